use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct BookingRequestDoc {
    pub service_id: i32,
    /// YYYY-MM-DD
    pub booking_date: String,
    /// HH:MM
    pub start_time: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(ToSchema)]
pub struct ReviewInputDoc {
    pub name: String,
    pub service: String,
    /// 1..=5, defaults to 5
    pub rating: Option<i32>,
    pub text: String,
}

#[derive(ToSchema)]
pub struct AdminLoginDoc { pub password: String }

#[derive(ToSchema)]
pub struct TelegramLoginDoc { pub telegram_id: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::catalog::list_services,
        crate::routes::catalog::get_service,
        crate::routes::catalog::availability,
        crate::routes::catalog::schedule_days,
        crate::routes::bookings::create,
        crate::routes::reviews::list_public,
        crate::routes::reviews::submit,
        crate::routes::analytics::record_visit,
        crate::routes::telegram::webhook,
        crate::routes::admin_auth::login,
        crate::routes::admin_auth::logout,
        crate::routes::chakra::login,
        crate::routes::chakra::list,
        crate::routes::chakra::detail,
        crate::routes::chakra::update,
    ),
    components(
        schemas(
            HealthResponse,
            BookingRequestDoc,
            ReviewInputDoc,
            AdminLoginDoc,
            TelegramLoginDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "catalog"),
        (name = "bookings"),
        (name = "reviews"),
        (name = "analytics"),
        (name = "admin"),
        (name = "chakra"),
        (name = "telegram")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_are_documented() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/api/bookings", "/api/availability", "/api/chakras/{id}", "/api/telegram/webhook"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
