use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use service::admin::AdminAuthError;
use service::chakra::ChakraAuthError;
use service::errors::ServiceError;

/// JSON error body: `{"error": ..., "detail": ...}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
    pub retry_after_secs: Option<i64>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), detail: None, retry_after_secs: None }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    fn internal(detail: String) -> Self {
        error!(error = %detail, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.error, detail: self.detail };
        let mut resp = (self.status, Json(body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(v) = HeaderValue::from_str(&secs.max(1).to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, v);
            }
        }
        resp
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::bad_request(m),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, m),
            ServiceError::Forbidden(m) => Self::new(StatusCode::FORBIDDEN, m),
            ServiceError::Unauthorized(m) => Self::unauthorized(m),
            ServiceError::RateLimited { retry_after_secs } => {
                let mut err = Self::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
                err.retry_after_secs = Some(retry_after_secs);
                err
            }
            ServiceError::Model(models::errors::ModelError::Validation(m)) => Self::bad_request(m),
            ServiceError::Model(other) => Self::internal(other.to_string()),
            ServiceError::Db(m) => Self::internal(m),
        }
    }
}

impl From<AdminAuthError> for JsonApiError {
    fn from(e: AdminAuthError) -> Self {
        let msg = e.to_string();
        match e {
            AdminAuthError::InvalidPassword | AdminAuthError::MissingToken => Self::unauthorized(msg),
            AdminAuthError::RateLimited { retry_after_secs } => {
                let mut err = Self::new(StatusCode::TOO_MANY_REQUESTS, msg);
                err.retry_after_secs = Some(retry_after_secs);
                err
            }
            AdminAuthError::NotConfigured => Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg),
            AdminAuthError::HashError(_) | AdminAuthError::Repository(_) => Self::internal(msg),
        }
    }
}

impl From<ChakraAuthError> for JsonApiError {
    fn from(e: ChakraAuthError) -> Self {
        match e {
            ChakraAuthError::TokenError(m) => Self::internal(m),
            other => Self::unauthorized(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::missing_field("client_name"), StatusCode::BAD_REQUEST),
            (ServiceError::not_found("booking"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("slot is already taken".into()), StatusCode::CONFLICT),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn throttled_login_sets_retry_after() {
        let resp = JsonApiError::from(AdminAuthError::RateLimited { retry_after_secs: 1800 }).into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok()), Some("1800"));
    }

    #[test]
    fn missing_field_message_is_kept() {
        let err = JsonApiError::from(ServiceError::missing_field("service_id"));
        assert_eq!(err.error, "Missing required field: service_id");
    }
}
