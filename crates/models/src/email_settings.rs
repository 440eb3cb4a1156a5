use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub smtp_host: String,
    pub smtp_port: i32,
    pub sender_email: String,
    pub admin_email: String,
    pub notifications_enabled: bool,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const DEFAULT_SMTP_HOST: &str = "smtp.yandex.ru";
pub const DEFAULT_SMTP_PORT: i32 = 587;

/// Width of every e-mail column.
pub const MAX_EMAIL_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)*\.[^@\s.]{2,}$").expect("email regex")
});

/// `local@domain.tld` shape check: exactly one `@`, no blanks, dotted domain.
pub fn looks_like_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

#[cfg(test)]
mod tests {
    use super::looks_like_email;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("admin@example.ru"));
        assert!(!looks_like_email("admin@example"));
        assert!(!looks_like_email("@example.ru"));
        assert!(!looks_like_email("ad min@example.ru"));
        assert!(!looks_like_email("a@b@c.de"));
        assert!(!looks_like_email("anna@.example.ru"));
        assert!(!looks_like_email("anna@example..ru"));
        assert!(looks_like_email(" anna.k+spa@mail.example.ru "));
    }
}
