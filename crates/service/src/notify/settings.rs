use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TryIntoModel};
use serde::Deserialize;
use tracing::info;

use models::email_settings::{self, looks_like_email, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};

use crate::errors::ServiceError;

/// Values used until the admin saves the form.
pub fn defaults() -> email_settings::Model {
    email_settings::Model {
        id: 0,
        smtp_host: DEFAULT_SMTP_HOST.into(),
        smtp_port: DEFAULT_SMTP_PORT,
        sender_email: String::new(),
        admin_email: String::new(),
        notifications_enabled: false,
        updated_at: Utc::now(),
    }
}

/// Stored settings, or defaults when nothing was saved yet.
pub async fn get_settings(db: &DatabaseConnection) -> Result<email_settings::Model, ServiceError> {
    let row = email_settings::Entity::find()
        .order_by_asc(email_settings::Column::Id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(row.unwrap_or_else(defaults))
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettingsInput {
    #[serde(default = "default_host")]
    pub smtp_host: String,
    #[serde(default = "default_port")]
    pub smtp_port: i32,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub notifications_enabled: bool,
}

fn default_host() -> String { DEFAULT_SMTP_HOST.into() }
fn default_port() -> i32 { DEFAULT_SMTP_PORT }

impl EmailSettingsInput {
    pub fn validate(&self) -> Result<(), ServiceError> {
        models::errors::require_text("smtp_host", &self.smtp_host, 255)?;
        if !(1..=65535).contains(&self.smtp_port) {
            return Err(ServiceError::Validation("smtp_port must be within 1..=65535".into()));
        }
        for (field, value) in [("sender_email", &self.sender_email), ("admin_email", &self.admin_email)] {
            if !value.trim().is_empty() && !looks_like_email(value) {
                return Err(ServiceError::Validation(format!("{field} is not a valid e-mail")));
            }
        }
        if self.notifications_enabled && self.admin_email.trim().is_empty() {
            return Err(ServiceError::Validation("admin_email required when notifications are enabled".into()));
        }
        Ok(())
    }
}

pub async fn save_settings(db: &DatabaseConnection, input: EmailSettingsInput) -> Result<email_settings::Model, ServiceError> {
    input.validate()?;
    let current = email_settings::Entity::find()
        .order_by_asc(email_settings::Column::Id)
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    let mut am: email_settings::ActiveModel = match current {
        Some(row) => row.into(),
        None => email_settings::ActiveModel { ..Default::default() },
    };
    am.smtp_host = Set(input.smtp_host.trim().to_string());
    am.smtp_port = Set(input.smtp_port);
    am.sender_email = Set(input.sender_email.trim().to_string());
    am.admin_email = Set(input.admin_email.trim().to_string());
    am.notifications_enabled = Set(input.notifications_enabled);
    am.updated_at = Set(Utc::now());
    let saved = am
        .save(db)
        .await
        .and_then(|m| m.try_into_model())
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(enabled = saved.notifications_enabled, "notification settings saved");
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn input() -> EmailSettingsInput {
        EmailSettingsInput {
            smtp_host: "smtp.yandex.ru".into(),
            smtp_port: 587,
            sender_email: "bot@example.ru".into(),
            admin_email: "admin@example.ru".into(),
            notifications_enabled: true,
        }
    }

    #[tokio::test]
    async fn defaults_until_saved() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let s = get_settings(&db).await?;
        assert_eq!((s.smtp_host.as_str(), s.smtp_port), (DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT));
        assert!(!s.notifications_enabled);

        save_settings(&db, input()).await?;
        let mut second = input();
        second.smtp_port = 465;
        save_settings(&db, second).await?;
        let s = get_settings(&db).await?;
        assert_eq!(s.smtp_port, 465);
        assert_eq!(email_settings::Entity::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn validation_rules() {
        let mut i = input();
        i.smtp_port = 0;
        assert!(i.validate().is_err());
        let mut i = input();
        i.admin_email = "nope".into();
        assert!(i.validate().is_err());
        let mut i = input();
        i.admin_email = String::new();
        assert!(i.validate().is_err());
        i.notifications_enabled = false;
        assert!(i.validate().is_ok());
    }
}
