use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use models::login_attempt;

use crate::admin::domain::Attempt;
use crate::admin::errors::AdminAuthError;
use crate::admin::repository::LoginAttemptRepository;

pub struct SeaOrmLoginAttemptRepository {
    pub db: DatabaseConnection,
}

#[async_trait::async_trait]
impl LoginAttemptRepository for SeaOrmLoginAttemptRepository {
    async fn record(&self, attempt: Attempt) -> Result<(), AdminAuthError> {
        login_attempt::ActiveModel {
            ip_address: Set(attempt.ip),
            success: Set(attempt.success),
            attempt_time: Set(attempt.at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| AdminAuthError::Repository(e.to_string()))?;
        Ok(())
    }

    async fn failures_since(&self, ip: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AdminAuthError> {
        let rows = login_attempt::Entity::find()
            .filter(login_attempt::Column::IpAddress.eq(ip))
            .filter(login_attempt::Column::Success.eq(false))
            .filter(login_attempt::Column::AttemptTime.gt(since))
            .order_by_asc(login_attempt::Column::AttemptTime)
            .all(&self.db)
            .await
            .map_err(|e| AdminAuthError::Repository(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.attempt_time).collect())
    }
}
