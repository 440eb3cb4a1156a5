use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set};

use models::notification_log;

use super::messages::Message;
use crate::errors::ServiceError;
use crate::pagination::Pagination;

pub const SENT: &str = "sent";
pub const FAILED: &str = "failed";
pub const SKIPPED: &str = "skipped";

pub async fn record(
    db: &DatabaseConnection,
    msg: &Message,
    channel: &str,
    recipient: String,
    status: &str,
    error: Option<String>,
) -> Result<notification_log::Model, ServiceError> {
    Ok(notification_log::ActiveModel {
        booking_id: Set(msg.booking_id),
        kind: Set(msg.kind.as_str().to_string()),
        channel: Set(channel.to_string()),
        recipient: Set(recipient),
        subject: Set(msg.subject.clone()),
        body: Set(msg.body.clone()),
        status: Set(status.to_string()),
        error: Set(error),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| ServiceError::Db(e.to_string()))?)
}

/// Newest first.
pub async fn list(db: &DatabaseConnection, opts: Pagination) -> Result<Vec<notification_log::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    Ok(notification_log::Entity::find()
        .order_by_desc(notification_log::Column::Id)
        .paginate(db, per_page)
        .fetch_page(page_idx)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?)
}
