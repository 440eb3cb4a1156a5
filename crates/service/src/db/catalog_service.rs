use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use models::service_item::{self, ServiceFields};

use crate::errors::ServiceError;

/// Active services for the public catalogue, grouped by category.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<service_item::Model>, ServiceError> {
    let rows = service_item::Entity::find()
        .filter(service_item::Column::IsActive.eq(true))
        .order_by_asc(service_item::Column::Category)
        .order_by_asc(service_item::Column::Name)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(rows)
}

/// Every service, inactive ones included.
pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<service_item::Model>, ServiceError> {
    Ok(service_item::Entity::find()
        .order_by_asc(service_item::Column::Category)
        .order_by_asc(service_item::Column::Name)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?)
}

pub async fn get(db: &DatabaseConnection, id: i32) -> Result<Option<service_item::Model>, ServiceError> {
    Ok(service_item::Entity::find_by_id(id).one(db).await.map_err(|e| ServiceError::Db(e.to_string()))?)
}

/// A service that can be booked right now.
pub async fn get_active(db: &DatabaseConnection, id: i32) -> Result<service_item::Model, ServiceError> {
    get(db, id)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ServiceError::not_found("service"))
}

#[instrument(skip(db, fields), fields(name = %fields.name))]
pub async fn create(db: &DatabaseConnection, fields: ServiceFields) -> Result<service_item::Model, ServiceError> {
    let created = service_item::create(db, fields).await?;
    info!(service_id = created.id, "service created");
    Ok(created)
}

/// Replace all editable fields.
pub async fn update(db: &DatabaseConnection, id: i32, fields: ServiceFields) -> Result<service_item::Model, ServiceError> {
    fields.validate()?;
    let mut am: service_item::ActiveModel = get(db, id).await?.ok_or_else(|| ServiceError::not_found("service"))?.into();
    am.name = Set(fields.name.trim().to_string());
    am.description = Set(fields.description.filter(|d| !d.trim().is_empty()));
    am.category = Set(fields.category.trim().to_string());
    am.duration_minutes = Set(fields.duration_minutes);
    am.price = Set(fields.price);
    am.is_active = Set(fields.is_active);
    Ok(am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?)
}

/// Hide a service from the catalogue. Past bookings keep their copy of the name.
pub async fn deactivate(db: &DatabaseConnection, id: i32) -> Result<service_item::Model, ServiceError> {
    let mut am: service_item::ActiveModel = get(db, id).await?.ok_or_else(|| ServiceError::not_found("service"))?.into();
    am.is_active = Set(false);
    let updated = am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
    info!(service_id = id, "service deactivated");
    Ok(updated)
}
