use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};

/// A bookable service from the catalogue.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub duration_minutes: i32,
    pub price: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 720;

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    errors::require_text("name", name, 255)
}

pub fn validate_category(category: &str) -> Result<(), ModelError> {
    errors::require_text("category", category, 128)
}

pub fn validate_duration(minutes: i32) -> Result<(), ModelError> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(ModelError::Validation(format!(
            "duration_minutes must be within {MIN_DURATION_MINUTES}..={MAX_DURATION_MINUTES}"
        )));
    }
    Ok(())
}

pub fn validate_price(price: i32) -> Result<(), ModelError> {
    if price < 0 {
        return Err(ModelError::Validation("price must be >= 0".into()));
    }
    Ok(())
}

/// Fields accepted when creating or replacing a catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub duration_minutes: i32,
    pub price: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool { true }

impl ServiceFields {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name(&self.name)?;
        validate_category(&self.category)?;
        validate_duration(self.duration_minutes)?;
        validate_price(self.price)
    }
}

pub async fn create(db: &DatabaseConnection, fields: ServiceFields) -> Result<Model, ModelError> {
    fields.validate()?;
    let am = ActiveModel {
        name: Set(fields.name.trim().to_string()),
        description: Set(fields.description.filter(|d| !d.trim().is_empty())),
        category: Set(fields.category.trim().to_string()),
        duration_minutes: Set(fields.duration_minutes),
        price: Set(fields.price),
        is_active: Set(fields.is_active),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ServiceFields {
        ServiceFields {
            name: "Классический массаж".into(),
            description: None,
            category: "Массаж".into(),
            duration_minutes: 60,
            price: 6000,
            is_active: true,
        }
    }

    #[test]
    fn accepts_catalogue_entry() {
        assert!(fields().validate().is_ok());
    }

    #[test]
    fn rejects_short_duration_and_negative_price() {
        let mut f = fields();
        f.duration_minutes = 10;
        assert!(f.validate().is_err());
        let mut f = fields();
        f.price = -1;
        assert!(f.validate().is_err());
    }

    #[test]
    fn rejects_blank_name() {
        let mut f = fields();
        f.name = "   ".into();
        assert!(matches!(f.validate(), Err(ModelError::Validation(_))));
    }
}
