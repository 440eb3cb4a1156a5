use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl ReviewStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "pending" => Some(ReviewStatus::Pending),
            "approved" => Some(ReviewStatus::Approved),
            "rejected" => Some(ReviewStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub service: String,
    pub rating: i32,
    pub text: String,
    pub status: ReviewStatus,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const MAX_TEXT_CHARS: usize = 5000;

pub fn validate_text(text: &str) -> Result<(), ModelError> {
    errors::require_text("text", text, MAX_TEXT_CHARS)
}

pub fn validate_rating(rating: i32) -> Result<(), ModelError> {
    if !(1..=5).contains(&rating) {
        return Err(ModelError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

/// Validate an already trimmed review.
pub fn validate(name: &str, service: &str, rating: i32, text: &str) -> Result<(), ModelError> {
    errors::require_text("name", name, 255)?;
    errors::require_text("service", service, 255)?;
    validate_text(text)?;
    validate_rating(rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn text_length_counts_characters() {
        let cyrillic = "я".repeat(MAX_TEXT_CHARS);
        assert!(validate_text(&cyrillic).is_ok());
        assert!(validate_text(&format!("{cyrillic}я")).is_err());
    }

    #[test]
    fn all_fields_required() {
        assert!(validate("", "Массаж", 5, "Отлично").is_err());
        assert!(validate("Анна", "", 5, "Отлично").is_err());
        assert!(validate("Анна", "Массаж", 5, "").is_err());
        assert!(validate("Анна", "Массаж", 5, "Отлично").is_ok());
    }
}
