use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{self, ModelError};

/// Explorer account; `telegram_id` is the login handle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chakra_users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_admin: bool,
    #[sea_orm(unique)]
    pub telegram_id: Option<String>,
    pub telegram_username: Option<String>,
    pub chakra_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub const ROLES: [&str; 4] = ["owner", "admin", "responsible", "viewer"];

pub fn validate_role(role: &str) -> Result<(), ModelError> {
    if !ROLES.contains(&role) {
        return Err(ModelError::Validation(format!("role must be one of {}", ROLES.join(", "))));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub telegram_id: Option<String>,
    #[serde(default)]
    pub telegram_username: Option<String>,
    #[serde(default)]
    pub chakra_id: Option<i32>,
}

fn default_role() -> String { "viewer".into() }

pub async fn create(db: &DatabaseConnection, input: NewUser) -> Result<Model, ModelError> {
    errors::require_text("name", &input.name, 255)?;
    validate_role(&input.role)?;
    let am = ActiveModel {
        name: Set(input.name.trim().to_string()),
        email: Set(input.email.filter(|e| !e.trim().is_empty())),
        // owners always administer the explorer
        is_admin: Set(input.is_admin || input.role == "owner"),
        role: Set(input.role),
        telegram_id: Set(input.telegram_id.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())),
        telegram_username: Set(input.telegram_username),
        chakra_id: Set(input.chakra_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
