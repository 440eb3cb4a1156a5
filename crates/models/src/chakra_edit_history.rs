use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chakra_edit_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chakra_id: i32,
    pub user_id: Option<i32>,
    /// `table.field`, e.g. `chakra_concepts.concept`.
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
