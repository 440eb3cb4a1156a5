use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "page_visits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub page_url: String,
    pub user_ip: String,
    pub user_agent: String,
    /// Empty when the visitor came without a referrer.
    pub referrer: String,
    pub visited_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
