use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chakra_user;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chakras")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub color: String,
    pub position: i32,
    pub right_statement: Option<String>,
    pub description: Option<String>,
    pub continent: Option<String>,
    pub status: Option<String>,
    pub symbol_url: Option<String>,
    pub responsible_user_id: Option<i32>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Responsible,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Responsible => Entity::belongs_to(chakra_user::Entity)
                .from(Column::ResponsibleUserId)
                .to(chakra_user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
