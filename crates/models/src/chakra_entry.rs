use sea_orm::entity::prelude::*;
use sea_orm::sea_query::StringLen;
use serde::{Deserialize, Serialize};

use crate::chakra;

/// The five kinds of facts attached to a chakra.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[sea_orm(string_value = "concept")]
    Concept,
    #[sea_orm(string_value = "question")]
    Question,
    #[sea_orm(string_value = "responsibility")]
    Responsibility,
    #[sea_orm(string_value = "science")]
    Science,
    #[sea_orm(string_value = "organ")]
    Organ,
}

impl EntryKind {
    pub const ALL: [EntryKind; 5] = [
        EntryKind::Concept,
        EntryKind::Question,
        EntryKind::Responsibility,
        EntryKind::Science,
        EntryKind::Organ,
    ];

    /// Plural URL segment (`concepts`, `questions`, ...).
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.segment() == segment)
    }

    pub fn segment(self) -> &'static str {
        match self {
            EntryKind::Concept => "concepts",
            EntryKind::Question => "questions",
            EntryKind::Responsibility => "responsibilities",
            EntryKind::Science => "sciences",
            EntryKind::Organ => "organs",
        }
    }

    /// Table-style prefix used in edit history field names.
    pub fn table(self) -> &'static str {
        match self {
            EntryKind::Concept => "chakra_concepts",
            EntryKind::Question => "chakra_questions",
            EntryKind::Responsibility => "chakra_responsibilities",
            EntryKind::Science => "chakra_sciences",
            EntryKind::Organ => "chakra_organs",
        }
    }

    pub fn title_field(self) -> &'static str {
        match self {
            EntryKind::Concept => "concept",
            EntryKind::Question => "question",
            EntryKind::Responsibility => "responsibility",
            EntryKind::Science => "science_name",
            EntryKind::Organ => "organ_name",
        }
    }

    /// `None` when the kind carries no secondary field.
    pub fn details_field(self) -> Option<&'static str> {
        match self {
            EntryKind::Concept => Some("category"),
            EntryKind::Question => Some("question_type"),
            EntryKind::Responsibility => None,
            EntryKind::Science | EntryKind::Organ => Some("description"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chakra_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chakra_id: i32,
    pub kind: EntryKind,
    pub title: String,
    pub details: Option<String>,
    /// Owner; `None` marks shared reference data.
    pub user_id: Option<i32>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Chakra,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Chakra => Entity::belongs_to(chakra::Entity)
                .from(Column::ChakraId)
                .to(chakra::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
