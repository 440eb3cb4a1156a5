use chrono::{NaiveDate, NaiveTime};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Per-date override of the weekly template.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "master_schedule")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start_time: Option<NaiveTime>,
    pub break_end_time: Option<NaiveTime>,
    pub is_working: bool,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Shared shape check for template and dated hours.
pub fn validate_hours(
    start: NaiveTime,
    end: NaiveTime,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
) -> Result<(), ModelError> {
    if start >= end {
        return Err(ModelError::Validation("start_time must be before end_time".into()));
    }
    match (break_start, break_end) {
        (None, None) => Ok(()),
        (Some(bs), Some(be)) => {
            if bs >= be {
                return Err(ModelError::Validation("break_start must be before break_end".into()));
            }
            if bs < start || be > end {
                return Err(ModelError::Validation("break must lie within working hours".into()));
            }
            Ok(())
        }
        _ => Err(ModelError::Validation("break needs both start and end".into())),
    }
}
