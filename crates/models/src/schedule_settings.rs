use chrono::NaiveTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Singleton row with slot-generation settings.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedule_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub slot_interval_minutes: i32,
    pub overrun_minutes: i32,
    pub break_duration_minutes: i32,
    pub working_hours_start: NaiveTime,
    pub working_hours_end: NaiveTime,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate(
    slot_interval_minutes: i32,
    overrun_minutes: i32,
    break_duration_minutes: i32,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<(), ModelError> {
    if !(5..=240).contains(&slot_interval_minutes) {
        return Err(ModelError::Validation("slot_interval_minutes must be within 5..=240".into()));
    }
    if !(0..=240).contains(&overrun_minutes) {
        return Err(ModelError::Validation("overrun_minutes must be within 0..=240".into()));
    }
    if !(5..=240).contains(&break_duration_minutes) {
        return Err(ModelError::Validation("break_duration_minutes must be within 5..=240".into()));
    }
    if start >= end {
        return Err(ModelError::Validation("working_hours_start must be before working_hours_end".into()));
    }
    Ok(())
}
