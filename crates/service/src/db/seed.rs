//! Idempotent seed data: catalogue, weekly template and slot settings.

use chrono::{NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tracing::info;

use models::{schedule_settings, service_item, weekly_schedule};

use crate::errors::ServiceError;

struct CatalogueEntry {
    name: &'static str,
    category: &'static str,
    description: &'static str,
    duration_minutes: i32,
    price: i32,
}

const CATALOGUE: [CatalogueEntry; 5] = [
    CatalogueEntry {
        name: "Access Bars",
        category: "Access Bars",
        description: "Телесная техника для освобождения от ментальных блоков",
        duration_minutes: 90,
        price: 7000,
    },
    CatalogueEntry {
        name: "Классический массаж",
        category: "Массаж",
        description: "Классический массаж всего тела",
        duration_minutes: 60,
        price: 6000,
    },
    CatalogueEntry {
        name: "Комплексная программа",
        category: "Массаж",
        description: "Массаж и Access Bars за один визит",
        duration_minutes: 120,
        price: 11000,
    },
    CatalogueEntry {
        name: "Обучение Access Bars",
        category: "Обучение",
        description: "Однодневный курс с сертификатом",
        duration_minutes: 240,
        price: 29000,
    },
    CatalogueEntry {
        name: "Целительство",
        category: "Целительство",
        description: "Работа с чакрами и аурой",
        duration_minutes: 60,
        price: 7000,
    },
];

fn hm(h: u32, m: u32) -> Result<NaiveTime, ServiceError> {
    NaiveTime::from_hms_opt(h, m, 0).ok_or_else(|| ServiceError::Validation(format!("bad time {h}:{m}")))
}

/// Insert whatever defaults are missing. Safe to run on every start.
pub async fn seed_defaults(db: &DatabaseConnection) -> Result<(), ServiceError> {
    let mut created = 0u32;

    if service_item::Entity::find().count(db).await? == 0 {
        for e in CATALOGUE.iter() {
            service_item::ActiveModel {
                name: Set(e.name.to_string()),
                description: Set(Some(e.description.to_string())),
                category: Set(e.category.to_string()),
                duration_minutes: Set(e.duration_minutes),
                price: Set(e.price),
                is_active: Set(true),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            created += 1;
        }
    }

    let existing: Vec<i32> = weekly_schedule::Entity::find().all(db).await?.into_iter().map(|d| d.day_of_week).collect();
    for day in 1..=7 {
        if existing.contains(&day) {
            continue;
        }
        weekly_schedule::ActiveModel {
            day_of_week: Set(day),
            start_time: Set(hm(12, 0)?),
            end_time: Set(hm(21, 0)?),
            break_start_time: Set(Some(hm(15, 0)?)),
            break_end_time: Set(Some(hm(15, 30)?)),
            // Sunday off
            is_working: Set(day != 7),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created += 1;
    }

    if schedule_settings::Entity::find().count(db).await? == 0 {
        schedule_settings::ActiveModel {
            slot_interval_minutes: Set(30),
            overrun_minutes: Set(30),
            break_duration_minutes: Set(30),
            working_hours_start: Set(hm(12, 0)?),
            working_hours_end: Set(hm(21, 0)?),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created += 1;
    }

    if created > 0 {
        info!(rows = created, "seed data inserted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    #[tokio::test]
    async fn seeding_twice_changes_nothing() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        seed_defaults(&db).await?;
        assert_eq!(service_item::Entity::find().count(&db).await?, 5);
        assert_eq!(weekly_schedule::Entity::find().count(&db).await?, 7);
        assert_eq!(schedule_settings::Entity::find().count(&db).await?, 1);
        Ok(())
    }
}
