pub mod errors;
pub mod db;
pub mod service_item;
pub mod weekly_schedule;
pub mod master_schedule;
pub mod schedule_settings;
pub mod booking;
pub mod review;
pub mod login_attempt;
pub mod page_visit;
pub mod email_settings;
pub mod notification_log;
pub mod chakra_user;
pub mod chakra;
pub mod chakra_entry;
pub mod chakra_edit_history;

#[cfg(test)]
mod schema_tests {
    use std::time::Instant;

    use chrono::{NaiveDate, NaiveTime, Utc};
    use migration::MigratorTrait;
    use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};

    use crate::{booking, chakra_user, db, service_item};

    #[tokio::test]
    async fn entities_match_migrated_schema() {
        let db = match db::connect_memory().await {
            Ok(db) => db,
            Err(e) => {
                eprintln!("skip: cannot open sqlite: {}", e);
                return;
            }
        };
        migration::Migrator::up(&db, None).await.expect("migrate up");
        let start = Instant::now();

        let svc = service_item::create(
            &db,
            service_item::ServiceFields {
                name: "Стоун-терапия".into(),
                description: Some("Горячие камни".into()),
                category: "Массаж".into(),
                duration_minutes: 90,
                price: 7500,
                is_active: true,
            },
        )
        .await
        .expect("create service");

        let txn = db.begin().await.expect("begin");
        let now = Utc::now();
        let b = booking::ActiveModel {
            service_id: Set(Some(svc.id)),
            service_name: Set(svc.name.clone()),
            booking_date: Set(NaiveDate::from_ymd_opt(2026, 3, 2).expect("date")),
            start_time: Set(NaiveTime::from_hms_opt(12, 0, 0).expect("time")),
            end_time: Set(NaiveTime::from_hms_opt(13, 30, 0).expect("time")),
            client_name: Set("Анна".into()),
            client_phone: Set("+7(999) 123-45-67".into()),
            client_email: Set(None),
            notes: Set(None),
            status: Set(booking::BookingStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .expect("insert booking");
        assert_eq!(b.status, booking::BookingStatus::Pending);
        txn.rollback().await.expect("rollback");
        assert!(booking::Entity::find().all(&db).await.expect("list").is_empty());

        let owner = chakra_user::create(
            &db,
            chakra_user::NewUser {
                name: "Owner".into(),
                email: None,
                role: "owner".into(),
                is_admin: false,
                telegram_id: Some(" 1001 ".into()),
                telegram_username: None,
                chakra_id: None,
            },
        )
        .await
        .expect("create user");
        assert!(owner.is_admin);
        assert_eq!(owner.telegram_id.as_deref(), Some("1001"));

        println!("elapsed_ms={}", start.elapsed().as_millis());
        migration::Migrator::down(&db, None).await.expect("migrate down");
    }
}
