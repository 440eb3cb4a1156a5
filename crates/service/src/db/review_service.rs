use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use common::metrics::REVIEWS_SUBMITTED_TOTAL;
use models::review::{self, ReviewStatus};

use crate::errors::ServiceError;

fn db_err(e: sea_orm::DbErr) -> ServiceError { ServiceError::Db(e.to_string()) }

/// Approved reviews per service filter. Any moderation drops every entry.
///
/// Keys carry a generation number bumped on every invalidation, so a list read
/// before a moderation and stored after it is filed under a dead generation.
#[derive(Clone)]
pub struct ReviewCache {
    inner: Cache<(u64, String), Arc<Vec<review::Model>>>,
    generation: Arc<AtomicU64>,
}

impl ReviewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(256).time_to_live(ttl).build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }

    async fn store(&self, generation: u64, key: String, rows: Arc<Vec<review::Model>>) {
        if generation == self.generation() {
            self.inner.insert((generation, key), rows).await;
        }
    }
}

impl Default for ReviewCache {
    fn default() -> Self { Self::new(Duration::from_secs(24 * 60 * 60)) }
}

/// Lowercased filter, or `None` when it means "everything".
pub fn normalize_filter(service: Option<&str>) -> Option<String> {
    let s = service?.trim().to_lowercase();
    match s.as_str() {
        "" | "все" | "all" => None,
        _ => Some(s),
    }
}

fn matches_service(r: &review::Model, filter: &Option<String>) -> bool {
    filter.as_ref().map_or(true, |f| r.service.to_lowercase().contains(f.as_str()))
}

/// Approved reviews, newest first, optionally narrowed by service name.
pub async fn list_public(db: &DatabaseConnection, cache: &ReviewCache, service: Option<&str>) -> Result<Arc<Vec<review::Model>>, ServiceError> {
    let filter = normalize_filter(service);
    let key = filter.clone().unwrap_or_default();
    let generation = cache.generation();
    if let Some(hit) = cache.inner.get(&(generation, key.clone())).await {
        debug!(filter = %key, "reviews cache hit");
        return Ok(hit);
    }
    let rows = Arc::new(load_approved(db, &filter).await?);
    cache.store(generation, key, rows.clone()).await;
    Ok(rows)
}

async fn load_approved(db: &DatabaseConnection, filter: &Option<String>) -> Result<Vec<review::Model>, ServiceError> {
    Ok(review::Entity::find()
        .filter(review::Column::Status.eq(ReviewStatus::Approved))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .filter(|r| matches_service(r, filter))
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub text: String,
}

/// Store a visitor review for moderation.
#[instrument(skip(db, input))]
pub async fn submit(db: &DatabaseConnection, input: ReviewInput) -> Result<review::Model, ServiceError> {
    let name = input.name.trim();
    let service = input.service.trim();
    let text = input.text.trim();
    let rating = input.rating.unwrap_or(5);
    review::validate(name, service, rating, text)?;
    let now = Utc::now();
    let created = review::ActiveModel {
        name: Set(name.to_string()),
        service: Set(service.to_string()),
        rating: Set(rating),
        text: Set(text.to_string()),
        status: Set(ReviewStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err)?;
    REVIEWS_SUBMITTED_TOTAL.inc();
    info!(review_id = created.id, "review submitted");
    Ok(created)
}

/// Moderation queue, newest first.
pub async fn list(db: &DatabaseConnection, status: Option<&str>, service: Option<&str>) -> Result<Vec<review::Model>, ServiceError> {
    let mut q = review::Entity::find();
    if let Some(raw) = status.filter(|s| !s.trim().is_empty() && *s != "all") {
        let st = ReviewStatus::parse(raw).ok_or_else(|| ServiceError::Validation(format!("unknown status: {raw}")))?;
        q = q.filter(review::Column::Status.eq(st));
    }
    let filter = normalize_filter(service);
    Ok(q.order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .filter(|r| matches_service(r, &filter))
        .collect())
}

async fn find(db: &DatabaseConnection, id: i32) -> Result<review::Model, ServiceError> {
    review::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::not_found("review"))
}

#[instrument(skip(db, cache))]
pub async fn set_status(db: &DatabaseConnection, cache: &ReviewCache, id: i32, status: &str) -> Result<review::Model, ServiceError> {
    let st = ReviewStatus::parse(status).ok_or_else(|| ServiceError::Validation(format!("unknown status: {status}")))?;
    let mut am: review::ActiveModel = find(db, id).await?.into();
    am.status = Set(st);
    am.updated_at = Set(Utc::now());
    let updated = am.update(db).await.map_err(db_err)?;
    cache.invalidate();
    info!(review_id = id, status, "review moderated");
    Ok(updated)
}

/// Text is always replaced; name, service and rating only when given.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEdit {
    pub text: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
}

pub async fn edit(db: &DatabaseConnection, cache: &ReviewCache, id: i32, input: ReviewEdit) -> Result<review::Model, ServiceError> {
    let current = find(db, id).await?;
    let text = input.text.trim().to_string();
    let name = input.name.map(|n| n.trim().to_string()).unwrap_or_else(|| current.name.clone());
    let service = input.service.map(|s| s.trim().to_string()).unwrap_or_else(|| current.service.clone());
    let rating = input.rating.unwrap_or(current.rating);
    review::validate(&name, &service, rating, &text)?;

    let mut am: review::ActiveModel = current.into();
    am.text = Set(text);
    am.name = Set(name);
    am.service = Set(service);
    am.rating = Set(rating);
    am.updated_at = Set(Utc::now());
    let updated = am.update(db).await.map_err(db_err)?;
    cache.invalidate();
    Ok(updated)
}

pub async fn delete(db: &DatabaseConnection, cache: &ReviewCache, id: i32) -> Result<(), ServiceError> {
    let res = review::Entity::delete_by_id(id).exec(db).await.map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("review"));
    }
    cache.invalidate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn input(service: &str, text: &str) -> ReviewInput {
        ReviewInput { name: " Мария ".into(), service: service.into(), rating: None, text: text.into() }
    }

    #[test]
    fn catch_all_filters_are_ignored() {
        assert_eq!(normalize_filter(Some("Все")), None);
        assert_eq!(normalize_filter(Some(" all ")), None);
        assert_eq!(normalize_filter(Some("")), None);
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("Массаж")).as_deref(), Some("массаж"));
    }

    #[tokio::test]
    async fn submitted_reviews_wait_for_approval() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let cache = ReviewCache::default();
        let r = submit(&db, input("Классический массаж", " Очень понравилось ")).await?;
        assert_eq!(r.rating, 5);
        assert_eq!(r.name, "Мария");
        assert_eq!(r.text, "Очень понравилось");
        assert!(list_public(&db, &cache, None).await?.is_empty());

        set_status(&db, &cache, r.id, "approved").await?;
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);
        assert_eq!(list_public(&db, &cache, Some("МАССАЖ")).await?.len(), 1);
        assert!(list_public(&db, &cache, Some("Access")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn cache_serves_until_moderation() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let cache = ReviewCache::default();
        let a = submit(&db, input("Access Bars", "Лёгкость в голове")).await?;
        set_status(&db, &cache, a.id, "approved").await?;
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);

        // written behind the cache's back
        let b = submit(&db, input("Access Bars", "Спасибо")).await?;
        let mut am: review::ActiveModel = find(&db, b.id).await?.into();
        am.status = Set(ReviewStatus::Approved);
        am.update(&db).await?;
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);

        delete(&db, &cache, a.id).await?;
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);
        assert!(matches!(delete(&db, &cache, a.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn list_read_before_moderation_is_not_cached_after_it() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let cache = ReviewCache::default();
        let r = submit(&db, input("Access Bars", "Лёгкость")).await?;

        // a public read loads the old (empty) list...
        let generation = cache.generation();
        let stale = Arc::new(load_approved(&db, &None).await?);
        assert!(stale.is_empty());
        // ...moderation lands before that read stores its result...
        set_status(&db, &cache, r.id, "approved").await?;
        cache.store(generation, String::new(), stale).await;

        // ...and the next reader still sees the approved review
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_readers_and_moderation_settle_on_fresh_data() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let cache = ReviewCache::default();
        let r = submit(&db, input("Access Bars", "Спасибо")).await?;
        let readers: Vec<_> = (0..8)
            .map(|_| {
                let (db, cache) = (db.clone(), cache.clone());
                tokio::spawn(async move { list_public(&db, &cache, None).await.map(|rows| rows.len()) })
            })
            .collect();
        set_status(&db, &cache, r.id, "approved").await?;
        for reader in readers {
            reader.await??;
        }
        assert_eq!(list_public(&db, &cache, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn validation_and_edits() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let cache = ReviewCache::default();
        let mut bad = input("Массаж", "Текст");
        bad.rating = Some(6);
        assert!(matches!(submit(&db, bad).await, Err(ServiceError::Model(_))));
        assert!(submit(&db, input("Массаж", "   ")).await.is_err());

        let r = submit(&db, input("Массаж", "Было хорошо")).await?;
        let e = edit(&db, &cache, r.id, ReviewEdit { text: "Было отлично".into(), name: None, service: None, rating: Some(4) }).await?;
        assert_eq!((e.text.as_str(), e.rating, e.name.as_str()), ("Было отлично", 4, "Мария"));

        assert_eq!(list(&db, Some("pending"), None).await?.len(), 1);
        assert_eq!(list(&db, Some("approved"), None).await?.len(), 0);
        assert!(list(&db, Some("spam"), None).await.is_err());
        Ok(())
    }
}
