use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use tracing::instrument;

use models::page_visit;

use crate::errors::ServiceError;
use crate::scheduling::BusinessClock;

pub const DEFAULT_DAYS: i64 = 7;
pub const TOP_LIMIT: usize = 10;
pub const DIRECT_REFERRER: &str = "Direct";
/// Column widths of `page_visits`.
pub const MAX_PAGE_URL_LEN: usize = 512;
pub const MAX_IP_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct VisitInput {
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub ip: String,
}

pub async fn record_visit(db: &DatabaseConnection, input: VisitInput) -> Result<page_visit::Model, ServiceError> {
    let page = input.page_url.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()).unwrap_or_else(|| "/".into());
    if page.chars().count() > MAX_PAGE_URL_LEN {
        return Err(ServiceError::Validation(format!("page_url too long (max {MAX_PAGE_URL_LEN})")));
    }
    let am = page_visit::ActiveModel {
        page_url: Set(page),
        user_ip: Set(input.ip.chars().take(MAX_IP_LEN).collect()),
        user_agent: Set(input.user_agent.unwrap_or_default()),
        referrer: Set(input.referrer.map(|r| r.trim().to_string()).unwrap_or_default()),
        visited_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(am.insert(db).await.map_err(|e| ServiceError::Db(e.to_string()))?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCount {
    pub page_url: String,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub visits: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VisitStats {
    pub period_days: i64,
    pub total_visits: u64,
    pub unique_visitors: u64,
    pub top_pages: Vec<PageCount>,
    pub daily_stats: Vec<DayCount>,
    pub top_referrers: Vec<ReferrerCount>,
}

/// Out-of-range periods fall back to a week.
pub fn clamp_days(days: Option<i64>) -> i64 {
    days.filter(|d| (1..=365).contains(d)).unwrap_or(DEFAULT_DAYS)
}

fn top(counts: HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut v: Vec<(String, u64)> = counts.into_iter().collect();
    // ties broken by name so output is stable
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v.truncate(TOP_LIMIT);
    v
}

/// Daily buckets follow the business calendar, not UTC.
pub fn summarize(period_days: i64, clock: &BusinessClock, visits: &[page_visit::Model]) -> VisitStats {
    let mut pages: HashMap<String, u64> = HashMap::new();
    let mut referrers: HashMap<String, u64> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut ips: HashSet<&str> = HashSet::new();

    for v in visits {
        *pages.entry(v.page_url.clone()).or_default() += 1;
        let referrer = if v.referrer.trim().is_empty() { DIRECT_REFERRER.to_string() } else { v.referrer.clone() };
        *referrers.entry(referrer).or_default() += 1;
        *daily.entry(clock.local(v.visited_at).date()).or_default() += 1;
        ips.insert(v.user_ip.as_str());
    }

    VisitStats {
        period_days,
        total_visits: visits.len() as u64,
        unique_visitors: ips.len() as u64,
        top_pages: top(pages).into_iter().map(|(page_url, visits)| PageCount { page_url, visits }).collect(),
        daily_stats: daily.into_iter().map(|(date, visits)| DayCount { date, visits }).collect(),
        top_referrers: top(referrers).into_iter().map(|(referrer, visits)| ReferrerCount { referrer, visits }).collect(),
    }
}

#[instrument(skip(db, clock))]
pub async fn stats(db: &DatabaseConnection, clock: &BusinessClock, days: Option<i64>) -> Result<VisitStats, ServiceError> {
    let days = clamp_days(days);
    let since = Utc::now() - Duration::days(days);
    let visits = page_visit::Entity::find()
        .filter(page_visit::Column::VisitedAt.gte(since))
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    Ok(summarize(days, clock, &visits))
}
