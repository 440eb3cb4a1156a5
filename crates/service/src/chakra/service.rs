use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use models::chakra_entry::{self, EntryKind};
use models::{chakra, chakra_edit_history, chakra_user};

use super::auth::{Caller, ChakraAuth, ChakraAuthError};
use crate::errors::ServiceError;

pub const HISTORY_LIMIT: u64 = 100;

fn db_err(e: sea_orm::DbErr) -> ServiceError { ServiceError::Db(e.to_string()) }

/// Role and admin flag as stored now. Tokens only carry the values from login time.
pub async fn resolve_caller(db: &DatabaseConnection, claimed: &Caller) -> Result<Caller, ServiceError> {
    let user = chakra_user::Entity::find_by_id(claimed.user_id)
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::Unauthorized("account no longer exists".into()))?;
    Ok(Caller { user_id: user.id, role: user.role, is_admin: user.is_admin })
}

async fn require_admin(db: &DatabaseConnection, caller: &Caller) -> Result<Caller, ServiceError> {
    let current = resolve_caller(db, caller).await?;
    if current.admin() {
        Ok(current)
    } else {
        Err(ServiceError::Forbidden("admin rights required".into()))
    }
}

/// Member of chakra `chakra_id` known by Telegram `username`, with or without the leading `@`.
pub async fn member_by_username(db: &DatabaseConnection, username: &str, chakra_id: i32) -> Result<Option<chakra_user::Model>, ServiceError> {
    let bare = username.trim().trim_start_matches('@');
    if bare.is_empty() {
        return Ok(None);
    }
    chakra_user::Entity::find()
        .filter(chakra_user::Column::TelegramUsername.is_in([bare.to_string(), format!("@{bare}")]))
        .filter(chakra_user::Column::ChakraId.eq(chakra_id))
        .one(db)
        .await
        .map_err(db_err)
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub user: chakra_user::Model,
}

/// Exchange a telegram id for a token.
#[instrument(skip(db, auth))]
pub async fn login(db: &DatabaseConnection, auth: &ChakraAuth, telegram_id: &str) -> Result<LoginResult, ChakraAuthError> {
    let user = chakra_user::Entity::find()
        .filter(chakra_user::Column::TelegramId.eq(telegram_id.trim()))
        .one(db)
        .await
        .map_err(|e| ChakraAuthError::TokenError(e.to_string()))?
        .ok_or(ChakraAuthError::UnknownUser)?;
    let token = auth.issue(&user)?;
    info!(user_id = user.id, role = %user.role, "chakra login");
    Ok(LoginResult { token, user })
}

/// Seed an owner account for `telegram_id` unless an admin already exists.
pub async fn bootstrap_admin(db: &DatabaseConnection, telegram_id: &str) -> Result<Option<chakra_user::Model>, ServiceError> {
    let admins = chakra_user::Entity::find()
        .filter(chakra_user::Column::IsAdmin.eq(true))
        .count(db)
        .await
        .map_err(db_err)?;
    if admins > 0 {
        return Ok(None);
    }
    let user = chakra_user::create(
        db,
        chakra_user::NewUser {
            name: "Администратор".into(),
            email: None,
            role: "owner".into(),
            is_admin: true,
            telegram_id: Some(telegram_id.to_string()),
            telegram_username: None,
            chakra_id: None,
        },
    )
    .await?;
    info!(user_id = user.id, "chakra admin bootstrapped");
    Ok(Some(user))
}

async fn log_change<C: ConnectionTrait>(
    db: &C,
    caller: &Caller,
    chakra_id: i32,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<(), ServiceError> {
    chakra_edit_history::ActiveModel {
        chakra_id: Set(chakra_id),
        user_id: Set(Some(caller.user_id)),
        field_name: Set(field),
        old_value: Set(old_value),
        new_value: Set(new_value),
        changed_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err)?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ChakraView {
    #[serde(flatten)]
    pub chakra: chakra::Model,
    pub responsible_name: Option<String>,
}

async fn user_names(db: &DatabaseConnection) -> Result<HashMap<i32, String>, ServiceError> {
    Ok(chakra_user::Entity::find().all(db).await.map_err(db_err)?.into_iter().map(|u| (u.id, u.name)).collect())
}

/// Chakras ordered by position with the responsible user's name.
pub async fn list_chakras(db: &DatabaseConnection) -> Result<Vec<ChakraView>, ServiceError> {
    let names = user_names(db).await?;
    let rows = chakra::Entity::find().order_by_asc(chakra::Column::Position).all(db).await.map_err(db_err)?;
    Ok(rows
        .into_iter()
        .map(|c| {
            let responsible_name = c.responsible_user_id.and_then(|id| names.get(&id).cloned());
            ChakraView { chakra: c, responsible_name }
        })
        .collect())
}

async fn find_chakra(db: &DatabaseConnection, id: i32) -> Result<chakra::Model, ServiceError> {
    chakra::Entity::find_by_id(id).one(db).await.map_err(db_err)?.ok_or_else(|| ServiceError::not_found("chakra"))
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChakraDetail {
    #[serde(flatten)]
    pub chakra: Option<ChakraView>,
    pub concepts: Vec<chakra_entry::Model>,
    pub questions: Vec<chakra_entry::Model>,
    pub responsibilities: Vec<chakra_entry::Model>,
    pub sciences: Vec<chakra_entry::Model>,
    pub organs: Vec<chakra_entry::Model>,
}

/// One chakra with its entries grouped by kind.
pub async fn chakra_detail(db: &DatabaseConnection, id: i32) -> Result<ChakraDetail, ServiceError> {
    let c = find_chakra(db, id).await?;
    let responsible_name = match c.responsible_user_id {
        Some(uid) => chakra_user::Entity::find_by_id(uid).one(db).await.map_err(db_err)?.map(|u| u.name),
        None => None,
    };
    let entries = chakra_entry::Entity::find()
        .filter(chakra_entry::Column::ChakraId.eq(id))
        .order_by_asc(chakra_entry::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?;
    let mut detail = ChakraDetail { chakra: Some(ChakraView { chakra: c, responsible_name }), ..Default::default() };
    for e in entries {
        match e.kind {
            EntryKind::Concept => detail.concepts.push(e),
            EntryKind::Question => detail.questions.push(e),
            EntryKind::Responsibility => detail.responsibilities.push(e),
            EntryKind::Science => detail.sciences.push(e),
            EntryKind::Organ => detail.organs.push(e),
        }
    }
    Ok(detail)
}

/// Editable chakra attributes; absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChakraPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub continent: Option<String>,
    pub right_statement: Option<String>,
    pub status: Option<String>,
    pub symbol_url: Option<String>,
}

/// Blank strings clear optional attributes.
fn optional(v: String) -> Option<String> {
    let v = v.trim().to_string();
    (!v.is_empty()).then_some(v)
}

#[instrument(skip(db, patch), fields(user_id = caller.user_id))]
pub async fn update_chakra(db: &DatabaseConnection, caller: &Caller, id: i32, patch: ChakraPatch) -> Result<chakra::Model, ServiceError> {
    let caller = &resolve_caller(db, caller).await?;
    if !caller.can_edit_chakras() {
        return Err(ServiceError::Forbidden("only admins and responsible users may edit chakras".into()));
    }
    let current = find_chakra(db, id).await?;
    let mut changes: Vec<(&'static str, Option<String>, Option<String>)> = Vec::new();
    let mut am: chakra::ActiveModel = current.clone().into();

    if let Some(name) = patch.name {
        let name = name.trim().to_string();
        models::errors::require_text("name", &name, 255)?;
        if name != current.name {
            changes.push(("name", Some(current.name.clone()), Some(name.clone())));
            am.name = Set(name);
        }
    }
    if let Some(color) = patch.color {
        let color = color.trim().to_string();
        models::errors::require_text("color", &color, 64)?;
        if color != current.color {
            changes.push(("color", Some(current.color.clone()), Some(color.clone())));
            am.color = Set(color);
        }
    }
    for (field, value, old) in [
        ("continent", patch.continent, &current.continent),
        ("right_statement", patch.right_statement, &current.right_statement),
        ("status", patch.status, &current.status),
        ("symbol_url", patch.symbol_url, &current.symbol_url),
    ] {
        let Some(value) = value.map(optional) else { continue };
        if &value == old {
            continue;
        }
        changes.push((field, old.clone(), value.clone()));
        match field {
            "continent" => am.continent = Set(value),
            "right_statement" => am.right_statement = Set(value),
            "status" => am.status = Set(value),
            _ => am.symbol_url = Set(value),
        }
    }

    if changes.is_empty() {
        return Ok(current);
    }
    am.updated_at = Set(Utc::now());
    let updated = am.update(db).await.map_err(db_err)?;
    for (field, old, new) in changes {
        log_change(db, caller, id, format!("chakras.{field}"), old, new).await?;
    }
    Ok(updated)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChakra {
    pub name: String,
    pub color: String,
    pub position: i32,
    #[serde(default)]
    pub right_statement: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub responsible_user_id: Option<i32>,
}

pub async fn create_chakra(db: &DatabaseConnection, caller: &Caller, input: NewChakra) -> Result<chakra::Model, ServiceError> {
    let caller = &require_admin(db, caller).await?;
    models::errors::require_text("name", &input.name, 255)?;
    models::errors::require_text("color", &input.color, 64)?;
    let created = chakra::ActiveModel {
        name: Set(input.name.trim().to_string()),
        color: Set(input.color.trim().to_string()),
        position: Set(input.position),
        right_statement: Set(input.right_statement.and_then(optional)),
        description: Set(input.description.and_then(optional)),
        continent: Set(input.continent.and_then(optional)),
        status: Set(None),
        symbol_url: Set(None),
        responsible_user_id: Set(input.responsible_user_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err)?;
    log_change(db, caller, created.id, "chakras.name".into(), None, Some(created.name.clone())).await?;
    Ok(created)
}

pub async fn delete_chakra(db: &DatabaseConnection, caller: &Caller, id: i32) -> Result<(), ServiceError> {
    require_admin(db, caller).await?;
    let res = chakra::Entity::delete_by_id(id).exec(db).await.map_err(db_err)?;
    if res.rows_affected == 0 {
        return Err(ServiceError::not_found("chakra"));
    }
    info!(chakra_id = id, "chakra deleted");
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryFilter {
    pub chakra_id: Option<i32>,
    pub user_id: Option<i32>,
}

/// Non-admins see their own rows and shared (unowned) ones; admins see all,
/// optionally narrowed to one owner.
pub async fn list_entries(db: &DatabaseConnection, caller: &Caller, kind: EntryKind, filter: EntryFilter) -> Result<Vec<chakra_entry::Model>, ServiceError> {
    let mut q = chakra_entry::Entity::find().filter(chakra_entry::Column::Kind.eq(kind));
    if let Some(chakra_id) = filter.chakra_id {
        q = q.filter(chakra_entry::Column::ChakraId.eq(chakra_id));
    }
    if caller.admin() {
        if let Some(uid) = filter.user_id {
            q = q.filter(chakra_entry::Column::UserId.eq(uid));
        }
    } else {
        q = q.filter(
            sea_orm::Condition::any()
                .add(chakra_entry::Column::UserId.eq(caller.user_id))
                .add(chakra_entry::Column::UserId.is_null()),
        );
    }
    Ok(q.order_by_asc(chakra_entry::Column::ChakraId)
        .order_by_asc(chakra_entry::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    pub chakra_id: i32,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    /// Only honoured for admins.
    #[serde(default)]
    pub user_id: Option<i32>,
}

fn title_field(kind: EntryKind) -> String {
    format!("{}.{}", kind.table(), kind.title_field())
}

fn details_field(kind: EntryKind) -> Option<String> {
    kind.details_field().map(|f| format!("{}.{}", kind.table(), f))
}

#[instrument(skip(db, input), fields(user_id = caller.user_id, kind = kind.segment()))]
pub async fn create_entry(db: &DatabaseConnection, caller: &Caller, kind: EntryKind, input: EntryInput) -> Result<chakra_entry::Model, ServiceError> {
    let title = input.title.trim().to_string();
    models::errors::require_text(kind.title_field(), &title, 1000)?;
    find_chakra(db, input.chakra_id).await?;
    let details = if kind.details_field().is_some() { input.details.and_then(optional) } else { None };
    let owner = if caller.admin() { input.user_id.or(Some(caller.user_id)) } else { Some(caller.user_id) };

    let created = chakra_entry::ActiveModel {
        chakra_id: Set(input.chakra_id),
        kind: Set(kind),
        title: Set(title),
        details: Set(details),
        user_id: Set(owner),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(db_err)?;
    log_change(db, caller, created.chakra_id, title_field(kind), None, Some(created.title.clone())).await?;
    if let (Some(field), Some(d)) = (details_field(kind), created.details.clone()) {
        log_change(db, caller, created.chakra_id, field, None, Some(d)).await?;
    }
    Ok(created)
}

async fn owned_entry(db: &DatabaseConnection, caller: &Caller, kind: EntryKind, id: i32) -> Result<chakra_entry::Model, ServiceError> {
    let entry = chakra_entry::Entity::find_by_id(id)
        .filter(chakra_entry::Column::Kind.eq(kind))
        .one(db)
        .await
        .map_err(db_err)?
        .ok_or_else(|| ServiceError::not_found("entry"))?;
    if !caller.admin() && entry.user_id.is_some_and(|owner| owner != caller.user_id) {
        return Err(ServiceError::Forbidden("entry belongs to another user".into()));
    }
    Ok(entry)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub details: Option<String>,
}

pub async fn update_entry(db: &DatabaseConnection, caller: &Caller, kind: EntryKind, id: i32, patch: EntryPatch) -> Result<chakra_entry::Model, ServiceError> {
    let entry = owned_entry(db, caller, kind, id).await?;
    let details_patch = patch.details.filter(|_| kind.details_field().is_some());
    if patch.title.is_none() && details_patch.is_none() {
        return Err(ServiceError::Validation("nothing to update".into()));
    }
    let mut am: chakra_entry::ActiveModel = entry.clone().into();
    let mut changes = Vec::new();
    if let Some(title) = patch.title {
        let title = title.trim().to_string();
        models::errors::require_text(kind.title_field(), &title, 1000)?;
        if title != entry.title {
            changes.push((title_field(kind), Some(entry.title.clone()), Some(title.clone())));
            am.title = Set(title);
        }
    }
    if let (Some(details), Some(field)) = (details_patch, details_field(kind)) {
        let details = optional(details);
        if details != entry.details {
            changes.push((field, entry.details.clone(), details.clone()));
            am.details = Set(details);
        }
    }
    if changes.is_empty() {
        return Ok(entry);
    }
    let updated = am.update(db).await.map_err(db_err)?;
    for (field, old, new) in changes {
        log_change(db, caller, entry.chakra_id, field, old, new).await?;
    }
    Ok(updated)
}

pub async fn delete_entry(db: &DatabaseConnection, caller: &Caller, kind: EntryKind, id: i32) -> Result<(), ServiceError> {
    let entry = owned_entry(db, caller, kind, id).await?;
    chakra_entry::Entity::delete_by_id(id).exec(db).await.map_err(db_err)?;
    log_change(db, caller, entry.chakra_id, title_field(kind), Some(entry.title), None).await?;
    Ok(())
}

pub async fn list_users(db: &DatabaseConnection, caller: &Caller) -> Result<Vec<chakra_user::Model>, ServiceError> {
    require_admin(db, caller).await?;
    Ok(chakra_user::Entity::find().order_by_asc(chakra_user::Column::Name).all(db).await.map_err(db_err)?)
}

pub async fn create_user(db: &DatabaseConnection, caller: &Caller, input: chakra_user::NewUser) -> Result<chakra_user::Model, ServiceError> {
    require_admin(db, caller).await?;
    if let Some(tid) = input.telegram_id.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let taken = chakra_user::Entity::find()
            .filter(chakra_user::Column::TelegramId.eq(tid))
            .count(db)
            .await
            .map_err(db_err)?;
        if taken > 0 {
            return Err(ServiceError::Conflict("telegram id already registered".into()));
        }
    }
    Ok(chakra_user::create(db, input).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    #[serde(flatten)]
    pub entry: chakra_edit_history::Model,
    pub user_name: Option<String>,
    pub chakra_name: Option<String>,
}

/// Latest edits first, at most [`HISTORY_LIMIT`].
pub async fn history(db: &DatabaseConnection, caller: &Caller, chakra_id: Option<i32>) -> Result<Vec<HistoryView>, ServiceError> {
    require_admin(db, caller).await?;
    let mut q = chakra_edit_history::Entity::find();
    if let Some(cid) = chakra_id {
        q = q.filter(chakra_edit_history::Column::ChakraId.eq(cid));
    }
    let rows = q
        .order_by_desc(chakra_edit_history::Column::ChangedAt)
        .order_by_desc(chakra_edit_history::Column::Id)
        .limit(HISTORY_LIMIT)
        .all(db)
        .await
        .map_err(db_err)?;
    let users = user_names(db).await?;
    let chakras: HashMap<i32, String> =
        chakra::Entity::find().all(db).await.map_err(db_err)?.into_iter().map(|c| (c.id, c.name)).collect();
    Ok(rows
        .into_iter()
        .map(|h| HistoryView {
            user_name: h.user_id.and_then(|u| users.get(&u).cloned()),
            chakra_name: chakras.get(&h.chakra_id).cloned(),
            entry: h,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    async fn user(db: &DatabaseConnection, name: &str, role: &str, tid: &str) -> chakra_user::Model {
        chakra_user::create(
            db,
            chakra_user::NewUser {
                name: name.into(),
                email: None,
                role: role.into(),
                is_admin: false,
                telegram_id: Some(tid.into()),
                telegram_username: None,
                chakra_id: None,
            },
        )
        .await
        .expect("user")
    }

    fn caller(u: &chakra_user::Model) -> Caller {
        Caller { user_id: u.id, role: u.role.clone(), is_admin: u.is_admin }
    }

    async fn setup(db: &DatabaseConnection) -> (Caller, Caller, Caller, chakra::Model) {
        let admin = bootstrap_admin(db, "1").await.expect("bootstrap").expect("created");
        let alice = user(db, "Алиса", "responsible", "2").await;
        let bob = user(db, "Борис", "viewer", "3").await;
        let admin = caller(&admin);
        let c = create_chakra(
            db,
            &admin,
            NewChakra {
                name: "Муладхара".into(),
                color: "красный".into(),
                position: 1,
                right_statement: Some("Я имею право быть".into()),
                description: None,
                continent: None,
                responsible_user_id: Some(alice.id),
            },
        )
        .await
        .expect("chakra");
        (admin, caller(&alice), caller(&bob), c)
    }

    fn concept(chakra_id: i32, title: &str) -> EntryInput {
        EntryInput { chakra_id, title: title.into(), details: Some("тело".into()), user_id: None }
    }

    #[tokio::test]
    async fn login_and_bootstrap() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let auth = ChakraAuth::new("secret", 24);
        assert!(matches!(login(&db, &auth, "1").await, Err(ChakraAuthError::UnknownUser)));
        assert!(bootstrap_admin(&db, "1").await?.is_some());
        assert!(bootstrap_admin(&db, "1").await?.is_none());
        let res = login(&db, &auth, " 1 ").await.expect("login");
        assert!(auth.verify(&res.token)?.admin());
        Ok(())
    }

    #[tokio::test]
    async fn listing_includes_responsible_name() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (_, _, _, c) = setup(&db).await;
        let list = list_chakras(&db).await?;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].responsible_name.as_deref(), Some("Алиса"));
        let detail = chakra_detail(&db, c.id).await?;
        assert!(detail.concepts.is_empty());
        assert!(matches!(chakra_detail(&db, 999).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn chakra_edits_are_role_gated_and_logged() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (admin, alice, bob, c) = setup(&db).await;
        let patch = ChakraPatch { color: Some("алый".into()), status: Some("в работе".into()), ..Default::default() };
        assert!(matches!(update_chakra(&db, &bob, c.id, patch.clone()).await, Err(ServiceError::Forbidden(_))));

        let updated = update_chakra(&db, &alice, c.id, patch).await?;
        assert_eq!(updated.color, "алый");
        let log = history(&db, &admin, Some(c.id)).await?;
        let fields: Vec<&str> = log.iter().map(|h| h.entry.field_name.as_str()).collect();
        assert!(fields.contains(&"chakras.color"));
        assert!(fields.contains(&"chakras.status"));
        assert!(log.iter().any(|h| h.user_name.as_deref() == Some("Алиса")));
        assert!(matches!(history(&db, &alice, None).await, Err(ServiceError::Forbidden(_))));
        Ok(())
    }

    #[tokio::test]
    async fn entries_respect_ownership() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (admin, alice, bob, c) = setup(&db).await;
        let mine = create_entry(&db, &alice, EntryKind::Concept, concept(c.id, "Опора")).await?;
        assert_eq!(mine.user_id, Some(alice.user_id));
        let shared = create_entry(&db, &admin, EntryKind::Concept, EntryInput { user_id: None, ..concept(c.id, "Земля") }).await?;
        assert_eq!(shared.user_id, Some(admin.user_id));

        // bob sees neither alice's row nor the admin's
        assert!(list_entries(&db, &bob, EntryKind::Concept, EntryFilter::default()).await?.is_empty());
        assert_eq!(list_entries(&db, &alice, EntryKind::Concept, EntryFilter::default()).await?.len(), 1);
        let by_owner = EntryFilter { chakra_id: Some(c.id), user_id: Some(alice.user_id) };
        assert_eq!(list_entries(&db, &admin, EntryKind::Concept, by_owner).await?.len(), 1);
        assert!(list_entries(&db, &admin, EntryKind::Organ, EntryFilter::default()).await?.is_empty());

        let patch = EntryPatch { title: Some("Устойчивость".into()), details: None };
        assert!(matches!(update_entry(&db, &bob, EntryKind::Concept, mine.id, patch.clone()).await, Err(ServiceError::Forbidden(_))));
        let updated = update_entry(&db, &alice, EntryKind::Concept, mine.id, patch).await?;
        assert_eq!(updated.title, "Устойчивость");
        assert!(matches!(
            update_entry(&db, &alice, EntryKind::Concept, mine.id, EntryPatch::default()).await,
            Err(ServiceError::Validation(_))
        ));

        assert!(matches!(delete_entry(&db, &bob, EntryKind::Concept, mine.id).await, Err(ServiceError::Forbidden(_))));
        delete_entry(&db, &admin, EntryKind::Concept, mine.id).await?;
        assert!(matches!(delete_entry(&db, &admin, EntryKind::Concept, mine.id).await, Err(ServiceError::NotFound(_))));

        let log = history(&db, &admin, Some(c.id)).await?;
        assert!(log.iter().any(|h| h.entry.field_name == "chakra_concepts.concept" && h.entry.new_value.is_none()));
        assert!(log.iter().any(|h| h.entry.field_name == "chakra_concepts.category"));
        Ok(())
    }

    #[tokio::test]
    async fn unowned_rows_are_shared() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (_, _, bob, c) = setup(&db).await;
        let row = chakra_entry::ActiveModel {
            chakra_id: Set(c.id),
            kind: Set(EntryKind::Organ),
            title: Set("Почки".into()),
            details: Set(None),
            user_id: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
        assert_eq!(list_entries(&db, &bob, EntryKind::Organ, EntryFilter::default()).await?.len(), 1);
        let patch = EntryPatch { title: None, details: Some("фильтрация".into()) };
        assert_eq!(update_entry(&db, &bob, EntryKind::Organ, row.id, patch).await?.details.as_deref(), Some("фильтрация"));
        Ok(())
    }

    #[tokio::test]
    async fn admin_only_operations() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (admin, alice, _, c) = setup(&db).await;
        assert!(matches!(list_users(&db, &alice).await, Err(ServiceError::Forbidden(_))));
        assert_eq!(list_users(&db, &admin).await?.len(), 3);
        let dup = chakra_user::NewUser {
            name: "Двойник".into(),
            email: None,
            role: "viewer".into(),
            is_admin: false,
            telegram_id: Some("2".into()),
            telegram_username: None,
            chakra_id: None,
        };
        assert!(matches!(create_user(&db, &admin, dup).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(delete_chakra(&db, &alice, c.id).await, Err(ServiceError::Forbidden(_))));
        delete_chakra(&db, &admin, c.id).await?;
        assert!(matches!(delete_chakra(&db, &admin, c.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn stale_claims_do_not_grant_admin_rights() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let (admin, _, bob, c) = setup(&db).await;

        // token claims say owner, the stored row says viewer
        let inflated = Caller { role: "owner".into(), is_admin: true, ..bob.clone() };
        assert!(matches!(list_users(&db, &inflated).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(delete_chakra(&db, &inflated, c.id).await, Err(ServiceError::Forbidden(_))));
        let patch = ChakraPatch { name: Some("Свадхистана".into()), ..Default::default() };
        assert!(matches!(update_chakra(&db, &inflated, c.id, patch).await, Err(ServiceError::Forbidden(_))));

        // revoked admin flag takes effect without a new login
        let mut am: chakra_user::ActiveModel = chakra_user::Entity::find_by_id(admin.user_id)
            .one(&db)
            .await?
            .ok_or_else(|| anyhow::anyhow!("admin row"))?
            .into();
        am.is_admin = Set(false);
        am.role = Set("viewer".into());
        am.update(&db).await?;
        assert!(matches!(history(&db, &admin, None).await, Err(ServiceError::Forbidden(_))));

        let ghost = Caller { user_id: 4242, role: "owner".into(), is_admin: true };
        assert!(matches!(resolve_caller(&db, &ghost).await, Err(ServiceError::Unauthorized(_))));
        Ok(())
    }
}
