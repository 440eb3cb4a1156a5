use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use dashmap::DashMap;
use sea_orm::DatabaseConnection;
use tracing::{info, instrument, warn};

use models::booking::{self, BookingStatus};

use super::callback::Callback;
use super::reply::{BotApi, Button, Reply};
use super::update::{IncomingMessage, Update, User};
use crate::booking::{BookingDraft, ClientInput, SelectedService};
use crate::chakra::service as chakras;
use crate::db::booking_service::{self, BookingFilter, BookingPolicy, BookingRequest};
use crate::db::{catalog_service, schedule_service};
use crate::errors::ServiceError;
use crate::notify::Dispatcher;
use crate::pagination::Pagination;
use crate::scheduling::iso_weekday;
use crate::timefmt::{add_days, hhmm};

/// Dates offered after a service is picked.
const DATE_CHOICES: usize = 7;
/// How far ahead to look for those dates.
const DATE_SCAN_DAYS: i64 = 21;
const SLOTS_PER_ROW: usize = 4;
const CONTACT_LABEL: &str = "📱 Отправить номер телефона";
const HELP: &str = "Команды:\n/start — главное меню\n/services — услуги и запись\n/mybookings — мои записи\n/cancel — прервать запись";

#[derive(Debug, Clone, Default)]
pub struct BotSettings {
    /// Telegram user id allowed into the owner menu.
    pub owner_id: Option<i64>,
    /// Public site, for chakra structure links.
    pub site_url: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`.
    pub webhook_secret: Option<String>,
}

impl BotSettings {
    pub fn from_config(cfg: &configs::TelegramConfig) -> Self {
        let owner_id = cfg.owner().and_then(|raw| match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(owner = %raw, "telegram owner is not a numeric user id; owner menu disabled");
                None
            }
        });
        Self {
            owner_id,
            site_url: cfg.site_url.trim_end_matches('/').to_string(),
            webhook_secret: cfg.webhook_secret.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// A chat that picked a slot and still owes its phone number.
#[derive(Debug, Clone)]
struct PendingBooking {
    draft: BookingDraft,
    name: String,
    username: Option<String>,
}

/// Booking conversations over the Bot API. Draft state lives in memory per chat.
pub struct BookingBot {
    db: DatabaseConnection,
    api: Arc<dyn BotApi>,
    notifier: Arc<Dispatcher>,
    policy: BookingPolicy,
    settings: BotSettings,
    pending: DashMap<i64, PendingBooking>,
}

impl BookingBot {
    pub fn new(db: DatabaseConnection, api: Arc<dyn BotApi>, notifier: Arc<Dispatcher>, policy: BookingPolicy, settings: BotSettings) -> Self {
        Self { db, api, notifier, policy, settings, pending: DashMap::new() }
    }

    /// Webhook requests must echo the configured secret; without one every request is accepted.
    pub fn accepts_secret(&self, header: Option<&str>) -> bool {
        match &self.settings.webhook_secret {
            Some(expected) => header == Some(expected.as_str()),
            None => true,
        }
    }

    fn is_owner(&self, user_id: i64) -> bool {
        self.settings.owner_id == Some(user_id)
    }

    /// Handle one update and send the replies. Failures are logged, never returned:
    /// Telegram retries anything but a 2xx.
    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn process(&self, update: Update) {
        if let Some(cb) = &update.callback_query {
            if let Err(e) = self.api.answer_callback(&cb.id).await {
                warn!(error = %e, "answerCallbackQuery failed");
            }
        }
        let replies = match self.handle(update).await {
            Ok(replies) => replies,
            Err(e) => {
                warn!(error = %e, "bot update failed");
                return;
            }
        };
        for reply in &replies {
            if let Err(e) = self.api.send(reply).await {
                warn!(chat_id = reply.chat_id, error = %e, "sendMessage failed");
            }
        }
    }

    /// Replies for one update, without touching the Bot API.
    pub async fn handle(&self, update: Update) -> Result<Vec<Reply>, ServiceError> {
        if let Some(cb) = update.callback_query {
            let Some(chat) = cb.message.as_ref().map(|m| m.chat.id) else {
                return Ok(Vec::new());
            };
            let Some(action) = cb.data.as_deref().and_then(Callback::parse) else {
                return Ok(vec![Reply::text(chat, "Кнопка устарела, начните с /start")]);
            };
            let result = self.on_callback(chat, &cb.from, action).await;
            return user_facing(chat, result);
        }
        if let Some(msg) = update.message {
            let chat = msg.chat.id;
            let result = self.on_message(msg).await;
            return user_facing(chat, result);
        }
        Ok(Vec::new())
    }

    async fn on_message(&self, msg: IncomingMessage) -> Result<Vec<Reply>, ServiceError> {
        let chat = msg.chat.id;
        let user_id = msg.from.as_ref().map_or(chat, |u| u.id);
        if let Some(contact) = &msg.contact {
            return self.complete(chat, &contact.phone_number).await;
        }
        let text = msg.text.as_deref().map(str::trim).unwrap_or_default();
        // "/start@HarmonyBot" in group chats
        let command = text.split_whitespace().next().unwrap_or_default().split('@').next().unwrap_or_default();
        match command {
            "/start" => {
                self.pending.remove(&chat);
                Ok(vec![self.main_menu(chat, user_id)])
            }
            "/services" => Ok(vec![self.services(chat).await?]),
            "/mybookings" => Ok(vec![self.my_bookings(chat).await?]),
            "/cancel" => {
                let text = if self.pending.remove(&chat).is_some() { "Запись прервана." } else { "Нечего отменять." };
                Ok(vec![Reply::text(chat, text).removing_keyboard()])
            }
            "/admin" if self.is_owner(user_id) => Ok(vec![self.owner_menu(chat)]),
            _ => {
                if let Some(position) = chakra_command(command) {
                    return self.chakra_link(chat, msg.from.as_ref(), position).await;
                }
                if !text.is_empty() && !text.starts_with('/') && self.pending.contains_key(&chat) {
                    return self.complete(chat, text).await;
                }
                Ok(vec![Reply::text(chat, HELP)])
            }
        }
    }

    async fn on_callback(&self, chat: i64, from: &User, action: Callback) -> Result<Vec<Reply>, ServiceError> {
        if action.owner_only() && !self.is_owner(from.id) {
            return Ok(vec![Reply::text(chat, "⛔ Недостаточно прав")]);
        }
        match action {
            Callback::Menu => Ok(vec![self.main_menu(chat, from.id)]),
            Callback::Services => Ok(vec![self.services(chat).await?]),
            Callback::Service(id) => Ok(vec![self.dates(chat, id).await?]),
            Callback::Date(id, date) => Ok(vec![self.times(chat, id, date).await?]),
            Callback::Time(id, date, time) => self.choose_time(chat, from, id, date, time).await,
            Callback::MyBookings => Ok(vec![self.my_bookings(chat).await?]),
            Callback::Cancel(id) => self.cancel(chat, from.id, id).await,
            Callback::OwnerMenu => Ok(vec![self.owner_menu(chat)]),
            Callback::OwnerToday => {
                let today = self.policy.clock.today();
                let rows = booking_service::list_for_date(&self.db, today).await?;
                Ok(vec![owner_list(chat, format!("📅 Записи на {}", date_label(today)), &rows)])
            }
            Callback::OwnerPending => {
                let filter = BookingFilter { status: Some(BookingStatus::Pending.as_str().into()), from: Some(self.policy.clock.today()) };
                let rows = booking_service::list(&self.db, filter, Pagination::default()).await?;
                Ok(vec![owner_list(chat, "⏳ Ожидают подтверждения".into(), &rows)])
            }
            Callback::Confirm(id) => {
                let change = booking_service::update_status(&self.db, id, BookingStatus::Confirmed.as_str()).await?;
                if change.changed {
                    self.notifier.spawn_status_changed(change.booking.clone());
                }
                Ok(vec![Reply::text(chat, format!("✅ Запись #{id} подтверждена"))])
            }
        }
    }

    fn main_menu(&self, chat: i64, user_id: i64) -> Reply {
        let mut rows = vec![
            vec![Button::callback("📅 Записаться на сеанс", Callback::Services)],
            vec![Button::callback("📋 Мои записи", Callback::MyBookings)],
        ];
        if self.is_owner(user_id) {
            rows.push(vec![Button::callback("⚙️ Управление записями", Callback::OwnerMenu)]);
        }
        Reply::text(chat, "👋 Добро пожаловать в «Гармонию энергий»!\n\nВыберите действие:").with_buttons(rows)
    }

    fn owner_menu(&self, chat: i64) -> Reply {
        Reply::text(chat, "⚙️ Управление записями").with_buttons(vec![
            vec![Button::callback("📅 Сегодня", Callback::OwnerToday)],
            vec![Button::callback("⏳ Ожидают подтверждения", Callback::OwnerPending)],
            vec![Button::callback("🏠 Главное меню", Callback::Menu)],
        ])
    }

    async fn services(&self, chat: i64) -> Result<Reply, ServiceError> {
        let items = catalog_service::list_active(&self.db).await?;
        if items.is_empty() {
            return Ok(Reply::text(chat, "Сейчас нет доступных услуг."));
        }
        let mut text = String::from("📋 Услуги:\n");
        let mut rows = Vec::with_capacity(items.len() + 1);
        for s in &items {
            text.push_str(&format!("\n• {} — {} мин, {} ₽", s.name, s.duration_minutes, s.price));
            rows.push(vec![Button::callback(s.name.clone(), Callback::Service(s.id))]);
        }
        rows.push(vec![Button::callback("🏠 Главное меню", Callback::Menu)]);
        Ok(Reply::text(chat, text).with_buttons(rows))
    }

    async fn free_slots(&self, date: NaiveDate, duration: i32) -> Result<Vec<NaiveTime>, ServiceError> {
        match schedule_service::working_day_for(&self.db, date).await? {
            Some(day) => schedule_service::free_slots(&self.db, &self.policy.clock, &day, duration).await,
            None => Ok(Vec::new()),
        }
    }

    async fn dates(&self, chat: i64, service_id: i32) -> Result<Reply, ServiceError> {
        let service = catalog_service::get_active(&self.db, service_id).await?;
        let today = self.policy.clock.today();
        let mut rows = Vec::new();
        for offset in 0..=DATE_SCAN_DAYS.min(self.policy.horizon_days) {
            if rows.len() == DATE_CHOICES {
                break;
            }
            let date = add_days(today, offset)?;
            if !self.free_slots(date, service.duration_minutes).await?.is_empty() {
                rows.push(vec![Button::callback(date_label(date), Callback::Date(service.id, date))]);
            }
        }
        let text = if rows.is_empty() {
            format!("😔 {}: свободных дат в ближайшее время нет.", service.name)
        } else {
            format!("📅 {}: выберите дату", service.name)
        };
        rows.push(vec![Button::callback("◀️ К услугам", Callback::Services)]);
        Ok(Reply::text(chat, text).with_buttons(rows))
    }

    /// Draft with service and date chosen, plus the free slots of that date.
    async fn draft(&self, service_id: i32, date: NaiveDate) -> Result<(BookingDraft, Vec<NaiveTime>), ServiceError> {
        let service = catalog_service::get_active(&self.db, service_id).await?;
        let duration = service.duration_minutes;
        let mut draft = BookingDraft::new();
        draft.select_service(SelectedService { id: service.id, name: service.name, duration_minutes: duration });
        draft.select_date(date, self.policy.clock.today(), self.policy.horizon_days)?;
        let slots = self.free_slots(date, duration).await?;
        Ok((draft, slots))
    }

    async fn times(&self, chat: i64, service_id: i32, date: NaiveDate) -> Result<Reply, ServiceError> {
        let (draft, slots) = self.draft(service_id, date).await?;
        let name = draft.service().map(|s| s.name.clone()).unwrap_or_default();
        let mut rows: Vec<Vec<Button>> = slots
            .chunks(SLOTS_PER_ROW)
            .map(|chunk| chunk.iter().map(|t| Button::callback(hhmm(*t), Callback::Time(service_id, date, *t))).collect())
            .collect();
        let text = if rows.is_empty() {
            format!("😔 На {} всё занято. Выберите другую дату.", date_label(date))
        } else {
            format!("🕐 {name}, {}: выберите время", date_label(date))
        };
        rows.push(vec![Button::callback("◀️ Другая дата", Callback::Service(service_id))]);
        Ok(Reply::text(chat, text).with_buttons(rows))
    }

    async fn choose_time(&self, chat: i64, from: &User, service_id: i32, date: NaiveDate, time: NaiveTime) -> Result<Vec<Reply>, ServiceError> {
        let (mut draft, slots) = self.draft(service_id, date).await?;
        if let Err(e) = draft.select_time(time, &slots) {
            return Ok(vec![Reply::text(chat, format!("❌ {e}")), self.times(chat, service_id, date).await?]);
        }
        let name = draft.service().map(|s| s.name.clone()).unwrap_or_default();
        self.pending.insert(chat, PendingBooking { draft, name: from.display_name(), username: from.username.clone() });
        let text = format!(
            "Вы выбрали: {name}, {} в {}.\n\nОтправьте номер телефона кнопкой ниже или сообщением. /cancel — прервать.",
            date_label(date),
            hhmm(time)
        );
        Ok(vec![Reply::text(chat, text).with_contact_request(CONTACT_LABEL)])
    }

    /// Last step: the phone arrived, store the booking.
    async fn complete(&self, chat: i64, phone: &str) -> Result<Vec<Reply>, ServiceError> {
        let Some((_, mut pending)) = self.pending.remove(&chat) else {
            return Ok(vec![Reply::text(chat, HELP).removing_keyboard()]);
        };
        let input = ClientInput {
            name: pending.name.clone(),
            phone: phone.to_string(),
            email: None,
            notes: pending.username.as_deref().map(|u| format!("Telegram: @{u}")),
        };
        if let Err(e) = pending.draft.fill_client(input) {
            let reply = Reply::text(chat, format!("❌ {e}. Попробуйте ещё раз.")).with_contact_request(CONTACT_LABEL);
            self.pending.insert(chat, pending);
            return Ok(vec![reply]);
        }
        let new = pending.draft.finish()?;
        let req = BookingRequest {
            service_id: Some(new.service.id),
            booking_date: Some(new.date.to_string()),
            start_time: Some(hhmm(new.start)),
            client_name: Some(new.client.name),
            client_phone: Some(new.client.phone),
            client_email: None,
            notes: new.client.notes,
            telegram_chat_id: Some(chat),
        };
        match booking_service::create_booking(&self.db, req, self.policy).await {
            Ok(b) => {
                info!(booking_id = b.id, chat_id = chat, "booking created from telegram");
                let text = format!(
                    "✅ Запись #{} принята!\n\n{}\n{} {}–{}\n\nМы подтвердим её в ближайшее время.",
                    b.id,
                    b.service_name,
                    date_label(b.booking_date),
                    hhmm(b.start_time),
                    hhmm(b.end_time)
                );
                self.notifier.spawn_booking_created(b);
                Ok(vec![Reply::text(chat, text).removing_keyboard(), self.main_menu(chat, chat)])
            }
            Err(ServiceError::Conflict(_)) => Ok(vec![
                Reply::text(chat, "😔 Это время только что заняли.").removing_keyboard(),
                self.times(chat, new.service.id, new.date).await?,
            ]),
            Err(e) => Err(e),
        }
    }

    async fn my_bookings(&self, chat: i64) -> Result<Reply, ServiceError> {
        let rows = booking_service::list_for_chat(&self.db, chat, self.policy.clock.today()).await?;
        if rows.is_empty() {
            return Ok(Reply::text(chat, "У вас нет предстоящих записей.")
                .with_buttons(vec![vec![Button::callback("📅 Записаться", Callback::Services)]]));
        }
        let mut text = String::from("📋 Ваши записи:\n");
        let mut buttons = Vec::with_capacity(rows.len() + 1);
        for b in &rows {
            text.push_str(&format!("\n{}\n", booking_line(b)));
            buttons.push(vec![Button::callback(format!("❌ Отменить #{}", b.id), Callback::Cancel(b.id))]);
        }
        buttons.push(vec![Button::callback("🏠 Главное меню", Callback::Menu)]);
        Ok(Reply::text(chat, text).with_buttons(buttons))
    }

    async fn cancel(&self, chat: i64, user_id: i64, id: i32) -> Result<Vec<Reply>, ServiceError> {
        let b = booking_service::get(&self.db, id).await?;
        if b.telegram_chat_id != Some(chat) && !self.is_owner(user_id) {
            return Ok(vec![Reply::text(chat, "❌ Запись не найдена")]);
        }
        let change = booking_service::update_status(&self.db, id, BookingStatus::Cancelled.as_str()).await?;
        if change.changed {
            self.notifier.spawn_status_changed(change.booking);
        }
        Ok(vec![Reply::text(chat, format!("✅ Запись #{id} отменена"))])
    }

    /// `/1`..`/7`: link to the chakra structure page for a member of that chakra.
    async fn chakra_link(&self, chat: i64, from: Option<&User>, position: i32) -> Result<Vec<Reply>, ServiceError> {
        let Some(username) = from.and_then(|u| u.username.as_deref()).filter(|u| !u.is_empty()) else {
            return Ok(vec![Reply::text(chat, "❌ Укажите username в настройках Telegram и повторите команду.")]);
        };
        let Some(member) = chakras::member_by_username(&self.db, username, position).await? else {
            return Ok(Vec::new());
        };
        if self.settings.site_url.is_empty() {
            return Ok(vec![Reply::text(chat, "Ссылка на сайт пока не настроена.")]);
        }
        let url = format!("{}/structure?chakra={position}&user={}", self.settings.site_url, member.id);
        Ok(vec![Reply::text(chat, format!("🔮 {}, ваша чакра №{position}", member.name))
            .with_buttons(vec![vec![Button::url("Открыть структуру", url)]])])
    }
}

/// Client mistakes become a chat message; storage failures stay errors.
fn user_facing(chat: i64, result: Result<Vec<Reply>, ServiceError>) -> Result<Vec<Reply>, ServiceError> {
    match result {
        Ok(replies) => Ok(replies),
        Err(ServiceError::Validation(m) | ServiceError::Conflict(m) | ServiceError::NotFound(m) | ServiceError::Forbidden(m)) => {
            Ok(vec![Reply::text(chat, format!("❌ {m}"))])
        }
        Err(e) => Err(e),
    }
}

fn chakra_command(command: &str) -> Option<i32> {
    match command.strip_prefix('/')?.parse::<i32>() {
        Ok(n) if (1..=7).contains(&n) => Some(n),
        _ => None,
    }
}

const WEEKDAYS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

fn date_label(date: NaiveDate) -> String {
    let idx = usize::try_from(iso_weekday(date) - 1).unwrap_or(0);
    format!("{} {}", WEEKDAYS.get(idx).copied().unwrap_or_default(), date.format("%d.%m.%Y"))
}

fn status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "ожидает подтверждения",
        BookingStatus::Confirmed => "подтверждена",
        BookingStatus::Cancelled => "отменена",
        BookingStatus::Completed => "завершена",
    }
}

fn booking_line(b: &booking::Model) -> String {
    format!(
        "#{} · {} {}–{}\n{} · {}",
        b.id,
        date_label(b.booking_date),
        hhmm(b.start_time),
        hhmm(b.end_time),
        b.service_name,
        status_label(b.status)
    )
}

fn owner_list(chat: i64, title: String, rows: &[booking::Model]) -> Reply {
    if rows.is_empty() {
        return Reply::text(chat, format!("{title}\n\nЗаписей нет."))
            .with_buttons(vec![vec![Button::callback("◀️ Назад", Callback::OwnerMenu)]]);
    }
    let mut text = format!("{title}\n");
    let mut buttons = Vec::new();
    for b in rows {
        text.push_str(&format!("\n{}\n👤 {}, {}\n", booking_line(b), b.client_name, b.client_phone));
        if b.status == BookingStatus::Pending {
            buttons.push(vec![
                Button::callback(format!("✅ #{}", b.id), Callback::Confirm(b.id)),
                Button::callback(format!("❌ #{}", b.id), Callback::Cancel(b.id)),
            ]);
        }
    }
    buttons.push(vec![Button::callback("◀️ Назад", Callback::OwnerMenu)]);
    Reply::text(chat, text).with_buttons(buttons)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Duration;

    use super::*;
    use crate::bot::reply::Markup;
    use crate::bot::update::{CallbackQuery, Chat, Contact};
    use crate::notify::NotifyError;
    use crate::test_support::get_db;
    use models::chakra_user;

    const OWNER: i64 = 1001;
    const ANNA: i64 = 42;

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<Reply>>,
        answered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn send(&self, reply: &Reply) -> Result<(), NotifyError> {
            self.sent.lock().map_err(|e| NotifyError::Transport(e.to_string()))?.push(reply.clone());
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str) -> Result<(), NotifyError> {
            self.answered.lock().map_err(|e| NotifyError::Transport(e.to_string()))?.push(callback_id.to_string());
            Ok(())
        }
    }

    async fn bot_with(api: Arc<RecordingApi>) -> Result<(BookingBot, DatabaseConnection), anyhow::Error> {
        let db = get_db().await?;
        let notifier = Arc::new(Dispatcher::load(db.clone(), Vec::new()).await?);
        let settings = BotSettings { owner_id: Some(OWNER), site_url: "https://harmony.example".into(), webhook_secret: Some("s3cret".into()) };
        Ok((BookingBot::new(db.clone(), api, notifier, BookingPolicy::default(), settings), db))
    }

    async fn bot() -> Result<(BookingBot, DatabaseConnection), anyhow::Error> {
        bot_with(Arc::new(RecordingApi::default())).await
    }

    fn user(id: i64, username: Option<&str>) -> User {
        User { id, first_name: "Анна".into(), last_name: None, username: username.map(Into::into) }
    }

    fn message(chat: i64, text: Option<&str>, contact: Option<&str>) -> IncomingMessage {
        IncomingMessage {
            message_id: 1,
            chat: Chat { id: chat },
            from: Some(user(chat, Some("anna"))),
            text: text.map(Into::into),
            contact: contact.map(|p| Contact { phone_number: p.into(), user_id: Some(chat) }),
        }
    }

    fn say(chat: i64, text: &str) -> Update {
        Update { update_id: 1, message: Some(message(chat, Some(text), None)), callback_query: None }
    }

    fn share_contact(chat: i64, phone: &str) -> Update {
        Update { update_id: 1, message: Some(message(chat, None, Some(phone))), callback_query: None }
    }

    fn press(chat: i64, cb: Callback) -> Update {
        Update {
            update_id: 1,
            message: None,
            callback_query: Some(CallbackQuery {
                id: format!("cb-{chat}"),
                from: user(chat, Some("anna")),
                message: Some(message(chat, Some("menu"), None)),
                data: Some(cb.to_string()),
            }),
        }
    }

    fn next_monday(bot: &BookingBot) -> NaiveDate {
        let mut d = bot.policy.clock.today() + Duration::days(1);
        while iso_weekday(d) != 1 {
            d += Duration::days(1);
        }
        d
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("time")
    }

    #[tokio::test]
    async fn start_menu_shows_owner_tools_only_to_the_owner() -> Result<(), anyhow::Error> {
        let (bot, _db) = bot().await?;
        let client = bot.handle(say(ANNA, "/start")).await?;
        assert_eq!(client.len(), 1);
        assert_eq!(client[0].callbacks(), vec![Callback::Services, Callback::MyBookings]);

        let owner = bot.handle(say(OWNER, "/start@HarmonyBot")).await?;
        assert!(owner[0].callbacks().contains(&Callback::OwnerMenu));

        let refused = bot.handle(press(ANNA, Callback::OwnerToday)).await?;
        assert_eq!(refused[0].text, "⛔ Недостаточно прав");
        assert_eq!(bot.handle(say(ANNA, "/admin")).await?[0].text, HELP);
        Ok(())
    }

    #[tokio::test]
    async fn full_booking_conversation_creates_a_pending_booking() -> Result<(), anyhow::Error> {
        let (bot, db) = bot().await?;
        let monday = next_monday(&bot);

        let services = bot.handle(say(ANNA, "/services")).await?;
        assert!(services[0].callbacks().contains(&Callback::Service(2)));

        let dates = bot.handle(press(ANNA, Callback::Service(2))).await?;
        let offered = dates[0].callbacks();
        assert!(offered.len() > 1 && offered.len() <= DATE_CHOICES + 1);
        assert!(offered[..offered.len() - 1].iter().all(|cb| matches!(cb, Callback::Date(2, _))));
        assert_eq!(offered.last(), Some(&Callback::Services));

        let times = bot.handle(press(ANNA, Callback::Date(2, monday))).await?;
        assert!(times[0].callbacks().contains(&Callback::Time(2, monday, at(12, 0))));

        let ask = bot.handle(press(ANNA, Callback::Time(2, monday, at(12, 0)))).await?;
        assert!(matches!(ask[0].markup, Some(Markup::RequestContact(_))));

        let bad = bot.handle(share_contact(ANNA, "12")).await?;
        assert!(bad[0].text.starts_with("❌"));

        let done = bot.handle(share_contact(ANNA, "+79991234567")).await?;
        assert!(done[0].text.starts_with("✅ Запись #"));
        assert_eq!(done[0].markup, Some(Markup::RemoveKeyboard));

        let stored = booking_service::list_for_date(&db, monday).await?;
        assert_eq!(stored.len(), 1);
        let b = &stored[0];
        assert_eq!(b.telegram_chat_id, Some(ANNA));
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.client_name, "Анна");
        assert_eq!(b.client_phone, "+7(999) 123-45-67");
        assert_eq!(b.notes.as_deref(), Some("Telegram: @anna"));

        // the slot is gone for the next chat
        let again = bot.handle(press(77, Callback::Time(2, monday, at(12, 0)))).await?;
        assert_eq!(again.len(), 2);
        assert!(!again[1].callbacks().contains(&Callback::Time(2, monday, at(12, 0))));
        Ok(())
    }

    #[tokio::test]
    async fn typed_phone_completes_and_cancel_drops_the_draft() -> Result<(), anyhow::Error> {
        let (bot, db) = bot().await?;
        let monday = next_monday(&bot);

        bot.handle(press(ANNA, Callback::Time(2, monday, at(16, 30)))).await?;
        let dropped = bot.handle(say(ANNA, "/cancel")).await?;
        assert_eq!(dropped[0].text, "Запись прервана.");
        assert_eq!(bot.handle(say(ANNA, "+7 999 123 45 67")).await?[0].text, HELP);

        bot.handle(press(ANNA, Callback::Time(2, monday, at(16, 30)))).await?;
        bot.handle(say(ANNA, "8 (999) 123-45-67")).await?;
        assert_eq!(booking_service::list_for_chat(&db, ANNA, monday).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn clients_see_and_cancel_only_their_own_bookings() -> Result<(), anyhow::Error> {
        let (bot, db) = bot().await?;
        let monday = next_monday(&bot);
        bot.handle(press(ANNA, Callback::Time(2, monday, at(12, 0)))).await?;
        bot.handle(share_contact(ANNA, "+79991234567")).await?;
        let id = booking_service::list_for_chat(&db, ANNA, monday).await?[0].id;

        let mine = bot.handle(say(ANNA, "/mybookings")).await?;
        assert!(mine[0].text.contains(&format!("#{id}")));
        assert!(mine[0].callbacks().contains(&Callback::Cancel(id)));

        let stranger = bot.handle(press(77, Callback::Cancel(id))).await?;
        assert_eq!(stranger[0].text, "❌ Запись не найдена");
        assert_eq!(booking_service::get(&db, id).await?.status, BookingStatus::Pending);

        let cancelled = bot.handle(press(ANNA, Callback::Cancel(id))).await?;
        assert_eq!(cancelled[0].text, format!("✅ Запись #{id} отменена"));
        assert_eq!(booking_service::get(&db, id).await?.status, BookingStatus::Cancelled);
        assert_eq!(bot.handle(press(ANNA, Callback::MyBookings)).await?[0].text, "У вас нет предстоящих записей.");

        let missing = bot.handle(press(ANNA, Callback::Cancel(9999))).await?;
        assert_eq!(missing[0].text, "❌ booking not found");
        Ok(())
    }

    #[tokio::test]
    async fn owner_confirms_pending_bookings() -> Result<(), anyhow::Error> {
        let (bot, db) = bot().await?;
        let monday = next_monday(&bot);
        bot.handle(press(ANNA, Callback::Time(2, monday, at(12, 0)))).await?;
        bot.handle(share_contact(ANNA, "+79991234567")).await?;
        let id = booking_service::list_for_chat(&db, ANNA, monday).await?[0].id;

        let pending = bot.handle(press(OWNER, Callback::OwnerPending)).await?;
        assert!(pending[0].callbacks().contains(&Callback::Confirm(id)));

        let confirmed = bot.handle(press(OWNER, Callback::Confirm(id))).await?;
        assert_eq!(confirmed[0].text, format!("✅ Запись #{id} подтверждена"));
        assert_eq!(booking_service::get(&db, id).await?.status, BookingStatus::Confirmed);

        let today = bot.handle(press(OWNER, Callback::OwnerToday)).await?;
        assert!(today[0].callbacks().contains(&Callback::OwnerMenu));
        Ok(())
    }

    #[tokio::test]
    async fn chakra_commands_link_known_members_only() -> Result<(), anyhow::Error> {
        let (bot, db) = bot().await?;
        let member = chakra_user::create(
            &db,
            chakra_user::NewUser {
                name: "Мария".into(),
                email: None,
                role: "responsible".into(),
                is_admin: false,
                telegram_id: Some("555".into()),
                telegram_username: Some("@anna".into()),
                chakra_id: Some(3),
            },
        )
        .await?;

        let link = bot.handle(say(ANNA, "/3")).await?;
        let Some(Markup::Inline(rows)) = &link[0].markup else { panic!("expected a link button") };
        assert_eq!(
            rows[0][0],
            Button::url("Открыть структуру", format!("https://harmony.example/structure?chakra=3&user={}", member.id))
        );

        assert!(bot.handle(say(ANNA, "/4")).await?.is_empty());
        assert_eq!(bot.handle(say(ANNA, "/8")).await?[0].text, HELP);

        let mut anonymous = message(ANNA, Some("/3"), None);
        anonymous.from = Some(user(ANNA, None));
        let no_username = bot.handle(Update { update_id: 2, message: Some(anonymous), callback_query: None }).await?;
        assert!(no_username[0].text.contains("username"));
        Ok(())
    }

    #[tokio::test]
    async fn process_answers_callbacks_and_sends_replies() -> Result<(), anyhow::Error> {
        let api = Arc::new(RecordingApi::default());
        let (bot, _db) = bot_with(api.clone()).await?;
        bot.process(press(ANNA, Callback::Menu)).await;
        bot.process(press(ANNA, Callback::Service(9999))).await;

        assert_eq!(*api.answered.lock().expect("lock"), vec!["cb-42".to_string(), "cb-42".to_string()]);
        let sent = api.sent.lock().expect("lock");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].chat_id, ANNA);
        assert!(sent[1].text.starts_with("❌"));

        assert!(bot.accepts_secret(Some("s3cret")));
        assert!(!bot.accepts_secret(Some("guess")));
        assert!(!bot.accepts_secret(None));
        Ok(())
    }
}
