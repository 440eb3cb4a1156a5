use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub chakra: ChakraConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub reviews: ReviewsConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Optional side listener serving `/healthz` and `/metrics`.
    #[serde(default)]
    pub admin_addr: Option<String>,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            admin_addr: None,
            frontend_dir: default_frontend_dir(),
            log_format: default_log_format(),
        }
    }
}

fn default_frontend_dir() -> String { "frontend".into() }
fn default_log_format() -> String { "compact".into() }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Password-gated admin panel.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Plain password; hashed with argon2 at startup and never kept around afterwards.
    #[serde(default)]
    pub password: Option<String>,
    /// Precomputed argon2 PHC string, takes precedence over `password`.
    #[serde(default)]
    pub password_hash: Option<String>,
    /// Long-lived token accepted next to session tokens.
    #[serde(default)]
    pub static_token: Option<String>,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u64,
    #[serde(default = "default_lockout_minutes")]
    pub lockout_minutes: i64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: None,
            password_hash: None,
            static_token: None,
            session_ttl_hours: default_session_ttl_hours(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_minutes: default_lockout_minutes(),
        }
    }
}

fn default_session_ttl_hours() -> i64 { 24 }
fn default_max_failed_attempts() -> u64 { 5 }
fn default_lockout_minutes() -> i64 { 60 }

/// Smallest accepted HS256 secret.
pub const MIN_JWT_SECRET_BYTES: usize = 32;
const PLACEHOLDER_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Deserialize)]
pub struct ChakraConfig {
    /// Required; set it in the file or through `JWT_SECRET`.
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub bootstrap_admin_telegram_id: Option<String>,
}

impl Default for ChakraConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new(), token_ttl_hours: default_session_ttl_hours(), bootstrap_admin_telegram_id: None }
    }
}

impl ChakraConfig {
    fn validate(&self) -> Result<()> {
        let secret = self.jwt_secret.trim();
        if secret.is_empty() {
            return Err(anyhow!("chakra.jwt_secret is required; set it in config.toml or JWT_SECRET"));
        }
        if secret == PLACEHOLDER_JWT_SECRET {
            return Err(anyhow!("chakra.jwt_secret still holds the placeholder value"));
        }
        if secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(anyhow!("chakra.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"));
        }
        if self.token_ttl_hours <= 0 {
            return Err(anyhow!("chakra.token_ttl_hours must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Business time zone as an offset from UTC (Moscow by default).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_booking_horizon_days")]
    pub booking_horizon_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { utc_offset_minutes: default_utc_offset_minutes(), booking_horizon_days: default_booking_horizon_days() }
    }
}

fn default_utc_offset_minutes() -> i32 { 180 }
fn default_booking_horizon_days() -> i64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    /// Compared with `X-Telegram-Bot-Api-Secret-Token` on webhook calls.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Telegram user id of the owner; defaults to `chat_id`.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Public site root used in chakra form links.
    #[serde(default)]
    pub site_url: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
            webhook_secret: None,
            owner_id: None,
            site_url: String::new(),
        }
    }
}

fn default_telegram_api_base() -> String { "https://api.telegram.org".into() }

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.trim().is_empty())
            && self.chat_id.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// The booking bot only needs a token.
    pub fn bot_enabled(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner_id.as_deref().or(self.chat_id.as_deref()).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Credentials for the SMTP relay named in the saved e-mail settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Login; the sender address from the settings is used when unset.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self { Self { username: None, password: None, timeout_secs: default_smtp_timeout() } }
}

fn default_smtp_timeout() -> u64 { 10 }

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewsConfig {
    #[serde(default = "default_reviews_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for ReviewsConfig {
    fn default() -> Self { Self { cache_ttl_secs: default_reviews_cache_ttl() } }
}

fn default_reviews_cache_ttl() -> u64 { 24 * 60 * 60 }

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `CONFIG_PATH` (or `config.toml`), falling back to defaults when the file is absent,
    /// then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from the environment; a set variable always wins over the file.
    /// `lookup` is injected so tests stay hermetic.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("SERVER_HOST") { self.server.host = host; }
        if let Some(port) = non_empty("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) { self.server.port = port; }
        if let Some(url) = non_empty("DATABASE_URL") { self.database.url = url; }
        if let Some(pw) = non_empty("ADMIN_PASSWORD").or_else(|| non_empty("PASSWORD")) {
            self.admin.password = Some(pw);
        }
        if let Some(tok) = non_empty("ADMIN_TOKEN") { self.admin.static_token = Some(tok); }
        if let Some(secret) = non_empty("JWT_SECRET") { self.chakra.jwt_secret = secret; }
        if let Some(tok) = non_empty("TELEGRAM_BOT_TOKEN") { self.telegram.bot_token = Some(tok); }
        if let Some(chat) = non_empty("TELEGRAM_CHAT_ID") { self.telegram.chat_id = Some(chat); }
        if let Some(secret) = non_empty("TELEGRAM_WEBHOOK_SECRET") { self.telegram.webhook_secret = Some(secret); }
        if let Some(owner) = non_empty("TELEGRAM_OWNER_ID") { self.telegram.owner_id = Some(owner); }
        if let Some(user) = non_empty("SMTP_USERNAME") { self.smtp.username = Some(user); }
        if let Some(pw) = non_empty("SMTP_PASSWORD") { self.smtp.password = Some(pw); }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.validate()?;
        self.admin.validate()?;
        self.schedule.validate()?;
        self.chakra.validate()?;
        if self.smtp.timeout_secs == 0 {
            return Err(anyhow!("smtp.timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            _ => {}
        }
        if !matches!(self.log_format.as_str(), "compact" | "json") {
            return Err(anyhow!("server.log_format must be \"compact\" or \"json\""));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn is_sqlite(&self) -> bool {
        self.url.to_lowercase().starts_with("sqlite:")
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || self.is_sqlite()) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl AdminConfig {
    fn validate(&self) -> Result<()> {
        if self.session_ttl_hours <= 0 {
            return Err(anyhow!("admin.session_ttl_hours must be positive"));
        }
        if self.max_failed_attempts == 0 {
            return Err(anyhow!("admin.max_failed_attempts must be >= 1"));
        }
        if self.lockout_minutes <= 0 {
            return Err(anyhow!("admin.lockout_minutes must be positive"));
        }
        Ok(())
    }
}

impl ScheduleConfig {
    fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(anyhow!("schedule.utc_offset_minutes must be within a day"));
        }
        if self.booking_horizon_days < 1 {
            return Err(anyhow!("schedule.booking_horizon_days must be >= 1"));
        }
        Ok(())
    }
}
