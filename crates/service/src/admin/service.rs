use std::sync::Arc;

use argon2::{password_hash::{PasswordHasher, PasswordVerifier, SaltString}, Argon2, PasswordHash};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use tracing::{info, instrument, warn};

use common::metrics::{ADMIN_LOGIN_FAILURES_TOTAL, ADMIN_LOGIN_RATE_LIMITED_TOTAL};

use super::domain::{AdminSession, Attempt, LoginInput};
use super::errors::AdminAuthError;
use super::repository::LoginAttemptRepository;

/// Length of issued session tokens.
pub const TOKEN_LEN: usize = 43;

/// Hash a plain password with argon2 and a random salt.
pub fn hash_password(plain: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AdminAuthError::HashError(e.to_string()))?
        .to_string())
}

/// Admin auth configuration
#[derive(Clone, Debug)]
pub struct AdminAuthConfig {
    pub password_hash: Option<String>,
    pub static_token: Option<String>,
    pub session_ttl: Duration,
    pub max_failed_attempts: usize,
    pub lockout: Duration,
}

impl AdminAuthConfig {
    /// A precomputed hash wins over a plain password, which is hashed here.
    pub fn from_config(cfg: &configs::AdminConfig) -> Result<Self, AdminAuthError> {
        let password_hash = match (&cfg.password_hash, &cfg.password) {
            (Some(hash), _) if !hash.trim().is_empty() => Some(hash.trim().to_string()),
            (_, Some(plain)) if !plain.is_empty() => Some(hash_password(plain)?),
            _ => None,
        };
        Ok(Self {
            password_hash,
            static_token: cfg.static_token.clone().filter(|t| !t.trim().is_empty()),
            session_ttl: Duration::hours(cfg.session_ttl_hours),
            max_failed_attempts: cfg.max_failed_attempts as usize,
            lockout: Duration::minutes(cfg.lockout_minutes),
        })
    }
}

/// Admin login business service independent of web framework
pub struct AdminAuthService<R: LoginAttemptRepository> {
    repo: Arc<R>,
    cfg: AdminAuthConfig,
    sessions: DashMap<String, DateTime<Utc>>,
}

impl<R: LoginAttemptRepository> AdminAuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AdminAuthConfig) -> Self {
        Self { repo, cfg, sessions: DashMap::new() }
    }

    /// Check the password for a client IP and open a session.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::admin::{AdminAuthConfig, AdminAuthService, domain::LoginInput, repository::mock::MockLoginAttemptRepository};
    /// use service::admin::service::hash_password;
    /// let cfg = AdminAuthConfig {
    ///     password_hash: Some(hash_password("s3cret").unwrap()),
    ///     static_token: None,
    ///     session_ttl: chrono::Duration::hours(24),
    ///     max_failed_attempts: 5,
    ///     lockout: chrono::Duration::hours(1),
    /// };
    /// let svc = AdminAuthService::new(Arc::new(MockLoginAttemptRepository::default()), cfg);
    /// let session = tokio_test::block_on(svc.login("10.0.0.1", LoginInput { password: "s3cret".into() })).unwrap();
    /// assert_eq!(session.token.len(), 43);
    /// assert!(svc.verify(&session.token));
    /// ```
    #[instrument(skip(self, input), fields(ip = %ip))]
    pub async fn login(&self, ip: &str, input: LoginInput) -> Result<AdminSession, AdminAuthError> {
        let hash = self.cfg.password_hash.as_deref().ok_or(AdminAuthError::NotConfigured)?;
        let now = Utc::now();

        let failures = self.repo.failures_since(ip, now - self.cfg.lockout).await?;
        if failures.len() >= self.cfg.max_failed_attempts {
            if let Some(last) = failures.iter().max() {
                let retry_after_secs = (*last + self.cfg.lockout - now).num_seconds();
                if retry_after_secs > 0 {
                    ADMIN_LOGIN_RATE_LIMITED_TOTAL.inc();
                    warn!(failures = failures.len(), retry_after_secs, "admin login throttled");
                    return Err(AdminAuthError::RateLimited { retry_after_secs });
                }
            }
        }

        let parsed = PasswordHash::new(hash).map_err(|e| AdminAuthError::HashError(e.to_string()))?;
        let ok = Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_ok();
        self.repo.record(Attempt { ip: ip.to_string(), success: ok, at: now }).await?;
        if !ok {
            ADMIN_LOGIN_FAILURES_TOTAL.inc();
            return Err(AdminAuthError::InvalidPassword);
        }

        self.purge_expired();
        let token: String = OsRng.sample_iter(&Alphanumeric).take(TOKEN_LEN).map(char::from).collect();
        let expires_at = now + self.cfg.session_ttl;
        self.sessions.insert(token.clone(), expires_at);
        info!(sessions = self.sessions.len(), "admin session opened");
        Ok(AdminSession { token, expires_at })
    }

    /// True for the static token or a live session.
    pub fn verify(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        if self.cfg.static_token.as_deref() == Some(token) {
            return true;
        }
        match self.sessions.get(token) {
            Some(expires_at) => *expires_at > Utc::now(),
            None => false,
        }
    }

    /// Returns whether a session was open.
    pub fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn purge_expired(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, expires_at| *expires_at > now);
    }
}
