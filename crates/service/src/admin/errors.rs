use thiserror::Error;

/// Business errors for the admin login flow
#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("PASSWORD not configured")]
    NotConfigured,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Too many failed attempts. Try again in {} minutes", .retry_after_secs / 60)]
    RateLimited { retry_after_secs: i64 },
    #[error("admin token required")]
    MissingToken,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AdminAuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AdminAuthError::NotConfigured => 2001,
            AdminAuthError::InvalidPassword => 2002,
            AdminAuthError::RateLimited { .. } => 2003,
            AdminAuthError::MissingToken => 2004,
            AdminAuthError::HashError(_) => 2101,
            AdminAuthError::Repository(_) => 2200,
        }
    }
}
