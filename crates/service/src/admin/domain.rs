use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Login form body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub password: String,
}

/// A recorded password attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub ip: String,
    pub success: bool,
    pub at: DateTime<Utc>,
}

/// Issued on successful login.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
