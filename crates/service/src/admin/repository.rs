use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::Attempt;
use super::errors::AdminAuthError;

/// Persistence for login attempts.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync {
    async fn record(&self, attempt: Attempt) -> Result<(), AdminAuthError>;

    /// Failed attempts from `ip` after `since`, oldest first.
    async fn failures_since(&self, ip: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AdminAuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockLoginAttemptRepository {
        attempts: Mutex<Vec<Attempt>>,
    }

    impl MockLoginAttemptRepository {
        pub fn len(&self) -> usize {
            self.attempts.lock().map(|a| a.len()).unwrap_or_default()
        }

        pub fn is_empty(&self) -> bool { self.len() == 0 }
    }

    #[async_trait]
    impl LoginAttemptRepository for MockLoginAttemptRepository {
        async fn record(&self, attempt: Attempt) -> Result<(), AdminAuthError> {
            let mut attempts = self.attempts.lock().map_err(|e| AdminAuthError::Repository(e.to_string()))?;
            attempts.push(attempt);
            Ok(())
        }

        async fn failures_since(&self, ip: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>, AdminAuthError> {
            let attempts = self.attempts.lock().map_err(|e| AdminAuthError::Repository(e.to_string()))?;
            Ok(attempts.iter().filter(|a| a.ip == ip && !a.success && a.at > since).map(|a| a.at).collect())
        }
    }
}
