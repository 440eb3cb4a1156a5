//! Admin panel access: password login with per-IP throttling and in-memory sessions.
//!
//! Same three layers as the rest of the crate's auth code (domain, repository, service);
//! only the login attempt log touches the database.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use errors::AdminAuthError;
pub use service::{AdminAuthConfig, AdminAuthService};
