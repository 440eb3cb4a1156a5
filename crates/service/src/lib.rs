//! Service layer: booking, scheduling and site administration on top of `models`.
//! - Pure engines (`scheduling`, `booking`) are kept apart from data access (`db`).
//! - Reuses validation and entity definitions in `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod pagination;
pub mod timefmt;
pub mod scheduling;
pub mod booking;
pub mod db;
pub mod admin;
pub mod chakra;
pub mod notify;
pub mod bot;
#[cfg(test)]
pub mod test_support;
