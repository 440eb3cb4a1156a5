//! Chakra explorer: telegram-id login, JWT callers and the data-entry operations.

pub mod auth;
pub mod service;

pub use auth::{Caller, ChakraAuth, ChakraAuthError};
