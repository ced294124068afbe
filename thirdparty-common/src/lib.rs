//! # thirdparty common library
//!
//! Shared code for the arbitration service:
//! - Error type and result alias
//! - Bootstrap configuration (TOML, environment, root folder)
//! - SQLite initialization and schema
//! - Event types and the broadcast EventBus

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
