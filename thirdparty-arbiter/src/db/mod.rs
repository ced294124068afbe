//! Database access for the arbiter
//!
//! Query functions over the shared SQLite schema created by
//! `thirdparty_common::db::init_database`.

pub mod arguments;
pub mod judgments;
pub mod settings;

use chrono::{DateTime, Utc};
use thirdparty_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
