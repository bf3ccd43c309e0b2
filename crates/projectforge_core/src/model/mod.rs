//! Domain model for teams, projects, tasks and their follow-up records.
//!
//! # Responsibility
//! - Define the typed records persisted by the repository layer.
//! - Own field-level invariants via `validate()` on every record.
//!
//! # Invariants
//! - Identifiers are store-assigned integers; `None` means "not yet inserted".
//! - Dates and timestamps travel as ISO-8601 text.
//! - Model code never touches SQLite.

pub mod activity;
pub mod connection;
pub mod entity;
pub mod note;
pub mod project;
pub mod task;
pub mod team;
pub mod validation;

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Deserializer};

/// Integer identifier assigned by the store on insert.
pub type EntityId = i64;

/// Persisted timestamp layout (ISO-8601, microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
/// Accepted timestamp layout on read (any fractional precision).
pub const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Persisted date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Returns the local wall-clock time truncated to what the store keeps.
pub fn now_timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(6)
}

/// Formats a timestamp the way it is persisted.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Serde hook for caller-supplied timestamps: drops precision the store
/// cannot keep, so a written record reads back equal.
pub(crate) fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    NaiveDateTime::deserialize(deserializer).map(|value| value.trunc_subsecs(6))
}
