//! Append-only activity feed storage.
//!
//! # Invariants
//! - Rows are only ever inserted; there is no update or delete path.
//! - Reads are newest first (`timestamp DESC, id DESC`).
//! - Project names are left-joined, so a missing project yields `None`.

use crate::model::activity::{ActionType, ActivityEntityType, ActivityLog, NewActivity};
use crate::model::{format_timestamp, now_timestamp, EntityId};
use crate::repo::entity_repo::{RepoError, RepoResult};
use crate::repo::rows::parse_timestamp;
use crate::repo::schema_check::{ensure_connection_ready, TableRequirement};
use rusqlite::{params, Connection, Row};

const ACTIVITY_DEFAULT_LIMIT: u32 = 10;
const ACTIVITY_LIMIT_MAX: u32 = 500;

const ACTIVITY_SELECT_SQL: &str = "SELECT
    a.id,
    a.timestamp,
    a.user_id,
    a.action_type,
    a.entity_type,
    a.entity_id,
    a.entity_name,
    a.description,
    a.project_id,
    p.name AS project_name
FROM activity_logs a
LEFT JOIN projects p ON p.id = a.project_id";

/// Durable recorder of entity state changes.
pub trait ActivityLogger {
    /// Appends one entry stamped with the current wall-clock time.
    fn log(&self, entry: &NewActivity) -> RepoResult<EntityId>;
    /// Most recent entries across all projects.
    fn recent(&self, limit: u32) -> RepoResult<Vec<ActivityLog>>;
    /// Most recent entries scoped to one project.
    fn for_project(&self, project_id: EntityId, limit: u32) -> RepoResult<Vec<ActivityLog>>;
}

/// SQLite-backed activity feed.
pub struct SqliteActivityLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityLog<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[TableRequirement {
                table: "activity_logs",
                columns: &[
                    "timestamp",
                    "user_id",
                    "action_type",
                    "entity_type",
                    "entity_id",
                    "entity_name",
                    "description",
                    "project_id",
                ],
            }],
        )?;
        Ok(Self { conn })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<ActivityLog>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_activity_row(row)?);
        }
        Ok(entries)
    }
}

impl ActivityLogger for SqliteActivityLog<'_> {
    fn log(&self, entry: &NewActivity) -> RepoResult<EntityId> {
        entry.validate()?;
        self.conn.execute(
            "INSERT INTO activity_logs (
                timestamp,
                user_id,
                action_type,
                entity_type,
                entity_id,
                entity_name,
                description,
                project_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                format_timestamp(&now_timestamp()),
                entry.user_id,
                entry.action_type.as_str(),
                entry.entity_type.as_str(),
                entry.entity_id,
                entry.entity_name.as_str(),
                entry.description.as_str(),
                entry.project_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent(&self, limit: u32) -> RepoResult<Vec<ActivityLog>> {
        self.query(
            &format!("{ACTIVITY_SELECT_SQL} ORDER BY a.timestamp DESC, a.id DESC LIMIT ?1;"),
            [normalize_activity_limit(limit)],
        )
    }

    fn for_project(&self, project_id: EntityId, limit: u32) -> RepoResult<Vec<ActivityLog>> {
        self.query(
            &format!(
                "{ACTIVITY_SELECT_SQL}
                 WHERE a.project_id = ?1
                 ORDER BY a.timestamp DESC, a.id DESC
                 LIMIT ?2;"
            ),
            params![project_id, normalize_activity_limit(limit)],
        )
    }
}

/// Normalizes feed limits: `0` means the default, large values are capped.
pub fn normalize_activity_limit(limit: u32) -> u32 {
    match limit {
        0 => ACTIVITY_DEFAULT_LIMIT,
        value if value > ACTIVITY_LIMIT_MAX => ACTIVITY_LIMIT_MAX,
        value => value,
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<ActivityLog> {
    let timestamp_text: String = row.get("timestamp")?;
    let timestamp = parse_timestamp(&timestamp_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{timestamp_text}` in activity_logs.timestamp"
        ))
    })?;

    let action_text: String = row.get("action_type")?;
    let action_type = ActionType::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid action type `{action_text}` in activity_logs.action_type"
        ))
    })?;

    let entity_text: String = row.get("entity_type")?;
    let entity_type = ActivityEntityType::parse(&entity_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid entity type `{entity_text}` in activity_logs.entity_type"
        ))
    })?;

    Ok(ActivityLog {
        id: row.get("id")?,
        timestamp,
        user_id: row.get("user_id")?,
        action_type,
        entity_type,
        entity_id: row.get("entity_id")?,
        entity_name: row.get("entity_name")?,
        description: row.get("description")?,
        project_id: row.get("project_id")?,
        project_name: row.get("project_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::normalize_activity_limit;

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(normalize_activity_limit(0), 10);
        assert_eq!(normalize_activity_limit(25), 25);
        assert_eq!(normalize_activity_limit(10_000), 500);
    }
}
