//! Integration settings store keyed by unique connection name.

use crate::model::connection::{
    normalize_connection_name, BitbucketSettings, ConnectionRecord, IntegrationSettings,
    JiraSettings,
};
use crate::model::entity::{Entity, EntityKind};
use crate::model::validation::ValidationError;
use crate::model::{format_timestamp, now_timestamp, EntityId};
use crate::repo::entity_repo::{RepoError, RepoResult};
use crate::repo::rows::parse_row;
use crate::repo::schema_check::{ensure_connection_ready, TableRequirement};
use crate::repo::table::table_for;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Settings persistence for external integrations.
pub trait ConnectionSettingsStore {
    /// Returns the stored payload for `name`, if any.
    fn get_settings(&self, name: &str) -> RepoResult<Option<Value>>;
    /// Inserts or replaces the payload for `name`; returns the row id.
    fn save_settings(&self, name: &str, settings: &Value) -> RepoResult<EntityId>;
    fn list_connections(&self) -> RepoResult<Vec<ConnectionRecord>>;
}

/// SQLite-backed settings store.
pub struct SqliteConnectionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteConnectionStore<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let table = table_for(EntityKind::Connection);
        ensure_connection_ready(
            conn,
            &[TableRequirement {
                table: table.table,
                columns: table.columns,
            }],
        )?;
        Ok(Self { conn })
    }

    /// Loads a typed payload; fields absent from storage take their defaults.
    pub fn load<S: IntegrationSettings>(&self) -> RepoResult<Option<S>> {
        match self.get_settings(S::NAME)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|err| {
                RepoError::InvalidData(format!("invalid `{}` settings: {err}", S::NAME))
            }),
            None => Ok(None),
        }
    }

    pub fn store<S: IntegrationSettings>(&self, settings: &S) -> RepoResult<EntityId> {
        let value = serde_json::to_value(settings)
            .map_err(|err| ValidationError::Malformed(err.to_string()))?;
        self.save_settings(S::NAME, &value)
    }

    /// Jira settings, or disabled defaults when never saved.
    pub fn jira(&self) -> RepoResult<JiraSettings> {
        Ok(self.load()?.unwrap_or_default())
    }

    /// Bitbucket settings, or disabled defaults when never saved.
    pub fn bitbucket(&self) -> RepoResult<BitbucketSettings> {
        Ok(self.load()?.unwrap_or_default())
    }
}

impl ConnectionSettingsStore for SqliteConnectionStore<'_> {
    fn get_settings(&self, name: &str) -> RepoResult<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT settings FROM connections WHERE name = ?1;",
                [normalize_connection_name(name)],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|err| {
                RepoError::InvalidData(format!("invalid JSON in connections.settings: {err}"))
            })
        })
        .transpose()
    }

    fn save_settings(&self, name: &str, settings: &Value) -> RepoResult<EntityId> {
        let record = ConnectionRecord::new(name, settings.clone());
        record.validate()?;
        let now = format_timestamp(&now_timestamp());

        let id = self.conn.query_row(
            "INSERT INTO connections (name, settings, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET
                settings = excluded.settings,
                updated_at = excluded.updated_at
             RETURNING id;",
            params![record.name, record.settings.to_string(), now],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn list_connections(&self) -> RepoResult<Vec<ConnectionRecord>> {
        let table = table_for(EntityKind::Connection);
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY name ASC;", table.select_sql()))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            if let Entity::Connection(record) = parse_row(EntityKind::Connection, row)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}
