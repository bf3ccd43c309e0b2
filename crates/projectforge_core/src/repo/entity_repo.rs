//! Generic entity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Uniform create/read/update/delete over the eight entity tables.
//! - Enforce parent-existence checks and delete guards from the registry.
//!
//! # Invariants
//! - Write paths validate the entity before any SQL mutation.
//! - Deletes never cascade: a non-zero guard count yields `Conflict`.
//! - Every call is its own unit of work; nothing spans two calls.

use crate::db::DbError;
use crate::model::entity::{Entity, EntityKind};
use crate::model::validation::ValidationError;
use crate::model::{format_timestamp, now_timestamp, EntityId};
use crate::repo::rows::{column_values, parse_row};
use crate::repo::schema_check::{ensure_connection_ready, TableRequirement};
use crate::repo::table::{table_for, EntityTable, TABLES};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Entity failed a field or reference rule; nothing was written.
    Validation(ValidationError),
    /// Storage failure (connection, disk, constraint outside domain rules).
    Db(DbError),
    /// No row with this id.
    NotFound { kind: EntityKind, id: EntityId },
    /// Delete blocked by dependents; the entity is unchanged.
    Conflict {
        kind: EntityKind,
        id: EntityId,
        blocked_by: &'static str,
        count: i64,
    },
    /// Persisted data cannot be converted into a valid model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Caller-facing error buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Store,
}

impl RepoError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => ErrorCategory::Store,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict {
                kind,
                id,
                blocked_by,
                count,
            } => write!(
                f,
                "cannot delete {kind} {id}: {blocked_by} ({count}); remove them first"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// `(id, display name)` pair used to populate selection inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupItem {
    pub id: EntityId,
    pub name: String,
}

/// Repository interface for generic entity CRUD.
pub trait EntityRepository {
    /// Inserts the entity and returns the store-assigned id.
    fn create(&self, entity: &Entity) -> RepoResult<EntityId>;
    fn get_by_id(&self, kind: EntityKind, id: EntityId) -> RepoResult<Entity>;
    /// Replaces every mutable column of an existing row.
    fn update(&self, entity: &Entity) -> RepoResult<()>;
    /// Deletes after all guards report zero dependents.
    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()>;
    /// Lists every row of `kind`; order is unspecified.
    fn list_all(&self, kind: EntityKind) -> RepoResult<Vec<Entity>>;
    /// Lists rows of `kind` whose `parent_column` equals `parent_id`.
    fn list_children(
        &self,
        kind: EntityKind,
        parent_column: &str,
        parent_id: EntityId,
    ) -> RepoResult<Vec<Entity>>;
    fn lookup(&self, kind: EntityKind) -> RepoResult<Vec<LookupItem>>;
    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool>;
    /// Follows parent links up to the owning project, if any.
    fn resolve_project_id(&self, kind: EntityKind, id: EntityId) -> RepoResult<Option<EntityId>>;
}

/// SQLite-backed entity repository borrowing a caller-owned connection.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` for foreign schemas.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let requirements: Vec<TableRequirement> = TABLES
            .iter()
            .map(|table| TableRequirement {
                table: table.table,
                columns: table.columns,
            })
            .collect();
        ensure_connection_ready(conn, &requirements)?;
        Ok(Self { conn })
    }

    fn check_references(
        &self,
        table: &EntityTable,
        values: &[(&'static str, Value)],
    ) -> RepoResult<()> {
        for parent in table.references {
            let referenced = values
                .iter()
                .find(|(column, _)| *column == parent.column)
                .map(|(_, value)| value);
            if let Some(Value::Integer(id)) = referenced {
                if !row_exists(self.conn, parent.table, *id)? {
                    return Err(ValidationError::UnknownReference {
                        field: parent.column,
                        id: *id,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// `id` is the row being written, excluded from the collision check.
    fn check_unique(
        &self,
        table: &EntityTable,
        values: &[(&'static str, Value)],
        id: Option<EntityId>,
    ) -> RepoResult<()> {
        for column in table.unique_columns.iter().copied() {
            let Some((_, value)) = values.iter().find(|(name, _)| *name == column) else {
                continue;
            };
            let taken: i64 = self.conn.query_row(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE {column} = ?1 AND id IS NOT ?2);",
                    table.table
                ),
                params![value, id],
                |row| row.get(0),
            )?;
            if taken == 1 {
                let value = match value {
                    Value::Text(text) => text.clone(),
                    other => format!("{other:?}"),
                };
                return Err(ValidationError::DuplicateValue {
                    field: column,
                    value,
                }
                .into());
            }
        }
        Ok(())
    }
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn create(&self, entity: &Entity) -> RepoResult<EntityId> {
        entity.validate()?;
        let table = table_for(entity.kind());
        let mut values = column_values(entity);
        self.check_references(table, &values)?;
        self.check_unique(table, &values, entity.id())?;

        let mut columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
        if let Some(id) = entity.id() {
            columns.insert(0, "id");
            values.insert(0, ("id", Value::Integer(id)));
        }
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");

        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                table.table,
                columns.join(", ")
            ),
            params_from_iter(values.into_iter().map(|(_, value)| value)),
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_by_id(&self, kind: EntityKind, id: EntityId) -> RepoResult<Entity> {
        let table = table_for(kind);
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1;", table.select_sql()))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => parse_row(kind, row),
            None => Err(RepoError::NotFound { kind, id }),
        }
    }

    fn update(&self, entity: &Entity) -> RepoResult<()> {
        let kind = entity.kind();
        let id = entity.id().ok_or(ValidationError::MissingField("id"))?;
        entity.validate()?;
        let table = table_for(kind);
        let mut values = column_values(entity);
        self.check_references(table, &values)?;
        self.check_unique(table, &values, Some(id))?;
        if !table.touched_columns.is_empty() {
            let touched_at = format_timestamp(&now_timestamp());
            for (column, value) in values.iter_mut() {
                if table.touched_columns.contains(column) {
                    *value = Value::Text(touched_at.clone());
                }
            }
        }

        // `column_values` follows registry order, so positions line up.
        let assignments: Vec<String> = table
            .updatable_columns()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect();
        let mut bind_values: Vec<Value> = values
            .into_iter()
            .filter(|(column, _)| !table.immutable_columns.contains(column))
            .map(|(_, value)| value)
            .collect();
        bind_values.push(Value::Integer(id));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ?{};",
                table.table,
                assignments.join(", "),
                bind_values.len()
            ),
            params_from_iter(bind_values),
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        Ok(())
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let table = table_for(kind);
        // Guard counts and the delete run under one write lock.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if !row_exists(&tx, table.table, id)? {
            return Err(RepoError::NotFound { kind, id });
        }

        for guard in table.guards {
            let count: i64 = tx.query_row(guard.count_sql, [id], |row| row.get(0))?;
            if count > 0 {
                warn!(
                    "event=entity_delete module=repo status=blocked kind={kind} id={id} blocked_by=\"{}\" count={count}",
                    guard.category
                );
                return Err(RepoError::Conflict {
                    kind,
                    id,
                    blocked_by: guard.category,
                    count,
                });
            }
        }

        tx.execute(&format!("DELETE FROM {} WHERE id = ?1;", table.table), [id])?;
        tx.commit()?;
        Ok(())
    }

    fn list_all(&self, kind: EntityKind) -> RepoResult<Vec<Entity>> {
        let table = table_for(kind);
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id ASC;", table.select_sql()))?;
        let mut rows = stmt.query([])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_row(kind, row)?);
        }
        Ok(entities)
    }

    fn list_children(
        &self,
        kind: EntityKind,
        parent_column: &str,
        parent_id: EntityId,
    ) -> RepoResult<Vec<Entity>> {
        let table = table_for(kind);
        if !table.has_column(parent_column) {
            return Err(RepoError::InvalidData(format!(
                "`{parent_column}` is not a column of {}",
                table.table
            )));
        }
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {parent_column} = ?1 ORDER BY id ASC;",
            table.select_sql()
        ))?;
        let mut rows = stmt.query([parent_id])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_row(kind, row)?);
        }
        Ok(entities)
    }

    fn lookup(&self, kind: EntityKind) -> RepoResult<Vec<LookupItem>> {
        let table = table_for(kind);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {display} AS display_name
             FROM {table}
             ORDER BY display_name COLLATE NOCASE ASC, id ASC;",
            display = table.display_expr,
            table = table.table
        ))?;
        let items = stmt
            .query_map([], |row| {
                Ok(LookupItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool> {
        row_exists(self.conn, table_for(kind).table, id)
    }

    fn resolve_project_id(&self, kind: EntityKind, id: EntityId) -> RepoResult<Option<EntityId>> {
        let sql = match kind {
            EntityKind::Project => "SELECT id FROM projects WHERE id = ?1;",
            EntityKind::SubProject => "SELECT project_id FROM sub_projects WHERE id = ?1;",
            EntityKind::Task => {
                "SELECT COALESCE(t.project_id, sp.project_id)
                 FROM tasks t
                 LEFT JOIN sub_projects sp ON sp.id = t.sub_project_id
                 WHERE t.id = ?1;"
            }
            EntityKind::Note => {
                "SELECT COALESCE(t.project_id, sp.project_id)
                 FROM notes n
                 INNER JOIN tasks t ON t.id = n.task_id
                 LEFT JOIN sub_projects sp ON sp.id = t.sub_project_id
                 WHERE n.id = ?1;"
            }
            EntityKind::Reminder => {
                "SELECT COALESCE(t.project_id, sp.project_id)
                 FROM reminders r
                 INNER JOIN tasks t ON t.id = r.task_id
                 LEFT JOIN sub_projects sp ON sp.id = t.sub_project_id
                 WHERE r.id = ?1;"
            }
            EntityKind::Team | EntityKind::TeamMember | EntityKind::Connection => return Ok(None),
        };

        let project_id = self
            .conn
            .query_row(sql, [id], |row| row.get::<_, Option<EntityId>>(0))
            .optional()?;
        Ok(project_id.flatten())
    }
}

fn row_exists(conn: &Connection, table: &str, id: EntityId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
