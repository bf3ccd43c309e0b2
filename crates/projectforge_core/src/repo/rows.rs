//! Entity <-> row mapping.
//!
//! # Invariants
//! - `column_values` yields exactly the registry columns, in registry order.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::connection::{normalize_connection_name, ConnectionRecord};
use crate::model::entity::{Entity, EntityKind};
use crate::model::note::{Note, Reminder};
use crate::model::project::{Project, SubProject};
use crate::model::task::{Task, TaskStatus};
use crate::model::team::{Team, TeamMember};
use crate::model::{format_timestamp, DATE_FORMAT, TIMESTAMP_PARSE_FORMAT};
use crate::repo::entity_repo::{RepoError, RepoResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::Row;

/// Column/value pairs for every registry column of `entity`.
pub(crate) fn column_values(entity: &Entity) -> Vec<(&'static str, Value)> {
    match entity {
        Entity::Team(team) => vec![
            ("name", text(&team.name)),
            ("description", opt_text(team.description.as_deref())),
            ("location", opt_text(team.location.as_deref())),
        ],
        Entity::TeamMember(member) => vec![
            ("first_name", text(&member.first_name)),
            ("last_name", text(&member.last_name)),
            ("email", opt_text(member.email.as_deref())),
            ("team_id", opt_int(member.team_id)),
        ],
        Entity::Project(project) => vec![
            ("name", text(&project.name)),
            ("description", opt_text(project.description.as_deref())),
            ("start_date", date(project.start_date)),
            ("end_date", date(project.end_date)),
            ("deviation", Value::Integer(project.deviation)),
            ("assigned_to", opt_int(project.assigned_to)),
        ],
        Entity::SubProject(sub_project) => vec![
            ("project_id", Value::Integer(sub_project.project_id)),
            ("name", text(&sub_project.name)),
            ("description", opt_text(sub_project.description.as_deref())),
            ("start_date", date(sub_project.start_date)),
            ("end_date", date(sub_project.end_date)),
            ("deviation", Value::Integer(sub_project.deviation)),
            ("assigned_to", opt_int(sub_project.assigned_to)),
        ],
        Entity::Task(task) => vec![
            ("project_id", opt_int(task.project_id)),
            ("sub_project_id", opt_int(task.sub_project_id)),
            ("name", text(&task.name)),
            ("description", opt_text(task.description.as_deref())),
            ("jira_ticket", opt_text(task.jira_ticket.as_deref())),
            ("status", text(task.status.as_str())),
            ("assigned_to", opt_int(task.assigned_to)),
        ],
        Entity::Note(note) => vec![
            ("task_id", Value::Integer(note.task_id)),
            ("note", text(&note.note)),
            ("created_at", Value::Text(format_timestamp(&note.created_at))),
        ],
        Entity::Reminder(reminder) => vec![
            ("task_id", Value::Integer(reminder.task_id)),
            ("reminder_date", date(reminder.reminder_date)),
            ("note", text(&reminder.note)),
            ("followed_up", Value::Integer(i64::from(reminder.followed_up))),
        ],
        Entity::Connection(connection) => vec![
            ("name", Value::Text(normalize_connection_name(&connection.name))),
            ("settings", Value::Text(connection.settings.to_string())),
            ("created_at", Value::Text(format_timestamp(&connection.created_at))),
            ("updated_at", Value::Text(format_timestamp(&connection.updated_at))),
        ],
    }
}

/// Parses one row selected with `EntityTable::select_sql`.
pub(crate) fn parse_row(kind: EntityKind, row: &Row<'_>) -> RepoResult<Entity> {
    let id = Some(row.get::<_, i64>("id")?);
    let entity = match kind {
        EntityKind::Team => Entity::Team(Team {
            id,
            name: row.get("name")?,
            description: row.get("description")?,
            location: row.get("location")?,
        }),
        EntityKind::TeamMember => Entity::TeamMember(TeamMember {
            id,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email: row.get("email")?,
            team_id: row.get("team_id")?,
        }),
        EntityKind::Project => Entity::Project(Project {
            id,
            name: row.get("name")?,
            description: row.get("description")?,
            start_date: read_date(row, "projects", "start_date")?,
            end_date: read_date(row, "projects", "end_date")?,
            deviation: row.get("deviation")?,
            assigned_to: row.get("assigned_to")?,
        }),
        EntityKind::SubProject => Entity::SubProject(SubProject {
            id,
            project_id: row.get("project_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            start_date: read_date(row, "sub_projects", "start_date")?,
            end_date: read_date(row, "sub_projects", "end_date")?,
            deviation: row.get("deviation")?,
            assigned_to: row.get("assigned_to")?,
        }),
        EntityKind::Task => Entity::Task(parse_task(row)?),
        EntityKind::Note => Entity::Note(Note {
            id,
            task_id: row.get("task_id")?,
            note: row.get("note")?,
            created_at: read_timestamp(row, "notes", "created_at")?,
        }),
        EntityKind::Reminder => Entity::Reminder(Reminder {
            id,
            task_id: row.get("task_id")?,
            reminder_date: read_date(row, "reminders", "reminder_date")?,
            note: row.get("note")?,
            followed_up: read_bool(row, "reminders", "followed_up")?,
        }),
        EntityKind::Connection => {
            let raw: String = row.get("settings")?;
            let settings = serde_json::from_str(&raw).map_err(|err| {
                RepoError::InvalidData(format!("invalid JSON in connections.settings: {err}"))
            })?;
            Entity::Connection(ConnectionRecord {
                id,
                name: row.get("name")?,
                settings,
                created_at: read_timestamp(row, "connections", "created_at")?,
                updated_at: read_timestamp(row, "connections", "updated_at")?,
            })
        }
    };
    entity.validate()?;
    Ok(entity)
}

/// Parses a task row; shared with report queries that select task columns.
pub(crate) fn parse_task(row: &Row<'_>) -> RepoResult<Task> {
    let status_text: String = row.get("status")?;
    let status = status_text.parse::<TaskStatus>().map_err(|_| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;
    Ok(Task {
        id: Some(row.get("id")?),
        project_id: row.get("project_id")?,
        sub_project_id: row.get("sub_project_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        jira_ticket: row.get("jira_ticket")?,
        status,
        assigned_to: row.get("assigned_to")?,
    })
}

pub(crate) fn read_date(row: &Row<'_>, table: &str, column: &str) -> RepoResult<NaiveDate> {
    let value: String = row.get(column)?;
    parse_date(&value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid date `{value}` in {table}.{column}"))
    })
}

/// Accepts `YYYY-MM-DD` and datetime-shaped values by keeping the date part.
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

fn read_timestamp(row: &Row<'_>, table: &str, column: &str) -> RepoResult<NaiveDateTime> {
    let value: String = row.get(column)?;
    parse_timestamp(&value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in {table}.{column}"))
    })
}

pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_PARSE_FORMAT).ok()
}

fn read_bool(row: &Row<'_>, table: &str, column: &str) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {table}.{column}"
        ))),
    }
}

fn date(value: NaiveDate) -> Value {
    Value::Text(value.format(DATE_FORMAT).to_string())
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, text)
}

fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}
