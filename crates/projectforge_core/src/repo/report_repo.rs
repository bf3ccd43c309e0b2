//! Read-only cross-entity queries behind the dashboard.
//!
//! # Responsibility
//! - Fetch the raw rows aggregations need; ordering and rollups that are
//!   pure functions live in `service::report_service`.
//!
//! # Invariants
//! - Nothing in this module writes.
//! - An empty filter dimension selects every row for that dimension.

use crate::model::entity::EntityKind;
use crate::model::task::{Task, TaskStatus};
use crate::model::{EntityId, DATE_FORMAT};
use crate::repo::entity_repo::{LookupItem, RepoError, RepoResult};
use crate::repo::rows::{parse_date, parse_task, read_date};
use crate::repo::schema_check::{ensure_connection_ready, TableRequirement};
use crate::repo::table::{table_for, TABLES};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::Serialize;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Project,
    SubProject,
}

/// One bar of the dashboard timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineItem {
    pub kind: TimelineKind,
    pub id: EntityId,
    pub project_id: EntityId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assigned_to: Option<EntityId>,
    /// Member full name, or `None` when unassigned.
    pub assignee_name: Option<String>,
}

impl TimelineItem {
    /// Assignee label shown on the bar.
    pub fn assignee_label(&self) -> &str {
        self.assignee_name.as_deref().unwrap_or(UNASSIGNED_LABEL)
    }
}

/// Label used wherever an assignee is absent.
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// Task count for one `(assigned_to, status)` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub assigned_to: Option<EntityId>,
    pub status: TaskStatus,
    pub count: i64,
}

/// Reminder joined with its task name for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderView {
    pub id: EntityId,
    pub task_id: EntityId,
    pub task_name: String,
    pub reminder_date: NaiveDate,
    pub note: String,
    pub followed_up: bool,
}

/// Task list filter; dimensions are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    pub assignees: Vec<EntityId>,
}

pub trait ReportRepository {
    /// Earliest start and latest end over projects and sub-projects.
    fn timeline_extent(&self) -> RepoResult<Option<DateSpan>>;
    /// Projects then sub-projects overlapping `window`, each by start date.
    fn timeline_items(&self, window: DateSpan) -> RepoResult<Vec<TimelineItem>>;
    /// Every team member as `(id, full name)`, ordered by id.
    fn members(&self) -> RepoResult<Vec<LookupItem>>;
    fn task_status_counts(&self) -> RepoResult<Vec<StatusCount>>;
    fn reminders(&self) -> RepoResult<Vec<ReminderView>>;
    fn filter_tasks(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let requirements: Vec<TableRequirement> = TABLES
            .iter()
            .filter(|table| table.kind != EntityKind::Connection)
            .map(|table| TableRequirement {
                table: table.table,
                columns: table.columns,
            })
            .collect();
        ensure_connection_ready(conn, &requirements)?;
        Ok(Self { conn })
    }
}

const TIMELINE_SQL: &str = "SELECT
    'project' AS item_kind,
    p.id AS id,
    p.id AS project_id,
    p.name AS name,
    p.start_date AS start_date,
    p.end_date AS end_date,
    p.assigned_to AS assigned_to,
    m.first_name || ' ' || m.last_name AS assignee_name
FROM projects p
LEFT JOIN team_members m ON m.id = p.assigned_to
WHERE p.start_date <= ?2 AND p.end_date >= ?1
UNION ALL
SELECT
    'sub_project',
    sp.id,
    sp.project_id,
    sp.name,
    sp.start_date,
    sp.end_date,
    sp.assigned_to,
    m.first_name || ' ' || m.last_name
FROM sub_projects sp
LEFT JOIN team_members m ON m.id = sp.assigned_to
WHERE sp.start_date <= ?2 AND sp.end_date >= ?1
ORDER BY item_kind ASC, start_date ASC, id ASC;";

impl ReportRepository for SqliteReportRepository<'_> {
    fn timeline_extent(&self) -> RepoResult<Option<DateSpan>> {
        let (min_start, max_end): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(start_date), MAX(end_date) FROM (
                SELECT start_date, end_date FROM projects
                UNION ALL
                SELECT start_date, end_date FROM sub_projects
            );",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match (min_start, max_end) {
            (Some(start), Some(end)) => {
                let start = parse_date(&start).ok_or_else(|| {
                    RepoError::InvalidData(format!("invalid timeline start `{start}`"))
                })?;
                let end = parse_date(&end).ok_or_else(|| {
                    RepoError::InvalidData(format!("invalid timeline end `{end}`"))
                })?;
                Ok(Some(DateSpan { start, end }))
            }
            _ => Ok(None),
        }
    }

    fn timeline_items(&self, window: DateSpan) -> RepoResult<Vec<TimelineItem>> {
        let mut stmt = self.conn.prepare(TIMELINE_SQL)?;
        let mut rows = stmt.query(params![
            window.start.format(DATE_FORMAT).to_string(),
            window.end.format(DATE_FORMAT).to_string(),
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_timeline_row(row)?);
        }
        Ok(items)
    }

    fn members(&self) -> RepoResult<Vec<LookupItem>> {
        let display = table_for(EntityKind::TeamMember).display_expr;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {display} FROM team_members ORDER BY id ASC;"
        ))?;
        let members = stmt
            .query_map([], |row| {
                Ok(LookupItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    fn task_status_counts(&self) -> RepoResult<Vec<StatusCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT assigned_to, status, COUNT(*)
             FROM tasks
             GROUP BY assigned_to, status
             ORDER BY assigned_to ASC, status ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut counts = Vec::new();
        while let Some(row) = rows.next()? {
            let status_text: String = row.get(1)?;
            let status = status_text.parse::<TaskStatus>().map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid task status `{status_text}` in tasks.status"
                ))
            })?;
            counts.push(StatusCount {
                assigned_to: row.get(0)?,
                status,
                count: row.get(2)?,
            });
        }
        Ok(counts)
    }

    fn reminders(&self) -> RepoResult<Vec<ReminderView>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.task_id, t.name AS task_name, r.reminder_date, r.note, r.followed_up
             FROM reminders r
             INNER JOIN tasks t ON t.id = r.task_id
             ORDER BY r.reminder_date ASC, r.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut reminders = Vec::new();
        while let Some(row) = rows.next()? {
            reminders.push(ReminderView {
                id: row.get("id")?,
                task_id: row.get("task_id")?,
                task_name: row.get("task_name")?,
                reminder_date: read_date(row, "reminders", "reminder_date")?,
                note: row.get("note")?,
                followed_up: row.get::<_, i64>("followed_up")? != 0,
            });
        }
        Ok(reminders)
    }

    fn filter_tasks(&self, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        let (where_clause, bind_values) = build_task_filter(filter);
        let mut stmt = self.conn.prepare(&format!(
            "{}{where_clause} ORDER BY id ASC;",
            table_for(EntityKind::Task).select_sql()
        ))?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task(row)?);
        }
        Ok(tasks)
    }
}

/// Builds ` WHERE ...` with positional placeholders, or an empty clause.
fn build_task_filter(filter: &TaskFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut bind_values = Vec::new();

    if !filter.statuses.is_empty() {
        let placeholders = placeholders(bind_values.len(), filter.statuses.len());
        bind_values.extend(
            filter
                .statuses
                .iter()
                .map(|status| Value::Text(status.as_str().to_string())),
        );
        clauses.push(format!("status IN ({placeholders})"));
    }

    if !filter.assignees.is_empty() {
        let placeholders = placeholders(bind_values.len(), filter.assignees.len());
        bind_values.extend(filter.assignees.iter().map(|id| Value::Integer(*id)));
        clauses.push(format!("assigned_to IN ({placeholders})"));
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}

fn placeholders(offset: usize, count: usize) -> String {
    (offset + 1..=offset + count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_timeline_row(row: &Row<'_>) -> RepoResult<TimelineItem> {
    let kind_text: String = row.get("item_kind")?;
    let (kind, table) = match kind_text.as_str() {
        "project" => (TimelineKind::Project, "projects"),
        _ => (TimelineKind::SubProject, "sub_projects"),
    };
    Ok(TimelineItem {
        kind,
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        start_date: read_date(row, table, "start_date")?,
        end_date: read_date(row, table, "end_date")?,
        assigned_to: row.get("assigned_to")?,
        assignee_name: row.get("assignee_name")?,
    })
}
