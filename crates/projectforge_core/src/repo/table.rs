//! Static table registry: one record per entity kind.
//!
//! Each record names the table, its writable columns (in bind order), the
//! SQL expression used as a display label, the parent references checked
//! before writes, and the dependency counts that guard deletes. Unique and
//! touched columns cover write rules SQLite would otherwise enforce or skip.

use crate::model::entity::EntityKind;

/// Foreign key checked for existence before insert/update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentRef {
    pub column: &'static str,
    pub table: &'static str,
}

/// Dependency count that must be zero before a delete proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteGuard {
    /// User-facing name of the blocking category, e.g. `has tasks`.
    pub category: &'static str,
    /// Count query taking the entity id as `?1`.
    pub count_sql: &'static str,
}

/// Table-of-operations record for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityTable {
    pub kind: EntityKind,
    pub table: &'static str,
    /// Every stored column except `id`, in bind order.
    pub columns: &'static [&'static str],
    /// Columns written on insert and never rewritten by update.
    pub immutable_columns: &'static [&'static str],
    /// Columns whose value must not repeat across rows.
    pub unique_columns: &'static [&'static str],
    /// Timestamp columns set to the current time on every update.
    pub touched_columns: &'static [&'static str],
    pub display_expr: &'static str,
    pub references: &'static [ParentRef],
    pub guards: &'static [DeleteGuard],
}

impl EntityTable {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT id, {} FROM {}", self.columns.join(", "), self.table)
    }

    pub(crate) fn updatable_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .copied()
            .filter(|column| !self.immutable_columns.contains(column))
    }
}

const TEAM: EntityTable = EntityTable {
    kind: EntityKind::Team,
    table: "teams",
    columns: &["name", "description", "location"],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "name",
    references: &[],
    guards: &[DeleteGuard {
        category: "has members",
        count_sql: "SELECT COUNT(*) FROM team_members WHERE team_id = ?1",
    }],
};

const TEAM_MEMBER: EntityTable = EntityTable {
    kind: EntityKind::TeamMember,
    table: "team_members",
    columns: &["first_name", "last_name", "email", "team_id"],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "first_name || ' ' || last_name",
    references: &[ParentRef {
        column: "team_id",
        table: "teams",
    }],
    guards: &[DeleteGuard {
        category: "has assigned tasks",
        count_sql: "SELECT COUNT(*) FROM tasks WHERE assigned_to = ?1",
    }],
};

const PROJECT: EntityTable = EntityTable {
    kind: EntityKind::Project,
    table: "projects",
    columns: &[
        "name",
        "description",
        "start_date",
        "end_date",
        "deviation",
        "assigned_to",
    ],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "name",
    references: &[ParentRef {
        column: "assigned_to",
        table: "team_members",
    }],
    guards: &[
        DeleteGuard {
            category: "has sub-projects",
            count_sql: "SELECT COUNT(*) FROM sub_projects WHERE project_id = ?1",
        },
        DeleteGuard {
            category: "has tasks",
            count_sql: "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
        },
    ],
};

const SUB_PROJECT: EntityTable = EntityTable {
    kind: EntityKind::SubProject,
    table: "sub_projects",
    columns: &[
        "project_id",
        "name",
        "description",
        "start_date",
        "end_date",
        "deviation",
        "assigned_to",
    ],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "name",
    references: &[
        ParentRef {
            column: "project_id",
            table: "projects",
        },
        ParentRef {
            column: "assigned_to",
            table: "team_members",
        },
    ],
    guards: &[DeleteGuard {
        category: "has tasks",
        count_sql: "SELECT COUNT(*) FROM tasks WHERE sub_project_id = ?1",
    }],
};

const TASK: EntityTable = EntityTable {
    kind: EntityKind::Task,
    table: "tasks",
    columns: &[
        "project_id",
        "sub_project_id",
        "name",
        "description",
        "jira_ticket",
        "status",
        "assigned_to",
    ],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "name",
    references: &[
        ParentRef {
            column: "project_id",
            table: "projects",
        },
        ParentRef {
            column: "sub_project_id",
            table: "sub_projects",
        },
        ParentRef {
            column: "assigned_to",
            table: "team_members",
        },
    ],
    guards: &[
        DeleteGuard {
            category: "has notes",
            count_sql: "SELECT COUNT(*) FROM notes WHERE task_id = ?1",
        },
        DeleteGuard {
            category: "has reminders",
            count_sql: "SELECT COUNT(*) FROM reminders WHERE task_id = ?1",
        },
    ],
};

const NOTE: EntityTable = EntityTable {
    kind: EntityKind::Note,
    table: "notes",
    columns: &["task_id", "note", "created_at"],
    immutable_columns: &["created_at"],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "note",
    references: &[ParentRef {
        column: "task_id",
        table: "tasks",
    }],
    guards: &[],
};

const REMINDER: EntityTable = EntityTable {
    kind: EntityKind::Reminder,
    table: "reminders",
    columns: &["task_id", "reminder_date", "note", "followed_up"],
    immutable_columns: &[],
    unique_columns: &[],
    touched_columns: &[],
    display_expr: "'Reminder for ' || reminder_date",
    references: &[ParentRef {
        column: "task_id",
        table: "tasks",
    }],
    guards: &[],
};

const CONNECTION: EntityTable = EntityTable {
    kind: EntityKind::Connection,
    table: "connections",
    columns: &["name", "settings", "created_at", "updated_at"],
    immutable_columns: &["created_at"],
    unique_columns: &["name"],
    touched_columns: &["updated_at"],
    display_expr: "name",
    references: &[],
    guards: &[],
};

/// Every registered table, in `EntityKind::ALL` order.
pub static TABLES: [EntityTable; 8] = [
    TEAM,
    TEAM_MEMBER,
    PROJECT,
    SUB_PROJECT,
    TASK,
    NOTE,
    REMINDER,
    CONNECTION,
];

/// Returns the registry record for `kind`.
pub fn table_for(kind: EntityKind) -> &'static EntityTable {
    match kind {
        EntityKind::Team => &TABLES[0],
        EntityKind::TeamMember => &TABLES[1],
        EntityKind::Project => &TABLES[2],
        EntityKind::SubProject => &TABLES[3],
        EntityKind::Task => &TABLES[4],
        EntityKind::Note => &TABLES[5],
        EntityKind::Reminder => &TABLES[6],
        EntityKind::Connection => &TABLES[7],
    }
}

#[cfg(test)]
mod tests {
    use super::{table_for, TABLES};
    use crate::model::entity::EntityKind;

    #[test]
    fn registry_is_keyed_consistently() {
        for kind in EntityKind::ALL {
            assert_eq!(table_for(kind).kind, kind);
        }
        assert_eq!(TABLES.len(), EntityKind::ALL.len());
    }

    #[test]
    fn immutable_columns_are_excluded_from_updates() {
        let notes = table_for(EntityKind::Note);
        let updatable: Vec<_> = notes.updatable_columns().collect();
        assert_eq!(updatable, vec!["task_id", "note"]);
    }

    #[test]
    fn references_and_column_sets_name_real_columns() {
        for table in TABLES.iter() {
            for parent in table.references {
                assert!(table.has_column(parent.column), "{}", table.table);
            }
            let column_sets = [
                table.immutable_columns,
                table.unique_columns,
                table.touched_columns,
            ];
            for column in column_sets.iter().flat_map(|set| set.iter()) {
                assert!(table.has_column(column), "{}", table.table);
            }
            for column in table.touched_columns {
                assert!(!table.immutable_columns.contains(column), "{}", table.table);
            }
        }
    }
}
