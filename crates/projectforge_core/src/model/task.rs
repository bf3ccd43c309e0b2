//! Tasks and their status values.
//!
//! # Invariants
//! - A task belongs to exactly one of a project or a sub-project.
//! - `status` is one of six values; any value may replace any other.

use crate::model::validation::{require_non_blank, ValidationError};
use crate::model::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Task progress state. There is no enforced transition graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "not started")]
    NotStarted,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "waiting")]
    Waiting,
    #[serde(rename = "completed")]
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::NotStarted,
        TaskStatus::Started,
        TaskStatus::InProgress,
        TaskStatus::Blocked,
        TaskStatus::Waiting,
        TaskStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Started => "started",
            Self::InProgress => "in progress",
            Self::Blocked => "blocked",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
        }
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ValidationError::InvalidStatus(value.to_string()))
    }
}

/// Owning parent of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskParent {
    Project(EntityId),
    SubProject(EntityId),
}

/// Unit of work tracked on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub project_id: Option<EntityId>,
    #[serde(default)]
    pub sub_project_id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// External ticket key; stored as given.
    #[serde(default)]
    pub jira_ticket: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assigned_to: Option<EntityId>,
}

impl Task {
    /// Creates an unsaved task owned directly by a project.
    pub fn for_project(project_id: EntityId, name: impl Into<String>) -> Self {
        Self::with_parent(TaskParent::Project(project_id), name)
    }

    /// Creates an unsaved task owned by a sub-project.
    pub fn for_sub_project(sub_project_id: EntityId, name: impl Into<String>) -> Self {
        Self::with_parent(TaskParent::SubProject(sub_project_id), name)
    }

    fn with_parent(parent: TaskParent, name: impl Into<String>) -> Self {
        let (project_id, sub_project_id) = match parent {
            TaskParent::Project(id) => (Some(id), None),
            TaskParent::SubProject(id) => (None, Some(id)),
        };
        Self {
            id: None,
            project_id,
            sub_project_id,
            name: name.into(),
            description: None,
            jira_ticket: None,
            status: TaskStatus::NotStarted,
            assigned_to: None,
        }
    }

    /// Returns the owning parent, or an error when zero or two are set.
    pub fn parent(&self) -> Result<TaskParent, ValidationError> {
        match (self.project_id, self.sub_project_id) {
            (Some(project_id), None) => Ok(TaskParent::Project(project_id)),
            (None, Some(sub_project_id)) => Ok(TaskParent::SubProject(sub_project_id)),
            (project_id, sub_project_id) => Err(ValidationError::InvalidTaskParent {
                project_id,
                sub_project_id,
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        self.parent()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Task, TaskParent, TaskStatus};
    use crate::model::validation::ValidationError;
    use std::str::FromStr;

    #[test]
    fn status_parses_all_six_values() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        for value in ["done", "Completed", "in_progress", ""] {
            assert!(matches!(
                TaskStatus::from_str(value),
                Err(ValidationError::InvalidStatus(_))
            ));
        }
    }

    #[test]
    fn status_serializes_with_spaces() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");
    }

    #[test]
    fn new_tasks_default_to_not_started() {
        let task = Task::for_project(7, "Write docs");
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.parent().unwrap(), TaskParent::Project(7));
    }

    #[test]
    fn task_with_both_or_no_parent_is_invalid() {
        let mut task = Task::for_project(1, "Both");
        task.sub_project_id = Some(2);
        assert!(matches!(
            task.validate(),
            Err(ValidationError::InvalidTaskParent { .. })
        ));

        task.project_id = None;
        task.sub_project_id = None;
        assert!(matches!(
            task.validate(),
            Err(ValidationError::InvalidTaskParent {
                project_id: None,
                sub_project_id: None
            })
        ));
    }
}
