//! Activity feed records.
//!
//! # Invariants
//! - Entries are append-only; nothing updates or deletes them.
//! - `project_id` is a plain value, not a foreign key, so entries outlive
//!   the project they describe.

use crate::model::validation::ValidationError;
use crate::model::EntityId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of state change recorded in the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "Created",
            Self::Update => "Updated",
            Self::Delete => "Deleted",
        }
    }
}

impl Display for ActionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity categories that appear in the activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityEntityType {
    Project,
    #[serde(rename = "subproject")]
    SubProject,
    Task,
    Note,
    Reminder,
}

impl ActivityEntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::SubProject => "subproject",
            Self::Task => "task",
            Self::Note => "note",
            Self::Reminder => "reminder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(Self::Project),
            "subproject" => Some(Self::SubProject),
            "task" => Some(Self::Task),
            "note" => Some(Self::Note),
            "reminder" => Some(Self::Reminder),
            _ => None,
        }
    }

    /// Human label used in generated descriptions.
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::SubProject => "sub-project",
            Self::Task => "task",
            Self::Note => "note",
            Self::Reminder => "reminder",
        }
    }
}

impl Display for ActivityEntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for one feed append. The timestamp is assigned by the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    pub action_type: ActionType,
    pub entity_type: ActivityEntityType,
    pub entity_id: EntityId,
    pub entity_name: String,
    pub description: String,
    pub project_id: Option<EntityId>,
    pub user_id: Option<EntityId>,
}

impl NewActivity {
    /// Builds an entry with the standard "<Verb> <label> '<name>'" description.
    pub fn describe(
        action_type: ActionType,
        entity_type: ActivityEntityType,
        entity_id: EntityId,
        entity_name: impl Into<String>,
        project_id: Option<EntityId>,
    ) -> Self {
        let entity_name = entity_name.into();
        let description = format!(
            "{} {} '{}'",
            action_type.past_tense(),
            entity_type.label(),
            entity_name
        );
        Self {
            action_type,
            entity_type,
            entity_id,
            entity_name,
            description,
            project_id,
            user_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingField("description"));
        }
        Ok(())
    }
}

/// One persisted feed entry, joined with its project name when it still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: EntityId,
    pub timestamp: NaiveDateTime,
    pub user_id: Option<EntityId>,
    pub action_type: ActionType,
    pub entity_type: ActivityEntityType,
    pub entity_id: EntityId,
    pub entity_name: String,
    pub description: String,
    pub project_id: Option<EntityId>,
    pub project_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{ActionType, ActivityEntityType, NewActivity};

    #[test]
    fn describe_builds_readable_description() {
        let entry = NewActivity::describe(
            ActionType::Delete,
            ActivityEntityType::SubProject,
            4,
            "Phase 2",
            Some(1),
        );
        assert_eq!(entry.description, "Deleted sub-project 'Phase 2'");
        assert_eq!(entry.project_id, Some(1));
        assert_eq!(entry.user_id, None);
    }

    #[test]
    fn entity_type_strings_round_trip() {
        for kind in [
            ActivityEntityType::Project,
            ActivityEntityType::SubProject,
            ActivityEntityType::Task,
            ActivityEntityType::Note,
            ActivityEntityType::Reminder,
        ] {
            assert_eq!(ActivityEntityType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityEntityType::parse("team"), None);
    }
}
