//! Follow-up records attached to tasks: notes and reminders.

use crate::model::validation::{require_non_blank, ValidationError};
use crate::model::{deserialize_timestamp, now_timestamp, EntityId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const NOTE_NAME_MAX_CHARS: usize = 40;

/// Free-text note on a task. `created_at` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub task_id: EntityId,
    pub note: String,
    #[serde(default = "now_timestamp", deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
}

impl Note {
    pub fn new(task_id: EntityId, note: impl Into<String>) -> Self {
        Self {
            id: None,
            task_id,
            note: note.into(),
            created_at: now_timestamp(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("note", &self.note)
    }

    /// Short single-line label for activity entries.
    pub fn summary(&self) -> String {
        let flattened = self.note.replace(['\n', '\r'], " ");
        let mut summary: String = flattened.chars().take(NOTE_NAME_MAX_CHARS).collect();
        if flattened.chars().count() > NOTE_NAME_MAX_CHARS {
            summary.push_str("...");
        }
        summary
    }
}

/// Dated nudge on a task; `followed_up` marks that someone acted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub task_id: EntityId,
    pub reminder_date: NaiveDate,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub followed_up: bool,
}

impl Reminder {
    pub fn new(task_id: EntityId, reminder_date: NaiveDate, note: impl Into<String>) -> Self {
        Self {
            id: None,
            task_id,
            reminder_date,
            note: note.into(),
            followed_up: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, Reminder};
    use chrono::NaiveDate;

    #[test]
    fn note_summary_is_single_line_and_capped() {
        let note = Note::new(1, format!("first line\n{}", "x".repeat(80)));
        let summary = note.summary();
        assert!(!summary.contains('\n'));
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn blank_note_is_rejected() {
        assert!(Note::new(1, "  ").validate().is_err());
    }

    #[test]
    fn reminder_defaults_to_not_followed_up() {
        let reminder: Reminder =
            serde_json::from_str(r#"{"task_id":3,"reminder_date":"2024-02-01"}"#).unwrap();
        assert!(!reminder.followed_up);
        assert_eq!(
            reminder.reminder_date,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(reminder.note, "");
    }
}
