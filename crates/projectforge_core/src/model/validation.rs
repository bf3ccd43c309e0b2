//! Field-level validation errors shared by all domain records.

use crate::model::EntityId;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Domain rule violation detected before any write happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is absent or blank.
    MissingField(&'static str),
    /// `end_date` precedes `start_date`.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    /// Task status outside the six known values.
    InvalidStatus(String),
    /// Task must reference exactly one of project / sub-project.
    InvalidTaskParent {
        project_id: Option<EntityId>,
        sub_project_id: Option<EntityId>,
    },
    /// Email is present but does not look like an address.
    InvalidEmail(String),
    /// Referenced parent row does not exist.
    UnknownReference { field: &'static str, id: EntityId },
    /// Value collides with an existing row in a unique column.
    DuplicateValue { field: &'static str, value: String },
    /// Keyed record could not be decoded into the entity shape.
    Malformed(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is missing"),
            Self::InvalidDateRange { start, end } => {
                write!(f, "end date {end} must not precede start date {start}")
            }
            Self::InvalidStatus(value) => write!(
                f,
                "invalid task status `{value}`; expected one of: not started, started, in progress, blocked, waiting, completed"
            ),
            Self::InvalidTaskParent {
                project_id,
                sub_project_id,
            } => write!(
                f,
                "task must belong to exactly one of project or sub-project (project_id={project_id:?}, sub_project_id={sub_project_id:?})"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::UnknownReference { field, id } => {
                write!(f, "`{field}` references missing row {id}")
            }
            Self::DuplicateValue { field, value } => {
                write!(f, "`{field}` value `{value}` is already in use")
            }
            Self::Malformed(message) => write!(f, "malformed record: {message}"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_non_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

pub(crate) fn require_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::InvalidDateRange { start, end });
    }
    Ok(())
}

pub(crate) fn require_email_shape(value: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(value.trim()) {
        return Err(ValidationError::InvalidEmail(value.to_string()));
    }
    Ok(())
}
