//! Projects and sub-projects.
//!
//! # Invariants
//! - `end_date >= start_date`, checked at construction and before every write.
//! - `deviation` is carried through untouched; nothing computes it.

use crate::model::validation::{require_date_range, require_non_blank, ValidationError};
use crate::model::EntityId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Top-level unit of planned work with a date span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub deviation: i64,
    #[serde(default)]
    pub assigned_to: Option<EntityId>,
}

impl Project {
    /// Creates an unsaved project.
    ///
    /// # Errors
    /// - `InvalidDateRange` when `end_date < start_date`.
    /// - `MissingField("name")` when `name` is blank.
    pub fn new(
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let project = Self {
            id: None,
            name: name.into(),
            description: None,
            start_date,
            end_date,
            deviation: 0,
            assigned_to: None,
        };
        project.validate()?;
        Ok(project)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        require_date_range(self.start_date, self.end_date)
    }
}

/// A dated slice of a project, owned by exactly one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub project_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub deviation: i64,
    #[serde(default)]
    pub assigned_to: Option<EntityId>,
}

impl SubProject {
    /// Creates an unsaved sub-project under `project_id`.
    ///
    /// Same date and name rules as [`Project::new`].
    pub fn new(
        project_id: EntityId,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let sub_project = Self {
            id: None,
            project_id,
            name: name.into(),
            description: None,
            start_date,
            end_date,
            deviation: 0,
            assigned_to: None,
        };
        sub_project.validate()?;
        Ok(sub_project)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        require_date_range(self.start_date, self.end_date)
    }
}
