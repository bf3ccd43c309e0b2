//! Entity kinds, the tagged entity union, and keyed-record conversion.
//!
//! # Responsibility
//! - Name the eight CRUD-able tables with a closed enum instead of
//!   deriving table names from type names.
//! - Convert between typed models and plain `field -> value` records used
//!   by the presentation layer.
//!
//! # Invariants
//! - `Entity::from_record` only returns entities that passed `validate()`.
//! - `Entity::to_record` omits an unset `id`.

use crate::model::activity::ActivityEntityType;
use crate::model::connection::ConnectionRecord;
use crate::model::note::{Note, Reminder};
use crate::model::project::{Project, SubProject};
use crate::model::task::{Task, TaskStatus};
use crate::model::team::{Team, TeamMember};
use crate::model::validation::ValidationError;
use crate::model::EntityId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Plain keyed record: field name to JSON value.
pub type Record = Map<String, Value>;

/// Tag for every table reachable through the generic repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Team,
    TeamMember,
    Project,
    SubProject,
    Task,
    Note,
    Reminder,
    Connection,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Team,
        EntityKind::TeamMember,
        EntityKind::Project,
        EntityKind::SubProject,
        EntityKind::Task,
        EntityKind::Note,
        EntityKind::Reminder,
        EntityKind::Connection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::TeamMember => "team_member",
            Self::Project => "project",
            Self::SubProject => "sub_project",
            Self::Task => "task",
            Self::Note => "note",
            Self::Reminder => "reminder",
            Self::Connection => "connection",
        }
    }

    /// Feed category, or `None` for kinds that stay out of the activity log.
    pub fn activity_type(self) -> Option<ActivityEntityType> {
        match self {
            Self::Project => Some(ActivityEntityType::Project),
            Self::SubProject => Some(ActivityEntityType::SubProject),
            Self::Task => Some(ActivityEntityType::Task),
            Self::Note => Some(ActivityEntityType::Note),
            Self::Reminder => Some(ActivityEntityType::Reminder),
            Self::Team | Self::TeamMember | Self::Connection => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown entity kind `{value}`"))
    }
}

/// Any storable entity, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Team(Team),
    TeamMember(TeamMember),
    Project(Project),
    SubProject(SubProject),
    Task(Task),
    Note(Note),
    Reminder(Reminder),
    Connection(ConnectionRecord),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Team(_) => EntityKind::Team,
            Self::TeamMember(_) => EntityKind::TeamMember,
            Self::Project(_) => EntityKind::Project,
            Self::SubProject(_) => EntityKind::SubProject,
            Self::Task(_) => EntityKind::Task,
            Self::Note(_) => EntityKind::Note,
            Self::Reminder(_) => EntityKind::Reminder,
            Self::Connection(_) => EntityKind::Connection,
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        match self {
            Self::Team(value) => value.id,
            Self::TeamMember(value) => value.id,
            Self::Project(value) => value.id,
            Self::SubProject(value) => value.id,
            Self::Task(value) => value.id,
            Self::Note(value) => value.id,
            Self::Reminder(value) => value.id,
            Self::Connection(value) => value.id,
        }
    }

    pub fn set_id(&mut self, id: EntityId) {
        let slot = match self {
            Self::Team(value) => &mut value.id,
            Self::TeamMember(value) => &mut value.id,
            Self::Project(value) => &mut value.id,
            Self::SubProject(value) => &mut value.id,
            Self::Task(value) => &mut value.id,
            Self::Note(value) => &mut value.id,
            Self::Reminder(value) => &mut value.id,
            Self::Connection(value) => &mut value.id,
        };
        *slot = Some(id);
    }

    /// Label used by lookups and activity entries.
    pub fn display_name(&self) -> String {
        match self {
            Self::Team(value) => value.name.clone(),
            Self::TeamMember(value) => value.full_name(),
            Self::Project(value) => value.name.clone(),
            Self::SubProject(value) => value.name.clone(),
            Self::Task(value) => value.name.clone(),
            Self::Note(value) => value.summary(),
            Self::Reminder(value) => format!("Reminder for {}", value.reminder_date),
            Self::Connection(value) => value.name.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Team(value) => value.validate(),
            Self::TeamMember(value) => value.validate(),
            Self::Project(value) => value.validate(),
            Self::SubProject(value) => value.validate(),
            Self::Task(value) => value.validate(),
            Self::Note(value) => value.validate(),
            Self::Reminder(_) => Ok(()),
            Self::Connection(value) => value.validate(),
        }
    }

    /// Decodes and validates a keyed record as an entity of `kind`.
    ///
    /// # Errors
    /// - `InvalidStatus` for a task `status` outside the six known values.
    /// - `Malformed` when fields are missing or have the wrong shape.
    /// - Any field rule reported by the entity's `validate()`.
    pub fn from_record(kind: EntityKind, record: &Record) -> Result<Self, ValidationError> {
        let entity = match kind {
            EntityKind::Team => Self::Team(decode(record)?),
            EntityKind::TeamMember => Self::TeamMember(decode(record)?),
            EntityKind::Project => Self::Project(decode(record)?),
            EntityKind::SubProject => Self::SubProject(decode(record)?),
            EntityKind::Task => {
                check_status_field(record)?;
                Self::Task(decode(record)?)
            }
            EntityKind::Note => Self::Note(decode(record)?),
            EntityKind::Reminder => Self::Reminder(decode(record)?),
            EntityKind::Connection => Self::Connection(decode(record)?),
        };
        entity.validate()?;
        Ok(entity)
    }

    /// Encodes the entity as a keyed record.
    pub fn to_record(&self) -> Record {
        let value = match self {
            Self::Team(value) => encode(value),
            Self::TeamMember(value) => encode(value),
            Self::Project(value) => encode(value),
            Self::SubProject(value) => encode(value),
            Self::Task(value) => encode(value),
            Self::Note(value) => encode(value),
            Self::Reminder(value) => encode(value),
            Self::Connection(value) => encode(value),
        };
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }
}

/// Typed model that maps onto one [`EntityKind`].
pub trait EntityModel: Sized {
    const KIND: EntityKind;

    fn into_entity(self) -> Entity;
    fn from_entity(entity: Entity) -> Option<Self>;
}

macro_rules! entity_model {
    ($model:ty, $variant:ident) => {
        impl EntityModel for $model {
            const KIND: EntityKind = EntityKind::$variant;

            fn into_entity(self) -> Entity {
                Entity::$variant(self)
            }

            fn from_entity(entity: Entity) -> Option<Self> {
                match entity {
                    Entity::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }

        impl From<$model> for Entity {
            fn from(value: $model) -> Self {
                Entity::$variant(value)
            }
        }
    };
}

entity_model!(Team, Team);
entity_model!(TeamMember, TeamMember);
entity_model!(Project, Project);
entity_model!(SubProject, SubProject);
entity_model!(Task, Task);
entity_model!(Note, Note);
entity_model!(Reminder, Reminder);
entity_model!(ConnectionRecord, Connection);

fn decode<T: DeserializeOwned>(record: &Record) -> Result<T, ValidationError> {
    serde_json::from_value(Value::Object(record.clone()))
        .map_err(|err| ValidationError::Malformed(err.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Value {
    // Models only hold strings, integers, dates and JSON values.
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn check_status_field(record: &Record) -> Result<(), ValidationError> {
    match record.get("status") {
        None => Ok(()),
        Some(Value::String(value)) => value.parse::<TaskStatus>().map(|_| ()),
        Some(other) => Err(ValidationError::InvalidStatus(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, EntityKind, Record};
    use crate::model::task::TaskStatus;
    use crate::model::validation::ValidationError;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn kind_strings_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn task_record_with_unknown_status_is_invalid_status() {
        let input = record(json!({"project_id": 1, "name": "Ship", "status": "done"}));
        let err = Entity::from_record(EntityKind::Task, &input).unwrap_err();
        assert_eq!(err, ValidationError::InvalidStatus("done".to_string()));
    }

    #[test]
    fn task_record_accepts_every_status() {
        for status in TaskStatus::ALL {
            let input = record(json!({"project_id": 1, "name": "Ship", "status": status.as_str()}));
            match Entity::from_record(EntityKind::Task, &input).unwrap() {
                Entity::Task(task) => assert_eq!(task.status, status),
                other => panic!("unexpected entity: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let input = record(json!({"description": "no name"}));
        assert!(matches!(
            Entity::from_record(EntityKind::Team, &input),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn record_with_inverted_dates_is_rejected() {
        let input = record(json!({
            "name": "Apollo",
            "start_date": "2024-06-10",
            "end_date": "2024-06-01"
        }));
        assert!(matches!(
            Entity::from_record(EntityKind::Project, &input),
            Err(ValidationError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn to_record_omits_unset_id() {
        let input = record(json!({"name": "Platform", "location": "Berlin"}));
        let entity = Entity::from_record(EntityKind::Team, &input).unwrap();
        let output = entity.to_record();
        assert!(!output.contains_key("id"));
        assert_eq!(output.get("location"), Some(&json!("Berlin")));
    }
}
