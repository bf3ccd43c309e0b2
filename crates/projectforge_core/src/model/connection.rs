//! Integration connection settings (Jira, Bitbucket).
//!
//! Settings are stored as an opaque JSON payload keyed by a unique name; the
//! typed structs below describe the two known payload shapes.

use crate::model::validation::{require_non_blank, ValidationError};
use crate::model::{deserialize_timestamp, now_timestamp, EntityId};
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row of the `connections` table. `name` is kept normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(deserialize_with = "deserialize_name")]
    pub name: String,
    #[serde(default = "empty_settings")]
    pub settings: Value,
    #[serde(default = "now_timestamp", deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default = "now_timestamp", deserialize_with = "deserialize_timestamp")]
    pub updated_at: NaiveDateTime,
}

impl ConnectionRecord {
    pub fn new(name: impl AsRef<str>, settings: Value) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            name: normalize_connection_name(name.as_ref()),
            settings,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        if !self.settings.is_object() {
            return Err(ValidationError::Malformed(
                "connection settings must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection names are case-insensitive and whitespace-trimmed.
pub fn normalize_connection_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|name| normalize_connection_name(&name))
}

fn empty_settings() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Typed view over a named settings payload.
pub trait IntegrationSettings: Serialize + DeserializeOwned + Default {
    /// Unique connection name the payload is stored under.
    const NAME: &'static str;

    fn enabled(&self) -> bool;
}

/// Jira REST credentials and default project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraSettings {
    pub enabled: bool,
    pub url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: Option<String>,
}

impl IntegrationSettings for JiraSettings {
    const NAME: &'static str = "jira";

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Bitbucket credentials and default workspace / repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitbucketSettings {
    pub enabled: bool,
    pub url: String,
    pub username: String,
    pub app_password: String,
    pub workspace: Option<String>,
    pub repository: Option<String>,
}

impl IntegrationSettings for BitbucketSettings {
    const NAME: &'static str = "bitbucket";

    fn enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionRecord, JiraSettings};
    use crate::model::entity::{Entity, EntityKind, Record};
    use serde_json::json;

    #[test]
    fn partial_payload_fills_defaults() {
        let settings: JiraSettings =
            serde_json::from_value(json!({"url": "https://acme.atlassian.net"})).unwrap();
        assert_eq!(settings.url, "https://acme.atlassian.net");
        assert!(!settings.enabled);
        assert_eq!(settings.project_key, None);
    }

    #[test]
    fn settings_payload_must_be_an_object() {
        let record = ConnectionRecord::new("jira", json!(["not", "an", "object"]));
        assert!(record.validate().is_err());
    }

    #[test]
    fn names_are_normalized_on_construction_and_decode() {
        assert_eq!(ConnectionRecord::new("  Jira ", json!({})).name, "jira");

        let record: Record = serde_json::from_value(json!({"name": " BitBucket"})).unwrap();
        match Entity::from_record(EntityKind::Connection, &record).unwrap() {
            Entity::Connection(connection) => assert_eq!(connection.name, "bitbucket"),
            other => panic!("unexpected entity: {other:?}"),
        }
    }
}
