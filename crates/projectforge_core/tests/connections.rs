use projectforge_core::db::open_db_in_memory;
use projectforge_core::model::connection::{
    BitbucketSettings, ConnectionRecord, IntegrationSettings, JiraSettings,
};
use projectforge_core::{
    Connection, ConnectionSettingsStore, Entity, EntityKind, EntityService, ErrorCategory,
    RepoError, SqliteActivityLog, SqliteConnectionStore, SqliteEntityRepository,
    ValidationError,
};
use serde_json::json;

#[test]
fn missing_settings_are_absent_and_typed_defaults_are_disabled() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteConnectionStore::try_new(&conn).unwrap();

    assert_eq!(store.get_settings("jira").unwrap(), None);
    let jira = store.jira().unwrap();
    assert!(!jira.enabled());
    assert_eq!(jira, JiraSettings::default());
}

#[test]
fn save_settings_upserts_by_name() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteConnectionStore::try_new(&conn).unwrap();

    let first_id = store
        .save_settings("jira", &json!({"enabled": false, "url": "https://old"}))
        .unwrap();
    let second_id = store
        .save_settings(" JIRA ", &json!({"enabled": true, "url": "https://new"}))
        .unwrap();
    assert_eq!(first_id, second_id);

    assert_eq!(
        store.get_settings("jira").unwrap(),
        Some(json!({"enabled": true, "url": "https://new"}))
    );
    let records = store.list_connections().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "jira");
    assert!(records[0].updated_at >= records[0].created_at);
}

#[test]
fn typed_settings_round_trip_and_fill_missing_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteConnectionStore::try_new(&conn).unwrap();

    let bitbucket = BitbucketSettings {
        enabled: true,
        url: "https://bitbucket.org".to_string(),
        username: "ci-bot".to_string(),
        app_password: "secret".to_string(),
        workspace: Some("forge".to_string()),
        repository: None,
    };
    store.store(&bitbucket).unwrap();
    assert_eq!(store.bitbucket().unwrap(), bitbucket);

    store
        .save_settings(JiraSettings::NAME, &json!({"enabled": true, "project_key": "APL"}))
        .unwrap();
    let jira = store.jira().unwrap();
    assert!(jira.enabled());
    assert_eq!(jira.project_key.as_deref(), Some("APL"));
    assert!(jira.url.is_empty());
}

#[test]
fn non_object_payload_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteConnectionStore::try_new(&conn).unwrap();

    let err = store.save_settings("jira", &json!(["not", "an", "object"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    let err = store.save_settings("   ", &json!({})).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
}

fn service(conn: &Connection) -> EntityService<SqliteEntityRepository<'_>, SqliteActivityLog<'_>> {
    EntityService::new(
        SqliteEntityRepository::try_new(conn).unwrap(),
        SqliteActivityLog::try_new(conn).unwrap(),
    )
}

#[test]
fn record_api_connections_share_the_settings_store_names() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let store = SqliteConnectionStore::try_new(&conn).unwrap();

    let record = json!({"name": " Jira ", "settings": {"enabled": true}});
    let id = service
        .create_record(EntityKind::Connection, record.as_object().unwrap())
        .unwrap();

    assert_eq!(
        store.get_settings("Jira").unwrap(),
        Some(json!({"enabled": true}))
    );
    assert_eq!(
        service.get_record(EntityKind::Connection, id).unwrap()["name"],
        json!("jira")
    );

    let typed = ConnectionRecord {
        id: None,
        name: "BitBucket".to_string(),
        ..ConnectionRecord::new("unused", json!({"enabled": false}))
    };
    service.create(&Entity::Connection(typed)).unwrap();
    assert_eq!(
        store.get_settings("bitbucket").unwrap(),
        Some(json!({"enabled": false}))
    );
}

#[test]
fn duplicate_connection_name_through_record_api_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let store = SqliteConnectionStore::try_new(&conn).unwrap();
    store.save_settings("jira", &json!({"url": "https://first"})).unwrap();

    let record = json!({"name": "JIRA", "settings": {"url": "https://second"}});
    let err = service
        .create_record(EntityKind::Connection, record.as_object().unwrap())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::DuplicateValue { field: "name", .. })
    ));

    let other = service
        .create_record(
            EntityKind::Connection,
            json!({"name": "bitbucket"}).as_object().unwrap(),
        )
        .unwrap();
    let rename = json!({"name": "Jira"});
    let err = service
        .update_record(EntityKind::Connection, other, rename.as_object().unwrap())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(
        store.get_settings("jira").unwrap(),
        Some(json!({"url": "https://first"}))
    );
}

#[test]
fn record_api_update_keeps_created_at_and_refreshes_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let record = json!({
        "name": "jira",
        "created_at": "2020-01-01T00:00:00",
        "updated_at": "2020-01-01T00:00:00",
    });
    let id = service
        .create_record(EntityKind::Connection, record.as_object().unwrap())
        .unwrap();

    let update = json!({
        "name": "jira",
        "settings": {"enabled": true},
        "created_at": "2021-06-01T00:00:00",
        "updated_at": "2019-01-01T00:00:00",
    });
    service
        .update_record(EntityKind::Connection, id, update.as_object().unwrap())
        .unwrap();

    let stored = service.get_record(EntityKind::Connection, id).unwrap();
    assert_eq!(stored["created_at"], json!("2020-01-01T00:00:00"));
    assert_eq!(stored["settings"], json!({"enabled": true}));
    let updated_at = stored["updated_at"].as_str().unwrap();
    assert!(updated_at > "2021", "updated_at was {updated_at}");
}
