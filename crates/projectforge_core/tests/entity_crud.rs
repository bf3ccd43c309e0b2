use chrono::NaiveDate;
use projectforge_core::db::open_db_in_memory;
use projectforge_core::model::note::{Note, Reminder};
use projectforge_core::model::project::{Project, SubProject};
use projectforge_core::model::task::Task;
use projectforge_core::model::team::{Team, TeamMember};
use projectforge_core::{
    Entity, EntityKind, EntityRepository, ErrorCategory, RepoError, SqliteEntityRepository,
    TaskStatus, ValidationError,
};
use rusqlite::Connection;
use serde_json::json;

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn seed_project(repo: &SqliteEntityRepository<'_>) -> i64 {
    let project = Project::new("Apollo", day(1, 1), day(6, 30)).unwrap();
    repo.create(&Entity::Project(project)).unwrap()
}

#[test]
fn create_and_get_roundtrip_for_every_kind() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();

    let team_id = repo.create(&Entity::Team(Team::new("Core"))).unwrap();
    let mut member = TeamMember::new("Ada", "Lovelace");
    member.email = Some("ada@example.com".to_string());
    member.team_id = Some(team_id);
    let member_id = repo.create(&Entity::TeamMember(member.clone())).unwrap();

    let mut project = Project::new("Apollo", day(1, 1), day(6, 30)).unwrap();
    project.description = Some("Moonshot".to_string());
    project.deviation = 3;
    project.assigned_to = Some(member_id);
    let project_id = repo.create(&Entity::Project(project.clone())).unwrap();

    let sub_project = SubProject::new(project_id, "Phase 1", day(2, 1), day(2, 1)).unwrap();
    let sub_project_id = repo.create(&Entity::SubProject(sub_project.clone())).unwrap();

    let mut task = Task::for_sub_project(sub_project_id, "Build lander");
    task.jira_ticket = Some("APL-12".to_string());
    task.status = TaskStatus::Waiting;
    task.assigned_to = Some(member_id);
    let task_id = repo.create(&Entity::Task(task.clone())).unwrap();

    let note = Note::new(task_id, "Waiting on vendor");
    let note_id = repo.create(&Entity::Note(note.clone())).unwrap();
    let reminder = Reminder::new(task_id, day(3, 5), "Call vendor");
    let reminder_id = repo.create(&Entity::Reminder(reminder.clone())).unwrap();

    let cases = vec![
        (Entity::TeamMember(member), member_id),
        (Entity::Project(project), project_id),
        (Entity::SubProject(sub_project), sub_project_id),
        (Entity::Task(task), task_id),
        (Entity::Note(note), note_id),
        (Entity::Reminder(reminder), reminder_id),
    ];
    for (mut expected, id) in cases {
        expected.set_id(id);
        let loaded = repo.get_by_id(expected.kind(), id).unwrap();
        assert_eq!(loaded, expected);
    }
}

#[test]
fn get_missing_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();

    let err = repo.get_by_id(EntityKind::Project, 42).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Project,
            id: 42
        }
    ));
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn update_replaces_mutable_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);

    let mut task = Task::for_project(project_id, "Draft plan");
    let task_id = repo.create(&Entity::Task(task.clone())).unwrap();
    task.id = Some(task_id);
    task.name = "Final plan".to_string();
    task.status = TaskStatus::Completed;
    repo.update(&Entity::Task(task.clone())).unwrap();

    assert_eq!(
        repo.get_by_id(EntityKind::Task, task_id).unwrap(),
        Entity::Task(task)
    );
}

#[test]
fn update_keeps_note_creation_time() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);
    let task_id = repo
        .create(&Entity::Task(Task::for_project(project_id, "Ship")))
        .unwrap();
    let note_id = repo
        .create(&Entity::Note(Note::new(task_id, "first")))
        .unwrap();
    let original = match repo.get_by_id(EntityKind::Note, note_id).unwrap() {
        Entity::Note(note) => note,
        other => panic!("unexpected entity: {other:?}"),
    };

    let mut edited = original.clone();
    edited.note = "edited".to_string();
    edited.created_at = original.created_at + chrono::Duration::days(3);
    repo.update(&Entity::Note(edited)).unwrap();

    match repo.get_by_id(EntityKind::Note, note_id).unwrap() {
        Entity::Note(note) => {
            assert_eq!(note.note, "edited");
            assert_eq!(note.created_at, original.created_at);
        }
        other => panic!("unexpected entity: {other:?}"),
    }
}

#[test]
fn update_without_id_or_missing_row_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();

    let mut team = Team::new("Ghosts");
    let err = repo.update(&Entity::Team(team.clone())).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::MissingField("id"))
    ));

    team.id = Some(77);
    let err = repo.update(&Entity::Team(team)).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 77, .. }));
}

#[test]
fn update_with_inverted_dates_is_validation_error_and_leaves_row() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);

    let mut project = match repo.get_by_id(EntityKind::Project, project_id).unwrap() {
        Entity::Project(project) => project,
        other => panic!("unexpected entity: {other:?}"),
    };
    project.end_date = day(1, 1) - chrono::Duration::days(1);
    let err = repo.update(&Entity::Project(project)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidDateRange { .. })
    ));

    match repo.get_by_id(EntityKind::Project, project_id).unwrap() {
        Entity::Project(project) => assert_eq!(project.end_date, day(6, 30)),
        other => panic!("unexpected entity: {other:?}"),
    }
}

#[test]
fn dangling_references_are_validation_errors() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);

    let err = repo
        .create(&Entity::Note(Note::new(999, "orphan")))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::UnknownReference {
            field: "task_id",
            id: 999
        })
    ));

    let mut task = Task::for_project(project_id, "Assign me");
    task.assigned_to = Some(5);
    let err = repo.create(&Entity::Task(task)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(repo.list_all(EntityKind::Task).unwrap().is_empty());
}

#[test]
fn task_requires_exactly_one_parent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);

    let mut both = Task::for_project(project_id, "Both");
    both.sub_project_id = Some(1);
    assert!(matches!(
        repo.create(&Entity::Task(both)).unwrap_err(),
        RepoError::Validation(ValidationError::InvalidTaskParent { .. })
    ));

    let mut neither = Task::for_project(project_id, "Neither");
    neither.project_id = None;
    assert!(matches!(
        repo.create(&Entity::Task(neither)).unwrap_err(),
        RepoError::Validation(ValidationError::InvalidTaskParent { .. })
    ));
}

#[test]
fn record_api_accepts_every_status_and_rejects_others() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);

    for status in TaskStatus::ALL {
        let record = json!({"project_id": project_id, "name": "T", "status": status.as_str()});
        let entity =
            Entity::from_record(EntityKind::Task, record.as_object().unwrap()).unwrap();
        let id = repo.create(&entity).unwrap();
        let stored = repo.get_by_id(EntityKind::Task, id).unwrap().to_record();
        assert_eq!(stored["status"], json!(status.as_str()));
        assert_eq!(stored["id"], json!(id));
    }

    let record = json!({"project_id": project_id, "name": "T", "status": "archived"});
    assert_eq!(
        Entity::from_record(EntityKind::Task, record.as_object().unwrap()).unwrap_err(),
        ValidationError::InvalidStatus("archived".to_string())
    );
}

#[test]
fn lookup_orders_by_display_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();

    repo.create(&Entity::TeamMember(TeamMember::new("Grace", "Hopper")))
        .unwrap();
    repo.create(&Entity::TeamMember(TeamMember::new("ada", "Lovelace")))
        .unwrap();

    let names: Vec<String> = repo
        .lookup(EntityKind::TeamMember)
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["ada Lovelace", "Grace Hopper"]);
}

#[test]
fn list_children_filters_by_parent_column() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);
    let sub_project_id = repo
        .create(&Entity::SubProject(
            SubProject::new(project_id, "Phase", day(1, 1), day(1, 31)).unwrap(),
        ))
        .unwrap();

    repo.create(&Entity::Task(Task::for_project(project_id, "direct")))
        .unwrap();
    repo.create(&Entity::Task(Task::for_sub_project(sub_project_id, "nested")))
        .unwrap();

    let direct = repo
        .list_children(EntityKind::Task, "project_id", project_id)
        .unwrap();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].display_name(), "direct");

    let err = repo
        .list_children(EntityKind::Task, "name; DROP TABLE tasks", 1)
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn resolve_project_id_follows_parent_chain() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteEntityRepository::try_new(&conn).unwrap();
    let project_id = seed_project(&repo);
    let sub_project_id = repo
        .create(&Entity::SubProject(
            SubProject::new(project_id, "Phase", day(1, 1), day(1, 31)).unwrap(),
        ))
        .unwrap();
    let task_id = repo
        .create(&Entity::Task(Task::for_sub_project(sub_project_id, "nested")))
        .unwrap();
    let reminder_id = repo
        .create(&Entity::Reminder(Reminder::new(task_id, day(1, 2), "")))
        .unwrap();

    for (kind, id) in [
        (EntityKind::Project, project_id),
        (EntityKind::SubProject, sub_project_id),
        (EntityKind::Task, task_id),
        (EntityKind::Reminder, reminder_id),
    ] {
        assert_eq!(repo.resolve_project_id(kind, id).unwrap(), Some(project_id));
    }
    assert_eq!(repo.resolve_project_id(EntityKind::Team, 1).unwrap(), None);
}

#[test]
fn try_new_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteEntityRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn try_new_rejects_connection_missing_column() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("ALTER TABLE teams DROP COLUMN location;")
        .unwrap();
    let err = SqliteEntityRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::MissingRequiredColumn {
            table: "teams",
            column: "location"
        }
    ));
}
