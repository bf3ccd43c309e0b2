//! Entity use-case service.
//!
//! # Responsibility
//! - Typed and keyed-record CRUD entry points for the presentation layer.
//! - Append an activity entry after every successful mutation of a
//!   project, sub-project, task, note or reminder.
//!
//! # Invariants
//! - Activity logging is best-effort: a failed append is reported through
//!   `log` and never fails or rolls back the mutation.
//! - Delete entries capture the entity name and project before the row is
//!   removed.

use crate::model::activity::{ActionType, NewActivity};
use crate::model::entity::{Entity, EntityKind, EntityModel, Record};
use crate::model::note::{Note, Reminder};
use crate::model::project::SubProject;
use crate::model::task::{Task, TaskStatus};
use crate::model::team::TeamMember;
use crate::model::EntityId;
use crate::repo::activity_repo::ActivityLogger;
use crate::repo::entity_repo::{EntityRepository, LookupItem, RepoError, RepoResult};
use log::{info, warn};

/// Use-case service over entity persistence plus the activity feed.
pub struct EntityService<R: EntityRepository, L: ActivityLogger> {
    repo: R,
    logger: L,
}

impl<R: EntityRepository, L: ActivityLogger> EntityService<R, L> {
    pub fn new(repo: R, logger: L) -> Self {
        Self { repo, logger }
    }

    /// Creates an entity and returns its store-assigned id.
    pub fn create(&self, entity: &Entity) -> RepoResult<EntityId> {
        let id = self.repo.create(entity)?;
        let kind = entity.kind();
        info!("event=entity_create module=service status=ok kind={kind} id={id}");
        let project_id = self.project_of(kind, id);
        self.record_activity(ActionType::Create, kind, id, &entity.display_name(), project_id, None);
        Ok(id)
    }

    /// Replaces every mutable field of an existing entity.
    pub fn update(&self, entity: &Entity) -> RepoResult<()> {
        self.repo.update(entity)?;
        let kind = entity.kind();
        let id = entity
            .id()
            .ok_or_else(|| RepoError::InvalidData(format!("{kind} updated without an id")))?;
        info!("event=entity_update module=service status=ok kind={kind} id={id}");
        let project_id = self.project_of(kind, id);
        self.record_activity(ActionType::Update, kind, id, &entity.display_name(), project_id, None);
        Ok(())
    }

    /// Deletes an entity once no dependents remain.
    ///
    /// # Errors
    /// - `NotFound` when the id does not exist.
    /// - `Conflict` naming the first blocking dependency category.
    pub fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let existing = self.repo.get_by_id(kind, id)?;
        let project_id = self.project_of(kind, id);
        self.repo.delete(kind, id)?;
        info!("event=entity_delete module=service status=ok kind={kind} id={id}");
        self.record_activity(
            ActionType::Delete,
            kind,
            id,
            &existing.display_name(),
            project_id,
            None,
        );
        Ok(())
    }

    pub fn get(&self, kind: EntityKind, id: EntityId) -> RepoResult<Entity> {
        self.repo.get_by_id(kind, id)
    }

    pub fn list(&self, kind: EntityKind) -> RepoResult<Vec<Entity>> {
        self.repo.list_all(kind)
    }

    /// Typed create; see [`EntityService::create`].
    pub fn create_model<M: EntityModel>(&self, model: M) -> RepoResult<EntityId> {
        self.create(&model.into_entity())
    }

    pub fn update_model<M: EntityModel>(&self, model: M) -> RepoResult<()> {
        self.update(&model.into_entity())
    }

    pub fn get_model<M: EntityModel>(&self, id: EntityId) -> RepoResult<M> {
        narrow(self.repo.get_by_id(M::KIND, id)?)
    }

    pub fn list_models<M: EntityModel>(&self) -> RepoResult<Vec<M>> {
        self.repo.list_all(M::KIND)?.into_iter().map(narrow).collect()
    }

    /// Creates an entity from a keyed record; an `id` key is honored.
    pub fn create_record(&self, kind: EntityKind, record: &Record) -> RepoResult<EntityId> {
        let entity = Entity::from_record(kind, record)?;
        self.create(&entity)
    }

    /// Updates entity `id` from a keyed record; the record's own `id` is ignored.
    pub fn update_record(&self, kind: EntityKind, id: EntityId, record: &Record) -> RepoResult<()> {
        let mut entity = Entity::from_record(kind, record)?;
        entity.set_id(id);
        self.update(&entity)
    }

    pub fn get_record(&self, kind: EntityKind, id: EntityId) -> RepoResult<Record> {
        Ok(self.repo.get_by_id(kind, id)?.to_record())
    }

    pub fn list_records(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        Ok(self
            .repo
            .list_all(kind)?
            .iter()
            .map(Entity::to_record)
            .collect())
    }

    /// `(id, display name)` pairs for selection inputs.
    pub fn lookup(&self, kind: EntityKind) -> RepoResult<Vec<LookupItem>> {
        self.repo.lookup(kind)
    }

    pub fn members_of_team(&self, team_id: EntityId) -> RepoResult<Vec<TeamMember>> {
        self.children("team_id", team_id)
    }

    pub fn sub_projects_of(&self, project_id: EntityId) -> RepoResult<Vec<SubProject>> {
        self.children("project_id", project_id)
    }

    /// Tasks owned directly by the project (not through a sub-project).
    pub fn tasks_of_project(&self, project_id: EntityId) -> RepoResult<Vec<Task>> {
        self.children("project_id", project_id)
    }

    pub fn tasks_of_sub_project(&self, sub_project_id: EntityId) -> RepoResult<Vec<Task>> {
        self.children("sub_project_id", sub_project_id)
    }

    /// Notes of a task, newest first.
    pub fn notes_of_task(&self, task_id: EntityId) -> RepoResult<Vec<Note>> {
        let mut notes: Vec<Note> = self.children("task_id", task_id)?;
        notes.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(notes)
    }

    pub fn reminders_of_task(&self, task_id: EntityId) -> RepoResult<Vec<Reminder>> {
        self.children("task_id", task_id)
    }

    /// Overwrites a task's status; any status may follow any other.
    pub fn set_task_status(&self, task_id: EntityId, status: TaskStatus) -> RepoResult<Task> {
        let mut task: Task = self.get_model(task_id)?;
        task.status = status;
        self.repo.update(&Entity::Task(task.clone()))?;
        info!("event=task_status module=service status=ok id={task_id}");
        let description = format!("Changed status of task '{}' to {status}", task.name);
        let project_id = self.project_of(EntityKind::Task, task_id);
        self.record_activity(
            ActionType::Update,
            EntityKind::Task,
            task_id,
            &task.name,
            project_id,
            Some(description),
        );
        Ok(task)
    }

    /// Sets or clears the task assignee.
    pub fn assign_task(&self, task_id: EntityId, member_id: Option<EntityId>) -> RepoResult<Task> {
        let mut task: Task = self.get_model(task_id)?;
        task.assigned_to = member_id;
        self.update(&Entity::Task(task.clone()))?;
        Ok(task)
    }

    pub fn mark_reminder_followed_up(
        &self,
        reminder_id: EntityId,
        followed_up: bool,
    ) -> RepoResult<Reminder> {
        let mut reminder: Reminder = self.get_model(reminder_id)?;
        reminder.followed_up = followed_up;
        self.update(&Entity::Reminder(reminder.clone()))?;
        Ok(reminder)
    }

    /// Appends a note to a task, stamped with the current time.
    pub fn add_note(&self, task_id: EntityId, text: impl Into<String>) -> RepoResult<Note> {
        let mut note = Note::new(task_id, text);
        let id = self.create(&Entity::Note(note.clone()))?;
        note.id = Some(id);
        Ok(note)
    }

    fn children<M: EntityModel>(&self, column: &str, parent_id: EntityId) -> RepoResult<Vec<M>> {
        self.repo
            .list_children(M::KIND, column, parent_id)?
            .into_iter()
            .map(narrow)
            .collect()
    }

    fn project_of(&self, kind: EntityKind, id: EntityId) -> Option<EntityId> {
        match self.repo.resolve_project_id(kind, id) {
            Ok(project_id) => project_id,
            Err(err) => {
                warn!(
                    "event=activity_resolve module=service status=error kind={kind} id={id} category={:?} error={err}",
                    err.category()
                );
                None
            }
        }
    }

    fn record_activity(
        &self,
        action_type: ActionType,
        kind: EntityKind,
        id: EntityId,
        name: &str,
        project_id: Option<EntityId>,
        description: Option<String>,
    ) {
        let Some(entity_type) = kind.activity_type() else {
            return;
        };
        let mut entry = NewActivity::describe(action_type, entity_type, id, name, project_id);
        if let Some(description) = description {
            entry = entry.with_description(description);
        }
        if let Err(err) = self.logger.log(&entry) {
            warn!(
                "event=activity_log module=service status=error action={action_type} kind={kind} id={id} error={err}"
            );
        }
    }
}

fn narrow<M: EntityModel>(entity: Entity) -> RepoResult<M> {
    let kind = entity.kind();
    M::from_entity(entity).ok_or_else(|| {
        RepoError::InvalidData(format!("expected {} but loaded {kind}", M::KIND))
    })
}
