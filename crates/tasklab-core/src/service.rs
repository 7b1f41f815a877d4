//! In-memory task repository.

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{Lookup, TaskError};
use crate::model::{CreatePayload, UpdatePayload, WorkItem, WorkItemKind};

/// CRUD and parent/child linking over a set of work items.
///
/// Every fallible operation reports a typed [`TaskError`] rather than
/// silently doing nothing.
pub trait TaskService {
    /// Create a work item of the kind named by `kind`.
    ///
    /// # Errors
    ///
    /// [`TaskError::DuplicateId`], [`TaskError::UnknownType`], or any
    /// construction error of [`WorkItem`].
    fn create_task(&mut self, kind: &str, payload: CreatePayload) -> Result<&WorkItem, TaskError>;

    fn get_task(&self, id: &str) -> Option<&WorkItem>;

    /// Every item, in insertion order.
    fn get_all_tasks(&self) -> &[WorkItem];

    /// # Errors
    ///
    /// [`TaskError::NotFound`] or the first error of the bulk update.
    fn update_task(&mut self, id: &str, updates: &UpdatePayload) -> Result<(), TaskError>;

    /// # Errors
    ///
    /// [`TaskError::NotFound`] for a missing parent or child, or
    /// [`TaskError::Capability`] when the parent cannot hold children.
    fn add_child_to_task(&mut self, parent_id: &str, child_id: &str) -> Result<(), TaskError>;

    /// # Errors
    ///
    /// [`TaskError::NotFound`], [`TaskError::Capability`], or
    /// [`TaskError::ChildNotLinked`] when `child_id` is not in the parent.
    fn remove_child_from_task(&mut self, parent_id: &str, child_id: &str)
    -> Result<(), TaskError>;

    /// # Errors
    ///
    /// [`TaskError::NotFound`] when no item has `id`.
    fn remove_task(&mut self, id: &str) -> Result<(), TaskError>;
}

/// Vec-backed [`TaskService`]. Lookups are linear; order is insertion order.
#[derive(Debug, Default)]
pub struct TaskRepository<C: Clock = SystemClock> {
    tasks: Vec<WorkItem>,
    clock: C,
}

impl TaskRepository<SystemClock> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> TaskRepository<C> {
    /// A repository whose validation reads "now" from `clock`.
    pub const fn with_clock(clock: C) -> Self {
        Self {
            tasks: Vec::new(),
            clock,
        }
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id() == id)
    }
}

impl<C: Clock> TaskService for TaskRepository<C> {
    fn create_task(&mut self, kind: &str, payload: CreatePayload) -> Result<&WorkItem, TaskError> {
        debug!(kind, id = %payload.id, "create task");
        if self.position(&payload.id).is_some() {
            return Err(TaskError::DuplicateId { id: payload.id });
        }
        let kind = kind
            .parse::<WorkItemKind>()
            .map_err(|err| TaskError::UnknownType { kind: err.got })?;

        let item = WorkItem::with_clock(kind, payload, &self.clock)?;
        info!(id = item.id(), %kind, "task created");
        let index = self.tasks.len();
        self.tasks.push(item);
        Ok(&self.tasks[index])
    }

    fn get_task(&self, id: &str) -> Option<&WorkItem> {
        debug!(id, "get task");
        self.tasks.iter().find(|task| task.id() == id)
    }

    fn get_all_tasks(&self) -> &[WorkItem] {
        &self.tasks
    }

    fn update_task(&mut self, id: &str, updates: &UpdatePayload) -> Result<(), TaskError> {
        debug!(id, fields = updates.len(), "update task");
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id() == id)
            .ok_or_else(|| TaskError::NotFound {
                lookup: Lookup::Task,
                id: id.to_string(),
            })?;
        task.update_details_with_clock(updates, &self.clock)
    }

    fn add_child_to_task(&mut self, parent_id: &str, child_id: &str) -> Result<(), TaskError> {
        debug!(parent_id, child_id, "add child");
        let parent = self.position(parent_id).ok_or_else(|| TaskError::NotFound {
            lookup: Lookup::Parent,
            id: parent_id.to_string(),
        })?;
        let parent_kind = self.tasks[parent].kind();
        if !parent_kind.has_children() {
            return Err(TaskError::Capability {
                id: parent_id.to_string(),
                kind: parent_kind,
            });
        }
        if self.position(child_id).is_none() {
            return Err(TaskError::NotFound {
                lookup: Lookup::Child,
                id: child_id.to_string(),
            });
        }
        self.tasks[parent].add_child(child_id)
    }

    fn remove_child_from_task(
        &mut self,
        parent_id: &str,
        child_id: &str,
    ) -> Result<(), TaskError> {
        debug!(parent_id, child_id, "remove child");
        let parent = self
            .tasks
            .iter_mut()
            .find(|task| task.id() == parent_id)
            .ok_or_else(|| TaskError::NotFound {
                lookup: Lookup::Parent,
                id: parent_id.to_string(),
            })?;
        if !parent.kind().has_children() {
            return Err(TaskError::Capability {
                id: parent_id.to_string(),
                kind: parent.kind(),
            });
        }
        if !parent.has_child(child_id) {
            return Err(TaskError::ChildNotLinked {
                parent_id: parent_id.to_string(),
                child_id: child_id.to_string(),
            });
        }
        parent.remove_child(child_id)
    }

    fn remove_task(&mut self, id: &str) -> Result<(), TaskError> {
        let index = self.position(id).ok_or_else(|| TaskError::NotFound {
            lookup: Lookup::Task,
            id: id.to_string(),
        })?;
        self.tasks.remove(index);
        info!(id, "task removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::Status;
    use chrono::{TimeZone, Utc};

    fn repo() -> TaskRepository<FixedClock> {
        TaskRepository::with_clock(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 10, 28, 12, 0, 0).unwrap(),
        ))
    }

    fn payload(id: &str) -> CreatePayload {
        CreatePayload::new(id, "Valid Title").created_at("2025-10-27")
    }

    #[test]
    fn duplicate_id_is_rejected_before_kind_is_checked() {
        let mut repo = repo();
        repo.create_task("task", payload("T-1")).unwrap();
        let err = repo.create_task("UNKNOWN_TYPE", payload("T-1")).unwrap_err();
        assert_eq!(err, TaskError::DuplicateId { id: "T-1".into() });
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn unknown_kind_is_reported_verbatim() {
        let mut repo = repo();
        let err = repo.create_task("UNKNOWN_TYPE", payload("T-999")).unwrap_err();
        assert_eq!(err.to_string(), "unknown work item type: UNKNOWN_TYPE");
        assert!(repo.is_empty());
    }

    #[test]
    fn kinds_are_matched_case_insensitively() {
        let mut repo = repo();
        let item = repo.create_task("Epic", payload("E-1")).unwrap();
        assert_eq!(item.kind(), WorkItemKind::Epic);
    }

    #[test]
    fn invalid_payload_is_not_stored() {
        let mut repo = repo();
        assert!(repo.create_task("task", CreatePayload::new("T-1", "ab")).is_err());
        assert!(repo.get_task("T-1").is_none());
    }

    #[test]
    fn get_all_keeps_insertion_order() {
        let mut repo = repo();
        for id in ["T-3", "T-1", "T-2"] {
            repo.create_task("task", payload(id)).unwrap();
        }
        let ids: Vec<&str> = repo.get_all_tasks().iter().map(WorkItem::id).collect();
        assert_eq!(ids, vec!["T-3", "T-1", "T-2"]);
    }

    #[test]
    fn update_reaches_stored_item() {
        let mut repo = repo();
        repo.create_task("task", payload("T-1")).unwrap();
        repo.update_task("T-1", &UpdatePayload::new().set("status", "in_progress"))
            .unwrap();
        assert_eq!(repo.get_task("T-1").unwrap().status(), Status::InProgress);

        let err = repo
            .update_task("NON_EXISTENT_ID", &UpdatePayload::new().set("title", "Should Fail"))
            .unwrap_err();
        assert_eq!(err.to_string(), "task with id NON_EXISTENT_ID not found");
    }

    #[test]
    fn add_child_checks_parent_then_capability_then_child() {
        let mut repo = repo();
        repo.create_task("task", payload("T-1")).unwrap();
        repo.create_task("subtask", payload("ST-1")).unwrap();

        let err = repo.add_child_to_task("NOPE", "ALSO_NOPE").unwrap_err();
        assert!(matches!(err, TaskError::NotFound { lookup: Lookup::Parent, .. }));

        let err = repo.add_child_to_task("ST-1", "ALSO_NOPE").unwrap_err();
        assert!(matches!(err, TaskError::Capability { .. }));

        let err = repo.add_child_to_task("T-1", "ALSO_NOPE").unwrap_err();
        assert!(matches!(err, TaskError::NotFound { lookup: Lookup::Child, .. }));

        repo.add_child_to_task("T-1", "ST-1").unwrap();
        assert!(repo.get_task("T-1").unwrap().has_child("ST-1"));
    }

    #[test]
    fn remove_child_requires_link() {
        let mut repo = repo();
        repo.create_task("story", payload("S-1")).unwrap();
        repo.create_task("task", payload("T-1")).unwrap();

        let err = repo.remove_child_from_task("S-1", "T-1").unwrap_err();
        assert!(matches!(err, TaskError::ChildNotLinked { .. }));

        repo.add_child_to_task("S-1", "T-1").unwrap();
        repo.remove_child_from_task("S-1", "T-1").unwrap();
        assert!(!repo.get_task("S-1").unwrap().has_child("T-1"));
    }

    #[test]
    fn removing_a_child_task_leaves_dangling_reference() {
        let mut repo = repo();
        repo.create_task("epic", payload("E-1")).unwrap();
        repo.create_task("story", payload("S-1")).unwrap();
        repo.add_child_to_task("E-1", "S-1").unwrap();

        repo.remove_task("S-1").unwrap();
        assert!(repo.get_task("S-1").is_none());
        assert!(repo.get_task("E-1").unwrap().has_child("S-1"));

        let err = repo.remove_task("S-1").unwrap_err();
        assert!(matches!(err, TaskError::NotFound { lookup: Lookup::Task, .. }));
    }
}
