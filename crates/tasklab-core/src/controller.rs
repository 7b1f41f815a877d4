//! Error-capturing front for a [`TaskService`].
//!
//! The controller never propagates a service error. Each failure is stored
//! together with the input that caused it, and the run continues. Callers
//! inspect the list afterwards with [`TaskController::errors`] or
//! [`TaskController::print_errors`].

use serde::Serialize;
use std::io::{self, Write};
use tracing::warn;

use crate::error::{Lookup, TaskError};
use crate::model::{CreatePayload, UpdatePayload, WorkItem};
use crate::service::{TaskRepository, TaskService};

/// A captured error and, when the operation carried one, its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorWithContext {
    pub entry: Option<serde_json::Value>,
    pub error: TaskError,
}

#[derive(Debug, Default)]
pub struct TaskController<S: TaskService = TaskRepository> {
    service: S,
    errors: Vec<ErrorWithContext>,
}

impl<S: TaskService> TaskController<S> {
    pub const fn new(service: S) -> Self {
        Self {
            service,
            errors: Vec::new(),
        }
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    pub fn into_service(self) -> S {
        self.service
    }

    pub fn create_task(&mut self, kind: &str, payload: CreatePayload) {
        let entry = to_entry(&payload);
        if let Err(error) = self.service.create_task(kind, payload) {
            self.record(entry, error);
        }
    }

    /// Look up a task. A missing id is recorded as a not-found error.
    pub fn get_task(&mut self, id: &str) -> Option<&WorkItem> {
        if self.service.get_task(id).is_none() {
            self.record(
                None,
                TaskError::NotFound {
                    lookup: Lookup::Task,
                    id: id.to_string(),
                },
            );
            return None;
        }
        self.service.get_task(id)
    }

    pub fn get_all_tasks(&self) -> &[WorkItem] {
        self.service.get_all_tasks()
    }

    pub fn update_task(&mut self, id: &str, updates: &UpdatePayload) {
        if let Err(error) = self.service.update_task(id, updates) {
            self.record(to_entry(updates), error);
        }
    }

    pub fn add_child_to_task(&mut self, parent_id: &str, child_id: &str) {
        if let Err(error) = self.service.add_child_to_task(parent_id, child_id) {
            self.record(None, error);
        }
    }

    pub fn remove_child_from_task(&mut self, parent_id: &str, child_id: &str) {
        if let Err(error) = self.service.remove_child_from_task(parent_id, child_id) {
            self.record(None, error);
        }
    }

    pub fn remove_task(&mut self, id: &str) {
        if let Err(error) = self.service.remove_task(id) {
            self.record(None, error);
        }
    }

    /// Captured errors, oldest first.
    pub fn errors(&self) -> &[ErrorWithContext] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Write every captured error as a numbered list.
    ///
    /// ```text
    /// Error 1: task with id T-101 already exists
    ///   Entry: {"id":"T-101","title":"Duplicate ID"}
    ///
    /// Error 2: task with id NON_EXISTENT_ID not found
    /// ```
    ///
    /// # Errors
    ///
    /// Returns any I/O error from `out`.
    pub fn print_errors(&self, out: &mut dyn Write) -> io::Result<()> {
        for (index, captured) in self.errors.iter().enumerate() {
            writeln!(out, "Error {}: {}", index + 1, captured.error)?;
            if let Some(entry) = &captured.entry {
                writeln!(out, "  Entry: {entry}")?;
                writeln!(out)?;
            }
        }
        Ok(())
    }

    fn record(&mut self, entry: Option<serde_json::Value>, error: TaskError) {
        warn!(code = %error.error_code(), error = %error, "task operation failed");
        self.errors.push(ErrorWithContext { entry, error });
    }
}

fn to_entry(payload: &impl Serialize) -> Option<serde_json::Value> {
    serde_json::to_value(payload).ok()
}
