//! Operation scripts: a JSON array of controller calls.
//!
//! ```json
//! [
//!   {"op": "create", "type": "task", "payload": {"id": "T-1", "title": "Implement login"}},
//!   {"op": "update", "id": "T-1", "updates": {"status": "in_progress"}},
//!   {"op": "add_child", "parent": "T-1", "child": "T-2"}
//! ]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tasklab_core::model::{CreatePayload, UpdatePayload};
use tasklab_core::{TaskController, TaskService};

/// One controller call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Create {
        #[serde(rename = "type")]
        kind: String,
        payload: CreatePayload,
    },
    Get {
        id: String,
    },
    Update {
        id: String,
        updates: UpdatePayload,
    },
    AddChild {
        parent: String,
        child: String,
    },
    RemoveChild {
        parent: String,
        child: String,
    },
    Remove {
        id: String,
    },
}

impl Operation {
    pub fn create(kind: &str, payload: CreatePayload) -> Self {
        Self::Create {
            kind: kind.to_string(),
            payload,
        }
    }

    /// Run this operation. Failures land in the controller's error list.
    pub fn apply<S: TaskService>(self, controller: &mut TaskController<S>) {
        debug!(op = ?self, "apply operation");
        match self {
            Self::Create { kind, payload } => controller.create_task(&kind, payload),
            Self::Get { id } => {
                controller.get_task(&id);
            }
            Self::Update { id, updates } => controller.update_task(&id, &updates),
            Self::AddChild { parent, child } => controller.add_child_to_task(&parent, &child),
            Self::RemoveChild { parent, child } => {
                controller.remove_child_from_task(&parent, &child);
            }
            Self::Remove { id } => controller.remove_task(&id),
        }
    }
}

/// Parse a script document.
///
/// # Errors
///
/// Fails when `source` is not a JSON array of operations.
pub fn parse_script(source: &str) -> Result<Vec<Operation>> {
    serde_json::from_str(source).context("Failed to parse operation script")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tasklab_core::{FixedClock, TaskRepository};

    #[test]
    fn script_ops_parse_from_json() {
        let ops = parse_script(
            r#"[
                {"op": "create", "type": "epic", "payload": {"id": "E-1", "title": "Platform"}},
                {"op": "get", "id": "E-1"},
                {"op": "update", "id": "E-1", "updates": {"title": "Renamed", "status": "done"}},
                {"op": "add_child", "parent": "E-1", "child": "S-1"},
                {"op": "remove_child", "parent": "E-1", "child": "S-1"},
                {"op": "remove", "id": "E-1"}
            ]"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 6);
        assert!(matches!(&ops[0], Operation::Create { kind, .. } if kind == "epic"));
        let Operation::Update { updates, .. } = &ops[2] else {
            panic!("expected update");
        };
        let keys: Vec<&str> = updates.entries().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["title", "status"]);
    }

    #[test]
    fn unknown_op_is_a_parse_error() {
        assert!(parse_script(r#"[{"op": "explode"}]"#).is_err());
        assert!(parse_script(r#"{"op": "get", "id": "x"}"#).is_err());
    }

    #[test]
    fn apply_routes_to_controller() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 10, 28, 0, 0, 0).unwrap());
        let mut ctl = TaskController::new(TaskRepository::with_clock(clock));
        Operation::create("story", CreatePayload::new("S-1", "Checkout")).apply(&mut ctl);
        Operation::Get {
            id: "missing".into(),
        }
        .apply(&mut ctl);
        assert_eq!(ctl.get_all_tasks().len(), 1);
        assert_eq!(ctl.errors().len(), 1);
    }
}
