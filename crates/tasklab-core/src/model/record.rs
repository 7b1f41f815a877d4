//! Flat, serializable view of a work item.

use serde::{Deserialize, Serialize};

use crate::model::item::{Priority, Status, WorkItemKind};
use crate::model::payload::CreatePayload;

/// A work item as plain data. Date-time fields use
/// [`TIMESTAMP_FORMAT`](crate::model::value::TIMESTAMP_FORMAT).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WorkItemKind,
    pub title: String,
    pub created_at: String,
    pub status: Status,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

impl WorkItemRecord {
    /// Turn the record back into the kind and payload that rebuild it.
    #[must_use]
    pub fn into_payload(self) -> (WorkItemKind, CreatePayload) {
        let mut payload = CreatePayload::new(self.id, self.title)
            .created_at(self.created_at)
            .status(self.status)
            .priority(self.priority);
        payload.description = self.description.map(Into::into);
        payload.deadline = self.deadline.map(Into::into);
        payload.done_at = self.done_at.map(Into::into);
        payload.children = self.children;
        (self.kind, payload)
    }
}
