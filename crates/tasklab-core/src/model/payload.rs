//! Creation and update payloads.

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::model::value::FieldValue;
use crate::validate::Field;

/// Input for constructing a work item.
///
/// Every field except `id` may be omitted; `status`, `priority` and
/// `created_at` then take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePayload {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

impl CreatePayload {
    pub fn new(id: impl Into<String>, title: impl Into<FieldValue>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            description: None,
            status: None,
            priority: None,
            created_at: None,
            deadline: None,
            done_at: None,
            children: None,
        }
    }

    #[must_use]
    pub fn description(mut self, value: impl Into<FieldValue>) -> Self {
        self.description = Some(value.into());
        self
    }

    #[must_use]
    pub fn status(mut self, value: impl Into<FieldValue>) -> Self {
        self.status = Some(value.into());
        self
    }

    #[must_use]
    pub fn priority(mut self, value: impl Into<FieldValue>) -> Self {
        self.priority = Some(value.into());
        self
    }

    #[must_use]
    pub fn created_at(mut self, value: impl Into<FieldValue>) -> Self {
        self.created_at = Some(value.into());
        self
    }

    #[must_use]
    pub fn deadline(mut self, value: impl Into<FieldValue>) -> Self {
        self.deadline = Some(value.into());
        self
    }

    #[must_use]
    pub fn done_at(mut self, value: impl Into<FieldValue>) -> Self {
        self.done_at = Some(value.into());
        self
    }

    #[must_use]
    pub fn children<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// The supplied value for `field`, if any.
    #[must_use]
    pub const fn value(&self, field: Field) -> Option<&FieldValue> {
        match field {
            Field::Title => self.title.as_ref(),
            Field::Description => self.description.as_ref(),
            Field::Status => self.status.as_ref(),
            Field::Priority => self.priority.as_ref(),
            Field::CreatedAt => self.created_at.as_ref(),
            Field::Deadline => self.deadline.as_ref(),
            Field::DoneAt => self.done_at.as_ref(),
        }
    }
}

/// A partial, ordered set of field changes.
///
/// Entries are applied in insertion order. A `None` value clears the field.
/// Keys are kept as text so that a key naming a fixed or unknown field is
/// reported when the update reaches it, not when the payload is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePayload {
    entries: Vec<(String, Option<FieldValue>)>,
}

impl UpdatePayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.entries.push((key.into(), Some(value.into())));
        self
    }

    #[must_use]
    pub fn clear(mut self, key: impl Into<String>) -> Self {
        self.entries.push((key.into(), None));
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for UpdatePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for UpdatePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let value = if value.is_null() {
                    None
                } else {
                    Some(FieldValue::from(value))
                };
                (key, value)
            })
            .collect();
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_payload_parses_loose_json() {
        let payload: CreatePayload = serde_json::from_str(
            r#"{"id": "T-014", "title": 12345, "created_at": "2025-10-27", "children": ["T-1"]}"#,
        )
        .unwrap();
        assert_eq!(payload.id, "T-014");
        assert_eq!(payload.title, Some(FieldValue::Number(12345.0)));
        assert_eq!(payload.value(Field::CreatedAt), Some(&FieldValue::Text("2025-10-27".into())));
        assert_eq!(payload.status, None);
        assert_eq!(payload.children, Some(vec!["T-1".to_string()]));
    }

    #[test]
    fn create_payload_requires_id() {
        assert!(serde_json::from_str::<CreatePayload>(r#"{"title": "x"}"#).is_err());
    }

    #[test]
    fn create_payload_serializes_only_supplied_fields() {
        let payload = CreatePayload::new("T-1", "Implement login").priority("high");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"id":"T-1","title":"Implement login","priority":"high"}"#);
    }

    #[test]
    fn update_payload_keeps_json_key_order() {
        let payload: UpdatePayload =
            serde_json::from_str(r#"{"title": "Renamed", "status": "done", "done_at": null}"#)
                .unwrap();
        let keys: Vec<&str> = payload.entries().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["title", "status", "done_at"]);
        let cleared: Vec<bool> = payload.entries().map(|(_, v)| v.is_none()).collect();
        assert_eq!(cleared, vec![false, false, true]);
    }

    #[test]
    fn update_payload_serializes_cleared_fields_as_null() {
        let payload = UpdatePayload::new().set("priority", "low").clear("deadline");
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"priority":"low","deadline":null}"#
        );
        assert_eq!(payload.len(), 2);
    }
}
