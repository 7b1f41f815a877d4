//! The work item entity.
//!
//! Every kind shares one record shape. Child-capable kinds carry
//! `children: Some(..)`; the others always hold `None`.
//!
//! Construction stages every supplied or defaulted value in a [`Draft`], runs
//! the full validation pass against it, and only then moves the values into
//! typed storage. Later writes go through [`validate_write`] first, so a
//! rejected write leaves the stored value untouched.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::num::FpCategory;
use std::str::FromStr;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::error::{FieldViolation, TaskError};
use crate::model::item::{ParseEnumError, Priority, Status, WorkItemKind};
use crate::model::payload::{CreatePayload, UpdatePayload};
use crate::model::record::WorkItemRecord;
use crate::model::value::{FieldValue, format_timestamp};
use crate::validate::{
    Field, FieldSource, Schema, coerce_field, schema_for, validate_all, validate_write,
};

/// A validated work item of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    id: String,
    kind: WorkItemKind,
    title: String,
    description: Option<String>,
    status: Status,
    priority: Priority,
    created_at: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
    done_at: Option<DateTime<Utc>>,
    children: Option<Vec<String>>,
}

/// Values staged during construction, before they are known to be valid.
#[derive(Debug, Default)]
struct Draft(BTreeMap<Field, FieldValue>);

impl Draft {
    fn take(&mut self, field: Field) -> Option<FieldValue> {
        self.0.remove(&field)
    }
}

impl FieldSource for Draft {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        self.0.get(&field).cloned()
    }
}

impl WorkItem {
    /// Build a work item against the system clock.
    ///
    /// # Errors
    ///
    /// See [`WorkItem::with_clock`].
    pub fn new(kind: WorkItemKind, payload: CreatePayload) -> Result<Self, TaskError> {
        Self::with_clock(kind, payload, &SystemClock)
    }

    /// Build a work item, reading "now" from `clock`.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Capability`] when the payload carries children and the
    ///   kind cannot hold them.
    /// - [`TaskError::FieldValidation`] when a date-time field receives a
    ///   value that cannot be coerced.
    /// - [`TaskError::AggregateValidation`] listing every field that fails
    ///   its rule chain.
    pub fn with_clock(
        kind: WorkItemKind,
        payload: CreatePayload,
        clock: &impl Clock,
    ) -> Result<Self, TaskError> {
        if payload.children.is_some() && !kind.has_children() {
            return Err(TaskError::Capability {
                id: payload.id,
                kind,
            });
        }

        let schema = schema_for(kind);
        let now = clock.now();

        let mut draft = Draft::default();
        for spec in schema.fields {
            let supplied = payload
                .value(spec.field)
                .filter(|value| !blank_optional(spec.field, value))
                .cloned();
            let value = supplied.or_else(|| default_for(spec.field, now));
            if let Some(value) = coerce_field(spec, value)? {
                draft.0.insert(spec.field, value);
            }
        }

        let violations = validate_all(schema, &draft, now);
        if !violations.is_empty() {
            return Err(TaskError::AggregateValidation(violations));
        }

        Ok(Self {
            kind,
            title: required(Field::Title, text(Field::Title, draft.take(Field::Title))?)?,
            description: text(Field::Description, draft.take(Field::Description))?,
            status: parsed(Field::Status, draft.take(Field::Status))?.unwrap_or_default(),
            priority: parsed(Field::Priority, draft.take(Field::Priority))?.unwrap_or_default(),
            created_at: required(
                Field::CreatedAt,
                instant(Field::CreatedAt, draft.take(Field::CreatedAt))?,
            )?,
            deadline: instant(Field::Deadline, draft.take(Field::Deadline))?,
            done_at: instant(Field::DoneAt, draft.take(Field::DoneAt))?,
            children: kind
                .has_children()
                .then(|| payload.children.unwrap_or_default()),
            id: payload.id,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> WorkItemKind {
        self.kind
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    #[must_use]
    pub const fn done_at(&self) -> Option<DateTime<Utc>> {
        self.done_at
    }

    /// Child ids in insertion order; `None` for kinds without children.
    #[must_use]
    pub fn children(&self) -> Option<&[String]> {
        self.children.as_deref()
    }

    #[must_use]
    pub fn schema(&self) -> &'static Schema {
        schema_for(self.kind)
    }

    /// Write one field, validating against the system clock.
    ///
    /// # Errors
    ///
    /// See [`WorkItem::set_with_clock`].
    pub fn set(&mut self, field: Field, value: Option<FieldValue>) -> Result<(), TaskError> {
        self.set_with_clock(field, value, &SystemClock)
    }

    /// Write one field. `None` clears an optional field and resets `status`
    /// or `priority` to its default.
    ///
    /// Moving `status` away from done drops `done_at`; clearing `done_at`
    /// on a done item moves it back to in progress.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::FieldValidation`] for the first rule the write
    /// breaks, either on `field` itself or on a field whose ordering rule
    /// reads it. The item is left unchanged.
    pub fn set_with_clock(
        &mut self,
        field: Field,
        value: Option<FieldValue>,
        clock: &impl Clock,
    ) -> Result<(), TaskError> {
        let stored = validate_write(self.schema(), field, value, self, clock.now())?;
        self.store(field, stored)?;
        Ok(())
    }

    /// Shorthand for [`WorkItem::set`] with a present value.
    ///
    /// # Errors
    ///
    /// See [`WorkItem::set_with_clock`].
    pub fn set_value(
        &mut self,
        field: Field,
        value: impl Into<FieldValue>,
    ) -> Result<(), TaskError> {
        self.set(field, Some(value.into()))
    }

    /// Shorthand for [`WorkItem::set`] with `None`.
    ///
    /// # Errors
    ///
    /// See [`WorkItem::set_with_clock`].
    pub fn clear(&mut self, field: Field) -> Result<(), TaskError> {
        self.set(field, None)
    }

    /// Apply a bulk update against the system clock.
    ///
    /// # Errors
    ///
    /// See [`WorkItem::update_details_with_clock`].
    pub fn update_details(&mut self, updates: &UpdatePayload) -> Result<(), TaskError> {
        self.update_details_with_clock(updates, &SystemClock)
    }

    /// Apply each entry of `updates` in order through the single-field
    /// setter. Entries applied before a failing one stay applied.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotUpdatable`] for `id`, `created_at` or an unknown key.
    /// - [`TaskError::FieldValidation`] for the first invalid write.
    pub fn update_details_with_clock(
        &mut self,
        updates: &UpdatePayload,
        clock: &impl Clock,
    ) -> Result<(), TaskError> {
        for (key, value) in updates.entries() {
            let field = match key.parse::<Field>() {
                Ok(Field::CreatedAt) | Err(_) => {
                    return Err(TaskError::NotUpdatable {
                        field: key.to_string(),
                    });
                }
                Ok(field) => field,
            };
            self.set_with_clock(field, value.cloned(), clock)?;
        }
        Ok(())
    }

    /// Append a child id. Duplicates are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Capability`] when this kind has no children.
    pub fn add_child(&mut self, child_id: impl Into<String>) -> Result<(), TaskError> {
        let children = self.children_mut()?;
        children.push(child_id.into());
        Ok(())
    }

    /// Remove every occurrence of `child_id`. Absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Capability`] when this kind has no children.
    pub fn remove_child(&mut self, child_id: &str) -> Result<(), TaskError> {
        let children = self.children_mut()?;
        children.retain(|existing| existing != child_id);
        Ok(())
    }

    /// Whether `child_id` is linked to this item.
    #[must_use]
    pub fn has_child(&self, child_id: &str) -> bool {
        self.children
            .as_ref()
            .is_some_and(|children| children.iter().any(|existing| existing == child_id))
    }

    /// True when the item was finished strictly before its deadline.
    ///
    /// Logs a warning and returns false if either date is missing.
    #[must_use]
    pub fn is_done_in_time(&self) -> bool {
        let Some(done_at) = self.done_at else {
            warn!(id = %self.id, "work item has not been done yet");
            return false;
        };
        let Some(deadline) = self.deadline else {
            warn!(id = %self.id, "work item has no deadline");
            return false;
        };
        done_at < deadline
    }

    /// Flat serialization view.
    #[must_use]
    pub fn to_record(&self) -> WorkItemRecord {
        WorkItemRecord {
            id: self.id.clone(),
            kind: self.kind,
            title: self.title.clone(),
            created_at: format_timestamp(self.created_at),
            status: self.status,
            priority: self.priority,
            description: self.description.clone(),
            deadline: self.deadline.map(format_timestamp),
            done_at: self.done_at.map(format_timestamp),
            children: self.children.clone(),
        }
    }

    /// Label/value pairs for a human-readable dump.
    ///
    /// Absent optional fields and empty child lists are omitted. Dates use
    /// the strftime pattern `date_format`, falling back to the full
    /// timestamp if the pattern is malformed.
    #[must_use]
    pub fn info_lines(&self, date_format: &str, show_done_at: bool) -> Vec<(&'static str, String)> {
        let mut lines = vec![("id", self.id.clone()), ("title", self.title.clone())];
        if let Some(description) = &self.description {
            lines.push(("description", description.clone()));
        }
        lines.push(("status", self.status.label().to_string()));
        lines.push(("priority", self.priority.label().to_string()));
        lines.push(("created at", format_date(self.created_at, date_format)));
        if let Some(deadline) = self.deadline {
            lines.push(("deadline", format_date(deadline, date_format)));
        }
        if let Some(done_at) = self.done_at.filter(|_| show_done_at) {
            lines.push(("done at", format_date(done_at, date_format)));
        }
        if let Some(children) = self.children.as_ref().filter(|c| !c.is_empty()) {
            lines.push(("children", children.join(", ")));
        }
        lines
    }

    fn children_mut(&mut self) -> Result<&mut Vec<String>, TaskError> {
        match self.children.as_mut() {
            Some(children) => Ok(children),
            None => Err(TaskError::Capability {
                id: self.id.clone(),
                kind: self.kind,
            }),
        }
    }

    fn store(&mut self, field: Field, value: Option<FieldValue>) -> Result<(), FieldViolation> {
        match field {
            Field::Title => self.title = required(field, text(field, value)?)?,
            Field::Description => self.description = text(field, value)?,
            Field::Status => {
                let next = parsed(field, value)?.unwrap_or_default();
                if self.done_at.is_some() && self.status == Status::Done && next != Status::Done {
                    self.done_at = None;
                }
                self.status = next;
            }
            Field::Priority => self.priority = parsed(field, value)?.unwrap_or_default(),
            Field::CreatedAt => self.created_at = required(field, instant(field, value)?)?,
            Field::Deadline => self.deadline = instant(field, value)?,
            Field::DoneAt => {
                self.done_at = instant(field, value)?;
                if self.done_at.is_none() && self.status == Status::Done {
                    self.status = Status::InProgress;
                }
            }
        }
        Ok(())
    }
}

impl FieldSource for WorkItem {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Title => Some(self.title.as_str().into()),
            Field::Description => self.description.as_deref().map(FieldValue::from),
            Field::Status => Some(self.status.into()),
            Field::Priority => Some(self.priority.into()),
            Field::CreatedAt => Some(self.created_at.into()),
            Field::Deadline => self.deadline.map(FieldValue::from),
            Field::DoneAt => self.done_at.map(FieldValue::from),
        }
    }
}

fn default_for(field: Field, now: DateTime<Utc>) -> Option<FieldValue> {
    match field {
        Field::CreatedAt => Some(now.into()),
        Field::Status => Some(Status::default().into()),
        Field::Priority => Some(Priority::default().into()),
        _ => None,
    }
}

/// Empty strings, zero, `false` and NaN given for a defaulted or optional
/// scalar count as not supplied at construction.
fn blank_optional(field: Field, value: &FieldValue) -> bool {
    let blankable = matches!(
        field,
        Field::Status | Field::Priority | Field::CreatedAt | Field::Deadline | Field::DoneAt
    );
    blankable
        && match value {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Number(number) => {
                matches!(number.classify(), FpCategory::Zero | FpCategory::Nan)
            }
            FieldValue::Bool(flag) => !flag,
            _ => false,
        }
}

fn format_date(at: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", at.format(pattern)).is_err() {
        return format_timestamp(at);
    }
    out
}

fn required<T>(field: Field, value: Option<T>) -> Result<T, FieldViolation> {
    value.ok_or_else(|| FieldViolation::new(field, format!("Field {field} is required")))
}

fn text(field: Field, value: Option<FieldValue>) -> Result<Option<String>, FieldViolation> {
    match value {
        None => Ok(None),
        Some(FieldValue::Text(text)) => Ok(Some(text)),
        Some(_) => Err(FieldViolation::new(
            field,
            format!("Field {field} must be a string"),
        )),
    }
}

fn parsed<T>(field: Field, value: Option<FieldValue>) -> Result<Option<T>, FieldViolation>
where
    T: FromStr<Err = ParseEnumError>,
{
    text(field, value)?
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| FieldViolation::new(field, err.to_string()))
        })
        .transpose()
}

fn instant(
    field: Field,
    value: Option<FieldValue>,
) -> Result<Option<DateTime<Utc>>, FieldViolation> {
    match value {
        None => Ok(None),
        Some(FieldValue::DateTime(at)) => Ok(Some(at)),
        Some(_) => Err(FieldViolation::new(
            field,
            format!("Field {field} is an invalid date"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorCode;
    use chrono::{Duration, TimeZone};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 10, 28, 12, 0, 0).unwrap())
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 27, 0, 0, 0).unwrap()
    }

    fn build(kind: WorkItemKind, payload: CreatePayload) -> Result<WorkItem, TaskError> {
        WorkItem::with_clock(kind, payload, &clock())
    }

    fn task(id: &str) -> WorkItem {
        build(
            WorkItemKind::Task,
            CreatePayload::new(id, "Implement login feature").created_at("2025-10-27"),
        )
        .unwrap()
    }

    fn set(item: &mut WorkItem, field: Field, value: Option<FieldValue>) -> Result<(), TaskError> {
        item.set_with_clock(field, value, &clock())
    }

    #[test]
    fn defaults_are_applied() {
        let item = build(WorkItemKind::Bug, CreatePayload::new("B-1", "Crash on start")).unwrap();
        assert_eq!(item.status(), Status::Todo);
        assert_eq!(item.priority(), Priority::Medium);
        assert_eq!(item.created_at(), clock().now());
        assert_eq!(item.children(), None);
        assert_eq!(item.description(), None);
    }

    #[test]
    fn blank_scalars_fall_back_to_defaults() {
        let item = build(
            WorkItemKind::Task,
            CreatePayload::new("T-1", "Implement login")
                .status("")
                .priority("")
                .created_at("")
                .deadline(0_i64)
                .done_at(false),
        )
        .unwrap();
        assert_eq!(item.status(), Status::Todo);
        assert_eq!(item.priority(), Priority::Medium);
        assert_eq!(item.created_at(), clock().now());
        assert_eq!(item.deadline(), None);
        assert_eq!(item.done_at(), None);
    }

    #[test]
    fn blank_title_and_description_are_still_checked() {
        let err = build(
            WorkItemKind::Task,
            CreatePayload::new("T-1", "").description(""),
        )
        .unwrap_err();
        assert_eq!(
            err.violated_fields(),
            vec![Field::Title, Field::Description]
        );
    }

    #[test]
    fn child_capable_kinds_start_with_empty_children() {
        for kind in [WorkItemKind::Epic, WorkItemKind::Story, WorkItemKind::Task] {
            let item = build(kind, CreatePayload::new("X-1", "Some title")).unwrap();
            assert_eq!(item.children(), Some(&[][..]));
        }
    }

    #[test]
    fn construction_aggregates_every_violation() {
        let err = build(
            WorkItemKind::Task,
            CreatePayload::new("T-1", "ab")
                .status("NOT_A_STATUS")
                .description("short"),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::AggregateValidation);
        assert_eq!(
            err.violated_fields(),
            vec![Field::Title, Field::Status, Field::Description]
        );
    }

    #[test]
    fn uncoercible_date_fails_immediately() {
        let err = build(
            WorkItemKind::Task,
            CreatePayload::new("T-015", "ab").deadline(true),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TaskError::FieldValidation(FieldViolation::new(
                Field::Deadline,
                "Field deadline must be a date-time or a string/number"
            ))
        );
    }

    #[test]
    fn children_on_leaf_kind_is_a_capability_error() {
        let err = build(
            WorkItemKind::Subtask,
            CreatePayload::new("ST-1", "Leaf item").children(["T-1"]),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Capability { kind: WorkItemKind::Subtask, .. }));
    }

    #[test]
    fn construction_does_not_couple_status_and_done_at() {
        let item = build(
            WorkItemKind::Task,
            CreatePayload::new("T-103", "Fix bug in payment module")
                .created_at("2025-10-27")
                .status("done"),
        )
        .unwrap();
        assert_eq!(item.status(), Status::Done);
        assert_eq!(item.done_at(), None);
    }

    #[test]
    fn rejected_write_keeps_old_value() {
        let mut item = task("T-1");
        let err = set(&mut item, Field::Title, Some("ab".into())).unwrap_err();
        assert_eq!(err.violated_fields(), vec![Field::Title]);
        assert_eq!(item.title(), "Implement login feature");
    }

    #[test]
    fn leaving_done_clears_done_at() {
        let mut item = task("T-1");
        set(&mut item, Field::Status, Some("done".into())).unwrap();
        set(&mut item, Field::DoneAt, Some("2025-10-28".into())).unwrap();
        assert!(item.done_at().is_some());

        set(&mut item, Field::Status, Some("in_progress".into())).unwrap();
        assert_eq!(item.done_at(), None);
        assert_eq!(item.to_record().done_at, None);
    }

    #[test]
    fn clearing_done_at_reverts_done_status() {
        let mut item = task("T-1");
        set(&mut item, Field::Status, Some("done".into())).unwrap();
        set(&mut item, Field::DoneAt, Some("2025-10-28".into())).unwrap();
        set(&mut item, Field::DoneAt, None).unwrap();
        assert_eq!(item.status(), Status::InProgress);
    }

    #[test]
    fn clearing_priority_resets_default() {
        let mut item = task("T-1");
        set(&mut item, Field::Priority, Some("high".into())).unwrap();
        set(&mut item, Field::Priority, None).unwrap();
        assert_eq!(item.priority(), Priority::Medium);
    }

    #[test]
    fn created_at_write_respects_deadline() {
        let mut item = task("T-1");
        set(&mut item, Field::Deadline, Some(created().into())).unwrap();
        let later = created() + Duration::hours(2);
        let err = set(&mut item, Field::CreatedAt, Some(later.into())).unwrap_err();
        assert_eq!(err.violated_fields(), vec![Field::Deadline]);
        assert_eq!(item.created_at(), created());
    }

    #[test]
    fn update_details_is_sequential_without_rollback() {
        let mut item = task("T-1");
        let updates = UpdatePayload::new()
            .set("title", "Renamed task")
            .set("description", "short");
        let err = item.update_details_with_clock(&updates, &clock()).unwrap_err();
        assert_eq!(err.violated_fields(), vec![Field::Description]);
        assert_eq!(item.title(), "Renamed task");
        assert_eq!(item.description(), None);
    }

    #[test]
    fn update_details_rejects_fixed_and_unknown_keys() {
        let mut item = task("T-1");
        for key in ["id", "created_at", "owner"] {
            let err = item
                .update_details_with_clock(&UpdatePayload::new().set(key, "x"), &clock())
                .unwrap_err();
            assert_eq!(err, TaskError::NotUpdatable { field: key.into() });
        }
    }

    #[test]
    fn children_are_appended_and_removed_by_value() {
        let mut item = task("T-1");
        item.add_child("T-2").unwrap();
        item.add_child("T-3").unwrap();
        item.add_child("T-2").unwrap();
        assert_eq!(item.children().unwrap(), ["T-2", "T-3", "T-2"]);
        item.remove_child("T-2").unwrap();
        assert_eq!(item.children().unwrap(), ["T-3"]);
        item.remove_child("missing").unwrap();
        assert!(item.has_child("T-3"));
    }

    #[test]
    fn leaf_kinds_refuse_children() {
        let mut bug = build(WorkItemKind::Bug, CreatePayload::new("B-1", "Crash on start")).unwrap();
        assert!(matches!(bug.add_child("T-1"), Err(TaskError::Capability { .. })));
        assert!(matches!(bug.remove_child("T-1"), Err(TaskError::Capability { .. })));
    }

    #[test]
    fn done_in_time_requires_both_dates() {
        let mut item = task("T-1");
        assert!(!item.is_done_in_time());
        set(&mut item, Field::Deadline, Some("2025-10-30".into())).unwrap();
        assert!(!item.is_done_in_time());
        set(&mut item, Field::DoneAt, Some("2025-10-28".into())).unwrap();
        assert!(item.is_done_in_time());
    }

    #[test]
    fn info_lines_skip_absent_fields() {
        let mut item = task("T-1");
        item.add_child("T-2").unwrap();
        let lines = item.info_lines("%Y-%m-%d", false);
        let labels: Vec<&str> = lines.iter().map(|(label, _)| *label).collect();
        assert_eq!(
            labels,
            vec!["id", "title", "status", "priority", "created at", "children"]
        );
        assert_eq!(lines[4].1, "2025-10-27");
        assert_eq!(lines[2].1, "Todo");
    }

    #[test]
    fn malformed_date_pattern_falls_back_to_timestamp() {
        assert_eq!(format_date(created(), "%Q"), "2025-10-27T00:00:00.000Z");
    }
}
