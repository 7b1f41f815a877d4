use std::fmt;

use crate::model::item::WorkItemKind;
use crate::validate::Field;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    FieldValidation,
    AggregateValidation,
    NotUpdatable,
    DuplicateId,
    UnknownType,
    ItemNotFound,
    CapabilityMissing,
    ChildNotLinked,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::FieldValidation => "E2001",
            Self::AggregateValidation => "E2002",
            Self::NotUpdatable => "E2003",
            Self::DuplicateId => "E3001",
            Self::UnknownType => "E3002",
            Self::ItemNotFound => "E3003",
            Self::CapabilityMissing => "E4001",
            Self::ChildNotLinked => "E4002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::FieldValidation => "Field validation failed",
            Self::AggregateValidation => "Work item validation failed",
            Self::NotUpdatable => "Field cannot be updated",
            Self::DuplicateId => "Duplicate work item ID",
            Self::UnknownType => "Unknown work item type",
            Self::ItemNotFound => "Item not found",
            Self::CapabilityMissing => "Work item cannot have children",
            Self::ChildNotLinked => "Child is not linked to parent",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .tasklab/config.toml and retry."),
            Self::FieldValidation | Self::AggregateValidation => {
                Some("Correct the listed fields and retry.")
            }
            Self::NotUpdatable => Some("id and created_at are fixed once an item exists."),
            Self::DuplicateId => Some("Pick an ID that is not already in use."),
            Self::UnknownType => Some("Use one of: epic, story, task, subtask, bug."),
            Self::ItemNotFound => None,
            Self::CapabilityMissing => Some("Only epics, stories and tasks can have children."),
            Self::ChildNotLinked => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One field, one violated rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FieldViolation {
    pub field: Field,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Which side of a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Task,
    Parent,
    Child,
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Task => "task",
            Self::Parent => "parent task",
            Self::Child => "child task",
        })
    }
}

/// Domain errors raised by the model and the task service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// A single write broke one rule.
    #[error(transparent)]
    FieldValidation(#[from] FieldViolation),

    /// Construction found one or more violations.
    #[error("validation errors: {}", join_violations(.0))]
    AggregateValidation(Vec<FieldViolation>),

    /// A bulk update named a field that cannot be written.
    #[error("field {field} cannot be updated")]
    NotUpdatable { field: String },

    #[error("task with id {id} already exists")]
    DuplicateId { id: String },

    #[error("unknown work item type: {kind}")]
    UnknownType { kind: String },

    #[error("{lookup} with id {id} not found")]
    NotFound { lookup: Lookup, id: String },

    #[error("task with id {id} ({kind}) cannot have children")]
    Capability { id: String, kind: WorkItemKind },

    #[error("child task with id {child_id} not found in parent task {parent_id}")]
    ChildNotLinked { parent_id: String, child_id: String },
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|violation| violation.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl TaskError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::FieldValidation(_) => ErrorCode::FieldValidation,
            Self::AggregateValidation(_) => ErrorCode::AggregateValidation,
            Self::NotUpdatable { .. } => ErrorCode::NotUpdatable,
            Self::DuplicateId { .. } => ErrorCode::DuplicateId,
            Self::UnknownType { .. } => ErrorCode::UnknownType,
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::Capability { .. } => ErrorCode::CapabilityMissing,
            Self::ChildNotLinked { .. } => ErrorCode::ChildNotLinked,
        }
    }

    /// Suggestion text for operators, falling back to the code's summary.
    #[must_use]
    pub fn suggestion(&self) -> String {
        let code = self.error_code();
        code.hint().unwrap_or_else(|| code.message()).to_string()
    }

    /// Fields named by a validation error, in reporting order.
    #[must_use]
    pub fn violated_fields(&self) -> Vec<Field> {
        match self {
            Self::FieldValidation(violation) => vec![violation.field],
            Self::AggregateValidation(violations) => violations.iter().map(|v| v.field).collect(),
            _ => Vec::new(),
        }
    }
}
