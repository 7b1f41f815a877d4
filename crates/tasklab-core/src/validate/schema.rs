//! Static rule tables, one per work item kind.
//!
//! The tables are plain data attached to the kind: nothing is registered at
//! runtime and nothing is looked up by object identity.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::model::item::{ParseEnumError, Priority, Status, WorkItemKind};
use crate::validate::rules::{EnumDomain, Rule};

/// A validated, writable field of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Title,
    Description,
    Status,
    Priority,
    CreatedAt,
    Deadline,
    DoneAt,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::CreatedAt => "created_at",
            Self::Deadline => "deadline",
            Self::DoneAt => "done_at",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "created_at" => Ok(Self::CreatedAt),
            "deadline" => Ok(Self::Deadline),
            "done_at" => Ok(Self::DoneAt),
            _ => Err(ParseEnumError {
                expected: "field",
                got: s.to_string(),
            }),
        }
    }
}

/// Rule chain and required flag for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    /// Run the chain even when the value is absent.
    pub required: bool,
    /// Declaration order is evaluation order.
    pub rules: &'static [Rule],
}

/// Every field spec of one work item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub kind: WorkItemKind,
    pub fields: &'static [FieldSpec],
}

impl Schema {
    /// The spec for `field`, if this schema declares it.
    #[must_use]
    pub fn spec(&self, field: Field) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.field == field)
    }

    /// Specs whose rules read `field` as their cross-field reference.
    pub fn dependents_of(&self, field: Field) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(move |spec| {
            spec.field != field
                && spec
                    .rules
                    .iter()
                    .any(|rule| rule.depends_on() == Some(field))
        })
    }

    #[must_use]
    pub const fn has_children(&self) -> bool {
        self.kind.has_children()
    }
}

const STATUS_DOMAIN: EnumDomain = EnumDomain {
    name: "status",
    values: Status::VALUES,
};

const PRIORITY_DOMAIN: EnumDomain = EnumDomain {
    name: "priority",
    values: Priority::VALUES,
};

static WORK_ITEM_FIELDS: [FieldSpec; 7] = [
    FieldSpec {
        field: Field::Title,
        required: true,
        rules: &[Rule::IsString, Rule::MinLength(3), Rule::MaxLength(100)],
    },
    FieldSpec {
        field: Field::CreatedAt,
        required: true,
        rules: &[Rule::CoerceDateTime, Rule::ValidDateTime, Rule::NotInFuture],
    },
    FieldSpec {
        field: Field::Status,
        required: false,
        rules: &[Rule::OneOf(STATUS_DOMAIN)],
    },
    FieldSpec {
        field: Field::Priority,
        required: false,
        rules: &[Rule::OneOf(PRIORITY_DOMAIN)],
    },
    FieldSpec {
        field: Field::Description,
        required: false,
        rules: &[Rule::IsString, Rule::MinLength(10), Rule::MaxLength(200)],
    },
    FieldSpec {
        field: Field::Deadline,
        required: false,
        rules: &[
            Rule::CoerceDateTime,
            Rule::ValidDateTime,
            Rule::NotBefore(Field::CreatedAt),
        ],
    },
    FieldSpec {
        field: Field::DoneAt,
        required: false,
        rules: &[
            Rule::CoerceDateTime,
            Rule::ValidDateTime,
            Rule::NotInFuture,
            Rule::NotBefore(Field::CreatedAt),
        ],
    },
];

static EPIC: Schema = Schema {
    kind: WorkItemKind::Epic,
    fields: &WORK_ITEM_FIELDS,
};
static STORY: Schema = Schema {
    kind: WorkItemKind::Story,
    fields: &WORK_ITEM_FIELDS,
};
static TASK: Schema = Schema {
    kind: WorkItemKind::Task,
    fields: &WORK_ITEM_FIELDS,
};
static SUBTASK: Schema = Schema {
    kind: WorkItemKind::Subtask,
    fields: &WORK_ITEM_FIELDS,
};
static BUG: Schema = Schema {
    kind: WorkItemKind::Bug,
    fields: &WORK_ITEM_FIELDS,
};

/// The rule table for `kind`.
#[must_use]
pub fn schema_for(kind: WorkItemKind) -> &'static Schema {
    match kind {
        WorkItemKind::Epic => &EPIC,
        WorkItemKind::Story => &STORY,
        WorkItemKind::Task => &TASK,
        WorkItemKind::Subtask => &SUBTASK,
        WorkItemKind::Bug => &BUG,
    }
}
