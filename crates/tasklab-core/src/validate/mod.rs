//! Field validation engine.
//!
//! Each work item kind owns a static [`Schema`]: an ordered rule chain plus a
//! `required` flag per field. The engine runs those chains at two moments.
//!
//! 1. **Single write** ([`validate_write`]): coerce the incoming value, run the
//!    field's checking rules against the item as it would look after the
//!    write, then re-check every field whose cross-field rule reads the
//!    written field. The first violation is returned.
//! 2. **Full pass** ([`validate_all`]): run every field's chain against a
//!    complete set of values and collect one violation per failing field.
//!    Construction uses this to report every problem at once.
//!
//! A chain stops at its first failing rule. Non-required fields with no value
//! skip their chain entirely; required fields always run it, so the first
//! rule that cannot accept an absent value reports it.

pub mod rules;
pub mod schema;

use chrono::{DateTime, Utc};

use crate::error::FieldViolation;
use crate::model::value::FieldValue;
use rules::RuleContext;
pub use rules::{EnumDomain, Rule};
pub use schema::{Field, FieldSpec, Schema, schema_for};

/// Read access to the live values of an item's fields.
///
/// Cross-field rules read through this, so they always see the current value
/// of the other field rather than a snapshot.
pub trait FieldSource {
    fn field_value(&self, field: Field) -> Option<FieldValue>;
}

/// An owner with one field replaced by a pending value.
struct Staged<'a> {
    base: &'a dyn FieldSource,
    field: Field,
    value: Option<&'a FieldValue>,
}

impl FieldSource for Staged<'_> {
    fn field_value(&self, field: Field) -> Option<FieldValue> {
        if field == self.field {
            self.value.cloned()
        } else {
            self.base.field_value(field)
        }
    }
}

/// Apply the transforming rules of `spec` to `value`.
///
/// # Errors
///
/// Returns the violation of the first transforming rule that rejects the
/// value's shape.
pub fn coerce_field(
    spec: &FieldSpec,
    value: Option<FieldValue>,
) -> Result<Option<FieldValue>, FieldViolation> {
    if value.is_none() && !spec.required {
        return Ok(None);
    }
    spec.rules
        .iter()
        .filter(|rule| rule.is_transform())
        .try_fold(value, |current, rule| rule.coerce(spec.field, current))
}

/// Run the checking rules of `spec` against an already coerced value.
///
/// # Errors
///
/// Returns the first violation in declaration order.
pub fn check_field(
    spec: &FieldSpec,
    value: Option<&FieldValue>,
    owner: &dyn FieldSource,
    now: DateTime<Utc>,
) -> Result<(), FieldViolation> {
    if value.is_none() && !spec.required {
        return Ok(());
    }
    let cx = RuleContext {
        field: spec.field,
        owner,
        now,
    };
    spec.rules
        .iter()
        .filter(|rule| !rule.is_transform())
        .try_for_each(|rule| rule.check(value, &cx))
}

/// Validate every field of `owner`, collecting one violation per failing
/// field in declaration order.
#[must_use]
pub fn validate_all(
    schema: &Schema,
    owner: &dyn FieldSource,
    now: DateTime<Utc>,
) -> Vec<FieldViolation> {
    schema
        .fields
        .iter()
        .filter_map(|spec| {
            let value = owner.field_value(spec.field);
            check_field(spec, value.as_ref(), owner, now).err()
        })
        .collect()
}

/// Validate a single write of `value` into `field` of `owner`.
///
/// Returns the coerced value to store. Fields without a spec in `schema` are
/// passed through unchecked.
///
/// # Errors
///
/// Returns the first violation found, either on the written field or on a
/// field whose cross-field rule reads it.
pub fn validate_write(
    schema: &Schema,
    field: Field,
    value: Option<FieldValue>,
    owner: &dyn FieldSource,
    now: DateTime<Utc>,
) -> Result<Option<FieldValue>, FieldViolation> {
    let Some(spec) = schema.spec(field) else {
        return Ok(value);
    };

    let value = coerce_field(spec, value)?;
    let staged = Staged {
        base: owner,
        field,
        value: value.as_ref(),
    };
    check_field(spec, value.as_ref(), &staged, now)?;

    for dependent in schema.dependents_of(field) {
        let current = staged.field_value(dependent.field);
        check_field(dependent, current.as_ref(), &staged, now)?;
    }

    Ok(value)
}
