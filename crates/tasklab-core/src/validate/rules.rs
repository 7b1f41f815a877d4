//! The rule catalog.
//!
//! Every rule is a pure function of the value being written, the field it is
//! attached to, and the owning item's live field values. Only
//! [`Rule::CoerceDateTime`] transforms the value; all other rules check it.

use chrono::{DateTime, Utc};

use crate::error::FieldViolation;
use crate::model::value::FieldValue;
use crate::validate::FieldSource;
use crate::validate::schema::Field;

/// A fixed set of string constants a field must belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDomain {
    pub name: &'static str,
    pub values: &'static [&'static str],
}

impl EnumDomain {
    #[must_use]
    pub fn contains(&self, candidate: &str) -> bool {
        self.values.contains(&candidate)
    }
}

/// One validation rule attachable to any field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Value must be text.
    IsString,
    /// Text must have at least this many characters.
    MinLength(usize),
    /// Text must have at most this many characters.
    MaxLength(usize),
    /// Value must be one of the domain's constants.
    OneOf(EnumDomain),
    /// Replace the value with its date-time coercion.
    CoerceDateTime,
    /// Date-time must not be the invalid sentinel.
    ValidDateTime,
    /// Date-time must be at or before the clock's now.
    NotInFuture,
    /// Date-time must be at or after the named field's current value.
    NotBefore(Field),
}

/// What a checking rule can see besides the value itself.
pub struct RuleContext<'a> {
    pub field: Field,
    pub owner: &'a dyn FieldSource,
    pub now: DateTime<Utc>,
}

impl Rule {
    /// Whether this rule rewrites the stored value.
    #[must_use]
    pub const fn is_transform(self) -> bool {
        matches!(self, Self::CoerceDateTime)
    }

    /// The other field this rule reads, if any.
    #[must_use]
    pub const fn depends_on(self) -> Option<Field> {
        match self {
            Self::NotBefore(other) => Some(other),
            _ => None,
        }
    }

    /// Apply a transforming rule. Checking rules pass the value through.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldViolation`] when the value's shape cannot be coerced.
    pub fn coerce(
        self,
        field: Field,
        value: Option<FieldValue>,
    ) -> Result<Option<FieldValue>, FieldViolation> {
        match self {
            Self::CoerceDateTime => value
                .as_ref()
                .and_then(FieldValue::coerce_datetime)
                .map(Some)
                .ok_or_else(|| {
                    FieldViolation::new(
                        field,
                        format!("Field {field} must be a date-time or a string/number"),
                    )
                }),
            _ => Ok(value),
        }
    }

    /// Run a checking rule. Transforming rules always pass here.
    ///
    /// # Errors
    ///
    /// Returns the single [`FieldViolation`] this rule detects.
    pub fn check(
        self,
        value: Option<&FieldValue>,
        cx: &RuleContext<'_>,
    ) -> Result<(), FieldViolation> {
        let field = cx.field;
        match self {
            Self::IsString => match value {
                Some(FieldValue::Text(_)) => Ok(()),
                _ => Err(FieldViolation::new(
                    field,
                    format!("Field {field} must be a string"),
                )),
            },
            Self::MinLength(min) => match value {
                Some(FieldValue::Text(text)) if text.chars().count() < min => {
                    Err(FieldViolation::new(
                        field,
                        format!("Field {field} must be at least {min} characters long"),
                    ))
                }
                _ => Ok(()),
            },
            Self::MaxLength(max) => match value {
                Some(FieldValue::Text(text)) if text.chars().count() > max => {
                    Err(FieldViolation::new(
                        field,
                        format!("Field {field} must be at most {max} characters long"),
                    ))
                }
                _ => Ok(()),
            },
            Self::OneOf(domain) => match value {
                Some(FieldValue::Text(text)) if domain.contains(text) => Ok(()),
                Some(FieldValue::Text(_) | FieldValue::Number(_)) => Err(FieldViolation::new(
                    field,
                    format!(
                        "Field {field} must be one of: {}",
                        domain.values.join(", ")
                    ),
                )),
                _ => Err(FieldViolation::new(
                    field,
                    format!(
                        "Incorrect value type for field {field}: must be a valid {} value",
                        domain.name
                    ),
                )),
            },
            Self::CoerceDateTime => Ok(()),
            Self::ValidDateTime => match value {
                Some(FieldValue::DateTime(_)) => Ok(()),
                _ => Err(FieldViolation::new(
                    field,
                    format!("Field {field} is an invalid date"),
                )),
            },
            Self::NotInFuture => match value {
                Some(FieldValue::DateTime(at)) if *at > cx.now => Err(FieldViolation::new(
                    field,
                    format!("Field {field} must be in the past"),
                )),
                _ => Ok(()),
            },
            Self::NotBefore(other) => {
                let Some(at) = value.and_then(FieldValue::as_datetime) else {
                    return Ok(());
                };
                let Some(other_at) = cx
                    .owner
                    .field_value(other)
                    .as_ref()
                    .and_then(FieldValue::as_datetime)
                else {
                    return Err(FieldViolation::new(
                        field,
                        format!("Field {other} is not a date"),
                    ));
                };
                if at < other_at {
                    Err(FieldViolation::new(
                        field,
                        format!("Field {field} must be after field {other}"),
                    ))
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    struct Values(BTreeMap<Field, FieldValue>);

    impl FieldSource for Values {
        fn field_value(&self, field: Field) -> Option<FieldValue> {
            self.0.get(&field).cloned()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 28, 0, 0, 0).unwrap()
    }

    fn check(rule: Rule, field: Field, value: Option<FieldValue>, owner: &Values) -> Option<String> {
        let cx = RuleContext {
            field,
            owner,
            now: now(),
        };
        rule.check(value.as_ref(), &cx).err().map(|v| v.message)
    }

    fn empty() -> Values {
        Values(BTreeMap::new())
    }

    #[test]
    fn string_rule_rejects_numbers_and_absence() {
        assert_eq!(
            check(Rule::IsString, Field::Title, Some(12345_i64.into()), &empty()),
            Some("Field title must be a string".into())
        );
        assert!(check(Rule::IsString, Field::Title, None, &empty()).is_some());
        assert!(check(Rule::IsString, Field::Title, Some("ok".into()), &empty()).is_none());
    }

    #[test]
    fn length_bounds_are_inclusive() {
        let owner = empty();
        assert!(check(Rule::MinLength(3), Field::Title, Some("abc".into()), &owner).is_none());
        assert_eq!(
            check(Rule::MinLength(3), Field::Title, Some("ab".into()), &owner),
            Some("Field title must be at least 3 characters long".into())
        );
        let hundred = "a".repeat(100);
        assert!(check(Rule::MaxLength(100), Field::Title, Some(hundred.into()), &owner).is_none());
        let long = "a".repeat(101);
        assert_eq!(
            check(Rule::MaxLength(100), Field::Title, Some(long.into()), &owner),
            Some("Field title must be at most 100 characters long".into())
        );
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let owner = empty();
        let two = "\u{1F600}\u{1F600}";
        assert!(check(Rule::MinLength(3), Field::Title, Some(two.into()), &owner).is_some());
        let three = "\u{1F600}\u{1F600}\u{1F600}";
        assert!(check(Rule::MinLength(3), Field::Title, Some(three.into()), &owner).is_none());
        let accented = "\u{e9}".repeat(100);
        assert!(check(Rule::MaxLength(100), Field::Title, Some(accented.into()), &owner).is_none());
    }

    #[test]
    fn enum_rule_distinguishes_type_and_membership() {
        let domain = EnumDomain {
            name: "status",
            values: &["todo", "in_progress", "done"],
        };
        let owner = empty();
        assert!(check(Rule::OneOf(domain), Field::Status, Some("done".into()), &owner).is_none());
        assert_eq!(
            check(Rule::OneOf(domain), Field::Status, Some("NOT_A_STATUS".into()), &owner),
            Some("Field status must be one of: todo, in_progress, done".into())
        );
        assert_eq!(
            check(Rule::OneOf(domain), Field::Status, Some(true.into()), &owner),
            Some("Incorrect value type for field status: must be a valid status value".into())
        );
    }

    #[test]
    fn coercion_rejects_wrong_shapes() {
        let err = Rule::CoerceDateTime
            .coerce(Field::Deadline, Some(FieldValue::Bool(true)))
            .unwrap_err();
        assert_eq!(err.field, Field::Deadline);

        let coerced = Rule::CoerceDateTime
            .coerce(Field::Deadline, Some("2025-10-27".into()))
            .unwrap();
        assert!(coerced.unwrap().as_datetime().is_some());

        let untouched = Rule::IsString.coerce(Field::Title, Some("x".into())).unwrap();
        assert_eq!(untouched, Some(FieldValue::Text("x".into())));
    }

    #[test]
    fn future_check_allows_now_boundary() {
        let owner = empty();
        assert!(check(Rule::NotInFuture, Field::CreatedAt, Some(now().into()), &owner).is_none());
        let later = now() + chrono::Duration::milliseconds(1);
        assert!(check(Rule::NotInFuture, Field::CreatedAt, Some(later.into()), &owner).is_some());
    }

    #[test]
    fn not_before_reads_live_owner_value() {
        let created = Utc.with_ymd_and_hms(2025, 10, 27, 0, 0, 0).unwrap();
        let mut values = BTreeMap::new();
        values.insert(Field::CreatedAt, FieldValue::DateTime(created));
        let owner = Values(values);

        let rule = Rule::NotBefore(Field::CreatedAt);
        assert!(check(rule, Field::Deadline, Some(created.into()), &owner).is_none());
        let before = created - chrono::Duration::days(1);
        assert_eq!(
            check(rule, Field::Deadline, Some(before.into()), &owner),
            Some("Field deadline must be after field created_at".into())
        );
        assert_eq!(
            check(rule, Field::Deadline, Some(created.into()), &empty()),
            Some("Field created_at is not a date".into())
        );
    }
}
