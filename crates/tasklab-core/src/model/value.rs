//! Dynamically typed field values.
//!
//! Payloads reach the model from code and from JSON, so a field value may
//! carry any JSON shape. The validation rules decide which shapes a field
//! accepts; [`FieldValue`] only records what was supplied.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::model::item::{Priority, Status};

/// Format used for every serialized timestamp: `2025-10-27T00:00:00.000Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A single supplied field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    /// A date-time coercion that did not yield a calendar instant. Keeps the
    /// raw input for reporting.
    InvalidDateTime(String),
    List(Vec<FieldValue>),
    /// Objects and nulls nested inside lists.
    Other(serde_json::Value),
}

impl FieldValue {
    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "string",
            Self::Number(_) => "number",
            Self::Bool(_) => "boolean",
            Self::DateTime(_) | Self::InvalidDateTime(_) => "date-time",
            Self::List(_) => "list",
            Self::Other(serde_json::Value::Null) => "null",
            Self::Other(_) => "object",
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The instant held by a valid date-time value.
    #[must_use]
    pub const fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(at) => Some(*at),
            _ => None,
        }
    }

    /// Coerce this value to a date-time.
    ///
    /// Date-times pass through, text is parsed, numbers are milliseconds since
    /// the Unix epoch. Text or numbers that do not describe an instant become
    /// [`FieldValue::InvalidDateTime`]. Returns `None` for any other shape.
    #[must_use]
    pub fn coerce_datetime(&self) -> Option<Self> {
        match self {
            Self::DateTime(at) => Some(Self::DateTime(at.trunc_subsecs(3))),
            Self::InvalidDateTime(raw) => Some(Self::InvalidDateTime(raw.clone())),
            Self::Text(raw) => Some(
                parse_datetime(raw)
                    .map_or_else(|| Self::InvalidDateTime(raw.clone()), Self::DateTime),
            ),
            Self::Number(millis) => Some(
                datetime_from_millis(*millis)
                    .map_or_else(|| Self::InvalidDateTime(millis.to_string()), Self::DateTime),
            ),
            Self::Bool(_) | Self::List(_) | Self::Other(_) => None,
        }
    }
}

/// Render an instant in [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a textual date-time.
///
/// Accepted forms: RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` and
/// `YYYY-MM-DD HH:MM:SS[.fff]` (read as UTC), `YYYY-MM-DD` (UTC midnight),
/// and RFC 2822. The result is truncated to millisecond precision.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc).trunc_subsecs(3));
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(naive.and_utc().trunc_subsecs(3));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|at| at.with_timezone(&Utc).trunc_subsecs(3))
}

#[allow(clippy::cast_possible_truncation)]
fn datetime_from_millis(millis: f64) -> Option<DateTime<Utc>> {
    // Same bounds as an ECMAScript time value: +/- 100 million days.
    const MAX_MILLIS: f64 = 8.64e15;
    if !millis.is_finite() || millis.abs() > MAX_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(at) => f.write_str(&format_timestamp(*at)),
            Self::InvalidDateTime(raw) => write!(f, "{raw} (invalid date)"),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::Text(text),
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map_or_else(|| Self::Other(serde_json::Value::Number(n)), Self::Number),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            other @ (serde_json::Value::Null | serde_json::Value::Object(_)) => Self::Other(other),
        }
    }
}

impl From<&FieldValue> for serde_json::Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => Self::String(text.clone()),
            FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(Self::Null, Self::Number),
            FieldValue::Bool(b) => Self::Bool(*b),
            FieldValue::DateTime(at) => Self::String(format_timestamp(*at)),
            FieldValue::InvalidDateTime(raw) => Self::String(raw.clone()),
            FieldValue::List(items) => Self::Array(items.iter().map(Self::from).collect()),
            FieldValue::Other(value) => value.clone(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

#[allow(clippy::cast_precision_loss)]
impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::DateTime(at)
    }
}

impl From<Status> for FieldValue {
    fn from(status: Status) -> Self {
        Self::Text(status.as_str().to_string())
    }
}

impl From<Priority> for FieldValue {
    fn from(priority: Priority) -> Self {
        Self::Text(priority.as_str().to_string())
    }
}
