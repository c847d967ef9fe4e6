// Generic record trait for any row type the grid can display

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::sort::SortSpec;

/// Epoch value used for timestamps that fail to parse.
///
/// Such records sort as if created at the Unix epoch and are compared at the
/// epoch by date-range filters.
pub const INVALID_TIMESTAMP: i64 = 0;

/// Core trait that any displayable record must implement
pub trait Record: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync + 'static {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Collection name for this record type (e.g., "transactions", "admins")
    fn collection_name() -> &'static str
    where
        Self: Sized;

    /// Ordered column schema, as shown in the table header
    fn columns() -> &'static [Column]
    where
        Self: Sized;

    /// Typed access to a field by its column name
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// Fields covered by the free-text search box
    fn search_fields() -> &'static [&'static str]
    where
        Self: Sized;

    /// Sort applied when a grid is first opened
    fn default_sort() -> SortSpec
    where
        Self: Sized;

    /// Label/value pairs for a detail view of this record
    fn details(&self) -> Vec<(&'static str, String)>;

    /// Look up a column by name
    fn column(name: &str) -> Option<&'static Column>
    where
        Self: Sized,
    {
        Self::columns().iter().find(|c| c.name == name)
    }
}

/// One column of a record schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Field name, as used by filters and sorts
    pub name: &'static str,
    /// Header label
    pub label: &'static str,
    pub kind: FieldKind,
    /// Whether clicking the header sorts by this column
    pub sortable: bool,
}

/// Field types a record can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Category,
    Amount,
    Timestamp,
}

/// A borrowed field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Category(&'a str),
    Amount(f64),
    /// ISO-8601 timestamp as stored on the record
    Timestamp(&'a str),
}

impl FieldValue<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Category(_) => FieldKind::Category,
            FieldValue::Amount(_) => FieldKind::Amount,
            FieldValue::Timestamp(_) => FieldKind::Timestamp,
        }
    }

    /// String content for text-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Category(s) | FieldValue::Timestamp(s) => Some(*s),
            FieldValue::Amount(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Category(s) => write!(f, "{}", s),
            FieldValue::Amount(a) => write!(f, "{:.2}", a),
            FieldValue::Timestamp(s) => write!(f, "{}", s),
        }
    }
}

/// Parse a timestamp into epoch milliseconds
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS[.fff]]` (read as UTC, the shape a
/// datetime-local input produces) and a bare `YYYY-MM-DD`.
pub fn parse_timestamp(input: &str) -> Option<i64> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc().timestamp_millis())
}

/// Epoch milliseconds for a stored timestamp, [`INVALID_TIMESTAMP`] if it doesn't parse
pub fn timestamp_millis(input: &str) -> i64 {
    parse_timestamp(input).unwrap_or(INVALID_TIMESTAMP)
}
