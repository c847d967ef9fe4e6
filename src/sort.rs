// Stable single-key sorting for record views

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::record::{FieldValue, Record, timestamp_millis};

/// Sort direction for the active column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flip(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Header glyph
    pub fn glyph(self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// The active sort: exactly one key at a time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, SortDirection::Ascending)
    }

    /// Header click: the same key flips direction, a new key starts ascending
    pub fn toggle(&mut self, key: &str) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key.to_string();
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn toggled(mut self, key: &str) -> Self {
        self.toggle(key);
        self
    }
}

/// Precomputed comparison key for one record
#[derive(Debug)]
enum SortKey<'a> {
    Missing,
    Text {
        base: String,
        folded: String,
        raw: &'a str,
    },
    Number(f64),
    Instant(i64),
}

impl<'a> SortKey<'a> {
    fn of(value: Option<FieldValue<'a>>) -> Self {
        match value {
            None => SortKey::Missing,
            Some(FieldValue::Text(s)) | Some(FieldValue::Category(s)) => SortKey::Text {
                base: base_letters(s),
                folded: s.to_lowercase(),
                raw: s,
            },
            Some(FieldValue::Amount(n)) => SortKey::Number(n),
            Some(FieldValue::Timestamp(s)) => SortKey::Instant(timestamp_millis(s)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Text { .. } => 1,
            SortKey::Number(_) => 2,
            SortKey::Instant(_) => 3,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                SortKey::Text {
                    base: a,
                    folded: fa,
                    raw: ra,
                },
                SortKey::Text {
                    base: b,
                    folded: fb,
                    raw: rb,
                },
            ) => a.cmp(b).then_with(|| fa.cmp(fb)).then_with(|| ra.cmp(rb)),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Primary collation key: lowercase letters with accents stripped
///
/// Text compares on this first, then on the lowercase form (so `е` < `ё`),
/// then on the raw string. `ё` and `é` fold onto their base letter; `й` is a
/// letter of its own. Across scripts, Latin sorts before Cyrillic.
fn base_letters(s: &str) -> String {
    let mut key = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        if c == 'й' {
            key.push(c);
        } else {
            key.extend(std::iter::once(c).nfd().filter(|m| !is_combining_mark(*m)));
        }
    }
    key
}

/// Reorder `indices` (positions into `records`) by the given spec
///
/// The sort is stable for both directions: records with equal keys keep
/// their relative order. An unknown key leaves the order untouched.
pub fn sort_indices<R: Record>(records: &[R], indices: &mut [usize], spec: &SortSpec) {
    if R::column(&spec.key).is_none() && records.first().and_then(|r| r.field(&spec.key)).is_none() {
        debug!(key = %spec.key, collection = R::collection_name(), "sort: unknown key, keeping order");
        return;
    }

    let mut keyed: Vec<(usize, SortKey<'_>)> = indices
        .iter()
        .map(|&i| (i, SortKey::of(records[i].field(&spec.key))))
        .collect();

    keyed.sort_by(|(_, a), (_, b)| spec.direction.apply(a.compare(b)));

    for (slot, (index, _)) in indices.iter_mut().zip(keyed) {
        *slot = index;
    }

    debug!(key = %spec.key, direction = %spec.direction, count = indices.len(), "sort: reordered");
}

/// Sort records into a new sequence
pub fn sort<R: Record>(records: &[R], spec: &SortSpec) -> Vec<R> {
    let mut indices: Vec<usize> = (0..records.len()).collect();
    sort_indices(records, &mut indices, spec);
    indices.into_iter().map(|i| records[i].clone()).collect()
}
