// Declarative filtering for record views

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::record::{FieldValue, Record, parse_timestamp, timestamp_millis};

/// Constraint on a single field
///
/// Every variant has an "empty" shape that matches everything: a blank
/// needle, an empty set, or a range with no bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Case-insensitive substring match on one text field
    Contains(String),
    /// Membership in a set of allowed values
    OneOf(BTreeSet<String>),
    /// Inclusive numeric range
    Range { min: Option<f64>, max: Option<f64> },
    /// Inclusive timestamp range, epoch milliseconds
    Between { from: Option<i64>, to: Option<i64> },
}

impl Constraint {
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Build a numeric range from raw input text
    ///
    /// Blank, unparseable or non-finite bounds impose no constraint.
    pub fn range_from_input(min: &str, max: &str) -> Self {
        Constraint::Range {
            min: parse_number(min),
            max: parse_number(max),
        }
    }

    /// Build a timestamp range from raw input text; bad bounds are dropped
    pub fn between_from_input(from: &str, to: &str) -> Self {
        Constraint::Between {
            from: parse_timestamp(from),
            to: parse_timestamp(to),
        }
    }

    /// Timestamp range from a relative preset up to now (open-ended)
    pub fn since(preset: DatePreset, now: DateTime<Utc>) -> Self {
        Constraint::Between {
            from: Some(preset.start(now)),
            to: None,
        }
    }

    /// True when this constraint excludes nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Constraint::Contains(needle) => needle.trim().is_empty(),
            Constraint::OneOf(set) => set.is_empty(),
            Constraint::Range { min, max } => min.is_none() && max.is_none(),
            Constraint::Between { from, to } => from.is_none() && to.is_none(),
        }
    }

    /// Whether a field value satisfies this constraint
    ///
    /// A constraint that doesn't apply to the value's kind is no constraint.
    fn matches(&self, value: FieldValue<'_>) -> bool {
        match (self, value) {
            (Constraint::Contains(needle), value) => match value.as_str() {
                Some(haystack) => contains_folded(haystack, &needle.trim().to_lowercase()),
                None => true,
            },
            (Constraint::OneOf(set), value) => match value.as_str() {
                Some(s) => set.is_empty() || set.contains(s),
                None => true,
            },
            (Constraint::Range { min, max }, FieldValue::Amount(n)) => within(n, *min, *max),
            (Constraint::Between { from, to }, FieldValue::Timestamp(s)) => {
                let ts = timestamp_millis(s);
                from.is_none_or(|f| ts >= f) && to.is_none_or(|t| ts <= t)
            }
            _ => true,
        }
    }
}

/// Relative start dates offered next to the date pickers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    /// Since midnight today (UTC)
    Today,
    /// The last `n` days, counted back from now
    LastDays(u32),
    /// Since the first day of the current month (UTC)
    ThisMonth,
}

impl DatePreset {
    /// Presets shown in the date popover, in display order
    pub const MENU: [DatePreset; 4] = [
        DatePreset::Today,
        DatePreset::LastDays(7),
        DatePreset::LastDays(30),
        DatePreset::ThisMonth,
    ];

    pub fn label(&self) -> String {
        match self {
            DatePreset::Today => "Сегодня".to_string(),
            DatePreset::LastDays(n) => format!("{} дней", n),
            DatePreset::ThisMonth => "Этот месяц".to_string(),
        }
    }

    /// Epoch millis the preset starts at, relative to `now`
    pub fn start(&self, now: DateTime<Utc>) -> i64 {
        let today = now.date_naive();
        let start = match self {
            DatePreset::Today => midnight(today),
            DatePreset::LastDays(n) => now - Duration::days(i64::from(*n)),
            DatePreset::ThisMonth => midnight(today.with_day(1).unwrap_or(today)),
        };
        start.timestamp_millis()
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl std::str::FromStr for DatePreset {
    type Err = eyre::Report;

    /// `today`, `month`, or a day count such as `7d`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "today" => Ok(DatePreset::Today),
            "month" => Ok(DatePreset::ThisMonth),
            _ => s
                .strip_suffix('d')
                .and_then(|n| n.parse::<u32>().ok())
                .map(DatePreset::LastDays)
                .ok_or_else(|| eyre::eyre!("Unknown date preset: {} (expected today, month or <N>d)", s)),
        }
    }
}

fn parse_number(input: &str) -> Option<f64> {
    input
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn within(n: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m)
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    folded_needle.is_empty() || haystack.to_lowercase().contains(folded_needle)
}

/// The full filter state of a grid
///
/// Constraints are ANDed across fields. Setting one field never touches
/// another, so per-column popovers compose.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Free-text query over the record's search fields
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub constraints: BTreeMap<String, Constraint>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, query: impl Into<String>) -> Self {
        self.search = query.into();
        self
    }

    pub fn with(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.set(field, constraint);
        self
    }

    /// Replace the constraint on one field; an empty constraint clears it
    pub fn set(&mut self, field: impl Into<String>, constraint: Constraint) {
        let field = field.into();
        if constraint.is_empty() {
            self.constraints.remove(&field);
        } else {
            self.constraints.insert(field, constraint);
        }
    }

    pub fn clear(&mut self, field: &str) -> Option<Constraint> {
        self.constraints.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.constraints.get(field)
    }

    /// Drop every constraint and the search query
    pub fn reset(&mut self) {
        self.search.clear();
        self.constraints.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.constraints.values().all(Constraint::is_empty)
    }

    /// Fields carrying a non-empty constraint, for "filter active" badges
    pub fn active_fields(&self) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(field, _)| field.as_str())
            .collect()
    }

    /// Whether a record passes every active constraint
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let query = self.search.trim().to_lowercase();
        if !query.is_empty() {
            let hit = R::search_fields().iter().any(|name| {
                record
                    .field(name)
                    .and_then(|v| v.as_str().map(|s| contains_folded(s, &query)))
                    .unwrap_or(false)
            });
            if !hit {
                return false;
            }
        }

        self.constraints.iter().all(|(name, constraint)| match record.field(name) {
            Some(value) => constraint.matches(value),
            None => true,
        })
    }
}

/// Positions of the records matching `spec`, in source order
pub fn filter_indices<R: Record>(records: &[R], spec: &FilterSpec) -> Vec<usize> {
    for name in spec.constraints.keys() {
        if R::column(name).is_none() {
            debug!(field = %name, collection = R::collection_name(), "filter: unknown field ignored");
        }
    }

    let indices: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(*r))
        .map(|(i, _)| i)
        .collect();

    debug!(
        collection = R::collection_name(),
        total = records.len(),
        matched = indices.len(),
        "filter: applied"
    );
    indices
}

/// Records matching `spec`, in source order
pub fn filter<R: Record>(records: &[R], spec: &FilterSpec) -> Vec<R> {
    filter_indices(records, spec)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{admin, at, tx};
    use crate::models::{Transaction, TransactionStatus};
    use proptest::prelude::*;

    fn amounts(records: &[Transaction]) -> Vec<f64> {
        records.iter().map(|t| t.amount).collect()
    }

    #[test]
    fn test_status_set_filter() {
        let records = vec![
            tx("a", TransactionStatus::Confirmed, 1.0, "USD"),
            tx("b", TransactionStatus::Pending, 1.0, "USD"),
            tx("c", TransactionStatus::Confirmed, 1.0, "USD"),
            tx("d", TransactionStatus::Pending, 1.0, "USD"),
            tx("e", TransactionStatus::Confirmed, 1.0, "USD"),
        ];
        let spec = FilterSpec::new().with("status", Constraint::one_of(["confirmed"]));

        let result = filter(&records, &spec);
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|t| t.status == TransactionStatus::Confirmed));
    }

    #[test]
    fn test_amount_range_is_inclusive() {
        let records: Vec<Transaction> = [50.0, 150.0, 500.0, 900.0]
            .iter()
            .enumerate()
            .map(|(i, &a)| tx(&i.to_string(), TransactionStatus::Pending, a, "USD"))
            .collect();
        let spec = FilterSpec::new().with(
            "amount",
            Constraint::Range {
                min: Some(100.0),
                max: Some(500.0),
            },
        );

        assert_eq!(amounts(&filter(&records, &spec)), vec![150.0, 500.0]);
    }

    #[test]
    fn test_open_ended_range() {
        let records: Vec<Transaction> = [50.0, 150.0, 900.0]
            .iter()
            .map(|&a| tx("x", TransactionStatus::Pending, a, "USD"))
            .collect();
        let spec = FilterSpec::new().with("amount", Constraint::range_from_input("", "150"));
        assert_eq!(amounts(&filter(&records, &spec)), vec![50.0, 150.0]);
    }

    #[test]
    fn test_invalid_number_input_is_no_constraint() {
        assert_eq!(
            Constraint::range_from_input("abc", "NaN"),
            Constraint::Range { min: None, max: None }
        );
        assert_eq!(
            Constraint::range_from_input(" 12,5 ", "inf"),
            Constraint::Range {
                min: Some(12.5),
                max: None
            }
        );

        let mut spec = FilterSpec::new();
        spec.set("amount", Constraint::range_from_input("x", ""));
        assert!(spec.is_empty());
    }

    #[test]
    fn test_date_range_filter() {
        let mut early = tx("early", TransactionStatus::Pending, 1.0, "USD");
        early.created_at = at(0);
        let mut mid = tx("mid", TransactionStatus::Pending, 1.0, "USD");
        mid.created_at = at(3600);
        let mut late = tx("late", TransactionStatus::Pending, 1.0, "USD");
        late.created_at = at(7200);
        let records = vec![early, mid, late];

        let spec = FilterSpec::new().with(
            "createdAt",
            Constraint::between_from_input("2024-01-01T01:00", "not-a-date"),
        );
        let ids: Vec<String> = filter(&records, &spec).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["mid", "late"]);
    }

    fn utc(input: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(input).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_date_presets_start() {
        let now = utc("2024-03-15T13:45:00Z");
        let millis = |s: &str| utc(s).timestamp_millis();

        assert_eq!(DatePreset::Today.start(now), millis("2024-03-15T00:00:00Z"));
        assert_eq!(DatePreset::LastDays(7).start(now), millis("2024-03-08T13:45:00Z"));
        assert_eq!(DatePreset::LastDays(30).start(now), millis("2024-02-14T13:45:00Z"));
        assert_eq!(DatePreset::ThisMonth.start(now), millis("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_since_preset_filters_created_at() {
        let now = utc("2024-01-01T12:00:00Z");
        let mut yesterday = tx("yesterday", TransactionStatus::Pending, 1.0, "USD");
        yesterday.created_at = "2023-12-31T23:00:00Z".to_string();
        let mut morning = tx("morning", TransactionStatus::Pending, 1.0, "USD");
        morning.created_at = at(3600);
        let mut last_month = tx("last_month", TransactionStatus::Pending, 1.0, "USD");
        last_month.created_at = "2023-12-05T00:00:00Z".to_string();
        let records = vec![yesterday, morning, last_month];

        let ids = |preset| -> Vec<String> {
            let spec = FilterSpec::new().with("createdAt", Constraint::since(preset, now));
            filter(&records, &spec).into_iter().map(|t| t.id).collect()
        };
        assert_eq!(ids(DatePreset::Today), vec!["morning"]);
        assert_eq!(ids(DatePreset::LastDays(7)), vec!["yesterday", "morning"]);
        assert_eq!(ids(DatePreset::LastDays(30)), vec!["yesterday", "morning", "last_month"]);
        assert_eq!(ids(DatePreset::ThisMonth), vec!["morning"]);
    }

    #[test]
    fn test_date_preset_parsing_and_labels() {
        assert_eq!("today".parse::<DatePreset>().unwrap(), DatePreset::Today);
        assert_eq!("7d".parse::<DatePreset>().unwrap(), DatePreset::LastDays(7));
        assert_eq!(" Month ".parse::<DatePreset>().unwrap(), DatePreset::ThisMonth);
        assert!("week".parse::<DatePreset>().is_err());
        assert!("d".parse::<DatePreset>().is_err());

        let labels: Vec<String> = DatePreset::MENU.iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["Сегодня", "7 дней", "30 дней", "Этот месяц"]);
    }

    #[test]
    fn test_currency_set_is_or_within_field() {
        let records = vec![
            tx("a", TransactionStatus::Pending, 1.0, "USD"),
            tx("b", TransactionStatus::Pending, 1.0, "KGS"),
            tx("c", TransactionStatus::Pending, 1.0, "EUR"),
        ];
        let spec = FilterSpec::new().with("currency", Constraint::one_of(["USD", "EUR"]));
        let ids: Vec<String> = filter(&records, &spec).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let mut a = tx("ABC123", TransactionStatus::Pending, 1.0, "USD");
        a.sender = "Алексей Петров".to_string();
        let mut b = tx("fff000", TransactionStatus::Pending, 1.0, "USD");
        b.recipient = "Мария Сидорова".to_string();
        let records = vec![a, b];

        assert_eq!(filter(&records, &FilterSpec::new().with_search("abc")).len(), 1);
        assert_eq!(filter(&records, &FilterSpec::new().with_search("ПЕТРОВ")).len(), 1);
        assert_eq!(filter(&records, &FilterSpec::new().with_search("мария")).len(), 1);
        assert_eq!(filter(&records, &FilterSpec::new().with_search("   ")).len(), 2);
    }

    #[test]
    fn test_per_column_contains() {
        let records = vec![
            admin("1", "John", "Doe", "john@example.com"),
            admin("2", "Jane", "Smith", "jane@bank.kg"),
        ];
        let spec = FilterSpec::new().with("login", Constraint::Contains("BANK".to_string()));
        let result = filter(&records, &spec);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "2");
    }

    #[test]
    fn test_constraints_compose() {
        let mut spec = FilterSpec::new();
        spec.set("currency", Constraint::one_of(["USD"]));
        spec.set("amount", Constraint::range_from_input("10", ""));
        spec.set("currency", Constraint::one_of(["USD", "EUR"]));

        assert_eq!(spec.active_fields(), vec!["amount", "currency"]);
        assert_eq!(spec.get("currency"), Some(&Constraint::one_of(["USD", "EUR"])));

        spec.set("amount", Constraint::Range { min: None, max: None });
        assert_eq!(spec.active_fields(), vec!["currency"]);
    }

    #[test]
    fn test_mismatched_or_unknown_constraints_are_ignored() {
        let records = vec![tx("a", TransactionStatus::Pending, 1.0, "USD")];
        let spec = FilterSpec::new()
            .with("sender", Constraint::Range { min: Some(5.0), max: None })
            .with("nonexistent", Constraint::one_of(["x"]));
        assert_eq!(filter(&records, &spec).len(), 1);
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            tx("c", TransactionStatus::Confirmed, 3.0, "USD"),
            tx("a", TransactionStatus::Declined, 1.0, "USD"),
            tx("b", TransactionStatus::Confirmed, 2.0, "USD"),
        ];
        let spec = FilterSpec::new().with("status", Constraint::one_of(["confirmed"]));
        assert_eq!(filter_indices(&records, &spec), vec![0, 2]);
    }

    #[test]
    fn test_spec_round_trips_through_json() {
        let spec = FilterSpec::new()
            .with_search("john")
            .with("status", Constraint::one_of(["pending"]));
        let json = serde_json::to_string(&spec).unwrap();
        let back: FilterSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }

    fn arb_records() -> impl Strategy<Value = Vec<Transaction>> {
        prop::collection::vec((0u8..3, 0u32..1000, 0u8..3), 0..40).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (status, amount, currency))| {
                    let currency = ["KGS", "USD", "EUR"][currency as usize];
                    let mut t = tx(
                        &format!("t{:03}", i),
                        TransactionStatus::ALL[status as usize],
                        amount as f64,
                        currency,
                    );
                    t.created_at = at(i as i64 * 60);
                    t
                })
                .collect()
        })
    }

    fn arb_constraint() -> impl Strategy<Value = (String, Constraint)> {
        prop_oneof![
            prop::sample::subsequence(vec!["confirmed", "pending", "declined"], 0..=3)
                .prop_map(|s| ("status".to_string(), Constraint::one_of(s))),
            prop::sample::subsequence(vec!["KGS", "USD", "EUR"], 0..=3)
                .prop_map(|s| ("currency".to_string(), Constraint::one_of(s))),
            (proptest::option::of(0u32..1000), proptest::option::of(0u32..1000)).prop_map(|(lo, hi)| {
                (
                    "amount".to_string(),
                    Constraint::Range {
                        min: lo.map(f64::from),
                        max: hi.map(f64::from),
                    },
                )
            }),
            "[a-z0-9]{0,2}".prop_map(|q| ("id".to_string(), Constraint::Contains(q))),
        ]
    }

    fn arb_spec() -> impl Strategy<Value = FilterSpec> {
        prop::collection::vec(arb_constraint(), 0..4).prop_map(|cs| {
            let mut spec = FilterSpec::new();
            for (field, c) in cs {
                spec.set(field, c);
            }
            spec
        })
    }

    proptest! {
        #[test]
        fn filtering_is_idempotent(records in arb_records(), spec in arb_spec()) {
            let once = filter(&records, &spec);
            let twice = filter(&once, &spec);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn adding_a_constraint_never_grows_the_result(
            records in arb_records(),
            spec in arb_spec(),
            extra in arb_constraint(),
        ) {
            let (field, extra) = extra;
            // only add onto a field the spec doesn't constrain yet
            prop_assume!(spec.get(&field).is_none());
            let base = filter(&records, &spec).len();
            let narrowed = filter(&records, &spec.clone().with(field, extra)).len();
            prop_assert!(narrowed <= base);
        }
    }
}
