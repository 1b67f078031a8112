use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use compact_str::{format_compact, CompactString};

use super::value::Value;

/// Result of clustering a raw attribute value: models sharing a `key` are
/// grouped together and the group is presented with `label`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub key: Value,
    pub label: CompactString,
}

impl Cluster {
    pub fn identity(value: &Value) -> Self {
        Self {
            key: value.clone(),
            label: value.as_key().unwrap_or_default(),
        }
    }
}

/// Per-attribute-type behavior bundle.
///
/// Every method is total: kinds without a specific ordering or grouping
/// fall back to native value ordering and identity clustering.
pub trait Kind: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        a.native_cmp(b)
    }

    fn cluster(&self, value: &Value) -> Cluster {
        Cluster::identity(value)
    }

    fn is_numeric(&self) -> bool {
        false
    }

    fn is_categorical(&self) -> bool {
        false
    }

    /// Maps a model value onto the scale presented to users (and used for coloring).
    fn to_user_scale(&self, value: f64) -> f64 {
        value
    }
}

/// Resolve a kind by the name used in serialized metamodels.
pub fn kind_by_name(name: &str) -> Option<Box<dyn Kind>> {
    let kind: Box<dyn Kind> = match name.to_ascii_lowercase().as_str() {
        "string" => Box::new(StringKind),
        "number" => Box::new(NumberKind),
        "range" => Box::new(RangeKind),
        "logrange" | "logarithmrange" => Box::new(LogarithmRangeKind),
        "date" => Box::new(DateKind::default()),
        "boolean" => Box::new(BooleanKind),
        "category" => Box::new(CategoryKind),
        _ => return None,
    };
    Some(kind)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringKind;

impl Kind for StringKind {
    fn name(&self) -> &'static str {
        "string"
    }

    fn cluster(&self, value: &Value) -> Cluster {
        let first: CompactString = value
            .as_key()
            .and_then(|s| s.chars().next())
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default();
        Cluster {
            key: Value::Text(first.clone()),
            label: first,
        }
    }
}

/// Integer comparison; unparsable values sort after every number.
fn compare_integers(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => (x.trunc()).total_cmp(&y.trunc()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Values up to 10 cluster by their integer part; larger values cluster
/// into ranges one order of magnitude below their own scale.
fn cluster_magnitude(value: &Value) -> Cluster {
    let Some(v) = value.as_f64().filter(|v| v.is_finite()) else {
        return Cluster::identity(value);
    };
    if v <= 10.0 {
        let int_value = v.trunc() as i64;
        return Cluster {
            key: Value::Number(int_value as f64),
            label: format_compact!("{int_value}"),
        };
    }
    // Stays in f64: integer magnitudes overflow past i64::MAX.
    let mut scaled = v.trunc();
    let mut magnitude = 1.0_f64;
    while scaled >= 10.0 {
        scaled = (scaled / 10.0).trunc();
        magnitude *= 10.0;
    }
    let low = (v / magnitude).trunc() * magnitude;
    let high = ((v / magnitude).trunc() + 1.0) * magnitude;
    Cluster {
        key: Value::Number(low),
        label: format_compact!("{low} - {high}"),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NumberKind;

impl Kind for NumberKind {
    fn name(&self) -> &'static str {
        "number"
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        compare_integers(a, b)
    }

    fn cluster(&self, value: &Value) -> Cluster {
        cluster_magnitude(value)
    }

    fn is_numeric(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RangeKind;

impl Kind for RangeKind {
    fn name(&self) -> &'static str {
        "range"
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        compare_integers(a, b)
    }

    fn cluster(&self, value: &Value) -> Cluster {
        cluster_magnitude(value)
    }

    fn is_numeric(&self) -> bool {
        true
    }
}

/// A range whose user-facing scale is logarithmic (`log10(v + 1)`).
#[derive(Debug, Clone, Copy, Default)]
pub struct LogarithmRangeKind;

impl Kind for LogarithmRangeKind {
    fn name(&self) -> &'static str {
        "logrange"
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => compare_integers(a, b),
        }
    }

    fn cluster(&self, value: &Value) -> Cluster {
        cluster_magnitude(value)
    }

    fn is_numeric(&self) -> bool {
        true
    }

    fn to_user_scale(&self, value: f64) -> f64 {
        (value.max(0.0) + 1.0).log10()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateClustering {
    #[default]
    Year,
    Month,
    Day,
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Dates are carried as ISO `YYYY-MM-DD` text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateKind {
    pub cluster_by: DateClustering,
}

impl DateKind {
    pub fn new(cluster_by: DateClustering) -> Self {
        Self { cluster_by }
    }

    fn parse(value: &Value) -> Option<NaiveDate> {
        match value {
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

impl Kind for DateKind {
    fn name(&self) -> &'static str {
        "date"
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (Self::parse(a), Self::parse(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.native_cmp(b),
        }
    }

    // Keys are zero-padded so that lexicographic order matches date order.
    fn cluster(&self, value: &Value) -> Cluster {
        let Some(date) = Self::parse(value) else {
            return Cluster::identity(value);
        };
        let (year, month, day) = (date.year(), date.month0(), date.day());
        let month_name = MONTHS[month as usize];
        let (key, label) = match self.cluster_by {
            DateClustering::Year => (format_compact!("{year}-00-01"), format_compact!("{year}")),
            DateClustering::Month => (
                format_compact!("{year}-{month:02}-01"),
                format_compact!("{year}-{month_name}"),
            ),
            DateClustering::Day => (
                format_compact!("{year}-{month:02}-{day:02}"),
                format_compact!("{year}-{month_name}-{day}"),
            ),
        };
        Cluster {
            key: Value::Text(key),
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanKind;

impl Kind for BooleanKind {
    fn name(&self) -> &'static str {
        "boolean"
    }

    /// `true` comes before `false`.
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let truthy = |v: &Value| matches!(v, Value::Bool(true));
        truthy(b).cmp(&truthy(a))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryKind;

impl Kind for CategoryKind {
    fn name(&self) -> &'static str {
        "category"
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        a.as_sequence().len().cmp(&b.as_sequence().len())
    }

    fn cluster(&self, value: &Value) -> Cluster {
        let key = value.as_key().filter(|k| !k.is_empty());
        let key = key.unwrap_or_else(|| CompactString::new("Nothing"));
        Cluster {
            key: Value::Text(key.clone()),
            label: key,
        }
    }

    fn is_categorical(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_clusters_by_magnitude() {
        let c = NumberKind.cluster(&Value::Number(7.0));
        assert_eq!(c.key, Value::Number(7.0));
        let c = NumberKind.cluster(&Value::Number(345.0));
        assert_eq!(c.key, Value::Number(300.0));
        assert_eq!(c.label, "300 - 400");
    }

    #[test]
    fn huge_numbers_cluster_without_overflow() {
        let c = NumberKind.cluster(&Value::Number(1e20));
        assert_eq!(c.key, Value::Number(1e20));
        assert_eq!(c.label, "100000000000000000000 - 200000000000000000000");
        let c = RangeKind.cluster(&Value::text("2.5e19"));
        assert_eq!(c.key, Value::Number(2e19));

        let c = LogarithmRangeKind.cluster(&Value::Number(f64::INFINITY));
        assert_eq!(c, Cluster::identity(&Value::Number(f64::INFINITY)));
    }

    #[test]
    fn string_clusters_by_initial() {
        let c = StringKind.cluster(&Value::text("banana"));
        assert_eq!(c.label, "B");
    }

    #[test]
    fn booleans_sort_true_first() {
        assert_eq!(
            BooleanKind.compare(&Value::Bool(true), &Value::Bool(false)),
            Ordering::Less
        );
    }

    #[test]
    fn date_keys_sort_lexicographically() {
        let kind = DateKind::new(DateClustering::Month);
        let c = kind.cluster(&Value::text("2010-03-15"));
        assert_eq!(c.key, Value::text("2010-02-01"));
        assert_eq!(c.label, "2010-Mar");
    }

    #[test]
    fn empty_category_clusters_as_nothing() {
        let c = CategoryKind.cluster(&Value::List(vec![]));
        assert_eq!(c.label, "Nothing");
    }

    #[test]
    fn log_scale_shifts_by_one() {
        let k = LogarithmRangeKind;
        assert!((k.to_user_scale(99.0) - 2.0).abs() < 1e-9);
        assert_eq!(k.to_user_scale(0.0), 0.0);
    }
}
