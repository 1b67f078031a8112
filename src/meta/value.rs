use std::cmp::Ordering;
use std::fmt;

use compact_str::{format_compact, CompactString};
use serde::{Deserialize, Serialize};

/// A single model attribute value, as decoded from a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(CompactString),
    List(Vec<Value>),
}

impl Value {
    pub fn text(s: &str) -> Self {
        Value::Text(CompactString::new(s))
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Value::List(items.into_iter().map(|s| Value::text(s.as_ref())).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Lenient numeric view: numbers as-is, text parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }

    /// String form used to resolve link pointers and group cluster keys.
    /// Whole numbers drop their fractional part so `3.0` and `"3"` resolve alike.
    pub fn as_key(&self) -> Option<CompactString> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(format_compact!("{b}")),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                Some(format_compact!("{}", *n as i64))
            }
            Value::Number(n) => Some(format_compact!("{n}")),
            Value::Text(s) => Some(s.clone()),
            Value::List(items) => {
                let parts: Vec<CompactString> = items.iter().filter_map(Value::as_key).collect();
                Some(CompactString::from(parts.join(",")))
            }
        }
    }

    /// Elements of a list, or the value itself as a single-element sequence.
    /// Null yields an empty sequence.
    pub fn as_sequence(&self) -> Vec<&Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
        }
    }

    /// Total ordering used whenever a kind has no opinion.
    pub fn native_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    let ord = x.native_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_key() {
            Some(k) => f.write_str(&k),
            None => f.write_str(""),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_numeric_parsing() {
        assert_eq!(Value::text(" 12.5 ").as_f64(), Some(12.5));
        assert_eq!(Value::text("abc").as_f64(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert_eq!(Value::Number(f64::NAN).as_f64(), None);
    }

    #[test]
    fn whole_numbers_key_like_text() {
        assert_eq!(Value::Number(3.0).as_key().as_deref(), Some("3"));
        assert_eq!(Value::text("3").as_key().as_deref(), Some("3"));
        assert_eq!(Value::Null.as_key(), None);
    }

    #[test]
    fn decodes_untagged_json() {
        let v: Vec<Value> = serde_json::from_str(r#"[null, true, 4, "x", ["a", "b"]]"#).unwrap();
        assert_eq!(
            v,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Number(4.0),
                Value::text("x"),
                Value::list(["a", "b"]),
            ]
        );
    }
}
