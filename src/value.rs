use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Variable bindings owned by one template node.
pub type Scope = IndexMap<String, Value>;

/// A value bound in a [`Scope`] or produced by an expression.
///
/// `List` is an ordered sequence of maps; it drives repetition blocks and
/// renders as its element count everywhere else.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Scope>),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::List(items) => !items.is_empty(),
        }
    }

    /// Numeric coercion used by arithmetic operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => parse_number(s).unwrap_or(0.0),
            Value::List(items) => items.len() as f64,
        }
    }

    /// A numeric view of the value if it has one without guessing: numbers
    /// and strings that look like numbers.
    fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Loose equality across types.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(b), v) | (v, Value::Bool(b)) => *b == v.is_truthy(),
            (Value::Null, Value::Null) => true,
            (Value::Null, v) | (v, Value::Null) => !v.is_truthy(),
            (Value::List(a), Value::List(b)) => a == b,
            (Value::List(items), v) | (v, Value::List(items)) => {
                v.as_numeric() == Some(items.len() as f64)
            }
            (a, b) => match (a.as_numeric(), b.as_numeric()) {
                (Some(x), Some(y)) => x == y,
                _ => a.to_string() == b.to_string(),
            },
        }
    }

    /// Loose ordering across types: two non-numeric strings compare
    /// lexically, everything else numerically. `None` when the operands
    /// cannot be ordered (NaN).
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b))
                if parse_number(a).is_none() || parse_number(b).is_none() =>
            {
                Some(a.cmp(b))
            }
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }
}

/// Parses a string the way a numeric literal is recognised: it must start
/// with a digit (or a sign followed by a digit) and parse completely.
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("1"),
            Value::Bool(false) => Ok(()),
            Value::Number(n) => {
                // No trailing `.0` on whole numbers
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => f.write_str(s),
            Value::List(items) => write!(f, "{}", items.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Scope>> for Value {
    fn from(items: Vec<Scope>) -> Self {
        Value::List(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map(Value::Number).unwrap_or_default(),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Json::Object(map) => {
                            map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
                        }
                        _ => Scope::new(),
                    })
                    .collect(),
            ),
            // Only sequences of maps are structured values
            Json::Object(_) => Value::Null,
        }
    }
}
