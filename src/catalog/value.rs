//! Typed characteristic values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Characteristic;

/// One value per characteristic, in catalog order.
pub type Traits = BTreeMap<Characteristic, Value>;

/// A single characteristic value.
///
/// Serialized untagged, so a persona's characteristics read as a plain
/// JSON object (`{"age": 34, "gender": "Femenino", ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Category(String),
}

impl Value {
    /// Numeric view of `Int` and `Float` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Text of a categorical value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Category(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Canonical form used when counting distinct values.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:.1}", x),
            Value::Category(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Category(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Round to one decimal place, the resolution of float characteristics.
pub fn round_tenth(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        assert_eq!(Value::Float(7.24).key(), "7.2");
        assert_eq!(Value::Float(7.0).key(), "7.0");
        assert_eq!(Value::Int(34).key(), "34");
        assert_eq!(Value::from("Rural").key(), "Rural");
        assert_eq!(Value::Bool(true).key(), "true");
    }

    #[test]
    fn test_untagged_json() {
        let values = vec![Value::Int(34), Value::Float(6.5), Value::from("Tigo"), Value::Bool(false)];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[34,6.5,"Tigo",false]"#);

        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::from("x").as_f64(), None);
        assert_eq!(round_tenth(3.14159), 3.1);
    }
}
