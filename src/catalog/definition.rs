//! Characteristic definitions and their value domains.

use serde::{Deserialize, Serialize};

use super::characteristic::{Characteristic, CharacteristicCategory, StereotypeRisk};
use super::value::Value;
use crate::error::{Error, Result};

/// Tolerance for float range checks.
const RANGE_EPSILON: f64 = 1e-9;

/// Allowed values of a characteristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    Categorical { options: Vec<String> },
    Numerical { min: f64, max: f64, integer: bool },
    Boolean,
    /// Free text; `examples` seed generation but do not restrict values.
    Text { examples: Vec<String> },
}

impl Domain {
    /// Whether `value` lies within this domain.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Domain::Categorical { options }, Value::Category(s)) => options.iter().any(|o| o == s),
            (Domain::Numerical { min, max, integer: true }, Value::Int(n)) => {
                let n = *n as f64;
                n >= *min - RANGE_EPSILON && n <= *max + RANGE_EPSILON
            }
            (Domain::Numerical { min, max, integer: false }, v @ (Value::Int(_) | Value::Float(_))) => {
                let x = v.as_f64().unwrap_or(f64::NAN);
                x >= *min - RANGE_EPSILON && x <= *max + RANGE_EPSILON
            }
            (Domain::Boolean, Value::Bool(_)) => true,
            (Domain::Text { .. }, Value::Category(_)) => true,
            _ => false,
        }
    }

    /// Position of a categorical option in declaration order.
    pub fn option_rank(&self, value: &str) -> Option<usize> {
        match self {
            Domain::Categorical { options } => options.iter().position(|o| o == value),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Domain::Categorical { .. } => "categorical",
            Domain::Numerical { .. } => "numerical",
            Domain::Boolean => "boolean",
            Domain::Text { .. } => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Domain::Numerical { .. })
    }
}

/// Which half of a numeric range counter-stereotypical draws come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterHalf {
    Lower,
    Upper,
}

/// Immutable description of one characteristic.
#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicDefinition {
    pub characteristic: Characteristic,
    pub category: CharacteristicCategory,
    pub domain: Domain,
    /// Importance weight used in scoring
    pub weight: f64,
    /// Requires bias-aware handling
    pub ethical_flag: bool,
    pub stereotype_risk: StereotypeRisk,
    /// Sampled from the reference demographics when one binds to it
    pub locale_specific: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_half: Option<CounterHalf>,
}

impl CharacteristicDefinition {
    pub fn name(&self) -> &'static str {
        self.characteristic.name()
    }

    /// Declared options; empty for non-categorical entries.
    pub fn options(&self) -> &[String] {
        match &self.domain {
            Domain::Categorical { options } => options,
            _ => &[],
        }
    }

    /// Short human-readable description of the domain.
    pub fn domain_summary(&self) -> String {
        match &self.domain {
            Domain::Categorical { options } => options.join(" | "),
            Domain::Numerical { min, max, integer: true } => format!("{}..={} (integer)", min, max),
            Domain::Numerical { min, max, integer: false } => format!("{:.1}..={:.1}", min, max),
            Domain::Boolean => "true | false".to_string(),
            Domain::Text { .. } => "free text".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// TOML Representation
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DataKind {
    Categorical,
    Numerical,
    Boolean,
    Text,
}

fn default_weight() -> f64 {
    1.0
}

/// A `[[characteristic]]` table as written in `catalog.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawDefinition {
    name: Characteristic,
    category: CharacteristicCategory,
    kind: DataKind,
    #[serde(default)]
    options: Vec<String>,
    min: Option<f64>,
    max: Option<f64>,
    #[serde(default)]
    integer: bool,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    ethical_flag: bool,
    #[serde(default)]
    stereotype_risk: StereotypeRisk,
    #[serde(default)]
    locale_specific: bool,
    counter_half: Option<CounterHalf>,
}

impl TryFrom<RawDefinition> for CharacteristicDefinition {
    type Error = Error;

    fn try_from(raw: RawDefinition) -> Result<Self> {
        let name = raw.name.name();

        if !(raw.weight >= 0.0) {
            return Err(Error::catalog(format!("{}: weight must be non-negative", name)));
        }

        let domain = match raw.kind {
            DataKind::Categorical => {
                if raw.options.is_empty() {
                    return Err(Error::catalog(format!("{}: categorical entry needs options", name)));
                }
                let mut seen = std::collections::HashSet::new();
                if let Some(dup) = raw.options.iter().find(|o| !seen.insert(o.as_str())) {
                    return Err(Error::catalog(format!("{}: duplicate option '{}'", name, dup)));
                }
                Domain::Categorical { options: raw.options }
            }
            DataKind::Numerical => {
                let (min, max) = match (raw.min, raw.max) {
                    (Some(min), Some(max)) => (min, max),
                    _ => return Err(Error::catalog(format!("{}: numerical entry needs min and max", name))),
                };
                if min > max {
                    return Err(Error::catalog(format!("{}: min {} exceeds max {}", name, min, max)));
                }
                Domain::Numerical { min, max, integer: raw.integer }
            }
            DataKind::Boolean => Domain::Boolean,
            DataKind::Text => Domain::Text { examples: raw.options },
        };

        if raw.counter_half.is_some() && !domain.is_numeric() {
            return Err(Error::catalog(format!("{}: counter_half only applies to numerical entries", name)));
        }

        Ok(CharacteristicDefinition {
            characteristic: raw.name,
            category: raw.category,
            domain,
            weight: raw.weight,
            ethical_flag: raw.ethical_flag,
            stereotype_risk: raw.stereotype_risk,
            locale_specific: raw.locale_specific,
            counter_half: raw.counter_half,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Result<CharacteristicDefinition> {
        let raw: RawDefinition = toml::from_str(src).map_err(|e| Error::catalog(e.to_string()))?;
        CharacteristicDefinition::try_from(raw)
    }

    #[test]
    fn test_categorical_domain() {
        let def = parse(r#"
name = "gender"
category = "demographic"
kind = "categorical"
options = ["Masculino", "Femenino"]
stereotype_risk = "high"
"#).unwrap();
        assert!(def.domain.contains(&Value::from("Femenino")));
        assert!(!def.domain.contains(&Value::from("Otro")));
        assert!(!def.domain.contains(&Value::Int(1)));
        assert_eq!(def.domain.option_rank("Femenino"), Some(1));
        assert_eq!(def.weight, 1.0);
    }

    #[test]
    fn test_integer_domain_rejects_floats() {
        let def = parse(r#"
name = "age"
category = "demographic"
kind = "numerical"
min = 18
max = 75
integer = true
"#).unwrap();
        assert!(def.domain.contains(&Value::Int(18)));
        assert!(def.domain.contains(&Value::Int(75)));
        assert!(!def.domain.contains(&Value::Int(76)));
        assert!(!def.domain.contains(&Value::Float(30.5)));
    }

    #[test]
    fn test_float_domain_accepts_ints() {
        let def = parse(r#"
name = "stress_level"
category = "lifestyle"
kind = "numerical"
min = 1
max = 10
"#).unwrap();
        assert!(def.domain.contains(&Value::Float(9.9)));
        assert!(def.domain.contains(&Value::Int(10)));
        assert!(!def.domain.contains(&Value::Float(10.2)));
    }

    #[test]
    fn test_invalid_definitions() {
        assert!(parse("name = \"gender\"\ncategory = \"demographic\"\nkind = \"categorical\"\n").is_err());
        assert!(parse("name = \"age\"\ncategory = \"demographic\"\nkind = \"numerical\"\nmin = 80\nmax = 18\n").is_err());
        assert!(parse("name = \"age\"\ncategory = \"demographic\"\nkind = \"numerical\"\nmin = 18\n").is_err());
        assert!(parse("name = \"gender\"\ncategory = \"demographic\"\nkind = \"categorical\"\noptions = [\"A\", \"A\"]\n").is_err());
        assert!(parse("name = \"gender\"\ncategory = \"demographic\"\nkind = \"categorical\"\noptions = [\"A\"]\ncounter_half = \"lower\"\n").is_err());
    }
}
