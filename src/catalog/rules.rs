//! Declarative predicates over persona values.
//!
//! The rule table names the stereotype correlations the bias framework
//! looks for, the positivity indicators behind positive-stereotype
//! clustering, and the trait/behavior mismatches the generator repairs.

use serde::{Deserialize, Serialize};

use super::characteristic::Characteristic;
use super::definition::{CharacteristicDefinition, Domain};
use super::value::Traits;
use crate::error::{Error, Result};

/// A test applied to one characteristic value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Test {
    Below(f64),
    Above(f64),
    AtLeast(f64),
    AtMost(f64),
    Equals(String),
    OneOf(Vec<String>),
    /// Categorical value contains the given text
    Contains(String),
    /// Categorical value is among the first `n` declared options
    TopRanked(usize),
}

/// `characteristic` passes `test`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub characteristic: Characteristic,
    pub test: Test,
}

impl Condition {
    /// Evaluate against a persona's values. Missing values never match.
    pub fn holds(&self, traits: &Traits, definitions: &[CharacteristicDefinition]) -> bool {
        let Some(value) = traits.get(&self.characteristic) else {
            return false;
        };
        match &self.test {
            Test::Below(t) => value.as_f64().is_some_and(|x| x < *t),
            Test::Above(t) => value.as_f64().is_some_and(|x| x > *t),
            Test::AtLeast(t) => value.as_f64().is_some_and(|x| x >= *t),
            Test::AtMost(t) => value.as_f64().is_some_and(|x| x <= *t),
            Test::Equals(s) => value.as_str() == Some(s.as_str()),
            Test::OneOf(set) => value.as_str().is_some_and(|v| set.iter().any(|s| s == v)),
            Test::Contains(s) => value.as_str().is_some_and(|v| v.contains(s.as_str())),
            Test::TopRanked(n) => value
                .as_str()
                .and_then(|v| definitions[self.characteristic.index()].domain.option_rank(v))
                .is_some_and(|rank| rank < *n),
        }
    }

    fn check(&self, rule: &str, definitions: &[CharacteristicDefinition]) -> Result<()> {
        let def = &definitions[self.characteristic.index()];
        let invalid = |msg: String| Err(Error::rules(rule, msg));
        match (&self.test, &def.domain) {
            (Test::Below(_) | Test::Above(_) | Test::AtLeast(_) | Test::AtMost(_), Domain::Numerical { .. }) => Ok(()),
            (Test::Below(_) | Test::Above(_) | Test::AtLeast(_) | Test::AtMost(_), _) => {
                invalid(format!("{} is not numerical", def.name()))
            }
            (Test::Equals(s), Domain::Categorical { options }) => {
                if options.contains(s) {
                    Ok(())
                } else {
                    invalid(format!("'{}' is not an option of {}", s, def.name()))
                }
            }
            (Test::OneOf(set), Domain::Categorical { options }) => match set.iter().find(|s| !options.contains(s)) {
                Some(bad) => invalid(format!("'{}' is not an option of {}", bad, def.name())),
                None => Ok(()),
            },
            (Test::Contains(s), Domain::Categorical { options }) => {
                if options.iter().any(|o| o.contains(s.as_str())) {
                    Ok(())
                } else {
                    invalid(format!("no option of {} contains '{}'", def.name(), s))
                }
            }
            (Test::TopRanked(n), Domain::Categorical { options }) => {
                if *n > 0 && *n <= options.len() {
                    Ok(())
                } else {
                    invalid(format!("top_ranked({}) out of range for {}", n, def.name()))
                }
            }
            _ => invalid(format!("{} is not categorical", def.name())),
        }
    }
}

/// Problematic stereotype correlation: all conditions hold together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelationRule {
    pub id: String,
    /// Human-readable description of the stereotype
    pub pattern: String,
    pub when: Vec<Condition>,
}

impl CorrelationRule {
    pub fn matches(&self, traits: &Traits, definitions: &[CharacteristicDefinition]) -> bool {
        !self.when.is_empty() && self.when.iter().all(|c| c.holds(traits, definitions))
    }
}

/// One signal of uniformly positive sentiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositivityIndicator {
    pub id: String,
    pub when: Condition,
}

/// Trait/behavior mismatch repaired by resampling `resample` from `choices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsistencyRule {
    pub id: String,
    pub when: Vec<Condition>,
    pub resample: Characteristic,
    pub choices: Vec<String>,
}

impl ConsistencyRule {
    pub fn applies(&self, traits: &Traits, definitions: &[CharacteristicDefinition]) -> bool {
        !self.when.is_empty() && self.when.iter().all(|c| c.holds(traits, definitions))
    }
}

/// All rules from `rules.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default, rename = "correlation")]
    pub correlations: Vec<CorrelationRule>,
    #[serde(default, rename = "positivity_indicator")]
    pub positivity_indicators: Vec<PositivityIndicator>,
    #[serde(default, rename = "consistency")]
    pub consistency: Vec<ConsistencyRule>,
}

impl RuleSet {
    pub(crate) fn from_toml(src: &str, definitions: &[CharacteristicDefinition]) -> Result<Self> {
        let rules: RuleSet = toml::from_str(src).map_err(|e| Error::rules("<file>", e.to_string()))?;
        rules.check(definitions)?;
        Ok(rules)
    }

    fn check(&self, definitions: &[CharacteristicDefinition]) -> Result<()> {
        for rule in &self.correlations {
            if rule.when.is_empty() {
                return Err(Error::rules(&rule.id, "correlation has no conditions"));
            }
            for cond in &rule.when {
                cond.check(&rule.id, definitions)?;
            }
        }
        for indicator in &self.positivity_indicators {
            indicator.when.check(&indicator.id, definitions)?;
        }
        for rule in &self.consistency {
            for cond in &rule.when {
                cond.check(&rule.id, definitions)?;
            }
            let options = definitions[rule.resample.index()].options();
            if options.is_empty() {
                return Err(Error::rules(&rule.id, format!("{} is not categorical", rule.resample)));
            }
            if rule.choices.is_empty() {
                return Err(Error::rules(&rule.id, "no replacement choices"));
            }
            if let Some(bad) = rule.choices.iter().find(|c| !options.contains(c)) {
                return Err(Error::rules(&rule.id, format!("'{}' is not an option of {}", bad, rule.resample)));
            }
        }
        Ok(())
    }

    pub fn correlation(&self, id: &str) -> Option<&CorrelationRule> {
        self.correlations.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Value};

    fn defs() -> &'static [CharacteristicDefinition] {
        Catalog::bundled().unwrap().definitions()
    }

    fn traits(pairs: &[(Characteristic, Value)]) -> Traits {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn test_numeric_tests() {
        let t = traits(&[(Characteristic::Age, Value::Int(24))]);
        let below = Condition { characteristic: Characteristic::Age, test: Test::Below(25.0) };
        let at_least = Condition { characteristic: Characteristic::Age, test: Test::AtLeast(24.0) };
        let above = Condition { characteristic: Characteristic::Age, test: Test::Above(24.0) };
        assert!(below.holds(&t, defs()));
        assert!(at_least.holds(&t, defs()));
        assert!(!above.holds(&t, defs()));
    }

    #[test]
    fn test_top_ranked_uses_option_order() {
        let cond = Condition {
            characteristic: Characteristic::CustomerServiceExperience,
            test: Test::TopRanked(2),
        };
        let good = traits(&[(Characteristic::CustomerServiceExperience, Value::from("Buena"))]);
        let fair = traits(&[(Characteristic::CustomerServiceExperience, Value::from("Regular"))]);
        assert!(cond.holds(&good, defs()));
        assert!(!cond.holds(&fair, defs()));
    }

    #[test]
    fn test_missing_value_never_matches() {
        let cond = Condition { characteristic: Characteristic::Gender, test: Test::Equals("Femenino".into()) };
        assert!(!cond.holds(&Traits::new(), defs()));
    }

    #[test]
    fn test_bundled_age_income_rule() {
        let rules = Catalog::bundled().unwrap().rules();
        let rule = rules.correlation("age_income").unwrap();
        let young_rich = traits(&[
            (Characteristic::Age, Value::Int(22)),
            (Characteristic::IncomeBracket, Value::from("Alto (> L.60,000)")),
        ]);
        let young_mid = traits(&[
            (Characteristic::Age, Value::Int(22)),
            (Characteristic::IncomeBracket, Value::from("Medio-alto (L.40,000-60,000)")),
        ]);
        assert!(rule.matches(&young_rich, defs()));
        assert!(!rule.matches(&young_mid, defs()));
    }

    #[test]
    fn test_rejects_bad_rules() {
        let bad_option = r#"
[[correlation]]
id = "x"
pattern = "x"
when = [{ characteristic = "gender", test = { equals = "Otro" } }]
"#;
        assert!(RuleSet::from_toml(bad_option, defs()).is_err());

        let numeric_on_category = r#"
[[correlation]]
id = "x"
pattern = "x"
when = [{ characteristic = "gender", test = { below = 3.0 } }]
"#;
        assert!(RuleSet::from_toml(numeric_on_category, defs()).is_err());

        let bad_choice = r#"
[[consistency]]
id = "x"
when = [{ characteristic = "age", test = { below = 30.0 } }]
resample = "social_media_activity"
choices = ["Hiperactivo"]
"#;
        assert!(RuleSet::from_toml(bad_choice, defs()).is_err());
    }
}
