//! Core persona types.
//!
//! A persona is a full set of characteristic values plus a few annotations
//! added during generation and batch validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Catalog, Characteristic, CharacteristicCategory, Traits, Value};

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// One synthetic consumer profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// Drawn with stereotype-breaking sampling.
    #[serde(default)]
    pub counter_stereotypical: bool,

    /// One value per catalog entry.
    pub characteristics: Traits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_imperfection: Option<HumanImperfection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_tendencies: Option<ResponseTendencies>,

    /// Batch-level annotations, attached after diversity enforcement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<PersonaValidation>,
}

impl Persona {
    /// New persona with a fresh id and no annotations.
    pub fn new(characteristics: Traits, counter_stereotypical: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            counter_stereotypical,
            characteristics,
            human_imperfection: None,
            response_tendencies: None,
            validation: None,
        }
    }

    pub fn get(&self, characteristic: Characteristic) -> Option<&Value> {
        self.characteristics.get(&characteristic)
    }

    /// Numeric value, if present and numeric.
    pub fn number(&self, characteristic: Characteristic) -> Option<f64> {
        self.get(characteristic).and_then(Value::as_f64)
    }

    /// Categorical value, if present and categorical.
    pub fn category(&self, characteristic: Characteristic) -> Option<&str> {
        self.get(characteristic).and_then(Value::as_str)
    }

    /// Categorical value equals `option`.
    pub fn is(&self, characteristic: Characteristic, option: &str) -> bool {
        self.category(characteristic) == Some(option)
    }

    /// Categorical value is one of `options`.
    pub fn is_any(&self, characteristic: Characteristic, options: &[&str]) -> bool {
        self.category(characteristic).is_some_and(|v| options.contains(&v))
    }

    /// Categorical value is among the first `n` declared options.
    pub fn ranked_within(&self, catalog: &Catalog, characteristic: Characteristic, n: usize) -> bool {
        self.category(characteristic)
            .and_then(|v| catalog.definition(characteristic).domain.option_rank(v))
            .is_some_and(|rank| rank < n)
    }

    pub fn set(&mut self, characteristic: Characteristic, value: Value) {
        self.characteristics.insert(characteristic, value);
    }

    /// Canonical key of a value, empty when missing.
    pub fn value_key(&self, characteristic: Characteristic) -> String {
        self.get(characteristic).map(Value::key).unwrap_or_default()
    }

    /// Subset of characteristics in a grouping.
    pub fn grouping(&self, catalog: &Catalog, grouping: Grouping) -> Traits {
        catalog
            .definitions()
            .iter()
            .filter(|d| grouping.includes(d.category, d.locale_specific))
            .filter_map(|d| self.get(d.characteristic).map(|v| (d.characteristic, v.clone())))
            .collect()
    }
}

/// Derived views over a persona's characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Demographic,
    /// Behavioral and communication entries
    Behavioral,
    Domain,
    LocaleSpecific,
}

impl Grouping {
    fn includes(&self, category: CharacteristicCategory, locale_specific: bool) -> bool {
        match self {
            Grouping::Demographic => category == CharacteristicCategory::Demographic,
            Grouping::Behavioral => matches!(
                category,
                CharacteristicCategory::Behavioral | CharacteristicCategory::Communication
            ),
            Grouping::Domain => category == CharacteristicCategory::Domain,
            Grouping::LocaleSpecific => locale_specific,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Annotations
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImperfectionKind {
    AttentionFatigue,
    KnowledgeGap,
    ResponseVariability,
}

impl ImperfectionKind {
    pub fn all() -> &'static [ImperfectionKind] {
        &[
            ImperfectionKind::AttentionFatigue,
            ImperfectionKind::KnowledgeGap,
            ImperfectionKind::ResponseVariability,
        ]
    }

    pub fn description(&self) -> &'static str {
        match self {
            ImperfectionKind::AttentionFatigue => "May give shorter answers in long surveys",
            ImperfectionKind::KnowledgeGap => "Has realistic knowledge limitations about telecom technology",
            ImperfectionKind::ResponseVariability => "Slight variations in responses to similar questions",
        }
    }
}

impl fmt::Display for ImperfectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImperfectionKind::AttentionFatigue => write!(f, "attention fatigue"),
            ImperfectionKind::KnowledgeGap => write!(f, "knowledge gap"),
            ImperfectionKind::ResponseVariability => write!(f, "response variability"),
        }
    }
}

/// Realistic inconsistency a persona exhibits when answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanImperfection {
    pub kind: ImperfectionKind,
    pub description: String,
}

impl From<ImperfectionKind> for HumanImperfection {
    fn from(kind: ImperfectionKind) -> Self {
        Self { kind, description: kind.description().to_string() }
    }
}

/// Answering bias of personas with high social desirability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTendencies {
    pub slightly_more_positive: bool,
    pub avoids_extreme_negative: bool,
}

impl Default for ResponseTendencies {
    fn default() -> Self {
        Self { slightly_more_positive: true, avoids_extreme_negative: true }
    }
}

/// How well a persona fits the reference locale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocaleAlignment {
    pub demographic_alignment: f64,
    pub cultural_consistency: f64,
    pub market_realism: f64,
}

/// Per-persona metadata computed over the finished batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonaValidation {
    /// Mean rarity of this persona's key values within the batch
    pub diversity_contribution: f64,
    pub bias_risk_score: f64,
    /// Ids of matched stereotype correlations
    pub stereotype_flags: Vec<String>,
    pub locale_alignment: LocaleAlignment,
    pub requires_human_review: bool,
}
