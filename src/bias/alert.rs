//! Bias alerts raised by the detectors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persona::Persona;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasType {
    StereotypeCorrelation,
    LackOfDiversity,
    PositiveStereotype,
    DemographicMismatch,
    SycophancyRisk,
}

impl fmt::Display for BiasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BiasType::StereotypeCorrelation => "stereotype_correlation",
            BiasType::LackOfDiversity => "lack_of_diversity",
            BiasType::PositiveStereotype => "positive_stereotype",
            BiasType::DemographicMismatch => "demographic_mismatch",
            BiasType::SycophancyRisk => "sycophancy_risk",
        };
        write!(f, "{}", s)
    }
}

/// Alert severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAlert {
    pub bias_type: BiasType,
    pub severity: Severity,
    pub description: String,

    /// Personas that exhibit the pattern
    #[serde(default)]
    pub affected_personas: Vec<Uuid>,

    #[serde(default)]
    pub mitigation: Vec<String>,

    pub detected_at: DateTime<Utc>,
}

impl BiasAlert {
    pub fn new(bias_type: BiasType, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            bias_type,
            severity,
            description: description.into(),
            affected_personas: Vec::new(),
            mitigation: Vec::new(),
            detected_at: Utc::now(),
        }
    }

    /// Record the ids of the personas matching `pred`.
    pub fn affecting<'a, I, F>(mut self, personas: I, pred: F) -> Self
    where
        I: IntoIterator<Item = &'a Persona>,
        F: Fn(&Persona) -> bool,
    {
        self.affected_personas = personas.into_iter().filter(|p| pred(p)).map(|p| p.id).collect();
        self
    }

    pub fn with_mitigation(mut self, steps: &[&str]) -> Self {
        self.mitigation = steps.iter().map(|s| s.to_string()).collect();
        self
    }
}

impl fmt::Display for BiasAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.bias_type, self.description)
    }
}
