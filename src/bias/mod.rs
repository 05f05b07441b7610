//! Bias detection framework.
//!
//! Three detectors (stereotype, demographic, sycophancy) run over a batch.
//! Their alerts and the batch metrics feed a hard-AND verdict: the batch
//! passes only when every gate holds.

pub mod alert;
pub mod analysis;
pub mod demographic;
pub mod stereotype;
pub mod sycophancy;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use alert::{BiasAlert, BiasType, Severity};
pub use analysis::DetailedAnalysis;
pub use demographic::DemographicValidator;
pub use stereotype::{StereotypeDetector, PROTECTED_CHARACTERISTICS};
pub use sycophancy::SycophancyDetector;

use crate::catalog::Catalog;
use crate::config::BiasSettings;
use crate::diversity::diversity_score;
use crate::persona::Persona;

// ─────────────────────────────────────────────────────────────────
// Results
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasMetrics {
    pub diversity_score: f64,
    pub sycophancy_index: f64,
    pub demographic_alignment: f64,
    pub stereotype_risk: f64,
    pub counter_stereotypical_rate: f64,
    pub human_imperfection_rate: f64,
}

/// Outcome of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Every gate's outcome; the batch passes only if all pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateReport {
    pub checks: Vec<GateCheck>,
}

impl GateReport {
    fn check(&mut self, name: &str, passed: bool, detail: String) {
        self.checks.push(GateCheck { name: name.to_string(), passed, detail });
    }

    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }

    /// Names of the failed gates.
    pub fn failures(&self) -> Vec<&str> {
        self.checks.iter().filter(|c| !c.passed).map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub analyzed_at: DateTime<Utc>,
    pub total_personas: usize,
    pub alerts: Vec<BiasAlert>,
    pub metrics: BiasMetrics,
    pub gates: GateReport,
    pub validation_passed: bool,
    pub recommendations: Vec<String>,
    pub detailed: DetailedAnalysis,
}

impl BiasAnalysis {
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.alerts.iter().filter(|a| a.severity == severity).count()
    }
}

// ─────────────────────────────────────────────────────────────────
// Framework
// ─────────────────────────────────────────────────────────────────

pub struct BiasFramework<'a> {
    catalog: &'a Catalog,
    settings: BiasSettings,
}

impl<'a> BiasFramework<'a> {
    pub fn new(catalog: &'a Catalog, settings: BiasSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn settings(&self) -> &BiasSettings {
        &self.settings
    }

    /// Run all detectors and gates over a batch.
    pub fn analyze(&self, personas: &[Persona]) -> BiasAnalysis {
        let stereotype = StereotypeDetector::new(self.catalog, &self.settings);
        let demographic = DemographicValidator::new(self.catalog, &self.settings);
        let sycophancy = SycophancyDetector::new(self.catalog, &self.settings);

        let mut alerts = stereotype.detect(personas);
        alerts.extend(demographic.detect(personas));
        alerts.extend(sycophancy.detect(personas));

        let metrics = if personas.is_empty() {
            BiasMetrics::default()
        } else {
            let n = personas.len() as f64;
            BiasMetrics {
                diversity_score: diversity_score(personas),
                sycophancy_index: sycophancy.index(personas),
                demographic_alignment: demographic.alignment(personas),
                stereotype_risk: stereotype.stereotype_risk(personas),
                counter_stereotypical_rate: personas.iter().filter(|p| p.counter_stereotypical).count() as f64 / n,
                human_imperfection_rate: personas.iter().filter(|p| p.human_imperfection.is_some()).count() as f64
                    / n,
            }
        };

        let gates = self.gates(&alerts, &metrics);
        let validation_passed = gates.passed();
        let recommendations = self.recommendations(&alerts, &metrics);
        let detailed = DetailedAnalysis::compute(self.catalog, personas, &demographic.audited(), &sycophancy);

        for alert in &alerts {
            debug!(%alert, "Bias alert");
        }
        info!(
            personas = personas.len(),
            alerts = alerts.len(),
            passed = validation_passed,
            diversity = metrics.diversity_score,
            sycophancy = metrics.sycophancy_index,
            alignment = metrics.demographic_alignment,
            stereotype_risk = metrics.stereotype_risk,
            "Bias analysis complete"
        );

        BiasAnalysis {
            analyzed_at: Utc::now(),
            total_personas: personas.len(),
            alerts,
            metrics,
            gates,
            validation_passed,
            recommendations,
            detailed,
        }
    }

    fn gates(&self, alerts: &[BiasAlert], metrics: &BiasMetrics) -> GateReport {
        let s = &self.settings;
        let critical = alerts.iter().filter(|a| a.severity == Severity::Critical).count();
        let high = alerts.iter().filter(|a| a.severity == Severity::High).count();

        let mut report = GateReport::default();
        report.check("no_critical_alerts", critical == 0, format!("{} critical alerts", critical));
        report.check(
            "high_alerts",
            high <= s.max_high_alerts,
            format!("{} high alerts (max {})", high, s.max_high_alerts),
        );
        report.check(
            "diversity",
            metrics.diversity_score >= s.min_diversity,
            format!("{:.3} (min {:.2})", metrics.diversity_score, s.min_diversity),
        );
        report.check(
            "demographic_alignment",
            metrics.demographic_alignment >= s.min_alignment,
            format!("{:.3} (min {:.2})", metrics.demographic_alignment, s.min_alignment),
        );
        report.check(
            "sycophancy",
            metrics.sycophancy_index <= s.max_sycophancy,
            format!("{:.3} (max {:.2})", metrics.sycophancy_index, s.max_sycophancy),
        );
        report.check(
            "stereotype_risk",
            metrics.stereotype_risk <= s.max_stereotype_risk,
            format!("{:.3} (max {:.2})", metrics.stereotype_risk, s.max_stereotype_risk),
        );
        report
    }

    /// Alert mitigations, then metric advice, without duplicates.
    fn recommendations(&self, alerts: &[BiasAlert], metrics: &BiasMetrics) -> Vec<String> {
        let s = &self.settings;
        let mut advice: Vec<String> = alerts.iter().flat_map(|a| a.mitigation.iter().cloned()).collect();
        if metrics.diversity_score < s.min_diversity {
            advice.push("Increase diversity in key characteristics".to_string());
        }
        if metrics.sycophancy_index > s.max_sycophancy {
            advice.push("Reduce artificial agreeableness in personas".to_string());
        }
        if metrics.counter_stereotypical_rate < s.min_counter_stereotypical_rate {
            advice.push("Generate more counter-stereotypical personas".to_string());
        }
        if metrics.human_imperfection_rate < s.min_imperfection_rate {
            advice.push("Add more realistic human imperfections".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        advice.retain(|a| seen.insert(a.clone()));
        advice
    }
}
