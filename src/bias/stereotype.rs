//! Stereotype detection: correlated traits, dominant values of protected
//! characteristics, and clusters of uniformly positive personas.

use std::collections::HashMap;

use tracing::debug;

use super::alert::{BiasAlert, BiasType, Severity};
use crate::catalog::{Catalog, Characteristic};
use crate::config::BiasSettings;
use crate::persona::Persona;

/// Characteristics checked for a dominant value.
pub const PROTECTED_CHARACTERISTICS: [Characteristic; 7] = [
    Characteristic::Gender,
    Characteristic::Age,
    Characteristic::EducationLevel,
    Characteristic::IncomeBracket,
    Characteristic::GeographicRegion,
    Characteristic::ReligiousSpirituality,
    Characteristic::MaritalStatus,
];

pub struct StereotypeDetector<'a> {
    catalog: &'a Catalog,
    settings: &'a BiasSettings,
}

impl<'a> StereotypeDetector<'a> {
    pub fn new(catalog: &'a Catalog, settings: &'a BiasSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn detect(&self, personas: &[Persona]) -> Vec<BiasAlert> {
        if personas.is_empty() {
            return Vec::new();
        }
        let mut alerts = self.correlations(personas);
        alerts.extend(self.dominant_values(personas));
        alerts.extend(self.positive_clusters(personas));
        alerts
    }

    /// Number of correlation rules a persona matches.
    pub fn matched_correlations(&self, persona: &Persona) -> usize {
        self.catalog
            .rules()
            .correlations
            .iter()
            .filter(|r| r.matches(&persona.characteristics, self.catalog.definitions()))
            .count()
    }

    /// Mean per-persona `min(1, risk_per_correlation × matches)`.
    pub fn stereotype_risk(&self, personas: &[Persona]) -> f64 {
        if personas.is_empty() {
            return 0.0;
        }
        personas
            .iter()
            .map(|p| (self.settings.risk_per_correlation * self.matched_correlations(p) as f64).min(1.0))
            .sum::<f64>()
            / personas.len() as f64
    }

    fn correlations(&self, personas: &[Persona]) -> Vec<BiasAlert> {
        let definitions = self.catalog.definitions();
        let mut alerts = Vec::new();
        for rule in &self.catalog.rules().correlations {
            let matches = personas
                .iter()
                .filter(|p| rule.matches(&p.characteristics, definitions))
                .count();
            let rate = matches as f64 / personas.len() as f64;
            debug!(rule = %rule.id, rate, "Correlation match rate");
            if rate > self.settings.correlation_alert_rate {
                let severity = if rate > self.settings.correlation_high_rate {
                    Severity::High
                } else {
                    Severity::Medium
                };
                alerts.push(
                    BiasAlert::new(
                        BiasType::StereotypeCorrelation,
                        severity,
                        format!("High correlation detected: {} ({:.1}%)", rule.pattern, rate * 100.0),
                    )
                    .affecting(personas, |p| rule.matches(&p.characteristics, definitions))
                    .with_mitigation(&[
                        "Generate more counter-stereotypical examples",
                        "Review correlation logic in generation",
                        "Increase diversity in affected characteristics",
                    ]),
                );
            }
        }
        alerts
    }

    fn dominant_values(&self, personas: &[Persona]) -> Vec<BiasAlert> {
        let mut alerts = Vec::new();
        for c in PROTECTED_CHARACTERISTICS {
            let mut counts: HashMap<String, usize> = HashMap::new();
            let mut total = 0usize;
            for p in personas {
                if let Some(v) = p.get(c) {
                    *counts.entry(v.key()).or_insert(0) += 1;
                    total += 1;
                }
            }
            // Ties go to the lexically smallest value so output is stable.
            let Some((dominant, count)) = counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            else {
                continue;
            };

            let share = count as f64 / total as f64;
            if share <= self.settings.dominance_share {
                continue;
            }
            let severity = if share > self.settings.dominance_high_share {
                Severity::High
            } else if share > self.settings.dominance_medium_share {
                Severity::Medium
            } else {
                Severity::Low
            };

            let mitigation = format!("Increase diversity in {}", c);
            alerts.push(
                BiasAlert::new(
                    BiasType::LackOfDiversity,
                    severity,
                    format!("Low diversity in {}: {} represents {:.1}%", c, dominant, share * 100.0),
                )
                .affecting(personas, |p| p.get(c).is_some_and(|v| v.key() == dominant))
                .with_mitigation(&[
                    mitigation.as_str(),
                    "Apply stratified sampling",
                    "Review generation weights for this characteristic",
                ]),
            );
        }
        alerts
    }

    /// Persona holds at least `positivity_indicator_rate` of the indicators.
    pub fn is_uniformly_positive(&self, persona: &Persona) -> bool {
        let indicators = &self.catalog.rules().positivity_indicators;
        if indicators.is_empty() {
            return false;
        }
        let held = indicators
            .iter()
            .filter(|i| i.when.holds(&persona.characteristics, self.catalog.definitions()))
            .count();
        held as f64 / indicators.len() as f64 >= self.settings.positivity_indicator_rate
    }

    fn positive_clusters(&self, personas: &[Persona]) -> Option<BiasAlert> {
        let positive = personas.iter().filter(|p| self.is_uniformly_positive(p)).count();
        if positive as f64 <= personas.len() as f64 * self.settings.positivity_batch_rate {
            return None;
        }
        Some(
            BiasAlert::new(
                BiasType::PositiveStereotype,
                Severity::Medium,
                format!("Too many unrealistically positive personas ({}/{})", positive, personas.len()),
            )
            .affecting(personas, |p| self.is_uniformly_positive(p))
            .with_mitigation(&[
                "Add more realistic mixed experiences",
                "Include personas with legitimate complaints",
                "Balance positive and negative characteristics",
            ]),
        )
    }
}
