//! Artificial agreeableness detection.

use super::alert::{BiasAlert, BiasType, Severity};
use crate::catalog::{Catalog, Characteristic};
use crate::config::BiasSettings;
use crate::persona::Persona;

/// Loyalty and recommendation above this count as uncritical.
const ENTHUSIASM_THRESHOLD: f64 = 8.0;

pub struct SycophancyDetector<'a> {
    catalog: &'a Catalog,
    settings: &'a BiasSettings,
}

impl<'a> SycophancyDetector<'a> {
    pub fn new(catalog: &'a Catalog, settings: &'a BiasSettings) -> Self {
        Self { catalog, settings }
    }

    fn highly_agreeable(&self, persona: &Persona) -> bool {
        persona
            .number(Characteristic::PersonalityAgreeableness)
            .is_some_and(|a| a > self.settings.agreeableness_threshold)
    }

    /// Customer service and Tigo perception both in their top-two categories.
    fn low_criticism(&self, persona: &Persona) -> bool {
        persona.ranked_within(self.catalog, Characteristic::CustomerServiceExperience, 2)
            && persona.ranked_within(self.catalog, Characteristic::BrandPerceptionTigo, 2)
    }

    pub fn detect(&self, personas: &[Persona]) -> Vec<BiasAlert> {
        let n = personas.len() as f64;
        if personas.is_empty() {
            return Vec::new();
        }
        let mut alerts = Vec::new();

        let agreeable = personas.iter().filter(|p| self.highly_agreeable(p)).count();
        if agreeable as f64 > n * self.settings.highly_agreeable_rate {
            alerts.push(
                BiasAlert::new(
                    BiasType::SycophancyRisk,
                    Severity::Medium,
                    format!("Too many highly agreeable personas ({}/{})", agreeable, personas.len()),
                )
                .affecting(personas, |p| self.highly_agreeable(p))
                .with_mitigation(&[
                    "Reduce agreeableness scores for some personas",
                    "Add more personas with critical perspectives",
                    "Balance personality trait distributions",
                ]),
            );
        }

        let uncritical = personas.iter().filter(|p| self.low_criticism(p)).count();
        if uncritical as f64 > n * self.settings.low_criticism_rate {
            alerts.push(
                BiasAlert::new(
                    BiasType::SycophancyRisk,
                    Severity::High,
                    format!(
                        "Too many personas with only positive experiences ({}/{})",
                        uncritical,
                        personas.len()
                    ),
                )
                .affecting(personas, |p| self.low_criticism(p))
                .with_mitigation(&[
                    "Add personas with mixed/negative experiences",
                    "Include realistic service complaints",
                    "Generate more balanced brand perceptions",
                ]),
            );
        }
        alerts
    }

    /// Per-persona index: mean of agreeableness excess, positive experience
    /// and loyalty factor.
    pub fn persona_index(&self, persona: &Persona) -> f64 {
        let agreeableness_excess = match persona.number(Characteristic::PersonalityAgreeableness) {
            Some(a) if a > 5.0 => ((a - 5.0) / 5.0).min(1.0),
            _ => 0.0,
        };

        let mut positive_experience = 0.0;
        if persona.ranked_within(self.catalog, Characteristic::CustomerServiceExperience, 2) {
            positive_experience += 0.5;
        }
        if persona.ranked_within(self.catalog, Characteristic::BrandPerceptionTigo, 2) {
            positive_experience += 0.5;
        }

        let loyal = persona
            .number(Characteristic::OperatorLoyalty)
            .is_some_and(|x| x > ENTHUSIASM_THRESHOLD);
        let recommends = persona
            .number(Characteristic::RecommendationLikelihood)
            .is_some_and(|x| x > ENTHUSIASM_THRESHOLD);
        let loyalty_factor = if loyal && recommends { 0.7 } else { 0.0 };

        (agreeableness_excess + positive_experience + loyalty_factor) / 3.0
    }

    /// Mean persona index; 0 for an empty batch.
    pub fn index(&self, personas: &[Persona]) -> f64 {
        if personas.is_empty() {
            return 0.0;
        }
        personas.iter().map(|p| self.persona_index(p)).sum::<f64>() / personas.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::test_support::{base_persona, batch_with};
    use crate::catalog::Value;

    fn detector(settings: &BiasSettings) -> SycophancyDetector<'_> {
        SycophancyDetector::new(Catalog::bundled().unwrap(), settings)
    }

    fn flatterer(p: &mut Persona) {
        p.set(Characteristic::PersonalityAgreeableness, Value::Float(10.0));
        p.set(Characteristic::CustomerServiceExperience, Value::from("Excelente"));
        p.set(Characteristic::BrandPerceptionTigo, Value::from("Positiva"));
        p.set(Characteristic::OperatorLoyalty, Value::Float(9.0));
        p.set(Characteristic::RecommendationLikelihood, Value::Int(10));
    }

    #[test]
    fn test_persona_index() {
        let settings = BiasSettings::default();
        let mut p = base_persona();
        assert_eq!(detector(&settings).persona_index(&p), 0.0);

        flatterer(&mut p);
        let expected = (1.0 + 1.0 + 0.7) / 3.0;
        assert!((detector(&settings).persona_index(&p) - expected).abs() < 1e-9);

        p.set(Characteristic::PersonalityAgreeableness, Value::Float(7.5));
        let expected = (0.5 + 1.0 + 0.7) / 3.0;
        assert!((detector(&settings).persona_index(&p) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_alerts() {
        let settings = BiasSettings::default();
        let batch = batch_with(10, |i, p| {
            if i < 7 {
                flatterer(p);
            }
        });
        let alerts = detector(&settings).detect(&batch);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[1].severity, Severity::High);
        assert_eq!(alerts[1].affected_personas.len(), 7);
    }

    #[test]
    fn test_rates_at_threshold_do_not_alert() {
        let settings = BiasSettings::default();
        let batch = batch_with(10, |i, p| {
            if i < 4 {
                flatterer(p);
            }
        });
        assert!(detector(&settings).detect(&batch).is_empty());
    }

    #[test]
    fn test_batch_index() {
        let settings = BiasSettings::default();
        assert_eq!(detector(&settings).index(&[]), 0.0);
        let batch = batch_with(4, |i, p| {
            if i == 0 {
                flatterer(p);
            }
        });
        assert!((detector(&settings).index(&batch) - 0.9 / 4.0).abs() < 1e-9);
    }
}
