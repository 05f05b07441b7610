//! Comparison of batch composition against the reference demographics.

use tracing::warn;

use super::alert::{BiasAlert, BiasType, Severity};
use crate::catalog::{Catalog, ReferenceDistribution};
use crate::config::BiasSettings;
use crate::persona::Persona;

pub struct DemographicValidator<'a> {
    catalog: &'a Catalog,
    settings: &'a BiasSettings,
}

impl<'a> DemographicValidator<'a> {
    pub fn new(catalog: &'a Catalog, settings: &'a BiasSettings) -> Self {
        Self { catalog, settings }
    }

    /// Reference distributions named in `audited_distributions`.
    pub fn audited(&self) -> Vec<&'a ReferenceDistribution> {
        let reference = self.catalog.reference();
        self.settings
            .audited_distributions
            .iter()
            .filter_map(|id| {
                let found = reference.get(id);
                if found.is_none() {
                    warn!(distribution = %id, "Audited distribution not found in reference data");
                }
                found
            })
            .collect()
    }

    pub fn detect(&self, personas: &[Persona]) -> Vec<BiasAlert> {
        if personas.is_empty() {
            return Vec::new();
        }
        let mut alerts = Vec::new();
        for dist in self.audited() {
            let escalated = self.settings.escalated_distributions.iter().any(|id| *id == dist.id);
            let actual = dist.actual_shares(personas.iter().map(|p| &p.characteristics));
            for (bucket, a) in dist.buckets.iter().zip(actual) {
                let diff = (a - bucket.share).abs();
                if diff <= self.settings.mismatch_tolerance {
                    continue;
                }
                let severity = if escalated && diff > self.settings.mismatch_high_delta {
                    Severity::High
                } else {
                    Severity::Medium
                };
                let adjust = format!("Adjust {} generation to match reference demographics", dist.title.to_lowercase());
                let target = format!("Target {:.1}% for {}", bucket.share * 100.0, bucket.label);
                alerts.push(
                    BiasAlert::new(
                        BiasType::DemographicMismatch,
                        severity,
                        format!(
                            "{} {}: {:.1}% vs expected {:.1}%",
                            dist.title,
                            bucket.label,
                            a * 100.0,
                            bucket.share * 100.0
                        ),
                    )
                    .with_mitigation(&[adjust.as_str(), target.as_str()]),
                );
            }
        }
        alerts
    }

    /// Mean alignment over the audited distributions; 0 for an empty batch.
    pub fn alignment(&self, personas: &[Persona]) -> f64 {
        let audited = self.audited();
        if personas.is_empty() || audited.is_empty() {
            return 0.0;
        }
        audited
            .iter()
            .map(|d| d.alignment(&d.actual_shares(personas.iter().map(|p| &p.characteristics))))
            .sum::<f64>()
            / audited.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::test_support::batch_with;
    use crate::catalog::{Characteristic, Value};

    fn validator(settings: &BiasSettings) -> DemographicValidator<'_> {
        DemographicValidator::new(Catalog::bundled().unwrap(), settings)
    }

    #[test]
    fn test_empty_batch() {
        let settings = BiasSettings::default();
        assert!(validator(&settings).detect(&[]).is_empty());
        assert_eq!(validator(&settings).alignment(&[]), 0.0);
    }

    #[test]
    fn test_unknown_audited_distribution_is_skipped() {
        let settings = BiasSettings {
            audited_distributions: vec!["gender".into(), "shoe_size".into()],
            ..BiasSettings::default()
        };
        assert_eq!(validator(&settings).audited().len(), 1);
    }

    #[test]
    fn test_income_mismatch_escalates() {
        let settings = BiasSettings {
            audited_distributions: vec!["income".into(), "gender".into()],
            ..BiasSettings::default()
        };
        // Everyone in the top bracket: Bajo is 45 points short, Alto 97 points over.
        let batch = batch_with(10, |i, p| {
            p.set(Characteristic::IncomeBracket, Value::from("Alto (> L.60,000)"));
            let gender = if i % 2 == 0 { "Masculino" } else { "Femenino" };
            p.set(Characteristic::Gender, Value::from(gender));
        });
        let alerts = validator(&settings).detect(&batch);
        assert!(alerts.iter().all(|a| a.bias_type == BiasType::DemographicMismatch));
        // Bajo, Medio-bajo, Medio and Alto miss by more than 0.15; Medio-alto by 0.07.
        assert_eq!(alerts.len(), 4);
        let high = alerts.iter().filter(|a| a.severity == Severity::High).count();
        assert_eq!(high, 2);
    }

    #[test]
    fn test_gender_mismatch_never_escalates() {
        let settings = BiasSettings {
            audited_distributions: vec!["gender".into()],
            ..BiasSettings::default()
        };
        let batch = batch_with(10, |_, p| p.set(Characteristic::Gender, Value::from("Masculino")));
        let alerts = validator(&settings).detect(&batch);
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::Medium));
    }

    #[test]
    fn test_alignment_of_matching_batch() {
        let settings = BiasSettings {
            audited_distributions: vec!["gender".into()],
            ..BiasSettings::default()
        };
        let batch = batch_with(100, |i, p| {
            let gender = if i < 49 { "Masculino" } else { "Femenino" };
            p.set(Characteristic::Gender, Value::from(gender));
        });
        assert!((validator(&settings).alignment(&batch) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_alignment_includes_region() {
        let settings = BiasSettings::default();
        let v = validator(&settings);
        let audited = v.audited();
        let ids: Vec<&str> = audited.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["age", "gender", "income", "region"]);

        let batch = batch_with(20, |i, p| {
            let gender = if i % 2 == 0 { "Masculino" } else { "Femenino" };
            p.set(Characteristic::Gender, Value::from(gender));
        });
        let reference = Catalog::bundled().unwrap().reference();
        let expected = ids
            .iter()
            .map(|id| {
                let d = reference.get(id).unwrap();
                d.alignment(&d.actual_shares(batch.iter().map(|p| &p.characteristics)))
            })
            .sum::<f64>()
            / 4.0;
        assert!((v.alignment(&batch) - expected).abs() < 1e-9);
    }
}
