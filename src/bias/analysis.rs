//! Descriptive breakdowns attached to every bias analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::alert::Severity;
use super::sycophancy::SycophancyDetector;
use crate::catalog::{Catalog, Characteristic, ReferenceDistribution};
use crate::persona::Persona;

const BIG_FIVE: [Characteristic; 5] = [
    Characteristic::PersonalityOpenness,
    Characteristic::PersonalityConscientiousness,
    Characteristic::PersonalityExtraversion,
    Characteristic::PersonalityAgreeableness,
    Characteristic::PersonalityNeuroticism,
];

const DOMAIN_PATTERNS: [Characteristic; 3] = [
    Characteristic::ServiceType,
    Characteristic::CurrentOperator,
    Characteristic::MonthlySpend,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Count {
    pub count: usize,
    pub share: f64,
}

/// Observed composition of one reference distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub distribution: String,
    /// Bucket label to observed count, in bucket order
    pub buckets: Vec<(String, Count)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitStats {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Share at or below 3
    pub low: f64,
    pub medium: f64,
    /// Share at or above 8
    pub high: f64,
}

impl TraitStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let low = values.iter().filter(|v| **v <= 3.0).count() as f64 / n;
        let high = values.iter().filter(|v| **v >= 8.0).count() as f64 / n;
        Some(Self {
            mean,
            std: var.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            low,
            medium: 1.0 - low - high,
            high,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRisk {
    pub group: String,
    pub count: usize,
    pub sycophancy_index: f64,
    /// High above 0.5, medium above 0.3
    pub risk_level: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedAnalysis {
    pub demographic_breakdown: Vec<Breakdown>,
    pub personality: BTreeMap<Characteristic, TraitStats>,
    pub domain_patterns: BTreeMap<Characteristic, BTreeMap<String, Count>>,
    pub risk_by_age_group: Vec<GroupRisk>,
}

impl DetailedAnalysis {
    pub fn compute(
        catalog: &Catalog,
        personas: &[Persona],
        audited: &[&ReferenceDistribution],
        sycophancy: &SycophancyDetector<'_>,
    ) -> Self {
        if personas.is_empty() {
            return Self::default();
        }
        let n = personas.len();
        let share = |count: usize| Count { count, share: count as f64 / n as f64 };

        let demographic_breakdown = audited
            .iter()
            .map(|dist| {
                let mut counts = vec![0usize; dist.buckets.len()];
                for p in personas {
                    if let Some(i) = p.get(dist.characteristic).and_then(|v| dist.bucket_of(v)) {
                        counts[i] += 1;
                    }
                }
                Breakdown {
                    distribution: dist.id.clone(),
                    buckets: dist
                        .buckets
                        .iter()
                        .zip(counts)
                        .map(|(b, c)| (b.label.clone(), share(c)))
                        .collect(),
                }
            })
            .collect();

        let personality = BIG_FIVE
            .iter()
            .filter_map(|c| {
                let values: Vec<f64> = personas.iter().filter_map(|p| p.number(*c)).collect();
                TraitStats::from_values(&values).map(|s| (*c, s))
            })
            .collect();

        let domain_patterns = DOMAIN_PATTERNS
            .iter()
            .map(|c| {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for p in personas {
                    if let Some(v) = p.get(*c) {
                        *counts.entry(v.key()).or_insert(0) += 1;
                    }
                }
                (*c, counts.into_iter().map(|(k, v)| (k, share(v))).collect())
            })
            .collect();

        let risk_by_age_group = match catalog.reference().for_characteristic(Characteristic::Age) {
            Some(ages) => ages
                .buckets
                .iter()
                .enumerate()
                .filter_map(|(i, bucket)| {
                    let group: Vec<Persona> = personas
                        .iter()
                        .filter(|p| p.get(Characteristic::Age).and_then(|v| ages.bucket_of(v)) == Some(i))
                        .cloned()
                        .collect();
                    if group.is_empty() {
                        return None;
                    }
                    let index = sycophancy.index(&group);
                    let risk_level = if index > 0.5 {
                        Severity::High
                    } else if index > 0.3 {
                        Severity::Medium
                    } else {
                        Severity::Low
                    };
                    Some(GroupRisk {
                        group: bucket.label.clone(),
                        count: group.len(),
                        sycophancy_index: index,
                        risk_level,
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            demographic_breakdown,
            personality,
            domain_patterns,
            risk_by_age_group,
        }
    }
}
