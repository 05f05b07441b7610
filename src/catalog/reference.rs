//! Reference demographic model.
//!
//! Each distribution binds to one characteristic and splits its values into
//! buckets with an expected population share. The same buckets drive
//! weighted sampling, the demographic-mismatch detector and the alignment
//! metrics.

use serde::{Deserialize, Serialize};

use super::characteristic::Characteristic;
use super::definition::{CharacteristicDefinition, Domain};
use super::value::{Traits, Value};
use crate::error::{Error, Result};

/// How a bucket recognizes its values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketMatch {
    /// Categorical options covered by the bucket
    Values(Vec<String>),
    /// Inclusive numeric range
    Range { min: f64, max: f64 },
}

/// One category of a reference distribution.
#[derive(Debug, Clone, Serialize)]
pub struct Bucket {
    pub label: String,
    /// Expected population share
    pub share: f64,
    pub matcher: BucketMatch,
}

impl Bucket {
    pub fn matches(&self, value: &Value) -> bool {
        match (&self.matcher, value) {
            (BucketMatch::Values(values), Value::Category(s)) => values.iter().any(|v| v == s),
            (BucketMatch::Range { min, max }, v) => match v.as_f64() {
                Some(x) => x >= *min && x <= *max,
                None => false,
            },
            _ => false,
        }
    }
}

/// Expected distribution of one characteristic.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDistribution {
    pub id: String,
    pub title: String,
    pub characteristic: Characteristic,
    pub buckets: Vec<Bucket>,
}

impl ReferenceDistribution {
    /// Index of the bucket holding `value`, if any.
    pub fn bucket_of(&self, value: &Value) -> Option<usize> {
        self.buckets.iter().position(|b| b.matches(value))
    }

    /// Bucket a persona falls into.
    pub fn bucket_for(&self, traits: &Traits) -> Option<&Bucket> {
        traits
            .get(&self.characteristic)
            .and_then(|v| self.bucket_of(v))
            .map(|i| &self.buckets[i])
    }

    /// Highest-share bucket (first one on ties).
    pub fn modal_bucket(&self) -> Option<&Bucket> {
        self.buckets.iter().fold(None, |best: Option<&Bucket>, b| match best {
            Some(current) if current.share >= b.share => Some(current),
            _ => Some(b),
        })
    }

    /// Sum of expected shares. Expected to be 1 but not enforced.
    pub fn total_share(&self) -> f64 {
        self.buckets.iter().map(|b| b.share).sum()
    }

    /// Observed share of each bucket, in bucket order.
    ///
    /// Personas outside every bucket count toward the total only.
    pub fn actual_shares<'a, I>(&self, batch: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a Traits>,
    {
        let mut counts = vec![0usize; self.buckets.len()];
        let mut total = 0usize;
        for traits in batch {
            total += 1;
            if let Some(i) = traits.get(&self.characteristic).and_then(|v| self.bucket_of(v)) {
                counts[i] += 1;
            }
        }
        if total == 0 {
            return vec![0.0; self.buckets.len()];
        }
        counts.into_iter().map(|c| c as f64 / total as f64).collect()
    }

    /// Mean per-bucket alignment `max(0, 1 - |actual - expected| / expected)`.
    pub fn alignment(&self, actual: &[f64]) -> f64 {
        let scores: Vec<f64> = self
            .buckets
            .iter()
            .zip(actual)
            .filter(|(b, _)| b.share > 0.0)
            .map(|(b, a)| (1.0 - (a - b.share).abs() / b.share).max(0.0))
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }
}

/// All reference distributions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceDemographics {
    distributions: Vec<ReferenceDistribution>,
}

impl ReferenceDemographics {
    pub fn distributions(&self) -> &[ReferenceDistribution] {
        &self.distributions
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceDistribution> {
        self.distributions.iter().find(|d| d.id == id)
    }

    /// Distribution bound to a characteristic, if one exists.
    pub fn for_characteristic(&self, characteristic: Characteristic) -> Option<&ReferenceDistribution> {
        self.distributions.iter().find(|d| d.characteristic == characteristic)
    }

    /// Parse and check against the catalog definitions.
    pub(crate) fn from_toml(src: &str, definitions: &[CharacteristicDefinition]) -> Result<Self> {
        let raw: RawReference =
            toml::from_str(src).map_err(|e| Error::reference("<file>", e.to_string()))?;

        let mut distributions = Vec::with_capacity(raw.distribution.len());
        for dist in raw.distribution {
            if distributions.iter().any(|d: &ReferenceDistribution| d.id == dist.id) {
                return Err(Error::reference(&dist.id, "duplicate distribution id"));
            }
            if distributions.iter().any(|d: &ReferenceDistribution| d.characteristic == dist.characteristic) {
                return Err(Error::reference(&dist.id, "characteristic already has a distribution"));
            }
            let def = &definitions[dist.characteristic.index()];
            let buckets = dist
                .buckets
                .into_iter()
                .map(|b| b.resolve(&dist.id, def))
                .collect::<Result<Vec<_>>>()?;
            if buckets.is_empty() {
                return Err(Error::reference(&dist.id, "no buckets"));
            }
            distributions.push(ReferenceDistribution {
                title: dist.title.unwrap_or_else(|| dist.id.clone()),
                id: dist.id,
                characteristic: dist.characteristic,
                buckets,
            });
        }

        Ok(Self { distributions })
    }
}

// ─────────────────────────────────────────────────────────────────
// TOML Representation
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawReference {
    distribution: Vec<RawDistribution>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDistribution {
    id: String,
    title: Option<String>,
    characteristic: Characteristic,
    buckets: Vec<RawBucket>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBucket {
    label: String,
    share: f64,
    #[serde(default)]
    values: Vec<String>,
    min: Option<f64>,
    max: Option<f64>,
}

impl RawBucket {
    fn resolve(self, dist_id: &str, def: &CharacteristicDefinition) -> Result<Bucket> {
        if !(self.share >= 0.0) {
            return Err(Error::reference(dist_id, format!("bucket '{}' has a negative share", self.label)));
        }

        let matcher = match &def.domain {
            Domain::Categorical { options } => {
                let values = if self.values.is_empty() { vec![self.label.clone()] } else { self.values };
                if let Some(bad) = values.iter().find(|v| !options.contains(v)) {
                    return Err(Error::reference(
                        dist_id,
                        format!("'{}' is not an option of {}", bad, def.name()),
                    ));
                }
                BucketMatch::Values(values)
            }
            Domain::Numerical { min: lo, max: hi, .. } => {
                let (min, max) = match (self.min, self.max) {
                    (Some(min), Some(max)) if min <= max => (min, max),
                    _ => {
                        return Err(Error::reference(
                            dist_id,
                            format!("bucket '{}' needs min <= max", self.label),
                        ))
                    }
                };
                if min < *lo || max > *hi {
                    return Err(Error::reference(
                        dist_id,
                        format!("bucket '{}' lies outside {}..={}", self.label, lo, hi),
                    ));
                }
                BucketMatch::Range { min, max }
            }
            _ => {
                return Err(Error::reference(
                    dist_id,
                    format!("{} is neither categorical nor numerical", def.name()),
                ))
            }
        };

        Ok(Bucket { label: self.label, share: self.share, matcher })
    }
}
