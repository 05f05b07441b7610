//! Per-characteristic sampling strategies.
//!
//! A strategy is chosen once per catalog entry when the generator is built,
//! separately for regular and counter-stereotypical draws.

use rand::distributions::{Distribution as _, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{
    round_tenth, BucketMatch, CharacteristicDefinition, CounterHalf, Domain, ReferenceDemographics,
    ReferenceDistribution, Value,
};

/// How a counter-stereotypical draw departs from the typical value.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakRule {
    /// Any option except the modal ones
    ExcludeModal(Vec<String>),
    LowerHalf,
    UpperHalf,
    /// Lower or upper half with equal odds
    EitherHalf,
}

#[derive(Debug, Clone)]
pub enum SamplingStrategy<'c> {
    Uniform,
    /// Bucket by reference share, then uniformly inside the bucket
    WeightedByReference {
        distribution: &'c ReferenceDistribution,
        weights: WeightedIndex<f64>,
    },
    CounterStereotypical(BreakRule),
}

impl<'c> SamplingStrategy<'c> {
    /// Strategy for one entry.
    pub fn select(
        def: &CharacteristicDefinition,
        reference: &'c ReferenceDemographics,
        counter_stereotypical: bool,
    ) -> Self {
        if counter_stereotypical && def.stereotype_risk.is_elevated() {
            let rule = match (&def.domain, def.counter_half) {
                (Domain::Categorical { .. }, _) => Some(BreakRule::ExcludeModal(modal_options(def, reference))),
                (Domain::Numerical { .. }, Some(CounterHalf::Lower)) => Some(BreakRule::LowerHalf),
                (Domain::Numerical { .. }, Some(CounterHalf::Upper)) => Some(BreakRule::UpperHalf),
                (Domain::Numerical { .. }, None) => Some(BreakRule::EitherHalf),
                _ => None,
            };
            if let Some(rule) = rule {
                return SamplingStrategy::CounterStereotypical(rule);
            }
        }

        if def.locale_specific {
            if let Some(distribution) = reference.for_characteristic(def.characteristic) {
                if let Ok(weights) = WeightedIndex::new(distribution.buckets.iter().map(|b| b.share)) {
                    return SamplingStrategy::WeightedByReference { distribution, weights };
                }
            }
        }

        SamplingStrategy::Uniform
    }

    /// Draw one value for `def`.
    pub fn sample<R: Rng>(&self, def: &CharacteristicDefinition, rng: &mut R) -> Value {
        match &def.domain {
            Domain::Categorical { options } => self.sample_categorical(options, rng),
            Domain::Numerical { min, max, integer } => self.sample_numerical(*min, *max, *integer, rng),
            Domain::Boolean => Value::Bool(rng.gen_bool(0.5)),
            Domain::Text { examples } => {
                Value::Category(examples.choose(rng).cloned().unwrap_or_default())
            }
        }
    }

    fn sample_categorical<R: Rng>(&self, options: &[String], rng: &mut R) -> Value {
        let picked = match self {
            SamplingStrategy::Uniform => options.choose(rng),
            SamplingStrategy::WeightedByReference { distribution, weights } => {
                match &distribution.buckets[weights.sample(rng)].matcher {
                    BucketMatch::Values(values) => values.choose(rng),
                    BucketMatch::Range { .. } => options.choose(rng),
                }
            }
            SamplingStrategy::CounterStereotypical(BreakRule::ExcludeModal(modal)) => {
                let allowed: Vec<&String> = options.iter().filter(|o| !modal.contains(o)).collect();
                match allowed.choose(rng) {
                    Some(o) => Some(*o),
                    None => options.choose(rng),
                }
            }
            SamplingStrategy::CounterStereotypical(_) => options.choose(rng),
        };
        Value::Category(picked.cloned().unwrap_or_default())
    }

    fn sample_numerical<R: Rng>(&self, min: f64, max: f64, integer: bool, rng: &mut R) -> Value {
        let mid = (min + max) / 2.0;
        let (lo, hi) = match self {
            SamplingStrategy::Uniform => (min, max),
            SamplingStrategy::WeightedByReference { distribution, weights } => {
                match distribution.buckets[weights.sample(rng)].matcher {
                    BucketMatch::Range { min: lo, max: hi } => (lo, hi),
                    BucketMatch::Values(_) => (min, max),
                }
            }
            SamplingStrategy::CounterStereotypical(BreakRule::LowerHalf) => (min, mid),
            SamplingStrategy::CounterStereotypical(BreakRule::UpperHalf) => (mid, max),
            SamplingStrategy::CounterStereotypical(BreakRule::EitherHalf) => {
                if rng.gen_bool(0.5) {
                    (min, mid)
                } else {
                    (mid, max)
                }
            }
            SamplingStrategy::CounterStereotypical(BreakRule::ExcludeModal(_)) => (min, max),
        };
        uniform_number(lo, hi, integer, rng)
    }
}

/// Uniform draw over `[min, max]`, rounded to an integer or one decimal.
pub fn uniform_number<R: Rng>(min: f64, max: f64, integer: bool, rng: &mut R) -> Value {
    if integer {
        let lo = min.ceil() as i64;
        let hi = max.floor() as i64;
        if lo >= hi {
            Value::Int(lo)
        } else {
            Value::Int(rng.gen_range(lo..=hi))
        }
    } else if max > min {
        Value::Float(round_tenth(rng.gen_range(min..=max)))
    } else {
        Value::Float(round_tenth(min))
    }
}

/// Options regarded as the stereotypical choice for a categorical entry.
///
/// The values of the highest-share reference bucket when a distribution
/// binds to the entry, otherwise its first declared option.
pub fn modal_options(def: &CharacteristicDefinition, reference: &ReferenceDemographics) -> Vec<String> {
    let from_reference = reference
        .for_characteristic(def.characteristic)
        .and_then(ReferenceDistribution::modal_bucket)
        .and_then(|b| match &b.matcher {
            BucketMatch::Values(values) => Some(values.clone()),
            BucketMatch::Range { .. } => None,
        });
    match from_reference {
        Some(values) => values,
        None => def.options().first().cloned().into_iter().collect(),
    }
}

/// Whether `value` is the stereotypical choice for its entry.
pub fn is_modal(def: &CharacteristicDefinition, reference: &ReferenceDemographics, value: &Value) -> bool {
    if let Some(bucket) = reference
        .for_characteristic(def.characteristic)
        .and_then(ReferenceDistribution::modal_bucket)
    {
        return bucket.matches(value);
    }
    match (def.options().first(), value.as_str()) {
        (Some(first), Some(v)) => first == v,
        _ => false,
    }
}
