//! Batch diversity measurement and enforcement.
//!
//! Diversity is the mean, over a fixed set of key characteristics, of the
//! number of distinct values divided by the batch size. The enforcer makes
//! one greedy pass that nudges duplicate key values toward unused ones.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::catalog::{Catalog, Characteristic, CharacteristicDefinition, Domain, Value};
use crate::persona::sampling::uniform_number;
use crate::persona::Persona;

/// Characteristics that diversity is measured over.
pub const KEY_CHARACTERISTICS: [Characteristic; 8] = [
    Characteristic::Age,
    Characteristic::Gender,
    Characteristic::EducationLevel,
    Characteristic::IncomeBracket,
    Characteristic::GeographicRegion,
    Characteristic::ServiceType,
    Characteristic::MonthlySpend,
    Characteristic::CurrentOperator,
];

/// Numeric draws tried when looking for an unused value.
const NUMERIC_ATTEMPTS: usize = 16;

/// Distinct values of `characteristic` divided by batch size.
pub fn characteristic_diversity(personas: &[Persona], characteristic: Characteristic) -> f64 {
    if personas.is_empty() {
        return 0.0;
    }
    let mut seen = std::collections::HashSet::new();
    for p in personas {
        seen.insert(p.value_key(characteristic));
    }
    seen.len() as f64 / personas.len() as f64
}

/// Mean per-characteristic diversity over the given characteristics.
pub fn diversity_over(personas: &[Persona], characteristics: &[Characteristic]) -> f64 {
    if personas.is_empty() || characteristics.is_empty() {
        return 0.0;
    }
    characteristics
        .iter()
        .map(|c| characteristic_diversity(personas, *c))
        .sum::<f64>()
        / characteristics.len() as f64
}

/// Batch diversity over the key characteristics; 0 for an empty batch.
pub fn diversity_score(personas: &[Persona]) -> f64 {
    diversity_over(personas, &KEY_CHARACTERISTICS)
}

// ─────────────────────────────────────────────────────────────────
// Value Counts
// ─────────────────────────────────────────────────────────────────

/// Per-key value counts, so diversity updates stay O(keys).
#[derive(Debug, Default, Clone)]
struct KeyCounts {
    counts: Vec<HashMap<String, usize>>,
    size: usize,
}

impl KeyCounts {
    fn new() -> Self {
        Self { counts: vec![HashMap::new(); KEY_CHARACTERISTICS.len()], size: 0 }
    }

    fn from_batch(personas: &[Persona]) -> Self {
        let mut counts = Self::new();
        for p in personas {
            counts.add(p);
        }
        counts
    }

    fn add(&mut self, persona: &Persona) {
        for (i, c) in KEY_CHARACTERISTICS.iter().enumerate() {
            *self.counts[i].entry(persona.value_key(*c)).or_insert(0) += 1;
        }
        self.size += 1;
    }

    fn has(&self, key_index: usize, value: &str) -> bool {
        self.counts[key_index].get(value).is_some_and(|n| *n > 0)
    }

    fn replace(&mut self, key_index: usize, old: &str, new: String) {
        if let Some(n) = self.counts[key_index].get_mut(old) {
            *n -= 1;
            if *n == 0 {
                self.counts[key_index].remove(old);
            }
        }
        *self.counts[key_index].entry(new).or_insert(0) += 1;
    }

    fn diversity(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        let distinct: usize = self.counts.iter().map(HashMap::len).sum();
        distinct as f64 / (self.size * self.counts.len()) as f64
    }

    /// Diversity after adding `persona`, without adding it.
    fn diversity_with(&self, persona: &Persona) -> f64 {
        let fresh = KEY_CHARACTERISTICS
            .iter()
            .enumerate()
            .filter(|(i, c)| !self.has(*i, &persona.value_key(**c)))
            .count();
        let distinct: usize = self.counts.iter().map(HashMap::len).sum::<usize>() + fresh;
        distinct as f64 / ((self.size + 1) * self.counts.len()) as f64
    }
}

// ─────────────────────────────────────────────────────────────────
// Enforcer
// ─────────────────────────────────────────────────────────────────

/// Greedy single-pass diversity enforcement.
pub struct DiversityEnforcer<'c> {
    catalog: &'c Catalog,
}

impl<'c> DiversityEnforcer<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// Raise batch diversity toward `target`.
    ///
    /// Output size equals input size and diversity never decreases. Only
    /// values that occur at least twice in the batch are replaced.
    pub fn enforce<R: Rng>(&self, mut personas: Vec<Persona>, target: f64, rng: &mut R) -> Vec<Persona> {
        let before = diversity_score(&personas);
        if personas.len() < 2 || before >= target {
            return personas;
        }

        let mut batch = KeyCounts::from_batch(&personas);
        let mut accepted = KeyCounts::new();
        let mut mutated = 0usize;

        for candidate in personas.iter_mut() {
            if accepted.size > 0 && accepted.diversity_with(candidate) < accepted.diversity() {
                mutated += self.mutate(candidate, &accepted, &mut batch, rng);
            }
            accepted.add(candidate);
        }

        debug!(
            before,
            after = diversity_score(&personas),
            target,
            mutated,
            "Diversity enforced"
        );
        personas
    }

    /// Move repeated key values toward unused ones. Returns fields changed.
    fn mutate<R: Rng>(
        &self,
        candidate: &mut Persona,
        accepted: &KeyCounts,
        batch: &mut KeyCounts,
        rng: &mut R,
    ) -> usize {
        let mut changed = 0;
        for (i, c) in KEY_CHARACTERISTICS.iter().enumerate() {
            let current = candidate.value_key(*c);
            if !accepted.has(i, &current) {
                continue;
            }
            let def = self.catalog.definition(*c);
            if let Some(value) = replacement(def, i, accepted, batch, rng) {
                batch.replace(i, &current, value.key());
                candidate.set(*c, value);
                changed += 1;
            }
        }
        changed
    }
}

/// A value absent from the accepted prefix, preferring one absent from the
/// whole batch.
fn replacement<R: Rng>(
    def: &CharacteristicDefinition,
    key_index: usize,
    accepted: &KeyCounts,
    batch: &KeyCounts,
    rng: &mut R,
) -> Option<Value> {
    let candidates: Vec<Value> = match &def.domain {
        Domain::Categorical { options } => options.iter().map(|o| Value::Category(o.clone())).collect(),
        Domain::Boolean => vec![Value::Bool(true), Value::Bool(false)],
        Domain::Numerical { min, max, integer } => (0..NUMERIC_ATTEMPTS)
            .map(|_| uniform_number(*min, *max, *integer, rng))
            .collect(),
        Domain::Text { .. } => return None,
    };

    let unused_in_batch: Vec<&Value> = candidates.iter().filter(|v| !batch.has(key_index, &v.key())).collect();
    if let Some(v) = unused_in_batch.choose(rng) {
        return Some((*v).clone());
    }
    let unused_in_accepted: Vec<&Value> =
        candidates.iter().filter(|v| !accepted.has(key_index, &v.key())).collect();
    unused_in_accepted.choose(rng).map(|v| (*v).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Traits;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn persona(age: i64, gender: &str, region: &str) -> Persona {
        let mut traits = Traits::new();
        traits.insert(Characteristic::Age, Value::Int(age));
        traits.insert(Characteristic::Gender, Value::from(gender));
        traits.insert(Characteristic::EducationLevel, Value::from("Secundaria"));
        traits.insert(Characteristic::IncomeBracket, Value::from("Bajo (< L.15,000)"));
        traits.insert(Characteristic::GeographicRegion, Value::from(region));
        traits.insert(Characteristic::ServiceType, Value::from("Prepago"));
        traits.insert(Characteristic::MonthlySpend, Value::from("L.200-400"));
        traits.insert(Characteristic::CurrentOperator, Value::from("Tigo"));
        Persona::new(traits, false)
    }

    fn enforcer() -> DiversityEnforcer<'static> {
        DiversityEnforcer::new(Catalog::bundled().unwrap())
    }

    #[test]
    fn test_empty_batch_scores_zero() {
        assert_eq!(diversity_score(&[]), 0.0);
        assert_eq!(characteristic_diversity(&[], Characteristic::Age), 0.0);
    }

    #[test]
    fn test_identical_batch_diversity() {
        let batch: Vec<Persona> = (0..4).map(|_| persona(30, "Masculino", "Rural")).collect();
        assert!((diversity_score(&batch) - 0.25).abs() < 1e-9);
        assert!((characteristic_diversity(&batch, Characteristic::Gender) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_spend_and_operator_count_toward_score() {
        let spends = ["< L.200", "L.200-400", "L.400-800", "> L.1200"];
        let operators = ["Tigo", "Claro", "Tigo", "Claro"];
        let batch: Vec<Persona> = (0..4)
            .map(|i| {
                let mut p = persona(30, "Masculino", "Rural");
                p.set(Characteristic::MonthlySpend, Value::from(spends[i]));
                p.set(Characteristic::CurrentOperator, Value::from(operators[i]));
                p
            })
            .collect();
        // six keys at 1/4, spend at 4/4, operator at 2/4
        assert!((diversity_score(&batch) - (6.0 * 0.25 + 1.0 + 0.5) / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_key_counts_match_direct_computation() {
        let batch = vec![
            persona(30, "Masculino", "Rural"),
            persona(31, "Masculino", "Rural"),
            persona(30, "Femenino", "Tegucigalpa"),
        ];
        let counts = KeyCounts::from_batch(&batch);
        assert!((counts.diversity() - diversity_score(&batch)).abs() < 1e-9);

        let prefix = KeyCounts::from_batch(&batch[..2]);
        assert!((prefix.diversity_with(&batch[2]) - diversity_score(&batch)).abs() < 1e-9);
    }

    #[test]
    fn test_small_or_diverse_batches_unchanged() {
        let mut rng = StdRng::seed_from_u64(1);
        let single = vec![persona(30, "Masculino", "Rural")];
        let out = enforcer().enforce(single.clone(), 1.0, &mut rng);
        assert_eq!(out, single);

        let pair = vec![persona(30, "Masculino", "Rural"), persona(31, "Femenino", "Tegucigalpa")];
        let out = enforcer().enforce(pair.clone(), 0.1, &mut rng);
        assert_eq!(out, pair);
    }

    #[test]
    fn test_enforce_raises_identical_batch() {
        let mut rng = StdRng::seed_from_u64(5);
        let batch: Vec<Persona> = (0..10).map(|_| persona(30, "Masculino", "Rural")).collect();
        let before = diversity_score(&batch);
        let out = enforcer().enforce(batch, 0.9, &mut rng);
        assert_eq!(out.len(), 10);
        assert!(diversity_score(&out) > before);

        let catalog = Catalog::bundled().unwrap();
        for p in &out {
            for c in KEY_CHARACTERISTICS {
                let value = p.get(c).unwrap();
                assert!(catalog.definition(c).domain.contains(value), "{} out of domain", c);
            }
        }
    }

    fn arb_persona() -> impl Strategy<Value = Persona> {
        (
            18i64..=75,
            prop::sample::select(vec!["Masculino", "Femenino"]),
            prop::sample::select(vec!["Rural", "Tegucigalpa", "La Ceiba"]),
        )
            .prop_map(|(age, gender, region)| persona(age, gender, region))
    }

    proptest! {
        #[test]
        fn prop_enforce_never_lowers_diversity(
            batch in prop::collection::vec(arb_persona(), 0..40),
            target in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let before = diversity_score(&batch);
            let n = batch.len();
            let out = enforcer().enforce(batch, target, &mut rng);
            prop_assert_eq!(out.len(), n);
            prop_assert!(diversity_score(&out) >= before - 1e-12);
        }
    }
}
