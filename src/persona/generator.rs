//! Single-persona and batch generation.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::sampling::{is_modal, SamplingStrategy};
use super::types::{
    HumanImperfection, ImperfectionKind, LocaleAlignment, Persona, PersonaValidation, ResponseTendencies,
};
use crate::catalog::{Catalog, Characteristic, Traits, Value};
use crate::config::GenerationSettings;
use crate::diversity::{DiversityEnforcer, KEY_CHARACTERISTICS};

/// Risk added per matched stereotype correlation.
const CORRELATION_RISK: f64 = 0.2;

/// Social desirability above which response tendencies are attached.
const DESIRABILITY_THRESHOLD: f64 = 7.0;

/// Generates personas from the catalog with a seedable RNG.
pub struct PersonaGenerator<'c> {
    catalog: &'c Catalog,
    settings: GenerationSettings,
    rng: StdRng,
    /// Strategy per catalog entry, in catalog order
    regular: Vec<SamplingStrategy<'c>>,
    counter: Vec<SamplingStrategy<'c>>,
}

impl<'c> PersonaGenerator<'c> {
    pub fn new(catalog: &'c Catalog, settings: GenerationSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let strategies = |counter: bool| {
            catalog
                .definitions()
                .iter()
                .map(|def| SamplingStrategy::select(def, catalog.reference(), counter))
                .collect::<Vec<_>>()
        };

        Self {
            catalog,
            regular: strategies(false),
            counter: strategies(true),
            settings,
            rng,
        }
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// One fully populated persona.
    pub fn generate(&mut self, counter_stereotypical: bool) -> Persona {
        let strategies = if counter_stereotypical { &self.counter } else { &self.regular };
        let mut traits: Traits = self
            .catalog
            .definitions()
            .iter()
            .zip(strategies)
            .map(|(def, strategy)| (def.characteristic, strategy.sample(def, &mut self.rng)))
            .collect();

        self.repair(&mut traits);

        let mut persona = Persona::new(traits, counter_stereotypical);
        if self.rng.gen_bool(self.settings.imperfection_probability.clamp(0.0, 1.0)) {
            if let Some(kind) = ImperfectionKind::all().choose(&mut self.rng) {
                persona.human_imperfection = Some(HumanImperfection::from(*kind));
            }
        }
        if persona
            .number(Characteristic::SocialDesirabilityBias)
            .is_some_and(|x| x > DESIRABILITY_THRESHOLD)
        {
            persona.response_tendencies = Some(ResponseTendencies::default());
        }
        persona
    }

    /// Resample fields that contradict the personality they sit next to.
    fn repair(&mut self, traits: &mut Traits) {
        let definitions = self.catalog.definitions();
        for rule in &self.catalog.rules().consistency {
            if rule.applies(traits, definitions) {
                if let Some(choice) = rule.choices.choose(&mut self.rng) {
                    debug!(rule = %rule.id, field = %rule.resample, value = %choice, "Consistency repair");
                    traits.insert(rule.resample, Value::Category(choice.clone()));
                }
            }
        }
    }

    /// Number of counter-stereotypical personas in a batch of `count`.
    pub fn counter_count(&self, count: usize) -> usize {
        if !self.settings.include_counter_stereotypical {
            return 0;
        }
        ((count as f64 * self.settings.counter_stereotypical_rate).round() as usize).min(count)
    }

    /// Generate, enforce diversity and annotate a batch.
    ///
    /// Regular personas come first, followed by the counter-stereotypical ones.
    pub fn generate_batch(&mut self, count: usize, diversity_target: f64) -> Vec<Persona> {
        let counter = self.counter_count(count);
        let mut personas: Vec<Persona> = (0..count).map(|i| self.generate(i >= count - counter)).collect();

        personas = DiversityEnforcer::new(self.catalog).enforce(personas, diversity_target, &mut self.rng);
        annotate(self.catalog, &mut personas, self.settings.human_review_rate);

        info!(count, counter_stereotypical = counter, "Persona batch generated");
        personas
    }
}

// ─────────────────────────────────────────────────────────────────
// Batch Annotations
// ─────────────────────────────────────────────────────────────────

/// Attach per-persona validation metadata computed over the whole batch.
///
/// The first `round(len × human_review_rate)` personas are marked for
/// human review.
pub fn annotate(catalog: &Catalog, personas: &mut [Persona], human_review_rate: f64) {
    let n = personas.len();
    if n == 0 {
        return;
    }

    let mut counts: Vec<HashMap<String, usize>> = vec![HashMap::new(); KEY_CHARACTERISTICS.len()];
    for p in personas.iter() {
        for (i, c) in KEY_CHARACTERISTICS.iter().enumerate() {
            *counts[i].entry(p.value_key(*c)).or_insert(0) += 1;
        }
    }

    let review = ((n as f64 * human_review_rate).round() as usize).min(n);
    for (idx, persona) in personas.iter_mut().enumerate() {
        let contribution = KEY_CHARACTERISTICS
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let same = counts[i].get(&persona.value_key(*c)).copied().unwrap_or(0);
                1.0 - same as f64 / n as f64
            })
            .sum::<f64>()
            / KEY_CHARACTERISTICS.len() as f64;

        let flags = stereotype_flags(catalog, persona);
        persona.validation = Some(PersonaValidation {
            diversity_contribution: contribution,
            bias_risk_score: bias_risk(catalog, persona, flags.len()),
            stereotype_flags: flags,
            locale_alignment: locale_alignment(catalog, persona),
            requires_human_review: idx < review,
        });
    }
}

/// Ids of the correlation rules a persona matches.
pub fn stereotype_flags(catalog: &Catalog, persona: &Persona) -> Vec<String> {
    catalog
        .rules()
        .correlations
        .iter()
        .filter(|r| r.matches(&persona.characteristics, catalog.definitions()))
        .map(|r| r.id.clone())
        .collect()
}

fn bias_risk(catalog: &Catalog, persona: &Persona, correlations: usize) -> f64 {
    let ethical: Vec<f64> = catalog
        .ethical()
        .map(|def| match persona.get(def.characteristic) {
            Some(v) if is_modal(def, catalog.reference(), v) => def.stereotype_risk.risk_weight(),
            _ => 0.0,
        })
        .collect();
    let base = if ethical.is_empty() {
        0.0
    } else {
        ethical.iter().sum::<f64>() / ethical.len() as f64
    };
    (base + CORRELATION_RISK * correlations as f64).min(1.0)
}

fn locale_alignment(catalog: &Catalog, persona: &Persona) -> LocaleAlignment {
    let reference = catalog.reference();
    let shares: Vec<f64> = reference
        .distributions()
        .iter()
        .filter_map(|d| d.bucket_for(&persona.characteristics))
        .map(|b| (2.0 * b.share).min(1.0))
        .collect();
    let demographic_alignment = if shares.is_empty() {
        0.0
    } else {
        shares.iter().sum::<f64>() / shares.len() as f64
    };

    let mut cultural_consistency = 0.0;
    if persona.number(Characteristic::ValuesFamily).is_some_and(|x| x >= 7.0) {
        cultural_consistency += 0.3;
    }
    if persona.is_any(Characteristic::ReligiousSpirituality, &["Muy religioso", "Religioso"]) {
        cultural_consistency += 0.3;
    }
    if persona.number(Characteristic::AuthorityRespect).is_some_and(|x| x >= 6.0) {
        cultural_consistency += 0.4;
    }

    let market_realism = reference
        .for_characteristic(Characteristic::CurrentOperator)
        .and_then(|d| d.bucket_for(&persona.characteristics))
        .map_or(0.0, |b| (2.0 * b.share).min(1.0));

    LocaleAlignment {
        demographic_alignment,
        cultural_consistency,
        market_realism,
    }
}

// ─────────────────────────────────────────────────────────────────
// Diverse Group Selection
// ─────────────────────────────────────────────────────────────────

/// Up to `size` personas, taken round-robin from the young (< 30),
/// middle (< 50) and senior age bands.
pub fn select_diverse_group(personas: &[Persona], size: usize) -> Vec<&Persona> {
    let mut bands: [Vec<&Persona>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for p in personas {
        let age = p.number(Characteristic::Age).unwrap_or(0.0);
        let band = if age < 30.0 {
            0
        } else if age < 50.0 {
            1
        } else {
            2
        };
        bands[band].push(p);
    }

    let mut picked = Vec::with_capacity(size.min(personas.len()));
    let mut round = 0;
    while picked.len() < size && bands.iter().any(|b| round < b.len()) {
        for band in &bands {
            if picked.len() == size {
                break;
            }
            if let Some(p) = band.get(round) {
                picked.push(*p);
            }
        }
        round += 1;
    }
    picked
}
