//! Characteristic catalog, reference demographics and rule table.
//!
//! The three tables ship with the crate under `config/` and are parsed once
//! per process by [`Catalog::bundled`]. Everything downstream borrows the
//! resulting `&'static Catalog`.

pub mod characteristic;
pub mod definition;
pub mod reference;
pub mod rules;
pub mod value;

use std::sync::OnceLock;

use serde::Deserialize;
use tracing::debug;

pub use characteristic::{Characteristic, CharacteristicCategory, StereotypeRisk};
pub use definition::{CharacteristicDefinition, CounterHalf, Domain};
pub use reference::{Bucket, BucketMatch, ReferenceDemographics, ReferenceDistribution};
pub use rules::{Condition, ConsistencyRule, CorrelationRule, PositivityIndicator, RuleSet, Test};
pub use value::{round_tenth, Traits, Value};

use crate::error::{Error, Result};
use definition::RawDefinition;

const CATALOG_TOML: &str = include_str!("../../config/catalog.toml");
const REFERENCE_TOML: &str = include_str!("../../config/reference.toml");
const RULES_TOML: &str = include_str!("../../config/rules.toml");

static BUNDLED: OnceLock<Catalog> = OnceLock::new();

#[derive(Debug, Deserialize)]
struct RawCatalog {
    characteristic: Vec<RawDefinition>,
}

/// Validated definitions plus the tables that reference them.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Indexed by `Characteristic::index`
    definitions: Vec<CharacteristicDefinition>,
    reference: ReferenceDemographics,
    rules: RuleSet,
}

impl Catalog {
    /// The catalog compiled into the binary, parsed on first use.
    pub fn bundled() -> Result<&'static Catalog> {
        if let Some(catalog) = BUNDLED.get() {
            return Ok(catalog);
        }
        let catalog = Self::from_sources(CATALOG_TOML, REFERENCE_TOML, RULES_TOML)?;
        Ok(BUNDLED.get_or_init(|| catalog))
    }

    /// Parse and cross-check the three tables.
    pub fn from_sources(catalog: &str, reference: &str, rules: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(catalog).map_err(|e| Error::catalog(e.to_string()))?;

        let mut slots: Vec<Option<CharacteristicDefinition>> = vec![None; Characteristic::all().len()];
        for entry in raw.characteristic {
            let def = CharacteristicDefinition::try_from(entry)?;
            let slot = &mut slots[def.characteristic.index()];
            if slot.is_some() {
                return Err(Error::catalog(format!("{} is defined more than once", def.name())));
            }
            *slot = Some(def);
        }

        let mut definitions = Vec::with_capacity(slots.len());
        for (slot, c) in slots.into_iter().zip(Characteristic::all()) {
            match slot {
                Some(def) => definitions.push(def),
                None => return Err(Error::catalog(format!("{} has no definition", c))),
            }
        }

        let reference = ReferenceDemographics::from_toml(reference, &definitions)?;
        let rules = RuleSet::from_toml(rules, &definitions)?;

        debug!(
            characteristics = definitions.len(),
            distributions = reference.distributions().len(),
            correlations = rules.correlations.len(),
            "Catalog loaded"
        );

        Ok(Self { definitions, reference, rules })
    }

    pub fn definition(&self, characteristic: Characteristic) -> &CharacteristicDefinition {
        &self.definitions[characteristic.index()]
    }

    /// All definitions in catalog order.
    pub fn definitions(&self) -> &[CharacteristicDefinition] {
        &self.definitions
    }

    pub fn by_category(&self, category: CharacteristicCategory) -> impl Iterator<Item = &CharacteristicDefinition> {
        self.definitions.iter().filter(move |d| d.category == category)
    }

    pub fn reference(&self) -> &ReferenceDemographics {
        &self.reference
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// First characteristic whose value is missing or outside its domain.
    pub fn find_violation(&self, traits: &Traits) -> Option<Characteristic> {
        self.definitions
            .iter()
            .find(|d| traits.get(&d.characteristic).map_or(true, |v| !d.domain.contains(v)))
            .map(|d| d.characteristic)
    }

    /// Every characteristic present with an in-domain value.
    pub fn contains(&self, traits: &Traits) -> bool {
        self.find_violation(traits).is_none()
    }

    /// Characteristics that carry the ethical flag.
    pub fn ethical(&self) -> impl Iterator<Item = &CharacteristicDefinition> {
        self.definitions.iter().filter(|d| d.ethical_flag)
    }

    /// Characteristics with locale-specific sampling.
    pub fn locale_specific(&self) -> impl Iterator<Item = &CharacteristicDefinition> {
        self.definitions.iter().filter(|d| d.locale_specific)
    }
}
