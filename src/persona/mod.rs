//! Persona model and generation.
//!
//! A persona carries one value per catalog characteristic. The generator
//! draws those values with per-entry sampling strategies, repairs obvious
//! inconsistencies, and annotates finished batches.

pub mod generator;
pub mod sampling;
pub mod types;

pub use generator::{annotate, select_diverse_group, stereotype_flags, PersonaGenerator};
pub use sampling::{BreakRule, SamplingStrategy};
pub use types::{
    Grouping, HumanImperfection, ImperfectionKind, LocaleAlignment, Persona, PersonaValidation,
    ResponseTendencies,
};
