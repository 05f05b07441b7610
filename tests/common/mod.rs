//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use persona_forge::catalog::Catalog;
use persona_forge::config::GenerationSettings;
use persona_forge::persona::{Persona, PersonaGenerator};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// A seeded generator over the bundled catalog.
pub fn seeded_generator(seed: u64) -> PersonaGenerator<'static> {
    let settings = GenerationSettings {
        seed: Some(seed),
        ..GenerationSettings::default()
    };
    PersonaGenerator::new(Catalog::bundled().expect("bundled catalog"), settings)
}

/// A generated, diversity-enforced batch.
pub fn seeded_batch(seed: u64, count: usize) -> Vec<Persona> {
    seeded_generator(seed).generate_batch(count, 0.8)
}
