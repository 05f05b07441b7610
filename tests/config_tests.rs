//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides

mod common;

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::{invalid_config_fixture, valid_config_fixture};
use persona_forge::config::{self, PipelineConfig};
use persona_forge::error::{Error, ErrorCode};
use persona_forge::validation::StudyLevel;

struct ConfigFixture {
    _temp_dir: TempDir,
    config_path: PathBuf,
}

impl ConfigFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        Self { _temp_dir: temp_dir, config_path }
    }

    fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).unwrap();
    }

    fn path(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}

fn forge_cmd() -> Command {
    let mut cmd = Command::cargo_bin("persona-forge").unwrap();
    cmd.env("HOME", env!("CARGO_TARGET_TMPDIR"));
    cmd
}

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_valid_fixture_loads() {
    let cfg = PipelineConfig::load(valid_config_fixture().to_str()).unwrap();
    assert_eq!(cfg.generation.count, 20);
    assert_eq!(cfg.generation.seed, Some(7));
    assert_eq!(cfg.generation.max_attempts, 2);
    assert_eq!(cfg.validation.study_level, StudyLevel::Pilot);
    assert_eq!(cfg.monitor.trend_window, 3);
    assert_eq!(cfg.logging.level, "warn");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation]\ncount = 10\n");

    let cfg = PipelineConfig::load(Some(fixture.path())).unwrap();
    assert_eq!(cfg.generation.count, 10);
    assert!((cfg.generation.diversity_target - 0.8).abs() < 1e-9);
    assert!((cfg.bias.min_alignment - 0.85).abs() < 1e-9);
    assert_eq!(cfg.bias.audited_distributions, vec!["age", "gender", "income", "region"]);
    assert_eq!(cfg.monitor.history_limit, 100);
}

#[test]
fn test_study_level_section() {
    let fixture = ConfigFixture::new();
    fixture.write_config(
        r#"
[validation]
study_level = "sensitivity"
gate_on_readiness = true
process_documented = false
"#,
    );

    let cfg = PipelineConfig::load(Some(fixture.path())).unwrap();
    assert_eq!(cfg.validation.study_level, StudyLevel::Sensitivity);
    assert!(cfg.validation.gate_on_readiness);
    assert!(!cfg.validation.process_documented);
    assert!(cfg.validation.quality_controls_applied);
}

#[test]
fn test_generated_default_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forge.toml");
    let written = config::init_config(path.to_str(), false).unwrap();
    assert_eq!(written, path);

    let cfg = PipelineConfig::load(path.to_str()).unwrap();
    let defaults = PipelineConfig::default();
    assert_eq!(cfg.generation.count, defaults.generation.count);
    assert_eq!(cfg.validation.study_level, defaults.validation.study_level);
    assert_eq!(cfg.bias.max_high_alerts, defaults.bias.max_high_alerts);
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_fixture_rejected() {
    let err = PipelineConfig::load(invalid_config_fixture().to_str()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigValidation);
    assert!(err.to_string().contains("diversity_target"));
}

#[test]
fn test_malformed_toml() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation\ncount = ");

    let err = PipelineConfig::load(Some(fixture.path())).unwrap_err();
    assert!(matches!(err, Error::ConfigParse { .. }));
    assert_eq!(err.exit_code(), 10);
}

#[test]
fn test_unknown_study_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[validation]\nstudy_level = \"confirmatory\"\n");

    assert!(matches!(
        PipelineConfig::load(Some(fixture.path())).unwrap_err(),
        Error::ConfigParse { .. }
    ));
}

#[test]
fn test_zero_count_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[generation]\ncount = 0\n");

    let err = PipelineConfig::load(Some(fixture.path())).unwrap_err();
    assert!(err.to_string().contains("count"));
}

#[test]
fn test_empty_audited_distributions_rejected() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[bias]\naudited_distributions = []\n");

    let err = PipelineConfig::load(Some(fixture.path())).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigValidation);
}

#[test]
fn test_invalid_log_level() {
    let fixture = ConfigFixture::new();
    fixture.write_config("[logging]\nlevel = \"loud\"\n");

    assert!(PipelineConfig::load(Some(fixture.path())).is_err());
}

#[test]
fn test_missing_explicit_file() {
    let err = PipelineConfig::load(Some("/nonexistent/forge.toml")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConfigNotFound);
    assert!(err.suggestion().unwrap().contains("config init"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Overrides (run in a child process)
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file_values() {
    forge_cmd()
        .args(["config", "show", "--config"])
        .arg(valid_config_fixture())
        .env("PERSONA_FORGE_COUNT", "33")
        .env("PERSONA_FORGE_STUDY_LEVEL", "exploratory")
        .env("PERSONA_FORGE_GATE_ON_READINESS", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("count = 33"))
        .stdout(predicate::str::contains("study_level = \"exploratory\""))
        .stdout(predicate::str::contains("gate_on_readiness = true"));
}

#[test]
fn test_env_override_is_validated() {
    forge_cmd()
        .args(["config", "validate"])
        .env("PERSONA_FORGE_DIVERSITY_TARGET", "2.0")
        .assert()
        .code(10)
        .stderr(predicate::str::contains("diversity_target"));
}

#[test]
fn test_unparseable_env_value_is_ignored() {
    forge_cmd()
        .args(["config", "show"])
        .env("PERSONA_FORGE_MAX_ATTEMPTS", "many")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_attempts = 3"));
}
