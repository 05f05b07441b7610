//! Configuration system for persona-forge
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (PERSONA_FORGE_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::validation::StudyLevel;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Batch generation settings
    pub generation: GenerationSettings,

    /// Staged validation settings
    pub validation: ValidationSettings,

    /// Bias detector thresholds and gates
    pub bias: BiasSettings,

    /// Quality monitor settings
    pub monitor: MonitorSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Batch generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Personas per batch
    pub count: usize,

    /// Diversity the enforcer aims for (0-1)
    pub diversity_target: f64,

    /// Advisory diversity floor; falling below it logs a warning (0-1)
    pub quality_threshold: f64,

    /// Generation attempts before giving up
    pub max_attempts: u32,

    /// Generate a share of counter-stereotypical personas
    pub include_counter_stereotypical: bool,

    /// Share of counter-stereotypical personas (0-1)
    pub counter_stereotypical_rate: f64,

    /// Chance a persona carries a human imperfection (0-1)
    pub imperfection_probability: f64,

    /// Share of each batch flagged for human review (0-1)
    pub human_review_rate: f64,

    /// RNG seed for reproducible batches (entropy when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Staged validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Study readiness level: pilot, exploratory, sensitivity
    pub study_level: StudyLevel,

    /// Require study readiness in addition to the bias verdict
    pub gate_on_readiness: bool,

    /// Generation process is documented
    pub process_documented: bool,

    /// Quality controls were applied to the batch
    pub quality_controls_applied: bool,
}

/// Bias detector thresholds and gates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiasSettings {
    /// Correlation match rate that raises an alert
    pub correlation_alert_rate: f64,

    /// Correlation match rate that makes the alert high severity
    pub correlation_high_rate: f64,

    /// Dominant-value share of a protected characteristic that raises an alert
    pub dominance_share: f64,

    /// Dominant share above which the alert is medium severity
    pub dominance_medium_share: f64,

    /// Dominant share above which the alert is high severity
    pub dominance_high_share: f64,

    /// Share of positivity indicators that marks a persona as positive
    pub positivity_indicator_rate: f64,

    /// Share of positive personas that raises an alert
    pub positivity_batch_rate: f64,

    /// Allowed |actual - expected| per reference bucket
    pub mismatch_tolerance: f64,

    /// Difference above which an escalated distribution alerts high
    pub mismatch_high_delta: f64,

    /// Distributions whose mismatches can escalate to high severity
    pub escalated_distributions: Vec<String>,

    /// Reference distributions compared against the batch
    pub audited_distributions: Vec<String>,

    /// Agreeableness above which a persona is highly agreeable
    pub agreeableness_threshold: f64,

    /// Share of highly agreeable personas that raises an alert
    pub highly_agreeable_rate: f64,

    /// Share of low-criticism personas that raises an alert
    pub low_criticism_rate: f64,

    /// Most high-severity alerts a passing batch may carry
    pub max_high_alerts: usize,

    /// Minimum batch diversity to pass
    pub min_diversity: f64,

    /// Minimum demographic alignment to pass
    pub min_alignment: f64,

    /// Maximum sycophancy index to pass
    pub max_sycophancy: f64,

    /// Maximum stereotype risk to pass
    pub max_stereotype_risk: f64,

    /// Stereotype risk per matched correlation
    pub risk_per_correlation: f64,

    /// Counter-stereotypical share below which more are recommended
    pub min_counter_stereotypical_rate: f64,

    /// Imperfection share below which more are recommended
    pub min_imperfection_rate: f64,
}

/// Quality monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Values kept per metric
    pub history_limit: usize,

    /// Validation records kept
    pub record_limit: usize,

    /// Values per trend window
    pub trend_window: usize,

    /// Relative change treated as stable
    pub trend_tolerance: f64,

    /// Pass rate below which a high alert is raised
    pub min_pass_rate: f64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            count: 50,
            diversity_target: 0.8,
            quality_threshold: 0.7,
            max_attempts: 3,
            include_counter_stereotypical: true,
            counter_stereotypical_rate: 0.30,
            imperfection_probability: 0.15,
            human_review_rate: 0.10,
            seed: None,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            study_level: StudyLevel::Pilot,
            gate_on_readiness: false,
            process_documented: true,
            quality_controls_applied: true,
        }
    }
}

impl Default for BiasSettings {
    fn default() -> Self {
        Self {
            correlation_alert_rate: 0.7,
            correlation_high_rate: 0.9,
            dominance_share: 0.7,
            dominance_medium_share: 0.8,
            dominance_high_share: 0.9,
            positivity_indicator_rate: 0.8,
            positivity_batch_rate: 0.3,
            mismatch_tolerance: 0.15,
            mismatch_high_delta: 0.25,
            escalated_distributions: vec!["income".to_string()],
            audited_distributions: ["age", "gender", "income", "region"].iter().map(|s| s.to_string()).collect(),
            agreeableness_threshold: 8.0,
            highly_agreeable_rate: 0.4,
            low_criticism_rate: 0.6,
            max_high_alerts: 2,
            min_diversity: 0.7,
            min_alignment: 0.85,
            max_sycophancy: 0.3,
            max_stereotype_risk: 0.2,
            risk_per_correlation: 0.2,
            min_counter_stereotypical_rate: 0.25,
            min_imperfection_rate: 0.15,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            record_limit: 50,
            trend_window: 5,
            trend_tolerance: 0.05,
            min_pass_rate: 0.8,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::config_not_found(path));
            }
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("persona-forge.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("persona-forge").join("config.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".persona-forge").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Generation settings
        if let Ok(val) = std::env::var("PERSONA_FORGE_COUNT") {
            if let Ok(n) = val.parse() {
                self.generation.count = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_DIVERSITY_TARGET") {
            if let Ok(n) = val.parse() {
                self.generation.diversity_target = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_QUALITY_THRESHOLD") {
            if let Ok(n) = val.parse() {
                self.generation.quality_threshold = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_MAX_ATTEMPTS") {
            if let Ok(n) = val.parse() {
                self.generation.max_attempts = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_COUNTER_RATE") {
            if let Ok(n) = val.parse() {
                self.generation.counter_stereotypical_rate = n;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_SEED") {
            if let Ok(n) = val.parse() {
                self.generation.seed = Some(n);
            }
        }

        // Validation settings
        if let Ok(val) = std::env::var("PERSONA_FORGE_STUDY_LEVEL") {
            if let Ok(level) = val.parse() {
                self.validation.study_level = level;
            }
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_GATE_ON_READINESS") {
            self.validation.gate_on_readiness = val.to_lowercase() == "true" || val == "1";
        }

        // Logging settings
        if let Ok(val) = std::env::var("PERSONA_FORGE_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("PERSONA_FORGE_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let g = &self.generation;
        if g.count == 0 {
            return Err(Error::config_field_invalid("generation.count", "count must be positive"));
        }
        if g.max_attempts == 0 {
            return Err(Error::config_field_invalid("generation.max_attempts", "max_attempts must be positive"));
        }

        let b = &self.bias;
        let fractions = [
            ("generation.diversity_target", g.diversity_target),
            ("generation.quality_threshold", g.quality_threshold),
            ("generation.counter_stereotypical_rate", g.counter_stereotypical_rate),
            ("generation.imperfection_probability", g.imperfection_probability),
            ("generation.human_review_rate", g.human_review_rate),
            ("bias.correlation_alert_rate", b.correlation_alert_rate),
            ("bias.correlation_high_rate", b.correlation_high_rate),
            ("bias.dominance_share", b.dominance_share),
            ("bias.dominance_medium_share", b.dominance_medium_share),
            ("bias.dominance_high_share", b.dominance_high_share),
            ("bias.positivity_indicator_rate", b.positivity_indicator_rate),
            ("bias.positivity_batch_rate", b.positivity_batch_rate),
            ("bias.mismatch_tolerance", b.mismatch_tolerance),
            ("bias.mismatch_high_delta", b.mismatch_high_delta),
            ("bias.highly_agreeable_rate", b.highly_agreeable_rate),
            ("bias.low_criticism_rate", b.low_criticism_rate),
            ("bias.min_diversity", b.min_diversity),
            ("bias.min_alignment", b.min_alignment),
            ("bias.max_sycophancy", b.max_sycophancy),
            ("bias.max_stereotype_risk", b.max_stereotype_risk),
            ("bias.risk_per_correlation", b.risk_per_correlation),
            ("bias.min_counter_stereotypical_rate", b.min_counter_stereotypical_rate),
            ("bias.min_imperfection_rate", b.min_imperfection_rate),
            ("monitor.trend_tolerance", self.monitor.trend_tolerance),
            ("monitor.min_pass_rate", self.monitor.min_pass_rate),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config_field_invalid(
                    field,
                    format!("{} must be between 0 and 1 (got {})", field, value),
                ));
            }
        }

        if b.audited_distributions.is_empty() {
            return Err(Error::config_field_invalid(
                "bias.audited_distributions",
                "at least one reference distribution must be audited",
            ));
        }

        if self.monitor.trend_window == 0 {
            return Err(Error::config_field_invalid("monitor.trend_window", "trend_window must be positive"));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".persona-forge")
                .join("config.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::ConfigValidation {
            message: format!(
                "Configuration file already exists: {}. Use --force to overwrite.",
                config_path.display()
            ),
            field: None,
        });
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    // Write the default config with comments
    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# persona-forge configuration

[generation]
# Personas per batch
count = 50

# Diversity the enforcer aims for (0-1)
diversity_target = 0.8

# Advisory diversity floor; a warning is logged below it (0-1)
quality_threshold = 0.7

# Generation attempts before giving up
max_attempts = 3

# Generate a share of counter-stereotypical personas
include_counter_stereotypical = true
counter_stereotypical_rate = 0.3

# Chance a persona carries a human imperfection
imperfection_probability = 0.15

# Share of each batch flagged for human review
human_review_rate = 0.1

# RNG seed for reproducible batches (entropy when unset)
# seed = 42

[validation]
# Study readiness level: pilot, exploratory, sensitivity
study_level = "pilot"

# Require study readiness in addition to the bias verdict
gate_on_readiness = false

# Methodological rigor inputs
process_documented = true
quality_controls_applied = true

[bias]
# Stereotype correlations
correlation_alert_rate = 0.7
correlation_high_rate = 0.9

# Dominant value of a protected characteristic
dominance_share = 0.7
dominance_medium_share = 0.8
dominance_high_share = 0.9

# Positive stereotype clustering
positivity_indicator_rate = 0.8
positivity_batch_rate = 0.3

# Reference demographics
mismatch_tolerance = 0.15
mismatch_high_delta = 0.25
escalated_distributions = ["income"]
audited_distributions = ["age", "gender", "income", "region"]

# Sycophancy
agreeableness_threshold = 8.0
highly_agreeable_rate = 0.4
low_criticism_rate = 0.6

# Gates
max_high_alerts = 2
min_diversity = 0.7
min_alignment = 0.85
max_sycophancy = 0.3
max_stereotype_risk = 0.2
risk_per_correlation = 0.2

# Recommendation floors
min_counter_stereotypical_rate = 0.25
min_imperfection_rate = 0.15

[monitor]
# Values kept per metric
history_limit = 100

# Validation records kept
record_limit = 50

# Trend window and stable band
trend_window = 5
trend_tolerance = 0.05

# Pass rate below which the monitor raises an alert
min_pass_rate = 0.8

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.persona-forge/logs/persona-forge.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.generation.count, 50);
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.validation.study_level, StudyLevel::Pilot);
        assert_eq!(config.bias.max_high_alerts, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_override() {
        env::set_var("PERSONA_FORGE_COUNT", "120");
        env::set_var("PERSONA_FORGE_STUDY_LEVEL", "sensitivity");
        env::set_var("PERSONA_FORGE_SEED", "99");

        let mut config = PipelineConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.generation.count, 120);
        assert_eq!(config.validation.study_level, StudyLevel::Sensitivity);
        assert_eq!(config.generation.seed, Some(99));

        env::remove_var("PERSONA_FORGE_COUNT");
        env::remove_var("PERSONA_FORGE_STUDY_LEVEL");
        env::remove_var("PERSONA_FORGE_SEED");
    }

    #[test]
    fn test_validation_zero_count() {
        let mut config = PipelineConfig::default();
        config.generation.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_out_of_range_threshold() {
        let mut config = PipelineConfig::default();
        config.bias.min_alignment = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bias.min_alignment"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = PipelineConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_audit_list() {
        let mut config = PipelineConfig::default();
        config.bias.audited_distributions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = PipelineConfig::default();
        config.logging.file = Some("~/logs/forge.log".to_string());
        config.expand_paths();
        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PipelineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.generation.count, parsed.generation.count);
        assert_eq!(config.bias.audited_distributions, parsed.bias.audited_distributions);
    }

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed: PipelineConfig = toml::from_str(&generate_default_config()).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(parsed.generation.count, defaults.generation.count);
        assert_eq!(parsed.bias.min_alignment, defaults.bias.min_alignment);
        assert_eq!(parsed.monitor.trend_window, defaults.monitor.trend_window);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[generation]
count = 20
diversity_target = 0.9
seed = 7

[validation]
study_level = "exploratory"
gate_on_readiness = true

[bias]
max_high_alerts = 1

[logging]
level = "debug"
"#;

        let config: PipelineConfig = toml::from_str(config_str).unwrap();

        assert_eq!(config.generation.count, 20);
        assert_eq!(config.generation.diversity_target, 0.9);
        assert_eq!(config.generation.seed, Some(7));
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.validation.study_level, StudyLevel::Exploratory);
        assert!(config.validation.gate_on_readiness);
        assert_eq!(config.bias.max_high_alerts, 1);
        assert_eq!(config.bias.min_diversity, 0.7);
        assert_eq!(config.logging.level, "debug");
    }
}
