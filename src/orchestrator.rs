//! Generate-validate retry loop.
//!
//! Each attempt regenerates the whole batch and hands it to a
//! [`BatchValidator`]. The loop stops on the first passing batch or when the
//! attempts run out, returning the last batch either way.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bias::{BiasAnalysis, BiasFramework};
use crate::catalog::Catalog;
use crate::config::{GenerationSettings, PipelineConfig, ValidationSettings};
use crate::diversity::diversity_score;
use crate::error::{Error, Result};
use crate::monitor::QualityMonitor;
use crate::persona::{Persona, PersonaGenerator};
use crate::validation::{CriteriaTable, StagedValidator, StudyReadinessAssessment, ValidationContext};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub count: usize,
    pub diversity_target: f64,
    /// Advisory diversity floor
    pub quality_threshold: f64,
    pub max_attempts: u32,
}

impl GenerationRequest {
    pub fn from_settings(settings: &GenerationSettings) -> Self {
        Self {
            count: settings.count,
            diversity_target: settings.diversity_target,
            quality_threshold: settings.quality_threshold,
            max_attempts: settings.max_attempts,
        }
    }

    fn check(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::invalid_parameter("count", "must be greater than 0"));
        }
        if self.max_attempts == 0 {
            return Err(Error::invalid_parameter("max_attempts", "must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.diversity_target) {
            return Err(Error::invalid_parameter("diversity_target", "must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(Error::invalid_parameter("quality_threshold", "must be between 0 and 1"));
        }
        Ok(())
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self::from_settings(&GenerationSettings::default())
    }
}

/// Result of validating one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub bias: BiasAnalysis,
    pub readiness: Option<StudyReadinessAssessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub personas: Vec<Persona>,
    pub verdict: Verdict,
    /// 1-based attempt that produced `personas`
    pub attempt: u32,
    pub message: String,
}

/// Decides whether a generated batch is acceptable.
pub trait BatchValidator {
    fn validate(&self, personas: &[Persona]) -> Verdict;
}

/// Bias framework plus staged readiness at the configured level.
pub struct StandardValidator<'a> {
    bias: BiasFramework<'a>,
    staged: StagedValidator<'a>,
    settings: ValidationSettings,
}

impl<'a> StandardValidator<'a> {
    pub fn new(
        catalog: &'a Catalog,
        criteria: &'a CriteriaTable,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            bias: BiasFramework::new(catalog, config.bias.clone()),
            staged: StagedValidator::new(catalog, criteria, &config.bias.audited_distributions),
            settings: config.validation.clone(),
        }
    }

    pub fn context(&self) -> ValidationContext {
        ValidationContext {
            process_documented: self.settings.process_documented,
            quality_controls_applied: self.settings.quality_controls_applied,
        }
    }
}

impl BatchValidator for StandardValidator<'_> {
    fn validate(&self, personas: &[Persona]) -> Verdict {
        let bias = self.bias.analyze(personas);
        let readiness = self
            .staged
            .validate_for_level(personas, self.settings.study_level, self.context());
        let passed = bias.validation_passed && (!self.settings.gate_on_readiness || readiness.passed);
        Verdict {
            passed,
            bias,
            readiness: Some(readiness),
        }
    }
}

pub struct Orchestrator<'a> {
    generator: PersonaGenerator<'a>,
    validator: Box<dyn BatchValidator + 'a>,
    monitor: Option<Arc<RwLock<QualityMonitor>>>,
}

impl<'a> Orchestrator<'a> {
    /// Standard pipeline over the bundled criteria table.
    pub fn new(catalog: &'a Catalog, config: &PipelineConfig) -> Result<Self> {
        let criteria = CriteriaTable::bundled()?;
        Ok(Self::with_validator(
            PersonaGenerator::new(catalog, config.generation.clone()),
            Box::new(StandardValidator::new(catalog, criteria, config)),
        ))
    }

    pub fn with_validator(generator: PersonaGenerator<'a>, validator: Box<dyn BatchValidator + 'a>) -> Self {
        Self {
            generator,
            validator,
            monitor: None,
        }
    }

    /// Record every verdict into a shared monitor.
    pub fn with_monitor(mut self, monitor: Arc<RwLock<QualityMonitor>>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn monitor(&self) -> Option<&Arc<RwLock<QualityMonitor>>> {
        self.monitor.as_ref()
    }

    pub fn generate_validated(&mut self, request: GenerationRequest) -> Result<GenerationOutcome> {
        request.check()?;

        let mut attempt = 1;
        loop {
            let personas = self.generator.generate_batch(request.count, request.diversity_target);

            let diversity = diversity_score(&personas);
            if diversity < request.quality_threshold {
                warn!(
                    attempt,
                    diversity,
                    threshold = request.quality_threshold,
                    "Batch diversity below quality threshold"
                );
            }

            let verdict = self.validator.validate(&personas);
            if let Some(ref monitor) = self.monitor {
                monitor.write().record(&verdict.bias, verdict.readiness.as_ref(), verdict.passed);
            }

            if verdict.passed {
                info!(attempt, count = personas.len(), "Batch passed validation");
                return Ok(GenerationOutcome {
                    success: true,
                    message: format!("Generated {} personas that passed validation on attempt {}", personas.len(), attempt),
                    personas,
                    verdict,
                    attempt,
                });
            }

            if attempt >= request.max_attempts {
                warn!(
                    attempts = attempt,
                    alerts = verdict.bias.alerts.len(),
                    "Validation failed on every attempt, returning last batch"
                );
                return Ok(GenerationOutcome {
                    success: false,
                    message: format!(
                        "Validation failed after {} attempts; returning the last batch for review",
                        attempt
                    ),
                    personas,
                    verdict,
                    attempt,
                });
            }

            info!(
                attempt,
                failed_gates = ?verdict.bias.gates.failures(),
                "Batch failed validation, regenerating"
            );
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::config::{BiasSettings, MonitorSettings};
    use crate::validation::StudyLevel;

    fn catalog() -> &'static Catalog {
        Catalog::bundled().unwrap()
    }

    fn seeded_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.generation.seed = Some(5);
        config
    }

    /// Standard verdicts overridden by a script of pass marks.
    struct Scripted<'a> {
        inner: StandardValidator<'a>,
        script: Vec<bool>,
        calls: Cell<usize>,
    }

    impl BatchValidator for Scripted<'_> {
        fn validate(&self, personas: &[Persona]) -> Verdict {
            let call = self.calls.get();
            self.calls.set(call + 1);
            let mut verdict = self.inner.validate(personas);
            verdict.passed = self.script.get(call).copied().unwrap_or(false);
            verdict
        }
    }

    fn scripted(script: Vec<bool>) -> Orchestrator<'static> {
        let config = seeded_config();
        let inner = StandardValidator::new(catalog(), CriteriaTable::bundled().unwrap(), &config);
        Orchestrator::with_validator(
            PersonaGenerator::new(catalog(), config.generation.clone()),
            Box::new(Scripted { inner, script, calls: Cell::new(0) }),
        )
    }

    fn request(count: usize, max_attempts: u32) -> GenerationRequest {
        GenerationRequest { count, max_attempts, ..GenerationRequest::default() }
    }

    #[test]
    fn test_passes_on_third_attempt() {
        let monitor = Arc::new(RwLock::new(QualityMonitor::new(MonitorSettings::default(), &BiasSettings::default())));
        let mut orchestrator = scripted(vec![false, false, true]).with_monitor(monitor.clone());

        let outcome = orchestrator.generate_validated(request(12, 3)).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempt, 3);
        assert_eq!(outcome.personas.len(), 12);
        assert_eq!(monitor.read().records().count(), 3);
    }

    #[test]
    fn test_stops_after_max_attempts() {
        let mut orchestrator = scripted(Vec::new());
        let outcome = orchestrator.generate_validated(request(8, 4)).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempt, 4);
        assert_eq!(outcome.personas.len(), 8);
        assert!(outcome.message.contains("after 4 attempts"));
    }

    #[test]
    fn test_first_pass_stops_immediately() {
        let mut orchestrator = scripted(vec![true]);
        let outcome = orchestrator.generate_validated(request(5, 3)).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempt, 1);
    }

    #[test]
    fn test_invalid_requests() {
        let mut orchestrator = scripted(vec![true]);
        for bad in [
            request(0, 3),
            request(5, 0),
            GenerationRequest { diversity_target: 1.5, ..request(5, 3) },
            GenerationRequest { quality_threshold: -0.1, ..request(5, 3) },
        ] {
            let err = orchestrator.generate_validated(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { .. }), "{:?}", bad);
        }
    }

    #[test]
    fn test_readiness_gate() {
        let mut config = seeded_config();
        config.validation.gate_on_readiness = true;
        let validator = StandardValidator::new(catalog(), CriteriaTable::bundled().unwrap(), &config);
        let personas = PersonaGenerator::new(catalog(), config.generation.clone()).generate_batch(20, 0.8);

        let verdict = validator.validate(&personas);
        let readiness = verdict.readiness.as_ref().unwrap();
        assert_eq!(verdict.passed, verdict.bias.validation_passed && readiness.passed);
    }

    #[test]
    fn test_monitor_records_final_verdict() {
        let monitor = Arc::new(RwLock::new(QualityMonitor::new(MonitorSettings::default(), &BiasSettings::default())));
        let mut orchestrator = scripted(vec![false, true]).with_monitor(monitor.clone());
        orchestrator.generate_validated(request(10, 2)).unwrap();

        let monitor = monitor.read();
        let passes: Vec<bool> = monitor.records().map(|r| r.passed).collect();
        assert_eq!(passes, vec![false, true]);
        assert!((monitor.pass_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_readiness_gate_feeds_monitor_pass_rate() {
        let mut config = seeded_config();
        config.validation.gate_on_readiness = true;
        config.validation.study_level = StudyLevel::Sensitivity;
        let monitor = Arc::new(RwLock::new(QualityMonitor::new(config.monitor.clone(), &config.bias)));
        let mut orchestrator = Orchestrator::new(catalog(), &config).unwrap().with_monitor(monitor.clone());

        let mut attempts = 0;
        let mut successes = 0;
        for _ in 0..3 {
            let outcome = orchestrator.generate_validated(request(15, 2)).unwrap();
            let readiness = outcome.verdict.readiness.as_ref().unwrap();
            assert!(!outcome.success || readiness.passed);
            attempts += outcome.attempt as usize;
            successes += usize::from(outcome.success);
        }

        let monitor = monitor.read();
        assert_eq!(monitor.records().count(), attempts);
        assert_eq!(monitor.records().filter(|r| r.passed).count(), successes);
        assert!((monitor.pass_rate() - successes as f64 / attempts as f64).abs() < 1e-9);
    }

    #[test]
    fn test_standard_pipeline_terminates() {
        let mut orchestrator = Orchestrator::new(catalog(), &seeded_config()).unwrap();
        let outcome = orchestrator.generate_validated(request(20, 2)).unwrap();
        assert!(outcome.attempt >= 1 && outcome.attempt <= 2);
        assert_eq!(outcome.personas.len(), 20);
        assert_eq!(outcome.success, outcome.verdict.passed);
    }
}
