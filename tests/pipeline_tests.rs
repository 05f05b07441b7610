//! End-to-end scenarios over the library API

mod common;

use std::sync::Arc;

use parking_lot::RwLock;

use common::{seeded_batch, seeded_generator};
use persona_forge::bias::{BiasFramework, BiasType, Severity};
use persona_forge::catalog::{Catalog, Characteristic, Value};
use persona_forge::config::{BiasSettings, MonitorSettings, PipelineConfig};
use persona_forge::diversity::characteristic_diversity;
use persona_forge::monitor::{Metric, QualityMonitor, Trend};
use persona_forge::orchestrator::{GenerationRequest, Orchestrator};
use persona_forge::persona::Persona;
use persona_forge::validation::{CriteriaTable, Dimension, StagedValidator, StudyLevel, ValidationContext};

fn catalog() -> &'static Catalog {
    Catalog::bundled().unwrap()
}

#[test]
fn test_batch_stays_inside_the_catalog() {
    let batch = seeded_batch(1, 40);
    assert_eq!(batch.len(), 40);
    for p in &batch {
        assert_eq!(catalog().find_violation(&p.characteristics), None, "persona {}", p.id);
        assert!(p.validation.is_some());
    }
}

#[test]
fn test_counter_stereotypical_share() {
    let batch = seeded_batch(2, 50);
    assert_eq!(batch.iter().filter(|p| p.counter_stereotypical).count(), 15);
    // regular personas come first
    assert!(batch[..35].iter().all(|p| !p.counter_stereotypical));
}

#[test]
fn test_skewed_gender_raises_medium_alert() {
    let mut batch = seeded_batch(3, 50);
    for (i, p) in batch.iter_mut().enumerate() {
        let gender = if i < 45 { "Masculino" } else { "Femenino" };
        p.set(Characteristic::Gender, Value::from(gender));
    }
    assert!(characteristic_diversity(&batch, Characteristic::Gender) < 0.2);

    let analysis = BiasFramework::new(catalog(), BiasSettings::default()).analyze(&batch);
    let alert = analysis
        .alerts
        .iter()
        .find(|a| a.bias_type == BiasType::LackOfDiversity && a.description.contains("gender"))
        .expect("gender dominance alert");
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(alert.affected_personas.len(), 45);
}

#[test]
fn test_batch_survives_json() {
    let batch = seeded_batch(4, 6);
    let json = serde_json::to_string(&batch).unwrap();
    let back: Vec<Persona> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, batch);
}

#[test]
fn test_readiness_bars_rise_with_level() {
    let batch = seeded_batch(5, 30);
    let table = CriteriaTable::bundled().unwrap();
    let validator = StagedValidator::new(catalog(), table, &BiasSettings::default().audited_distributions);
    let context = ValidationContext { process_documented: true, quality_controls_applied: true };

    let assessments = validator.validate_all_levels(&batch, context);
    let bars: Vec<f64> = assessments.iter().map(|a| a.pass_threshold).collect();
    assert!(bars.windows(2).all(|w| w[0] < w[1]), "{:?}", bars);

    for a in &assessments {
        assert_eq!(a.dimension_results.len(), Dimension::all().len());
        assert_eq!(a.certificate.is_some(), a.passed);
        assert!(a.summary.contains(&a.level.slug().to_uppercase()));
    }
}

#[test]
fn test_methodology_context_matters() {
    let batch = seeded_batch(6, 20);
    let table = CriteriaTable::bundled().unwrap();
    let validator = StagedValidator::new(catalog(), table, &BiasSettings::default().audited_distributions);

    let documented = validator.validate_for_level(
        &batch,
        StudyLevel::Pilot,
        ValidationContext { process_documented: true, quality_controls_applied: true },
    );
    let bare = validator.validate_for_level(&batch, StudyLevel::Pilot, ValidationContext::default());

    let rigor = |a: &persona_forge::validation::StudyReadinessAssessment| {
        a.result(Dimension::MethodologicalRigor).unwrap().score
    };
    assert!((rigor(&documented) - 1.0).abs() < 1e-9);
    assert!((rigor(&bare) - 0.4).abs() < 1e-9);
    // 0.6 × weight 0.05
    assert!((documented.overall_score - bare.overall_score - 0.03).abs() < 1e-9);
}

#[test]
fn test_orchestrated_runs_feed_the_monitor() {
    let mut config = PipelineConfig::default();
    config.generation.seed = Some(8);
    config.monitor = MonitorSettings { trend_window: 2, ..MonitorSettings::default() };

    let monitor = Arc::new(RwLock::new(QualityMonitor::new(config.monitor.clone(), &config.bias)));
    let mut orchestrator = Orchestrator::new(catalog(), &config).unwrap().with_monitor(monitor.clone());

    let request = GenerationRequest { count: 15, max_attempts: 1, ..GenerationRequest::default() };
    let mut attempts = 0;
    for _ in 0..4 {
        let outcome = orchestrator.generate_validated(request).unwrap();
        assert_eq!(outcome.personas.len(), 15);
        attempts += outcome.attempt as usize;
    }

    let monitor = monitor.read();
    assert_eq!(monitor.records().count(), attempts);
    assert_eq!(monitor.history(Metric::DiversityScore).len(), attempts);
    assert_eq!(monitor.history(Metric::ReadinessScore).len(), attempts);
    assert_ne!(monitor.trend(Metric::DiversityScore), Trend::InsufficientData);

    let report = monitor.report();
    assert_eq!(report.validations, attempts);
    assert!(report.metrics.contains_key(&Metric::SycophancyIndex));
}

#[test]
fn test_seeded_generation_is_reproducible() {
    let a = seeded_generator(9).generate_batch(10, 0.8);
    let b = seeded_generator(9).generate_batch(10, 0.8);
    let traits = |batch: &[Persona]| batch.iter().map(|p| p.characteristics.clone()).collect::<Vec<_>>();
    assert_eq!(traits(&a), traits(&b));
}
