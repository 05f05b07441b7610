//! persona-forge binary
//!
//! Generates validated persona batches, validates existing ones, and
//! manages configuration.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use parking_lot::RwLock;
use tracing::{debug, error, info};

use persona_forge::bias::BiasAnalysis;
use persona_forge::catalog::{Catalog, CharacteristicCategory};
use persona_forge::cli::{Cli, Commands, ConfigSubcommand};
use persona_forge::config::{self, PipelineConfig};
use persona_forge::error::{Error, Result};
use persona_forge::logging::{self, LogGuards};
use persona_forge::monitor::QualityMonitor;
use persona_forge::orchestrator::{BatchValidator, GenerationOutcome, GenerationRequest, Orchestrator, StandardValidator};
use persona_forge::persona::{select_diverse_group, Persona};
use persona_forge::validation::{CriteriaTable, StudyReadinessAssessment};
use persona_forge::version;

/// Exit code when no batch passed validation.
const EXIT_VALIDATION_FAILED: i32 = 3;

fn main() {
    match run() {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            std::process::exit(e.exit_code());
        }
    }
}

/// Runs the command and returns the process exit code.
fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(0)
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            handle_config_command(subcommand)?;
            Ok(0)
        }
        Commands::Catalog { category } => {
            logging::init_simple(tracing::Level::WARN)?;
            print_catalog(category)?;
            Ok(0)
        }
        Commands::Generate {
            config,
            count,
            diversity_target,
            quality_threshold,
            max_attempts,
            level,
            seed,
            json,
        } => {
            let mut cfg = PipelineConfig::load(config.as_deref())?;
            let g = &mut cfg.generation;
            if let Some(v) = count {
                g.count = v;
            }
            if let Some(v) = diversity_target {
                g.diversity_target = v;
            }
            if let Some(v) = quality_threshold {
                g.quality_threshold = v;
            }
            if let Some(v) = max_attempts {
                g.max_attempts = v;
            }
            if seed.is_some() {
                g.seed = seed;
            }
            if let Some(l) = level {
                cfg.validation.study_level = l;
            }
            cfg.validate()?;

            let _log_guards = init_logging(&cfg, cli.verbose, cli.quiet)?;
            let passed = run_generate(&cfg, json).inspect_err(log_failure)?;
            Ok(if passed { 0 } else { EXIT_VALIDATION_FAILED })
        }
        Commands::Validate { input, level, config, json } => {
            let mut cfg = PipelineConfig::load(config.as_deref())?;
            if let Some(l) = level {
                cfg.validation.study_level = l;
            }

            let _log_guards = init_logging(&cfg, cli.verbose, cli.quiet)?;
            let passed = run_validate(&cfg, &input, json).inspect_err(log_failure)?;
            Ok(if passed { 0 } else { EXIT_VALIDATION_FAILED })
        }
    }
}

/// Failures also reach the log file while its guard is still held.
fn log_failure(e: &Error) {
    error!(error = %e.format_for_log(), "Command failed");
}

fn init_logging(config: &PipelineConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let guards = logging::init_logging(&config.logging, verbose, quiet)?;
    let build = version::build_info();
    debug!(version = %build.full_version(), target = %build.target, "Starting persona-forge");
    Ok(guards)
}

// ─────────────────────────────────────────────────────────────────
// Generate
// ─────────────────────────────────────────────────────────────────

fn run_generate(config: &PipelineConfig, json: bool) -> Result<bool> {
    let catalog = Catalog::bundled()?;
    let monitor = Arc::new(RwLock::new(QualityMonitor::new(config.monitor.clone(), &config.bias)));
    let mut orchestrator = Orchestrator::new(catalog, config)?.with_monitor(monitor.clone());

    let request = GenerationRequest::from_settings(&config.generation);
    info!(
        count = request.count,
        diversity_target = request.diversity_target,
        max_attempts = request.max_attempts,
        level = %config.validation.study_level,
        "Generating persona batch"
    );
    let outcome = orchestrator.generate_validated(request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, config);
        let report = monitor.read().report();
        println!();
        println!("Quality status: {} ({} validations, pass rate {:.0}%)", report.status, report.validations, report.pass_rate * 100.0);
        for alert in &report.alerts {
            println!("  [{}] {}", alert.severity, alert.message);
        }
    }
    Ok(outcome.success)
}

fn print_outcome(outcome: &GenerationOutcome, config: &PipelineConfig) {
    println!("{}", outcome.message);
    println!();
    print_bias(&outcome.verdict.bias);
    if let Some(ref readiness) = outcome.verdict.readiness {
        println!();
        print_readiness(readiness);
    }

    let review = outcome
        .personas
        .iter()
        .filter(|p| p.validation.as_ref().is_some_and(|v| v.requires_human_review))
        .count();
    let wanted = if review > 0 {
        review
    } else {
        (outcome.personas.len() as f64 * config.generation.human_review_rate).round() as usize
    };
    let sample = select_diverse_group(&outcome.personas, wanted);
    if !sample.is_empty() {
        println!();
        println!("Human review sample ({} personas):", sample.len());
        for p in sample {
            println!("  {}", describe(p));
        }
    }
}

fn describe(p: &Persona) -> String {
    use persona_forge::catalog::Characteristic as C;
    format!(
        "{}  {}, {}, {}, {}{}",
        p.id,
        p.value_key(C::Age),
        p.value_key(C::Gender),
        p.value_key(C::GeographicRegion),
        p.value_key(C::IncomeBracket),
        if p.counter_stereotypical { "  [counter-stereotypical]" } else { "" }
    )
}

fn print_bias(analysis: &BiasAnalysis) {
    let m = &analysis.metrics;
    let verdict = if analysis.validation_passed { "PASSED" } else { "FAILED" };
    println!("Bias analysis: {} ({} personas, {} alerts)", verdict, analysis.total_personas, analysis.alerts.len());
    println!("  Diversity score:          {:.3}", m.diversity_score);
    println!("  Demographic alignment:    {:.3}", m.demographic_alignment);
    println!("  Sycophancy index:         {:.3}", m.sycophancy_index);
    println!("  Stereotype risk:          {:.3}", m.stereotype_risk);
    println!("  Counter-stereotypical:    {:.1}%", m.counter_stereotypical_rate * 100.0);
    println!("  Human imperfections:      {:.1}%", m.human_imperfection_rate * 100.0);

    let failures = analysis.gates.failures();
    if !failures.is_empty() {
        println!("  Failed gates: {}", failures.join(", "));
    }
    for alert in &analysis.alerts {
        println!("  {}", alert);
    }
    if !analysis.recommendations.is_empty() {
        println!("Recommendations:");
        for rec in &analysis.recommendations {
            println!("  - {}", rec);
        }
    }
}

fn print_readiness(assessment: &StudyReadinessAssessment) {
    print!("{}", assessment.summary);
    if let Some(ref cert) = assessment.certificate {
        println!();
        print!("{}", cert);
    }
    if !assessment.limitations.is_empty() {
        println!();
        println!("Limitations:");
        for line in &assessment.limitations {
            println!("  - {}", line);
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Validate
// ─────────────────────────────────────────────────────────────────

fn load_batch(catalog: &Catalog, path: &str) -> Result<Vec<Persona>> {
    let path_buf = PathBuf::from(shellexpand::tilde(path).to_string());
    let content = std::fs::read_to_string(&path_buf).map_err(|source| Error::IoRead {
        path: path_buf.clone(),
        source,
    })?;
    let parse_error = |message: String| Error::BatchParse { path: path_buf.clone(), message };
    let mut doc: serde_json::Value = serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
    // A saved `generate --json` outcome carries the batch under "personas"
    if let Some(batch) = doc.get_mut("personas").map(serde_json::Value::take) {
        doc = batch;
    }
    let personas: Vec<Persona> = serde_json::from_value(doc).map_err(|e| parse_error(e.to_string()))?;
    if personas.is_empty() {
        return Err(Error::EmptyBatch);
    }
    for p in &personas {
        if let Some(c) = catalog.find_violation(&p.characteristics) {
            return Err(parse_error(format!("persona {}: {} is missing or outside its domain", p.id, c)));
        }
    }
    Ok(personas)
}

fn run_validate(config: &PipelineConfig, input: &str, json: bool) -> Result<bool> {
    let catalog = Catalog::bundled()?;
    let personas = load_batch(catalog, input)?;
    info!(personas = personas.len(), level = %config.validation.study_level, "Validating batch");

    let validator = StandardValidator::new(catalog, CriteriaTable::bundled()?, config);
    let verdict = validator.validate(&personas);

    if json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print_bias(&verdict.bias);
        if let Some(ref readiness) = verdict.readiness {
            println!();
            print_readiness(readiness);
        }
    }
    Ok(verdict.passed)
}

// ─────────────────────────────────────────────────────────────────
// Catalog & Config
// ─────────────────────────────────────────────────────────────────

fn print_catalog(category: Option<CharacteristicCategory>) -> Result<()> {
    let catalog = Catalog::bundled()?;
    let categories: Vec<CharacteristicCategory> = match category {
        Some(c) => vec![c],
        None => CharacteristicCategory::all().to_vec(),
    };
    for cat in categories {
        let defs: Vec<_> = catalog.by_category(cat).collect();
        println!("{} ({})", cat, defs.len());
        for def in defs {
            let mut marks = String::new();
            if def.ethical_flag {
                marks.push_str(" [ethical]");
            }
            if def.locale_specific {
                marks.push_str(" [locale]");
            }
            println!("  {:<36} {}{}", def.name(), def.domain_summary(), marks);
        }
        println!();
    }
    Ok(())
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = PipelineConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            PipelineConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
