//! Level-specific readiness assessment over the eight dimensions.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::criteria::{CriteriaTable, Dimension, StudyLevel};
use super::dimensions::{evaluate, DimensionResult, ScoringInput, ValidationContext};
use crate::catalog::{Catalog, ReferenceDistribution};
use crate::persona::Persona;

/// Dimensions scoring below this are listed as limitations.
const LIMITATION_SCORE: f64 = 0.8;

/// Improvements quoted in the summary.
const PRIORITY_IMPROVEMENTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReadinessAssessment {
    pub level: StudyLevel,
    pub overall_score: f64,
    pub pass_threshold: f64,
    pub passed: bool,
    pub dimension_results: Vec<DimensionResult>,
    pub summary: String,
    /// Issued only when the batch passed
    pub certificate: Option<String>,
    pub limitations: Vec<String>,
    pub use_cases: Vec<String>,
    pub assessed_at: DateTime<Utc>,
}

impl StudyReadinessAssessment {
    pub fn result(&self, dimension: Dimension) -> Option<&DimensionResult> {
        self.dimension_results.iter().find(|r| r.dimension == dimension)
    }

    pub fn failed_dimensions(&self) -> impl Iterator<Item = &DimensionResult> {
        self.dimension_results.iter().filter(|r| !r.passed)
    }
}

pub struct StagedValidator<'a> {
    catalog: &'a Catalog,
    criteria: &'a CriteriaTable,
    audited: Vec<&'a ReferenceDistribution>,
}

impl<'a> StagedValidator<'a> {
    /// `audited` names the reference distributions scored for demographic accuracy.
    pub fn new(catalog: &'a Catalog, criteria: &'a CriteriaTable, audited: &[String]) -> Self {
        let reference = catalog.reference();
        let audited = audited
            .iter()
            .filter_map(|id| {
                let found = reference.get(id);
                if found.is_none() {
                    warn!(distribution = %id, "Audited distribution not found in reference data");
                }
                found
            })
            .collect();
        Self { catalog, criteria, audited }
    }

    pub fn validate_for_level(
        &self,
        personas: &[Persona],
        level: StudyLevel,
        context: ValidationContext,
    ) -> StudyReadinessAssessment {
        let input = ScoringInput {
            catalog: self.catalog,
            personas,
            level,
            context,
            audited: &self.audited,
        };

        let mut overall = 0.0;
        let mut results = Vec::with_capacity(Dimension::all().len());
        for criteria in self.criteria.for_level(level) {
            let result = evaluate(criteria.dimension, &input, criteria.minimum);
            debug!(
                dimension = %criteria.dimension,
                score = result.score,
                minimum = criteria.minimum,
                passed = result.passed,
                "Dimension scored"
            );
            overall += result.score * criteria.weight;
            results.push(result);
        }

        let pass_threshold = self.criteria.pass_threshold(level);
        let passed = overall >= pass_threshold;
        let assessed_at = Utc::now();

        info!(
            level = %level,
            personas = personas.len(),
            score = overall,
            threshold = pass_threshold,
            passed,
            "Study readiness assessed"
        );

        let mut assessment = StudyReadinessAssessment {
            level,
            overall_score: overall,
            pass_threshold,
            passed,
            dimension_results: results,
            summary: String::new(),
            certificate: None,
            limitations: Vec::new(),
            use_cases: use_cases(level, passed),
            assessed_at,
        };
        assessment.summary = self.summary(&assessment);
        assessment.limitations = limitations(&assessment);
        if passed {
            assessment.certificate = Some(certificate(&assessment, personas));
        }
        assessment
    }

    /// Assess every level, lowest first.
    pub fn validate_all_levels(&self, personas: &[Persona], context: ValidationContext) -> Vec<StudyReadinessAssessment> {
        StudyLevel::all()
            .iter()
            .map(|level| self.validate_for_level(personas, *level, context))
            .collect()
    }

    fn summary(&self, a: &StudyReadinessAssessment) -> String {
        let mut out = String::new();
        let verdict = if a.passed { "PASSED" } else { "FAILED" };
        let _ = writeln!(out, "Study Readiness Validation: {} - {}", a.level.slug().to_uppercase(), verdict);
        let _ = writeln!(out, "Overall score: {:.2} (threshold {:.2})", a.overall_score, a.pass_threshold);
        let _ = writeln!(out);
        let _ = writeln!(out, "Dimension scores:");
        for r in &a.dimension_results {
            let minimum = self.criteria.get(a.level, r.dimension).minimum;
            let mark = if r.passed { "✓" } else { "✗" };
            let _ = writeln!(out, "  {} {}: {:.2} (min {:.2})", mark, r.dimension.title(), r.score, minimum);
        }

        let improvements: Vec<&String> = a
            .failed_dimensions()
            .flat_map(|r| r.recommendations.iter())
            .take(PRIORITY_IMPROVEMENTS)
            .collect();
        if !improvements.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Priority improvements:");
            for rec in improvements {
                let _ = writeln!(out, "  - {}", rec);
            }
        }
        out
    }
}

fn limitations(a: &StudyReadinessAssessment) -> Vec<String> {
    let mut lines: Vec<String> = a
        .dimension_results
        .iter()
        .filter(|r| r.score < LIMITATION_SCORE)
        .map(|r| {
            let reason = r.issues.first().map(String::as_str).unwrap_or("May have limitations");
            format!("{}: Score {:.2} - {}", r.dimension.title(), r.score, reason)
        })
        .collect();
    lines.push(a.level.limitation().to_string());
    lines
}

fn use_cases(level: StudyLevel, passed: bool) -> Vec<String> {
    let mut cases = Vec::new();
    if !passed {
        cases.push("Improve persona quality before research use".to_string());
        cases.push("Consider lower-stakes validation or testing".to_string());
    }
    cases.extend(level.use_cases().iter().map(|s| s.to_string()));
    cases
}

/// SHA-256 over the persona ids in batch order.
pub fn batch_fingerprint(personas: &[Persona]) -> String {
    let mut hasher = Sha256::new();
    for p in personas {
        hasher.update(p.id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn certificate(a: &StudyReadinessAssessment, personas: &[Persona]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PERSONA BATCH READINESS CERTIFICATE");
    let _ = writeln!(out, "Study level: {}", a.level.slug().to_uppercase());
    let _ = writeln!(out, "Validation date: {}", a.assessed_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "Batch size: {} personas", personas.len());
    let _ = writeln!(out, "Overall score: {:.3}", a.overall_score);
    let _ = writeln!(out, "Batch fingerprint: {}", batch_fingerprint(personas));
    out
}
