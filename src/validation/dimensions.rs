//! Heuristic scorers for the eight quality dimensions.
//!
//! Every scorer returns a score in [0, 1] with the evidence behind it. An
//! empty batch scores 0 on every dimension derived from the batch.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::criteria::{Dimension, StudyLevel};
use crate::catalog::{Catalog, Characteristic, ReferenceDistribution};
use crate::diversity::diversity_over;
use crate::persona::Persona;

const COVERAGE_CHARACTERISTICS: [Characteristic; 5] = [
    Characteristic::Age,
    Characteristic::Gender,
    Characteristic::EducationLevel,
    Characteristic::IncomeBracket,
    Characteristic::GeographicRegion,
];

/// Combinations of the four binary intersectional flags.
const INTERSECTIONAL_PROFILES: f64 = 16.0;

/// Process facts that cannot be read off the personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationContext {
    pub process_documented: bool,
    pub quality_controls_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: Dimension,
    pub score: f64,
    /// Score reached the level's minimum
    pub passed: bool,
    pub evidence: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
}

/// Everything a scorer may look at.
pub struct ScoringInput<'a> {
    pub catalog: &'a Catalog,
    pub personas: &'a [Persona],
    pub level: StudyLevel,
    pub context: ValidationContext,
    pub audited: &'a [&'a ReferenceDistribution],
}

#[derive(Default)]
struct Findings {
    evidence: Vec<String>,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Findings {
    fn evidence(&mut self, line: String) {
        self.evidence.push(line);
    }

    fn issue(&mut self, issue: impl Into<String>, recommendation: impl Into<String>) {
        self.issues.push(issue.into());
        self.recommendations.push(recommendation.into());
    }

    fn finish(self, dimension: Dimension, score: f64, confidence: f64, minimum: f64) -> DimensionResult {
        let score = score.clamp(0.0, 1.0);
        DimensionResult {
            dimension,
            score,
            passed: score >= minimum,
            evidence: self.evidence,
            issues: self.issues,
            recommendations: self.recommendations,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Score one dimension against its level minimum.
pub fn evaluate(dimension: Dimension, input: &ScoringInput<'_>, minimum: f64) -> DimensionResult {
    if input.personas.is_empty() && dimension != Dimension::MethodologicalRigor {
        let mut findings = Findings::default();
        findings.issue("No personas to validate", "Generate a batch before validating");
        return findings.finish(dimension, 0.0, 0.0, minimum);
    }

    let (score, confidence, findings) = match dimension {
        Dimension::DemographicAccuracy => demographic_accuracy(input),
        Dimension::BehavioralConsistency => behavioral_consistency(input),
        Dimension::ResponseAuthenticity => response_authenticity(input),
        Dimension::CulturalAppropriateness => cultural_appropriateness(input),
        Dimension::TemporalRelevance => temporal_relevance(input),
        Dimension::BiasMitigation => bias_mitigation(input),
        Dimension::DiversityCoverage => diversity_coverage(input),
        Dimension::MethodologicalRigor => methodological_rigor(input),
    };
    findings.finish(dimension, score, confidence, minimum)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn above(p: &Persona, c: Characteristic, threshold: f64) -> bool {
    p.number(c).is_some_and(|x| x > threshold)
}

fn below(p: &Persona, c: Characteristic, threshold: f64) -> bool {
    p.number(c).is_some_and(|x| x < threshold)
}

fn at_least(p: &Persona, c: Characteristic, threshold: f64) -> bool {
    p.number(c).is_some_and(|x| x >= threshold)
}

fn top_income(p: &Persona) -> bool {
    p.category(Characteristic::IncomeBracket).is_some_and(|v| v.starts_with("Alto"))
}

// ─────────────────────────────────────────────────────────────────
// Scorers: (score, confidence, findings)
// ─────────────────────────────────────────────────────────────────

fn demographic_accuracy(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let mut accuracies = Vec::with_capacity(input.audited.len());
    for dist in input.audited {
        let accuracy = dist.alignment(&dist.actual_shares(input.personas.iter().map(|p| &p.characteristics)));
        f.evidence(format!("{} distribution accuracy: {:.2}", dist.title, accuracy));
        if accuracy < 0.7 {
            f.issue(
                format!("{} distribution deviates significantly from reference demographics", dist.title),
                format!("Adjust {} sampling to match reference demographics", dist.title.to_lowercase()),
            );
        }
        accuracies.push(accuracy);
    }
    let score = mean(accuracies.into_iter());
    (score, (score + 0.1).min(0.9), f)
}

fn personality_alignment(p: &Persona) -> f64 {
    let mut alignment = 1.0;
    let passive = p.is_any(Characteristic::SocialMediaActivity, &["Pasivo", "No usuario"]);
    let very_active = p.is(Characteristic::SocialMediaActivity, "Muy activo");
    if (above(p, Characteristic::PersonalityExtraversion, 7.0) && passive)
        || (below(p, Characteristic::PersonalityExtraversion, 4.0) && very_active)
    {
        alignment -= 0.2;
    }
    let laggard = p.is(Characteristic::TechnologyAdoption, "Rezagado");
    let innovator = p.is(Characteristic::TechnologyAdoption, "Innovador");
    if (above(p, Characteristic::PersonalityOpenness, 7.0) && laggard)
        || (below(p, Characteristic::PersonalityOpenness, 4.0) && innovator)
    {
        alignment -= 0.3;
    }
    alignment
}

fn has_contradiction(p: &Persona) -> bool {
    let demanding_bargain_hunter = above(p, Characteristic::PriceSensitivityTelecom, 8.0)
        && p.is(Characteristic::CustomerServiceExpectations, "Muy altas");
    let low_income_big_spender = p
        .category(Characteristic::IncomeBracket)
        .is_some_and(|v| v.to_lowercase().contains("bajo"))
        && p.is(Characteristic::MonthlySpend, "> L.1200");
    demanding_bargain_hunter || low_income_big_spender
}

fn behavioral_consistency(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let n = input.personas.len() as f64;
    let alignment = mean(input.personas.iter().map(personality_alignment));
    let contradictions = input.personas.iter().filter(|p| has_contradiction(p)).count();
    let rate = contradictions as f64 / n;

    f.evidence(format!("Average personality-behavior alignment: {:.2}", alignment));
    f.evidence(format!("Personas with internal contradictions: {}", contradictions));
    if alignment < 0.6 {
        f.issue(
            "Weak personality-behavior alignment",
            "Improve personality-behavior alignment in generation",
        );
    }
    if rate >= 0.2 {
        f.issue(
            format!("Internal contradictions in {} of {} personas", contradictions, input.personas.len()),
            "Reduce internal contradictions in persona characteristics",
        );
    }
    let score = (alignment - 0.5 * rate).clamp(0.0, 1.0);
    (score, score.min(0.9), f)
}

fn response_authenticity(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let n = input.personas.len() as f64;
    let mut sycophantic = 0usize;
    let mut generic = 0usize;
    let score = mean(input.personas.iter().map(|p| {
        let mut s: f64 = 1.0;
        if above(p, Characteristic::PersonalityAgreeableness, 8.0)
            && p.ranked_within(input.catalog, Characteristic::CustomerServiceExperience, 2)
            && p.ranked_within(input.catalog, Characteristic::BrandPerceptionTigo, 2)
        {
            s -= 0.4;
            sycophantic += 1;
        }
        if above(p, Characteristic::RecommendationLikelihood, 8.0) && above(p, Characteristic::OperatorLoyalty, 8.0) {
            s -= 0.3;
            generic += 1;
        }
        s.max(0.0)
    }));

    f.evidence(format!("Average authenticity score: {:.2}", score));
    f.evidence(format!("Potential sycophancy issues: {}/{}", sycophantic, input.personas.len()));
    f.evidence(format!("Generic response patterns: {}/{}", generic, input.personas.len()));
    if sycophantic as f64 > n * 0.1 {
        f.issue(
            format!("High sycophancy risk: {} personas", sycophantic),
            "Implement stronger anti-sycophancy measures",
        );
    }
    if generic as f64 > n * 0.15 {
        f.issue(
            format!("Too many generic response patterns: {} personas", generic),
            "Increase response diversity and add realistic concerns",
        );
    }
    (score, score, f)
}

fn cultural_appropriateness(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let scores: Vec<f64> = input
        .personas
        .iter()
        .map(|p| {
            let mut s: f64 = 0.0;
            if at_least(p, Characteristic::LocalExpressionsUsage, 5.0) {
                s += 0.2;
            }
            if at_least(p, Characteristic::ValuesFamily, 7.0) {
                s += 0.3;
            }
            if p.is_any(Characteristic::ReligiousSpirituality, &["Muy religioso", "Religioso", "Moderado"]) {
                s += 0.2;
            }
            if p.is_any(Characteristic::FormalityPreference, &["Formal", "Semi-formal"]) {
                s += 0.2;
            }
            if at_least(p, Characteristic::CulturalIdentityStrength, 6.0) {
                s += 0.1;
            }
            s.min(1.0)
        })
        .collect();
    let score = mean(scores.iter().copied());
    let covered = scores.iter().filter(|s| **s > 0.5).count() as f64 / scores.len() as f64;

    f.evidence(format!("Average cultural appropriateness: {:.2}", score));
    f.evidence(format!("Local cultural context coverage: {:.1}%", covered * 100.0));
    if score < 0.6 {
        f.issue(
            "Low cultural appropriateness across personas",
            "Strengthen local cultural context in generation",
        );
    }
    (score, score, f)
}

fn temporal_relevance(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let scores: Vec<f64> = input
        .personas
        .iter()
        .map(|p| {
            let mut s: f64 = 0.0;
            if p.is_any(Characteristic::TechnologyAdoption, &["Innovador", "Early adopter"]) {
                s += 0.3;
            }
            if p.is_any(Characteristic::SocialMediaActivity, &["Muy activo", "Activo", "Moderado"]) {
                s += 0.2;
            }
            if above(p, Characteristic::Age, 15.0) {
                s += 0.2;
            }
            if at_least(p, Characteristic::PriceSensitivityTelecom, 6.0) {
                s += 0.3;
            }
            s.min(1.0)
        })
        .collect();
    let score = mean(scores.iter().copied());
    let current = scores.iter().filter(|s| **s > 0.5).count() as f64 / scores.len() as f64;

    f.evidence(format!("Average temporal relevance: {:.2}", score));
    f.evidence(format!("Current context awareness: {:.1}%", current * 100.0));
    if score < 0.5 {
        f.issue(
            "Low temporal relevance - personas may seem outdated",
            "Integrate more current context and contemporary patterns",
        );
    }
    (score, score, f)
}

fn bias_mitigation(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let n = input.personas.len() as f64;
    let counter_rate = input.personas.iter().filter(|p| p.counter_stereotypical).count() as f64 / n;
    let stereotyped = input
        .personas
        .iter()
        .filter(|p| {
            (below(p, Characteristic::Age, 25.0) && top_income(p))
                || (p.is(Characteristic::Gender, "Femenino") && p.is(Characteristic::TechnologyAdoption, "Rezagado"))
        })
        .count();
    let stereotyped_rate = stereotyped as f64 / n;
    let score = counter_rate * 0.6 + (1.0 - stereotyped_rate) * 0.4;

    f.evidence(format!("Counter-stereotypical rate: {:.1}%", counter_rate * 100.0));
    f.evidence(format!("Stereotype patterns detected: {}/{}", stereotyped, input.personas.len()));
    f.evidence(format!("Bias mitigation score: {:.2}", score));
    if counter_rate < 0.25 {
        f.issue(
            "Low counter-stereotypical representation",
            "Increase counter-stereotypical persona generation",
        );
    }
    if stereotyped_rate > 0.1 {
        f.issue(
            format!("Too many stereotype patterns: {}", stereotyped),
            "Implement stronger stereotype detection and prevention",
        );
    }
    (score, score, f)
}

/// Distinct `(age < 35, Femenino, top income, Rural)` profiles over 16.
pub fn intersectional_coverage(personas: &[Persona]) -> f64 {
    let profiles: HashSet<(bool, bool, bool, bool)> = personas
        .iter()
        .map(|p| {
            (
                below(p, Characteristic::Age, 35.0),
                p.is(Characteristic::Gender, "Femenino"),
                top_income(p),
                p.is(Characteristic::GeographicRegion, "Rural"),
            )
        })
        .collect();
    profiles.len() as f64 / INTERSECTIONAL_PROFILES
}

fn diversity_coverage(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let coverage = diversity_over(input.personas, &COVERAGE_CHARACTERISTICS);
    f.evidence(format!("Overall diversity score: {:.2}", coverage));
    if coverage < 0.6 {
        f.issue(
            "Low overall diversity across key dimensions",
            "Increase diversity in persona generation",
        );
    }

    let score = if input.level >= StudyLevel::Exploratory {
        let intersectional = intersectional_coverage(input.personas);
        f.evidence(format!("Intersectional diversity: {:.2}", intersectional));
        if intersectional < 0.5 {
            f.issue("Low intersectional diversity", "Ensure diverse combinations of characteristics");
        }
        (coverage + intersectional) / 2.0
    } else {
        coverage
    };
    (score, score, f)
}

fn methodological_rigor(input: &ScoringInput<'_>) -> (f64, f64, Findings) {
    let mut f = Findings::default();
    let mut score = 0.4;
    f.evidence("Validation framework implemented".to_string());
    if input.context.process_documented {
        score += 0.3;
        f.evidence("Process documentation available".to_string());
    } else {
        f.issue("Process documentation missing", "Document persona generation methodology");
    }
    if input.context.quality_controls_applied {
        score += 0.3;
        f.evidence("Quality controls applied".to_string());
    } else {
        f.issue("Quality controls not documented", "Implement and document quality control measures");
    }
    (score, score, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::test_support::batch_with;
    use crate::catalog::Value;

    fn input<'a>(
        personas: &'a [Persona],
        level: StudyLevel,
        audited: &'a [&'a ReferenceDistribution],
    ) -> ScoringInput<'a> {
        ScoringInput {
            catalog: Catalog::bundled().unwrap(),
            personas,
            level,
            context: ValidationContext { process_documented: true, quality_controls_applied: true },
            audited,
        }
    }

    #[test]
    fn test_empty_batch_scores_zero() {
        for dim in Dimension::all() {
            let result = evaluate(*dim, &input(&[], StudyLevel::Pilot, &[]), 0.5);
            if *dim == Dimension::MethodologicalRigor {
                assert!((result.score - 1.0).abs() < 1e-9);
            } else {
                assert_eq!(result.score, 0.0, "{}", dim);
                assert!(!result.passed);
            }
        }
    }

    #[test]
    fn test_methodological_rigor() {
        let batch = batch_with(1, |_, _| {});
        let mut inp = input(&batch, StudyLevel::Pilot, &[]);
        inp.context = ValidationContext { process_documented: true, quality_controls_applied: false };
        let result = evaluate(Dimension::MethodologicalRigor, &inp, 0.6);
        assert!((result.score - 0.7).abs() < 1e-9);
        assert!(result.passed);
        assert_eq!(result.issues, vec!["Quality controls not documented"]);
    }

    #[test]
    fn test_behavioral_consistency_penalties() {
        let batch = batch_with(4, |i, p| {
            p.set(Characteristic::PersonalityExtraversion, Value::Float(5.0));
            p.set(Characteristic::PersonalityOpenness, Value::Float(5.0));
            p.set(Characteristic::PriceSensitivityTelecom, Value::Float(5.0));
            p.set(Characteristic::CustomerServiceExpectations, Value::from("Altas"));
            if i == 0 {
                p.set(Characteristic::PersonalityExtraversion, Value::Float(9.0));
                p.set(Characteristic::SocialMediaActivity, Value::from("No usuario"));
                p.set(Characteristic::PersonalityOpenness, Value::Float(2.0));
                p.set(Characteristic::TechnologyAdoption, Value::from("Innovador"));
            }
            if i == 1 {
                p.set(Characteristic::IncomeBracket, Value::from("Bajo (< L.15,000)"));
                p.set(Characteristic::MonthlySpend, Value::from("> L.1200"));
            }
        });
        let result = evaluate(Dimension::BehavioralConsistency, &input(&batch, StudyLevel::Pilot, &[]), 0.5);
        // alignment (0.5 + 1 + 1 + 1) / 4 = 0.875, contradiction rate 0.25
        assert!((result.score - 0.75).abs() < 1e-9);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_response_authenticity() {
        let batch = batch_with(2, |i, p| {
            if i == 0 {
                p.set(Characteristic::PersonalityAgreeableness, Value::Float(9.0));
                p.set(Characteristic::CustomerServiceExperience, Value::from("Buena"));
                p.set(Characteristic::BrandPerceptionTigo, Value::from("Muy positiva"));
                p.set(Characteristic::RecommendationLikelihood, Value::Int(10));
                p.set(Characteristic::OperatorLoyalty, Value::Float(9.0));
            }
        });
        let result = evaluate(Dimension::ResponseAuthenticity, &input(&batch, StudyLevel::Pilot, &[]), 0.5);
        assert!((result.score - 0.65).abs() < 1e-9);
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn test_cultural_appropriateness_caps_at_one() {
        let batch = batch_with(1, |_, p| {
            p.set(Characteristic::LocalExpressionsUsage, Value::Float(8.0));
            p.set(Characteristic::ValuesFamily, Value::Float(9.0));
            p.set(Characteristic::ReligiousSpirituality, Value::from("Religioso"));
            p.set(Characteristic::FormalityPreference, Value::from("Formal"));
            p.set(Characteristic::CulturalIdentityStrength, Value::Float(7.0));
        });
        let result = evaluate(Dimension::CulturalAppropriateness, &input(&batch, StudyLevel::Pilot, &[]), 0.6);
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_bias_mitigation() {
        let batch = batch_with(4, |i, p| {
            p.counter_stereotypical = i < 2;
            if i == 3 {
                p.set(Characteristic::Gender, Value::from("Femenino"));
                p.set(Characteristic::TechnologyAdoption, Value::from("Rezagado"));
            }
        });
        let result = evaluate(Dimension::BiasMitigation, &input(&batch, StudyLevel::Pilot, &[]), 0.6);
        // 0.5 × 0.6 + 0.75 × 0.4
        assert!((result.score - 0.6).abs() < 1e-9);
        assert_eq!(result.issues, vec!["Too many stereotype patterns: 1"]);
    }

    #[test]
    fn test_intersectional_only_above_pilot() {
        let batch = batch_with(4, |i, p| p.set(Characteristic::Age, Value::Int(20 + i as i64)));
        let pilot = evaluate(Dimension::DiversityCoverage, &input(&batch, StudyLevel::Pilot, &[]), 0.5);
        let exploratory = evaluate(Dimension::DiversityCoverage, &input(&batch, StudyLevel::Exploratory, &[]), 0.5);
        // age distinct 4/4, the other four 1/4
        assert!((pilot.score - 0.4).abs() < 1e-9);
        assert!((exploratory.score - (0.4 + 1.0 / 16.0) / 2.0).abs() < 1e-9);
        assert!(exploratory.evidence.iter().any(|e| e.starts_with("Intersectional")));
    }

    #[test]
    fn test_demographic_accuracy_perfect_gender() {
        let catalog = Catalog::bundled().unwrap();
        let gender = catalog.reference().get("gender").unwrap();
        let audited = [gender];
        let batch = batch_with(100, |i, p| {
            let g = if i < 49 { "Masculino" } else { "Femenino" };
            p.set(Characteristic::Gender, Value::from(g));
        });
        let result = evaluate(Dimension::DemographicAccuracy, &input(&batch, StudyLevel::Pilot, &audited), 0.6);
        assert!((result.score - 1.0).abs() < 1e-9);
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }
}
