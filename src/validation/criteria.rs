//! Study levels, quality dimensions and the criteria table binding them.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

const CRITERIA_TOML: &str = include_str!("../../config/criteria.toml");

static BUNDLED: OnceLock<CriteriaTable> = OnceLock::new();

/// Weight sums may differ from 1 by this much.
const WEIGHT_TOLERANCE: f64 = 1e-6;

// ─────────────────────────────────────────────────────────────────
// Study Level
// ─────────────────────────────────────────────────────────────────

/// Research rigor a batch is certified for, in escalating order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyLevel {
    Pilot,
    Exploratory,
    Sensitivity,
}

impl StudyLevel {
    pub fn all() -> &'static [StudyLevel] {
        &[StudyLevel::Pilot, StudyLevel::Exploratory, StudyLevel::Sensitivity]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            StudyLevel::Pilot => "pilot",
            StudyLevel::Exploratory => "exploratory",
            StudyLevel::Sensitivity => "sensitivity",
        }
    }

    /// What a certified batch is good for.
    pub fn use_cases(&self) -> &'static [&'static str] {
        match self {
            StudyLevel::Pilot => &[
                "Concept testing and initial user feedback",
                "Preliminary market research insights",
                "Internal brainstorming and ideation sessions",
                "Basic user journey mapping",
                "Initial product-market fit assessment",
            ],
            StudyLevel::Exploratory => &[
                "In-depth qualitative research",
                "Theory development and hypothesis generation",
                "Comprehensive user behavior analysis",
                "Detailed market segmentation studies",
                "Product development and feature prioritization",
                "Strategic planning and decision support",
            ],
            StudyLevel::Sensitivity => &[
                "Publication-ready research studies",
                "Peer-reviewed academic research",
                "High-stakes business decision support",
                "Comprehensive market analysis and forecasting",
                "Regulatory and policy development support",
                "Advanced methodological validation studies",
            ],
        }
    }

    /// Standing caveat for results at this level.
    pub fn limitation(&self) -> &'static str {
        match self {
            StudyLevel::Pilot => "Suitable for preliminary insights only - not for definitive conclusions",
            StudyLevel::Exploratory => {
                "Appropriate for theory-building - may require validation for confirmatory research"
            }
            StudyLevel::Sensitivity => "Research-grade quality - suitable for publication-ready research",
        }
    }
}

impl fmt::Display for StudyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for StudyLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pilot" => Ok(StudyLevel::Pilot),
            "exploratory" => Ok(StudyLevel::Exploratory),
            "sensitivity" => Ok(StudyLevel::Sensitivity),
            _ => Err(format!(
                "Unknown study level: '{}'. Valid levels: pilot, exploratory, sensitivity",
                s
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Dimension
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    DemographicAccuracy,
    BehavioralConsistency,
    ResponseAuthenticity,
    CulturalAppropriateness,
    TemporalRelevance,
    BiasMitigation,
    DiversityCoverage,
    MethodologicalRigor,
}

impl Dimension {
    pub fn all() -> &'static [Dimension] {
        &[
            Dimension::DemographicAccuracy,
            Dimension::BehavioralConsistency,
            Dimension::ResponseAuthenticity,
            Dimension::CulturalAppropriateness,
            Dimension::TemporalRelevance,
            Dimension::BiasMitigation,
            Dimension::DiversityCoverage,
            Dimension::MethodologicalRigor,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Dimension::DemographicAccuracy => "demographic_accuracy",
            Dimension::BehavioralConsistency => "behavioral_consistency",
            Dimension::ResponseAuthenticity => "response_authenticity",
            Dimension::CulturalAppropriateness => "cultural_appropriateness",
            Dimension::TemporalRelevance => "temporal_relevance",
            Dimension::BiasMitigation => "bias_mitigation",
            Dimension::DiversityCoverage => "diversity_coverage",
            Dimension::MethodologicalRigor => "methodological_rigor",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::DemographicAccuracy => "Demographic accuracy",
            Dimension::BehavioralConsistency => "Behavioral consistency",
            Dimension::ResponseAuthenticity => "Response authenticity",
            Dimension::CulturalAppropriateness => "Cultural appropriateness",
            Dimension::TemporalRelevance => "Temporal relevance",
            Dimension::BiasMitigation => "Bias mitigation",
            Dimension::DiversityCoverage => "Diversity coverage",
            Dimension::MethodologicalRigor => "Methodological rigor",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

// ─────────────────────────────────────────────────────────────────
// Criteria
// ─────────────────────────────────────────────────────────────────

/// Thresholds and weight for one (level, dimension) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationCriteria {
    pub level: StudyLevel,
    pub dimension: Dimension,
    pub minimum: f64,
    pub target: f64,
    pub weight: f64,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub indicators: Vec<String>,
    #[serde(default)]
    pub acceptance: String,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    criteria: Vec<ValidationCriteria>,
}

/// Complete criteria table: one entry per level and dimension.
#[derive(Debug, Clone)]
pub struct CriteriaTable {
    /// Indexed by level, then dimension, in declaration order
    entries: Vec<Vec<ValidationCriteria>>,
}

impl CriteriaTable {
    /// The table compiled into the binary, parsed on first use.
    pub fn bundled() -> Result<&'static CriteriaTable> {
        if let Some(table) = BUNDLED.get() {
            return Ok(table);
        }
        let table = Self::from_toml(CRITERIA_TOML)?;
        Ok(BUNDLED.get_or_init(|| table))
    }

    pub fn from_toml(src: &str) -> Result<Self> {
        let raw: RawTable = toml::from_str(src).map_err(|e| Error::criteria(e.to_string()))?;

        let levels = StudyLevel::all().len();
        let dims = Dimension::all().len();
        let mut slots: Vec<Vec<Option<ValidationCriteria>>> = vec![vec![None; dims]; levels];
        for entry in raw.criteria {
            if entry.minimum > entry.target {
                return Err(Error::criteria(format!(
                    "{}/{}: minimum {} exceeds target {}",
                    entry.level, entry.dimension, entry.minimum, entry.target
                )));
            }
            if entry.weight < 0.0 {
                return Err(Error::criteria(format!("{}/{}: negative weight", entry.level, entry.dimension)));
            }
            let slot = &mut slots[entry.level as usize][entry.dimension as usize];
            if slot.is_some() {
                return Err(Error::criteria(format!("{}/{} is defined more than once", entry.level, entry.dimension)));
            }
            *slot = Some(entry);
        }

        let mut entries = Vec::with_capacity(levels);
        for (level, row) in StudyLevel::all().iter().zip(slots) {
            let mut filled = Vec::with_capacity(dims);
            for (dim, slot) in Dimension::all().iter().zip(row) {
                match slot {
                    Some(c) => filled.push(c),
                    None => return Err(Error::criteria(format!("{}/{} has no criteria", level, dim))),
                }
            }
            let total: f64 = filled.iter().map(|c| c.weight).sum();
            if (total - 1.0).abs() > WEIGHT_TOLERANCE {
                return Err(Error::criteria(format!("weights for {} sum to {}, expected 1", level, total)));
            }
            entries.push(filled);
        }

        debug!(entries = levels * dims, "Validation criteria loaded");
        Ok(Self { entries })
    }

    pub fn get(&self, level: StudyLevel, dimension: Dimension) -> &ValidationCriteria {
        &self.entries[level as usize][dimension as usize]
    }

    /// Criteria of one level in dimension order.
    pub fn for_level(&self, level: StudyLevel) -> &[ValidationCriteria] {
        &self.entries[level as usize]
    }

    /// Weighted sum of a level's minimums.
    pub fn pass_threshold(&self, level: StudyLevel) -> f64 {
        self.for_level(level).iter().map(|c| c.minimum * c.weight).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
