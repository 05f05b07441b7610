//! Running quality history across validated batches.
//!
//! The orchestrator records every verdict here. Reports summarize each
//! metric with its trend and raise alerts when recent quality slips.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bias::{BiasAnalysis, Severity};
use crate::config::{BiasSettings, MonitorSettings};
use crate::validation::{StudyLevel, StudyReadinessAssessment};

/// Medium alerts above this count turn the status to warning.
const WARNING_MEDIUM_ALERTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    DiversityScore,
    SycophancyIndex,
    DemographicAlignment,
    StereotypeRisk,
    CounterStereotypicalRate,
    HumanImperfectionRate,
    ReadinessScore,
}

impl Metric {
    /// Whether a rising value means better quality.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::SycophancyIndex | Metric::StereotypeRisk)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::DiversityScore => "diversity_score",
            Metric::SycophancyIndex => "sycophancy_index",
            Metric::DemographicAlignment => "demographic_alignment",
            Metric::StereotypeRisk => "stereotype_risk",
            Metric::CounterStereotypicalRate => "counter_stereotypical_rate",
            Metric::HumanImperfectionRate => "human_imperfection_rate",
            Metric::ReadinessScore => "readiness_score",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    Good,
    Caution,
    Warning,
    Critical,
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityStatus::Good => "good",
            QualityStatus::Caution => "caution",
            QualityStatus::Warning => "warning",
            QualityStatus::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// One recorded verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub recorded_at: DateTime<Utc>,
    pub personas: usize,
    pub passed: bool,
    pub alerts: usize,
    pub high_alerts: usize,
    pub readiness_level: Option<StudyLevel>,
    pub readiness_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub current: f64,
    pub average: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAlert {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub validations: usize,
    pub pass_rate: f64,
    pub metrics: BTreeMap<Metric, MetricSummary>,
    pub alerts: Vec<QualityAlert>,
    pub status: QualityStatus,
}

#[derive(Debug, Clone)]
pub struct QualityMonitor {
    settings: MonitorSettings,
    diversity_floor: f64,
    sycophancy_ceiling: f64,
    history: BTreeMap<Metric, VecDeque<f64>>,
    records: VecDeque<ValidationRecord>,
}

impl QualityMonitor {
    /// Alerts on diversity and sycophancy follow the bias gate thresholds.
    pub fn new(settings: MonitorSettings, gates: &BiasSettings) -> Self {
        Self {
            settings,
            diversity_floor: gates.min_diversity,
            sycophancy_ceiling: gates.max_sycophancy,
            history: BTreeMap::new(),
            records: VecDeque::new(),
        }
    }

    /// Record one validated batch. `passed` is the final verdict, which may
    /// also depend on readiness.
    pub fn record(&mut self, analysis: &BiasAnalysis, readiness: Option<&StudyReadinessAssessment>, passed: bool) {
        let m = &analysis.metrics;
        self.push(Metric::DiversityScore, m.diversity_score);
        self.push(Metric::SycophancyIndex, m.sycophancy_index);
        self.push(Metric::DemographicAlignment, m.demographic_alignment);
        self.push(Metric::StereotypeRisk, m.stereotype_risk);
        self.push(Metric::CounterStereotypicalRate, m.counter_stereotypical_rate);
        self.push(Metric::HumanImperfectionRate, m.human_imperfection_rate);
        if let Some(r) = readiness {
            self.push(Metric::ReadinessScore, r.overall_score);
        }

        self.records.push_back(ValidationRecord {
            recorded_at: analysis.analyzed_at,
            personas: analysis.total_personas,
            passed,
            alerts: analysis.alerts.len(),
            high_alerts: analysis.count_severity(Severity::High),
            readiness_level: readiness.map(|r| r.level),
            readiness_score: readiness.map(|r| r.overall_score),
        });
        while self.records.len() > self.settings.record_limit {
            self.records.pop_front();
        }
        debug!(records = self.records.len(), passed, "Quality recorded");
    }

    fn push(&mut self, metric: Metric, value: f64) {
        let values = self.history.entry(metric).or_default();
        values.push_back(value);
        while values.len() > self.settings.history_limit {
            values.pop_front();
        }
    }

    pub fn history(&self, metric: Metric) -> Vec<f64> {
        self.history.get(&metric).map(|v| v.iter().copied().collect()).unwrap_or_default()
    }

    pub fn records(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.records.iter()
    }

    /// Share of recorded verdicts that passed; 0 when nothing is recorded.
    pub fn pass_rate(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().filter(|r| r.passed).count() as f64 / self.records.len() as f64
    }

    /// Compare the latest window with the one before it.
    pub fn trend(&self, metric: Metric) -> Trend {
        let values: Vec<f64> = self.history(metric);
        let window = self.settings.trend_window;
        if window == 0 || values.len() < window {
            return Trend::InsufficientData;
        }
        let split = values.len() - window;
        let previous = &values[split.saturating_sub(window)..split];
        if previous.is_empty() {
            return Trend::Stable;
        }
        let recent = mean(&values[split..]);
        let before = mean(previous);
        let change = if before.abs() > f64::EPSILON {
            (recent - before) / before.abs()
        } else {
            recent - before
        };

        let rising = if change > self.settings.trend_tolerance {
            Some(true)
        } else if change < -self.settings.trend_tolerance {
            Some(false)
        } else {
            None
        };
        match rising {
            None => Trend::Stable,
            Some(up) if up == metric.higher_is_better() => Trend::Improving,
            Some(_) => Trend::Declining,
        }
    }

    pub fn report(&self) -> QualityReport {
        let metrics: BTreeMap<Metric, MetricSummary> = self
            .history
            .iter()
            .filter_map(|(metric, values)| {
                let current = *values.back()?;
                let all: Vec<f64> = values.iter().copied().collect();
                Some((
                    *metric,
                    MetricSummary {
                        current,
                        average: mean(&all),
                        trend: self.trend(*metric),
                    },
                ))
            })
            .collect();

        let pass_rate = self.pass_rate();
        let mut alerts = Vec::new();
        if let Some(d) = metrics.get(&Metric::DiversityScore) {
            if d.current < self.diversity_floor {
                alerts.push(QualityAlert {
                    kind: "low_diversity".to_string(),
                    severity: Severity::Medium,
                    message: format!("Diversity score {:.2} below {:.2}", d.current, self.diversity_floor),
                });
            }
        }
        if let Some(s) = metrics.get(&Metric::SycophancyIndex) {
            if s.current > self.sycophancy_ceiling {
                alerts.push(QualityAlert {
                    kind: "high_sycophancy".to_string(),
                    severity: Severity::High,
                    message: format!("Sycophancy index {:.2} above {:.2}", s.current, self.sycophancy_ceiling),
                });
            }
        }
        if !self.records.is_empty() && pass_rate < self.settings.min_pass_rate {
            alerts.push(QualityAlert {
                kind: "low_pass_rate".to_string(),
                severity: Severity::High,
                message: format!("Validation pass rate {:.0}% below {:.0}%", pass_rate * 100.0, self.settings.min_pass_rate * 100.0),
            });
        }

        let status = status_for(&alerts);
        if status == QualityStatus::Critical {
            warn!(alerts = alerts.len(), pass_rate, "Quality status critical");
        }

        QualityReport {
            generated_at: Utc::now(),
            validations: self.records.len(),
            pass_rate,
            metrics,
            alerts,
            status,
        }
    }
}

fn status_for(alerts: &[QualityAlert]) -> QualityStatus {
    let medium = alerts.iter().filter(|a| a.severity == Severity::Medium).count();
    if alerts.iter().any(|a| a.severity >= Severity::High) {
        QualityStatus::Critical
    } else if medium > WARNING_MEDIUM_ALERTS {
        QualityStatus::Warning
    } else if medium > 0 {
        QualityStatus::Caution
    } else {
        QualityStatus::Good
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
