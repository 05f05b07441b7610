//! Staged study-readiness validation.
//!
//! A batch is scored on eight quality dimensions and certified for a study
//! level when its weighted score reaches that level's aggregate bar.

pub mod criteria;
pub mod dimensions;
pub mod staged;

pub use criteria::{CriteriaTable, Dimension, StudyLevel, ValidationCriteria};
pub use dimensions::{intersectional_coverage, DimensionResult, ValidationContext};
pub use staged::{batch_fingerprint, StagedValidator, StudyReadinessAssessment};
