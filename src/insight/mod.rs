//! Insight derivation: severity grading, recommendation lookup and the
//! clinician-facing text blocks.
//!
//! Pure functions over immutable data; safe to call from any thread.

pub mod deriver;
pub mod recommendations;
pub mod severity;

pub use deriver::{derive, InsightReport, InsightSections, CLASS_COUNT};
pub use recommendations::{lookup, lookup_label, Recommendation};
pub use severity::{Severity, SeverityAssessment};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsightError {
    #[error("Invalid prediction format. Expected (5,), but got ({observed},)")]
    InvalidShape { observed: usize },
}
