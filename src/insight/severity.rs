//! Diabetic retinopathy severity scale.
//!
//! The classifier emits one probability per grade, in the order of
//! [`Severity::ALL`]. Index ↔ grade binding is fixed by the model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Below this confidence (percent) the grade is reported as `No DR`.
pub const MIN_GRADING_CONFIDENCE: f64 = 50.0;

/// Five-grade disease progression scale, from none to proliferative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "No DR")]
    NoDr,
    #[serde(rename = "Mild")]
    Mild,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Severe")]
    Severe,
    #[serde(rename = "Proliferative")]
    Proliferative,
}

impl Severity {
    /// Grades in classifier output order.
    pub const ALL: [Severity; 5] = [
        Severity::NoDr,
        Severity::Mild,
        Severity::Moderate,
        Severity::Severe,
        Severity::Proliferative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDr => "No DR",
            Self::Mild => "Mild",
            Self::Moderate => "Moderate",
            Self::Severe => "Severe",
            Self::Proliferative => "Proliferative",
        }
    }

    /// Position of this grade in the probability vector.
    pub fn index(&self) -> usize {
        match self {
            Self::NoDr => 0,
            Self::Mild => 1,
            Self::Moderate => 2,
            Self::Severe => 3,
            Self::Proliferative => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Exact-match label parse. Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grade plus the classifier's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub label: Severity,
    /// `100 × max(probabilities)`, never altered by the low-confidence override.
    pub confidence: f64,
}

impl SeverityAssessment {
    /// Apply the low-confidence rule to a raw argmax result.
    pub fn from_argmax(predicted: Severity, confidence: f64) -> Self {
        let label = if confidence < MIN_GRADING_CONFIDENCE {
            Severity::NoDr
        } else {
            predicted
        };
        Self { label, confidence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_output_order() {
        let labels: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(labels, ["No DR", "Mild", "Moderate", "Severe", "Proliferative"]);
        for (i, s) in Severity::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
            assert_eq!(Severity::from_index(i), Some(*s));
        }
    }

    #[test]
    fn from_index_out_of_range() {
        assert_eq!(Severity::from_index(5), None);
    }

    #[test]
    fn from_label_is_exact_match() {
        assert_eq!(Severity::from_label("Severe"), Some(Severity::Severe));
        assert_eq!(Severity::from_label("severe"), None);
        assert_eq!(Severity::from_label("Stage 4"), None);
    }

    #[test]
    fn serializes_as_display_label() {
        let json = serde_json::to_string(&Severity::NoDr).unwrap();
        assert_eq!(json, "\"No DR\"");
        let back: Severity = serde_json::from_str("\"Proliferative\"").unwrap();
        assert_eq!(back, Severity::Proliferative);
    }

    #[test]
    fn low_confidence_overrides_label_only() {
        let a = SeverityAssessment::from_argmax(Severity::Severe, 49.99);
        assert_eq!(a.label, Severity::NoDr);
        assert_eq!(a.confidence, 49.99);
    }

    #[test]
    fn threshold_is_inclusive_for_grading() {
        let a = SeverityAssessment::from_argmax(Severity::Mild, 50.0);
        assert_eq!(a.label, Severity::Mild);
    }
}
