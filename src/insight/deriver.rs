//! Probability vector → severity assessment + five insight blocks.

use serde::{Deserialize, Serialize};

use super::recommendations;
use super::severity::{Severity, SeverityAssessment};
use super::InsightError;

/// Number of classes the classifier must emit.
pub const CLASS_COUNT: usize = 5;

/// The five human-readable insight blocks shown to the clinician and
/// embedded in the PDF report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightSections {
    pub risk_assessment: String,
    pub early_detection: String,
    pub predictive_analysis: String,
    pub alerts_followups: String,
    pub educational_insights: String,
}

impl InsightSections {
    /// Sections in report order, keyed by field name.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("risk_assessment", &self.risk_assessment),
            ("early_detection", &self.early_detection),
            ("predictive_analysis", &self.predictive_analysis),
            ("alerts_followups", &self.alerts_followups),
            ("educational_insights", &self.educational_insights),
        ]
    }
}

/// Result of one classification: the assessment plus its insight blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub assessment: SeverityAssessment,
    #[serde(flatten)]
    pub sections: InsightSections,
}

/// Derive insights from a classifier probability vector.
///
/// Ties resolve to the lowest index and NaN entries are skipped. Values are
/// not renormalized.
pub fn derive(probabilities: &[f32]) -> Result<InsightReport, InsightError> {
    if probabilities.len() != CLASS_COUNT {
        return Err(InsightError::InvalidShape {
            observed: probabilities.len(),
        });
    }

    let max_index = argmax(probabilities);

    let predicted = max_index
        .and_then(Severity::from_index)
        .unwrap_or(Severity::NoDr);
    let confidence = max_index.map_or(0.0, |i| f64::from(probabilities[i]) * 100.0);
    let assessment = SeverityAssessment::from_argmax(predicted, confidence);

    Ok(InsightReport {
        assessment,
        sections: compose(&assessment),
    })
}

/// Index of the first maximum, skipping NaN entries. `None` when every
/// entry is NaN.
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some(b) if *v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

fn compose(assessment: &SeverityAssessment) -> InsightSections {
    let label = assessment.label;
    let conf = assessment.confidence;
    let recs = recommendations::lookup(label);

    InsightSections {
        risk_assessment: format!(
            "Severity Level: {label}\nConfidence Score: {conf:.2}%\nAnalysis: {}",
            recs.risk_analysis
        ),
        early_detection: format!(
            "Detection Level: {label}\nConfidence Score: {conf:.2}%\nAnalysis: {}",
            recs.early_detection_analysis
        ),
        predictive_analysis: format!(
            "Disease Progression: {label}\nConfidence Score: {conf:.2}%\nAnalysis: {}",
            recs.predictive_analysis
        ),
        alerts_followups: format!(
            "Follow-up Requirement: {label}\nConfidence Score: {conf:.2}%\nRecommendation: {}",
            recs.recommendation
        ),
        educational_insights: format!(
            "Patient Education Level: {label}\nConfidence Score: {conf:.2}%\nGuidance: {}",
            recs.guidance
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moderate_example() {
        let report = derive(&[0.05, 0.05, 0.8, 0.05, 0.05]).unwrap();
        assert_eq!(report.assessment.label, Severity::Moderate);
        assert_eq!(format!("{:.2}", report.assessment.confidence), "80.00");
        assert_eq!(
            report.sections.alerts_followups,
            "Follow-up Requirement: Moderate\nConfidence Score: 80.00%\n\
             Recommendation: Ophthalmologist visits every 6 months recommended."
        );
    }

    #[test]
    fn low_confidence_tie_forces_no_dr() {
        let report = derive(&[0.3, 0.3, 0.2, 0.1, 0.1]).unwrap();
        assert_eq!(report.assessment.label, Severity::NoDr);
        assert_eq!(format!("{:.2}", report.assessment.confidence), "30.00");
    }

    #[test]
    fn low_confidence_on_other_grade_forces_no_dr() {
        let report = derive(&[0.1, 0.1, 0.1, 0.45, 0.25]).unwrap();
        assert_eq!(report.assessment.label, Severity::NoDr);
        assert!(report.sections.risk_assessment.starts_with("Severity Level: No DR\n"));
        assert!(report.sections.risk_assessment.contains("Confidence Score: 45.00%"));
    }

    #[test]
    fn tie_above_threshold_picks_first_index() {
        let report = derive(&[0.0, 0.0, 0.0, 0.5, 0.5]).unwrap();
        assert_eq!(report.assessment.label, Severity::Severe);
    }

    #[test]
    fn nan_entries_never_win() {
        for probs in [
            [f32::NAN, 0.9, 0.0, 0.0, 0.0],
            [0.0, 0.9, f32::NAN, 0.0, 0.0],
        ] {
            let report = derive(&probs).unwrap();
            assert_eq!(report.assessment.label, Severity::Mild);
            assert_eq!(format!("{:.2}", report.assessment.confidence), "90.00");
            assert!(!report.sections.risk_assessment.contains("NaN"));
        }
    }

    #[test]
    fn all_nan_is_zero_confidence_no_dr() {
        let report = derive(&[f32::NAN; 5]).unwrap();
        assert_eq!(report.assessment.label, Severity::NoDr);
        assert_eq!(report.assessment.confidence, 0.0);
    }

    #[test]
    fn wrong_length_reports_observed_shape() {
        let err = derive(&[0.1, 0.2, 0.3]).unwrap_err();
        assert_eq!(err, InsightError::InvalidShape { observed: 3 });
        assert!(err.to_string().contains('3'));

        assert_eq!(
            derive(&[]).unwrap_err(),
            InsightError::InvalidShape { observed: 0 }
        );
    }

    #[test]
    fn confidence_is_hundred_times_max() {
        let vectors: [[f32; 5]; 4] = [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [0.2, 0.2, 0.2, 0.2, 0.2],
            [0.01, 0.02, 0.03, 0.04, 0.9],
        ];
        for v in vectors {
            let max = v.iter().cloned().fold(f32::MIN, f32::max);
            let report = derive(&v).unwrap();
            assert_eq!(report.assessment.confidence, f64::from(max) * 100.0);
            assert!((0.0..=100.0).contains(&report.assessment.confidence));
        }
    }

    #[test]
    fn unnormalized_vector_is_not_rescaled() {
        let report = derive(&[0.1, 0.1, 0.1, 0.1, 0.7]).unwrap();
        assert_eq!(report.assessment.label, Severity::Proliferative);
        assert_eq!(format!("{:.2}", report.assessment.confidence), "70.00");
    }

    #[test]
    fn derive_is_deterministic() {
        let v = [0.12, 0.61, 0.07, 0.1, 0.1];
        assert_eq!(derive(&v).unwrap(), derive(&v).unwrap());
    }

    #[test]
    fn sections_follow_report_order() {
        let report = derive(&[0.9, 0.025, 0.025, 0.025, 0.025]).unwrap();
        let keys: Vec<&str> = report.sections.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            [
                "risk_assessment",
                "early_detection",
                "predictive_analysis",
                "alerts_followups",
                "educational_insights"
            ]
        );
        assert!(report.sections.educational_insights.ends_with(
            "Guidance: Regular eye exams and controlled blood sugar levels recommended."
        ));
    }

    #[test]
    fn report_serializes_flat_sections() {
        let report = derive(&[0.05, 0.05, 0.8, 0.05, 0.05]).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["assessment"]["label"], "Moderate");
        assert!(json["risk_assessment"].is_string());
        assert!(json["educational_insights"].is_string());
    }
}
