//! Static recommendation table, one bundle per severity grade.
//!
//! Immutable and process-wide: lookups borrow `'static` data and need no
//! locking under concurrent callers.

use serde::Serialize;

use super::severity::Severity;

/// Canned clinical text for one severity grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub risk_analysis: &'static str,
    pub early_detection_analysis: &'static str,
    pub predictive_analysis: &'static str,
    pub recommendation: &'static str,
    pub guidance: &'static str,
}

/// Indexed by `Severity::index()`.
static RECOMMENDATIONS: [Recommendation; 5] = [
    Recommendation {
        risk_analysis: "No signs of diabetic retinopathy detected.",
        early_detection_analysis: "The model suggests regular eye check-ups for preventive care.",
        predictive_analysis: "No signs of disease progression detected.",
        recommendation: "Routine checkups and healthy lifestyle maintenance.",
        guidance: "Regular eye exams and controlled blood sugar levels recommended.",
    },
    Recommendation {
        risk_analysis: "Early signs of DR detected, but not severe.",
        early_detection_analysis: "Early detection is crucial; yearly screenings recommended.",
        predictive_analysis: "Potential for progression; lifestyle changes recommended.",
        recommendation: "Yearly screenings and lifestyle adjustments advised.",
        guidance: "Monitor blood pressure and cholesterol to slow progression.",
    },
    Recommendation {
        risk_analysis: "Moderate DR detected, requiring closer observation.",
        early_detection_analysis: "Signs of DR suggest more frequent monitoring.",
        predictive_analysis: "Progression risk is moderate; intervention may be needed.",
        recommendation: "Ophthalmologist visits every 6 months recommended.",
        guidance: "Strict glucose control and possible early intervention required.",
    },
    Recommendation {
        risk_analysis: "High risk of vision impairment due to DR progression.",
        early_detection_analysis: "Urgent intervention recommended to prevent further damage.",
        predictive_analysis: "Disease progression is accelerating; treatment needed.",
        recommendation: "Immediate medical evaluation required.",
        guidance: "Potential laser treatment or medication intervention needed.",
    },
    Recommendation {
        risk_analysis: "Critical stage of DR detected, vision at serious risk.",
        early_detection_analysis: "Emergency medical attention required to prevent vision loss.",
        predictive_analysis: "Significant progression detected; urgent action needed.",
        recommendation: "Urgent specialist treatment necessary.",
        guidance: "Advanced procedures such as anti-VEGF injections or surgery required.",
    },
];

/// Bundle for a known grade.
pub fn lookup(severity: Severity) -> &'static Recommendation {
    &RECOMMENDATIONS[severity.index()]
}

/// Bundle for a free-text label. Unrecognized labels get the `No DR` bundle.
pub fn lookup_label(label: &str) -> &'static Recommendation {
    match Severity::from_label(label) {
        Some(severity) => lookup(severity),
        None => {
            tracing::debug!(label, "Unknown severity label, using No DR recommendations");
            lookup(Severity::NoDr)
        }
    }
}
