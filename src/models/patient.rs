use serde::{Deserialize, Serialize};

/// Status of a freshly diagnosed record until a doctor reviews it.
pub const PENDING_DIAGNOSIS: &str = "Pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub eye_issue: String,
    pub diabetes: String,
    /// Years since diabetes diagnosis, as entered.
    pub duration: String,
    pub image_path: String,
    /// Username of the doctor who submitted the intake.
    pub diagnosed_by: String,
    pub diagnosis_result: String,
    /// Report file name under the upload directory. `None` only inside an
    /// uncommitted diagnosis.
    pub pdf_report_path: Option<String>,
    pub created_at: String,
}

/// Row inserted at intake, before classification.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub eye_issue: String,
    pub diabetes: String,
    pub duration: String,
    pub image_path: String,
    pub diagnosed_by: String,
}

/// Doctor-editable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub eye_issue: String,
    pub diabetes: String,
    pub duration: String,
    pub diagnosis_result: String,
}
