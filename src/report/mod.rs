//! Diagnosis report assembly.
//!
//! One PDF per diagnosis event, written under the upload directory.
//! File names carry the patient record id when one exists, so two patients
//! sharing a display name never overwrite each other's report.

pub mod layout;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::insight::InsightSections;

pub use layout::REPORT_TITLE;

/// Fixed suffix of every report file name.
pub const REPORT_SUFFIX: &str = "_diagnosis_report.pdf";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Report rendering failed: {0}")]
    Render(String),
}

/// Patient fields printed in the report header. All display-only except
/// `name`, which also feeds the file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientMeta {
    /// Patient record id, embedded in the file name when present.
    #[serde(default)]
    pub record_id: Option<i64>,
    pub name: String,
    pub age: String,
    pub gender: String,
    pub eye_issue: String,
    pub diabetes: String,
    pub duration: String,
}

impl PatientMeta {
    pub(crate) fn display_lines(&self) -> [String; 6] {
        [
            format!("Patient Name: {}", self.name),
            format!("Age: {}", self.age),
            format!("Gender: {}", self.gender),
            format!("Previous Eye Issues: {}", self.eye_issue),
            format!("Diabetes: {}", self.diabetes),
            format!("Diabetes Duration: {} years", self.duration),
        ]
    }

    pub fn report_filename(&self) -> String {
        report_filename(&self.name, self.record_id)
    }

    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self {
            record_id: None,
            name: "Jane Doe".into(),
            age: "58".into(),
            gender: "Female".into(),
            eye_issue: "Blurred vision".into(),
            diabetes: "Type 2".into(),
            duration: "12".into(),
        }
    }
}

/// `<name>[_<id>]_diagnosis_report.pdf`, with the name made filesystem-safe.
pub fn report_filename(name: &str, record_id: Option<i64>) -> String {
    let stem = sanitize_name(name);
    match record_id {
        Some(id) => format!("{stem}_{id}{REPORT_SUFFIX}"),
        None => format!("{stem}{REPORT_SUFFIX}"),
    }
}

/// Whitespace → `_`; anything outside `[A-Za-z0-9_.-]` dropped.
pub(crate) fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "patient".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Render the report and write it to `output_dir`. Returns the file name
/// only; callers join it with their own upload directory.
///
/// A missing or undecodable `source_image` omits the image block.
pub fn assemble(
    meta: &PatientMeta,
    insights: &InsightSections,
    source_image: &Path,
    output_dir: &Path,
) -> Result<String, ReportError> {
    let bytes = layout::render_report(meta, insights, source_image)?;
    let filename = meta.report_filename();
    write_report(output_dir, &filename, &bytes)?;
    Ok(filename)
}

/// Write already rendered report bytes as `output_dir/filename`.
pub fn write_report(output_dir: &Path, filename: &str, bytes: &[u8]) -> Result<(), ReportError> {
    std::fs::create_dir_all(output_dir)?;
    std::fs::write(output_dir.join(filename), bytes)?;

    tracing::info!(
        report = %filename,
        dir = %output_dir.display(),
        "Diagnosis report written"
    );
    Ok(())
}
