//! New-patient diagnosis: store the upload, grade it, write the report and
//! persist the record as one unit.
//!
//! Write order:
//! 1. save the uploaded image under a unique name
//! 2. classify, derive insights and render the report in memory
//! 3. open a transaction and insert the patient as `Pending`
//! 4. write the report named with the new id, record its file name, commit
//!
//! The write lock is only held during steps 3 and 4. Any failure after
//! step 1 rolls the transaction back and removes the saved image and any
//! report file written for the record.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::{ClassifierError, SeverityClassifier};
use crate::db::{self, DatabaseError};
use crate::insight::{self, InsightError, InsightReport, Severity};
use crate::models::NewPatient;
use crate::report::{self, PatientMeta, ReportError};

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("No image uploaded")]
    EmptyImage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Insight(#[from] InsightError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for DiagnosisError {
    fn from(err: rusqlite::Error) -> Self {
        DiagnosisError::Database(DatabaseError::Sqlite(err))
    }
}

/// Patient fields submitted with the retinal image.
#[derive(Debug, Clone)]
pub struct Intake {
    pub name: String,
    pub age: i64,
    pub gender: String,
    pub eye_issue: String,
    pub diabetes: String,
    pub duration: String,
}

impl Intake {
    /// Report header fields; the record id is filled in once the row exists.
    fn report_meta(&self) -> PatientMeta {
        PatientMeta {
            record_id: None,
            name: self.name.clone(),
            age: self.age.to_string(),
            gender: self.gender.clone(),
            eye_issue: self.eye_issue.clone(),
            diabetes: self.diabetes.clone(),
            duration: self.duration.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client-supplied file name; only used for the stored name's suffix.
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosisOutcome {
    pub patient_id: i64,
    pub report_filename: String,
    pub insights: InsightReport,
    #[serde(skip)]
    pub image_path: PathBuf,
}

/// Run the full intake pipeline. Blocking; call from a blocking context.
pub fn run_diagnosis(
    conn: &mut Connection,
    classifier: &dyn SeverityClassifier,
    upload_dir: &Path,
    intake: &Intake,
    image: &UploadedImage,
    diagnosed_by: &str,
) -> Result<DiagnosisOutcome, DiagnosisError> {
    if image.bytes.is_empty() {
        return Err(DiagnosisError::EmptyImage);
    }

    std::fs::create_dir_all(upload_dir)?;
    let image_path = upload_dir.join(stored_image_name(&image.original_name));
    std::fs::write(&image_path, &image.bytes)?;

    let mut report_path: Option<PathBuf> = None;
    let result = persist_diagnosis(
        conn,
        classifier,
        upload_dir,
        intake,
        &image_path,
        diagnosed_by,
        &mut report_path,
    );

    match result {
        Ok((patient_id, report_filename, insights)) => {
            tracing::info!(
                patient_id,
                severity = %insights.assessment.label,
                confidence = insights.assessment.confidence,
                report = %report_filename,
                "Diagnosis recorded"
            );
            Ok(DiagnosisOutcome {
                patient_id,
                report_filename,
                insights,
                image_path,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Diagnosis failed, discarding upload");
            remove_quietly(&image_path);
            if let Some(path) = report_path {
                remove_quietly(&path);
            }
            Err(e)
        }
    }
}

/// Transactional part of [`run_diagnosis`]. `report_path` is set as soon as a
/// report file may exist so the caller can clean it up.
fn persist_diagnosis(
    conn: &mut Connection,
    classifier: &dyn SeverityClassifier,
    upload_dir: &Path,
    intake: &Intake,
    image_path: &Path,
    diagnosed_by: &str,
    report_path: &mut Option<PathBuf>,
) -> Result<(i64, String, InsightReport), DiagnosisError> {
    let insights = assess_image(classifier, image_path)?;
    let mut meta = intake.report_meta();
    let pdf = report::layout::render_report(&meta, &insights.sections, image_path)?;

    let tx = conn.transaction()?;

    let patient_id = db::insert_patient(
        &tx,
        &NewPatient {
            name: intake.name.clone(),
            age: intake.age,
            gender: intake.gender.clone(),
            eye_issue: intake.eye_issue.clone(),
            diabetes: intake.diabetes.clone(),
            duration: intake.duration.clone(),
            image_path: image_path.to_string_lossy().into_owned(),
            diagnosed_by: diagnosed_by.to_string(),
        },
    )?;

    meta.record_id = Some(patient_id);
    let report_filename = meta.report_filename();
    *report_path = Some(upload_dir.join(&report_filename));
    report::write_report(upload_dir, &report_filename, &pdf)?;

    db::set_report_path(&tx, patient_id, &report_filename)?;
    tx.commit()?;

    Ok((patient_id, report_filename, insights))
}

/// Classify the image at `path` and derive insights from the output.
pub fn assess_image(
    classifier: &dyn SeverityClassifier,
    path: &Path,
) -> Result<InsightReport, DiagnosisError> {
    let probabilities = classifier.classify_path(path)?;
    log_prediction(classifier.name(), &probabilities);
    Ok(insight::derive(&probabilities)?)
}

fn log_prediction(backend: &str, probabilities: &[f32]) {
    tracing::info!(backend, prediction = ?probabilities, "Classifier output");
    for (severity, p) in Severity::ALL.iter().zip(probabilities) {
        tracing::info!(
            class = %severity,
            confidence = %format!("{:.2}%", f64::from(*p) * 100.0),
            "Class confidence"
        );
    }
}

/// `<uuid>_<sanitized client name>`, unique per upload.
fn stored_image_name(original_name: &str) -> String {
    let id = Uuid::new_v4().simple();
    let name = report::sanitize_name(original_name);
    format!("{id}_{name}")
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Cleanup failed");
        }
    }
}
