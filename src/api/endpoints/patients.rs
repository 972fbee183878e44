//! Patient endpoints: intake with diagnosis, listing, viewing, editing.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorContext};
use crate::db;
use crate::diagnosis::{self, Intake, UploadedImage};
use crate::insight::InsightReport;
use crate::models::{Patient, PatientUpdate};

#[derive(Serialize)]
pub struct CreatePatientResponse {
    pub patient_id: i64,
    pub report_filename: String,
    pub insights: InsightReport,
    pub view_url: String,
}

#[derive(Serialize)]
pub struct PatientView {
    pub patient: Patient,
    /// Recomputed from the stored image. `None` when the image can no
    /// longer be graded (moved, deleted, unreadable).
    pub insights: Option<InsightReport>,
}

/// Multipart intake form, collected field by field.
#[derive(Default)]
struct IntakeForm {
    name: Option<String>,
    age: Option<String>,
    gender: Option<String>,
    eye_issue: Option<String>,
    diabetes: Option<String>,
    duration: Option<String>,
    image: Option<UploadedImage>,
}

impl IntakeForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "image" {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                form.image = Some(UploadedImage {
                    original_name,
                    bytes: bytes.to_vec(),
                });
                continue;
            }
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            let slot = match name.as_str() {
                "name" => &mut form.name,
                "age" => &mut form.age,
                "gender" => &mut form.gender,
                "eye_issue" => &mut form.eye_issue,
                "diabetes" => &mut form.diabetes,
                "duration" => &mut form.duration,
                _ => continue,
            };
            *slot = Some(text);
        }
        Ok(form)
    }

    fn into_parts(self) -> Result<(Intake, UploadedImage), ApiError> {
        let age = required("age", self.age)?;
        let age: i64 = age
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid age: {age}")))?;
        let intake = Intake {
            name: required("name", self.name)?,
            age,
            gender: required("gender", self.gender)?,
            eye_issue: required("eye_issue", self.eye_issue)?,
            diabetes: required("diabetes", self.diabetes)?,
            duration: required("duration", self.duration)?,
        };
        let image = self
            .image
            .filter(|img| !img.bytes.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No file selected".into()))?;
        Ok((intake, image))
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing required field: {field}")))
}

/// `POST /api/patients`: intake form with retinal image; runs the diagnosis.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorContext>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreatePatientResponse>), ApiError> {
    let (intake, image) = IntakeForm::read(multipart).await?.into_parts()?;

    let core = ctx.core.clone();
    let outcome = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let mut conn = core.open_db()?;
        let classifier = core.classifier();
        Ok(diagnosis::run_diagnosis(
            &mut conn,
            &*classifier,
            core.upload_dir(),
            &intake,
            &image,
            &doctor.username,
        )?)
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(CreatePatientResponse {
            patient_id: outcome.patient_id,
            view_url: format!("/api/patients/{}", outcome.patient_id),
            report_filename: outcome.report_filename,
            insights: outcome.insights,
        }),
    ))
}

/// `GET /api/patients`: all patient records, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    Ok(Json(db::list_patients(&conn)?))
}

/// `GET /api/patients/:id`: record plus insights recomputed from its image.
pub async fn view(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PatientView>, ApiError> {
    let patient = {
        let conn = ctx.core.open_db()?;
        db::get_patient(&conn, id)?
    };

    let classifier = ctx.core.classifier();
    let image_path = PathBuf::from(&patient.image_path);
    let assessed =
        tokio::task::spawn_blocking(move || diagnosis::assess_image(&*classifier, &image_path))
            .await?;

    let insights = match assessed {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(patient_id = id, error = %e, "Could not recompute insights");
            None
        }
    };

    Ok(Json(PatientView { patient, insights }))
}

/// `POST /api/patients/:id`: edit the doctor-editable fields.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorContext>,
    Path(id): Path<i64>,
    Json(update): Json<PatientUpdate>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::update_patient(&conn, id, &update)?;
    tracing::info!(
        patient_id = id,
        doctor = %doctor.username,
        diagnosis = %update.diagnosis_result,
        "Patient updated"
    );
    Ok(Json(db::get_patient(&conn, id)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_named_in_error() {
        let form = IntakeForm {
            name: Some("Jane".into()),
            age: Some("58".into()),
            ..IntakeForm::default()
        };
        let err = form.into_parts().err().unwrap();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Missing required field: gender"));
    }

    #[test]
    fn non_numeric_age_rejected() {
        let form = IntakeForm {
            age: Some("fifty".into()),
            ..IntakeForm::default()
        };
        let err = form.into_parts().err().unwrap();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid age: fifty"));
    }

    #[test]
    fn empty_image_rejected() {
        let form = IntakeForm {
            name: Some("Jane".into()),
            age: Some(" 58 ".into()),
            gender: Some("F".into()),
            eye_issue: Some("None".into()),
            diabetes: Some("Type 2".into()),
            duration: Some("3".into()),
            image: Some(UploadedImage {
                original_name: "x.png".into(),
                bytes: Vec::new(),
            }),
        };
        let err = form.into_parts().err().unwrap();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "No file selected"));
    }
}
