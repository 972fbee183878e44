//! Doctor dashboard endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, DoctorContext};
use crate::db;
use crate::models::Doctor;

#[derive(Serialize)]
pub struct DashboardResponse {
    pub doctor: Doctor,
    /// Patients diagnosed by this doctor.
    pub patient_count: i64,
    pub generated_at: String,
}

/// `GET /api/dashboard`: logged-in doctor's profile and activity.
pub async fn dashboard(
    State(ctx): State<ApiContext>,
    Extension(session): Extension<DoctorContext>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctor = db::get_doctor_by_username(&conn, &session.username)?
        .ok_or_else(|| ApiError::NotFound(format!("Doctor {} not found", session.username)))?;
    let patient_count = db::count_patients_by_doctor(&conn, &session.username)?;

    Ok(Json(DashboardResponse {
        doctor,
        patient_count,
        generated_at: chrono::Utc::now().to_rfc3339(),
    }))
}
