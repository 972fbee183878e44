//! Report generation from caller-supplied insights.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::endpoints::uploads::confine_to_upload_dir;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::insight::InsightSections;
use crate::report::{self, PatientMeta};

const REQUIRED_FIELDS: [&str; 8] = [
    "name",
    "age",
    "gender",
    "eye_issue",
    "diabetes",
    "duration",
    "image_path",
    "insights",
];

#[derive(Serialize)]
pub struct ReportResponse {
    pub pdf_path: String,
}

/// `POST /api/reports`: assemble a report without creating a patient record.
///
/// The file is named from the patient name alone, so a second request for
/// the same name overwrites it.
pub async fn generate(
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<ReportResponse>, ApiError> {
    let fields = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Expected a JSON object".into()))?;
    for field in REQUIRED_FIELDS {
        if fields.get(field).map_or(true, Value::is_null) {
            return Err(ApiError::BadRequest(format!("Missing required field: {field}")));
        }
    }

    let meta = PatientMeta {
        record_id: None,
        name: display_field(fields, "name"),
        age: display_field(fields, "age"),
        gender: display_field(fields, "gender"),
        eye_issue: display_field(fields, "eye_issue"),
        diabetes: display_field(fields, "diabetes"),
        duration: display_field(fields, "duration"),
    };
    let insights: InsightSections = serde_json::from_value(fields["insights"].clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid insights: {e}")))?;

    let upload_dir = ctx.core.upload_dir().to_path_buf();
    let image_path = confine_to_upload_dir(&upload_dir, &display_field(fields, "image_path"))?;

    let pdf_path = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let filename = report::assemble(&meta, &insights, &image_path, &upload_dir)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(upload_dir.join(filename).to_string_lossy().into_owned())
    })
    .await??;

    Ok(Json(ReportResponse { pdf_path }))
}

/// Strings as-is, other scalars via their JSON text.
fn display_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}
