//! Ad-hoc prediction endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::endpoints::uploads::confine_to_upload_dir;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::diagnosis;
use crate::insight::InsightReport;

#[derive(Deserialize)]
pub struct PredictRequest {
    pub image_path: String,
}

/// `POST /api/predict`: classify a stored image and return its insights.
pub async fn predict(
    State(ctx): State<ApiContext>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<InsightReport>, ApiError> {
    let path = confine_to_upload_dir(ctx.core.upload_dir(), &req.image_path)?;
    let classifier = ctx.core.classifier();

    let report = tokio::task::spawn_blocking(move || diagnosis::assess_image(&*classifier, &path))
        .await??;
    Ok(Json(report))
}
