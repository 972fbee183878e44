//! Upload directory access: report downloads and path confinement.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/uploads/:filename`: download a stored file as an attachment.
pub async fn download(
    State(ctx): State<ApiContext>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, ApiError> {
    if !is_plain_filename(&filename) {
        return Err(ApiError::BadRequest("Invalid file name".into()));
    }

    let path = ctx.core.upload_dir().join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("File {filename} not found")));
        }
        Err(e) => return Err(ApiError::Internal(format!("read {}: {e}", path.display()))),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let content_type = HeaderValue::from_str(mime.as_ref())
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::debug!(file = %filename, size = bytes.len(), "Serving upload");

    let mut response = Response::new(Body::from(bytes));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// A single path component with no separators, quotes or dot-dot.
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '"'])
        && !name.contains("..")
        && !name.chars().any(char::is_control)
}

/// Resolve a client-supplied image path to a file inside `upload_dir`.
///
/// Accepts either a bare file name or a path that already starts with the
/// upload directory (as stored in patient records). Parent-directory
/// components are always rejected.
pub(crate) fn confine_to_upload_dir(upload_dir: &Path, raw: &str) -> Result<PathBuf, ApiError> {
    let outside = || ApiError::BadRequest("image_path must be inside the upload directory".into());
    let path = Path::new(raw);

    if raw.is_empty() || path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(outside());
    }
    if path.starts_with(upload_dir) {
        return Ok(path.to_path_buf());
    }
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(upload_dir.join(name)),
        _ => Err(outside()),
    }
}
