//! Doctor account endpoints: signup, login, logout.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::auth::SESSION_COOKIE;
use crate::api::types::{ApiContext, DoctorContext};
use crate::crypto::{self, CryptoError};
use crate::db;
use crate::models::NewDoctor;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub doctor_id: String,
    pub hospital: String,
    pub specialization: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub expires_in_secs: u64,
}

/// `POST /api/auth/signup`: register a doctor account.
pub async fn signup(
    State(ctx): State<ApiContext>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    for (field, value) in [
        ("username", &req.username),
        ("email", &req.email),
        ("password", &req.password),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("Missing required field: {field}")));
        }
    }

    let core = ctx.core.clone();
    let (id, username) = tokio::task::spawn_blocking(move || -> Result<_, ApiError> {
        let password_hash = crypto::hash_password(&req.password);
        let doctor = NewDoctor {
            full_name: req.full_name,
            doctor_id: req.doctor_id,
            hospital: req.hospital,
            specialization: req.specialization,
            username: req.username.trim().to_string(),
            email: req.email.trim().to_string(),
        };
        let conn = core.open_db()?;
        let id = db::insert_doctor(&conn, &doctor, &password_hash)?;
        Ok((id, doctor.username))
    })
    .await??;

    tracing::info!(doctor = %username, "Doctor registered");
    Ok((StatusCode::CREATED, Json(SignupResponse { id, username })))
}

/// `POST /api/auth/login`: verify credentials and open a session.
///
/// The token is returned in the body for API clients and as an
/// `HttpOnly` cookie for browsers.
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let core = ctx.core.clone();
    let username = req.username.trim().to_string();
    let lookup = username.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        let conn = core.open_db()?;
        let stored = db::get_password_hash(&conn, &lookup)?.ok_or(ApiError::InvalidCredentials)?;
        crypto::verify_password(&req.password, &stored).map_err(|e| match e {
            CryptoError::WrongPassword => ApiError::InvalidCredentials,
            CryptoError::MalformedHash => {
                ApiError::Internal(format!("stored hash for {lookup} is malformed"))
            }
        })
    })
    .await?
    .inspect_err(|_| tracing::warn!(doctor = %username, "Login failed"))?;

    let token = ctx.core.lock_sessions()?.create(&username);
    let max_age = ctx.core.config.session_idle_timeout_secs;
    let cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");

    tracing::info!(doctor = %username, "Doctor logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            username,
            expires_in_secs: max_age,
        }),
    ))
}

/// `POST /api/auth/logout`: revoke the current session.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(doctor): Extension<DoctorContext>,
) -> Result<impl IntoResponse, ApiError> {
    ctx.core.lock_sessions()?.revoke(&doctor.token);
    tracing::info!(doctor = %doctor.username, "Doctor logged out");

    let cookie = format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
    Ok(([(header::SET_COOKIE, cookie)], StatusCode::NO_CONTENT))
}
