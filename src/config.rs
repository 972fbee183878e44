use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "drscreen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory holding container secrets (one file per value).
const SECRETS_DIR: &str = "/run/secrets";

/// Prefix for environment overrides, e.g. `DRSCREEN_UPLOAD_FOLDER`.
const ENV_PREFIX: &str = "DRSCREEN_";

/// Default inactivity timeout for doctor sessions: 15 minutes.
const DEFAULT_SESSION_IDLE_SECS: u64 = 900;

/// Default maximum multipart upload size: 10 MB.
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "drscreen_lib=info,drscreen=info,tower_http=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Uploaded retinal images and generated reports.
    pub upload_dir: PathBuf,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    pub session_idle_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// Model-less classifier output, for development and tests.
    pub fixed_prediction: Option<Vec<f32>>,
    /// Key unauthenticated rate limits on the last `X-Forwarded-For` hop.
    /// Only safe behind a reverse proxy that appends that header.
    pub trust_forwarded_for: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            upload_dir: PathBuf::from("uploads"),
            database_path: PathBuf::from("users.db"),
            model_path: PathBuf::from("diabetic_retinopathy_model.onnx"),
            session_idle_timeout_secs: DEFAULT_SESSION_IDLE_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fixed_prediction: None,
            trust_forwarded_for: false,
        }
    }
}

impl AppConfig {
    /// Resolve every value from env → `/run/secrets` → default.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(SECRETS_DIR), |key| std::env::var(key).ok())
    }

    /// Resolution with an injectable secrets dir and env source.
    pub fn load_from(
        secrets_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| -> Option<String> {
            env(&format!("{ENV_PREFIX}{name}")).or_else(|| read_secret(secrets_dir, name))
        };

        let mut config = Self::default();

        if let Some(v) = lookup("BIND_ADDR") {
            config.bind_addr = parse("BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("UPLOAD_FOLDER") {
            config.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MODEL_NAME") {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SESSION_IDLE_SECS") {
            config.session_idle_timeout_secs = parse("SESSION_IDLE_SECS", &v)?;
        }
        if let Some(v) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = lookup("FIXED_PREDICTION") {
            config.fixed_prediction = Some(parse_prediction(&v)?);
        }
        if let Some(v) = lookup("TRUST_FORWARDED_FOR") {
            config.trust_forwarded_for = parse("TRUST_FORWARDED_FOR", &v)?;
        }

        Ok(config)
    }
}

/// Read `<dir>/<name>`, trimmed. Missing or unreadable files yield `None`.
fn read_secret(dir: &Path, name: &str) -> Option<String> {
    std::fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.into(),
        reason: e.to_string(),
    })
}

fn parse_prediction(value: &str) -> Result<Vec<f32>, ConfigError> {
    value
        .split(',')
        .map(|part| parse::<f32>("FIXED_PREDICTION", part))
        .collect()
}
