pub mod api;
pub mod classifier;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod diagnosis;
pub mod insight;
pub mod models;
pub mod report;
pub mod session;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Cannot create upload directory {path}: {source}")]
    UploadDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] db::DatabaseError),

    #[error(transparent)]
    Classifier(#[from] classifier::ClassifierError),

    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Load configuration, prepare storage and the classifier, then serve
/// until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::load()?;
    std::fs::create_dir_all(&config.upload_dir).map_err(|source| StartupError::UploadDir {
        path: config.upload_dir.clone(),
        source,
    })?;

    // Apply migrations once up front; requests open their own connections.
    drop(db::open_database(&config.database_path)?);
    tracing::info!(path = %config.database_path.display(), "Database ready");

    let classifier = classifier::load_classifier(&config)?;
    tracing::info!(backend = classifier.name(), "Classifier ready");

    let bind_addr = config.bind_addr;
    let core = Arc::new(core_state::CoreState::new(config, classifier));
    let server = api::ApiServer::start(core, bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    server.run_until_ctrl_c().await?;
    Ok(())
}
