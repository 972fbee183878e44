//! Shared application state for the HTTP layer.
//!
//! Holds configuration, the classifier handle and the session table.
//! Database connections are opened per request from the configured path;
//! there is no process-wide connection.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::classifier::SeverityClassifier;
use crate::config::AppConfig;
use crate::db;
use crate::session::SessionStore;

pub struct CoreState {
    pub config: AppConfig,
    classifier: Arc<dyn SeverityClassifier>,
    sessions: Mutex<SessionStore>,
}

impl CoreState {
    pub fn new(config: AppConfig, classifier: Arc<dyn SeverityClassifier>) -> Self {
        let idle = Duration::from_secs(config.session_idle_timeout_secs);
        Self {
            config,
            classifier,
            sessions: Mutex::new(SessionStore::new(idle)),
        }
    }

    /// Open a database connection for one request.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.database_path).map_err(CoreError::Database)
    }

    pub fn classifier(&self) -> Arc<dyn SeverityClassifier> {
        Arc::clone(&self.classifier)
    }

    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionStore>, CoreError> {
        self.sessions.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
