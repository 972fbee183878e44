//! API server lifecycle: binds the listener and runs axum in a
//! background task.
//!
//! bind → spawn background task → return handle with shutdown channel.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ApiServer {
    /// Bind `addr` and start serving. Port 0 picks an ephemeral port;
    /// the bound address is in `ApiServer::addr`.
    pub async fn start(core: Arc<CoreState>, addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let addr = listener.local_addr()?;

        let app = api_router(core);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let shutdown_signal = async move {
                let _ = shutdown_rx.await;
                tracing::info!("API server received shutdown signal");
            };

            tracing::info!(%addr, "API server started");
            let result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal)
            .await;
            if let Err(e) = &result {
                tracing::error!("API server error: {e}");
            }
            tracing::info!("API server stopped");
            result
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) -> Result<(), ServerError> {
        self.task.await??;
        Ok(())
    }

    /// Serve until Ctrl-C, then shut down gracefully.
    pub async fn run_until_ctrl_c(mut self) -> Result<(), ServerError> {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Ctrl-C received");
                self.shutdown();
                self.wait().await
            }
            result = &mut self.task => {
                result??;
                Ok(())
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedClassifier;
    use crate::config::AppConfig;

    fn test_core(dir: &std::path::Path) -> Arc<CoreState> {
        let config = AppConfig {
            database_path: dir.join("users.db"),
            upload_dir: dir.join("uploads"),
            ..AppConfig::default()
        };
        Arc::new(CoreState::new(
            config,
            Arc::new(FixedClassifier::new(vec![1.0, 0.0, 0.0, 0.0, 0.0])),
        ))
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = ApiServer::start(test_core(tmp.path()), localhost())
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");

        server.shutdown();
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn server_serves_api_routes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = ApiServer::start(test_core(tmp.path()), localhost())
            .await
            .unwrap();
        let base = format!("http://{}", server.addr);

        let resp = reqwest::get(format!("{base}/nonexistent")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        let resp = reqwest::get(format!("{base}/api/patients")).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
    }

    #[tokio::test]
    async fn multipart_intake_over_http() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = ApiServer::start(test_core(tmp.path()), localhost())
            .await
            .unwrap();
        let base = format!("http://{}", server.addr);
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/auth/signup"))
            .json(&serde_json::json!({
                "full_name": "Dr. K", "doctor_id": "1", "hospital": "H",
                "specialization": "S", "username": "drk",
                "email": "k@example.org", "password": "pw-123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

        let login: serde_json::Value = client
            .post(format!("{base}/api/auth/login"))
            .json(&serde_json::json!({"username": "drk", "password": "pw-123"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token = login["token"].as_str().unwrap().to_string();

        let mut png = std::io::Cursor::new(Vec::new());
        let fundus =
            image::RgbImage::from_fn(32, 32, |x, y| image::Rgb([x as u8 * 7, y as u8 * 7, 90]));
        image::DynamicImage::ImageRgb8(fundus)
            .write_to(&mut png, image::ImageOutputFormat::Png)
            .unwrap();
        let form = reqwest::multipart::Form::new()
            .text("name", "Kwame Asante")
            .text("age", "66")
            .text("gender", "Male")
            .text("eye_issue", "None")
            .text("diabetes", "Type 2")
            .text("duration", "15")
            .part(
                "image",
                reqwest::multipart::Part::bytes(png.into_inner()).file_name("fundus.png"),
            );
        let resp = client
            .post(format!("{base}/api/patients"))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["insights"]["assessment"]["label"], "No DR");

        server.shutdown();
        server.wait().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut first = ApiServer::start(test_core(tmp.path()), localhost())
            .await
            .unwrap();
        let err = ApiServer::start(test_core(tmp.path()), first.addr)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let mut server = ApiServer::start(test_core(tmp.path()), localhost())
            .await
            .unwrap();
        server.shutdown();
        server.shutdown(); // Second call should be safe
        server.wait().await.unwrap();
    }
}
