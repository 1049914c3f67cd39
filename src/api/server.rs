//! Triage API server lifecycle: bind, spawn the axum server in a
//! background task, return a handle with a shutdown channel.
//!
//! Shutting down also cancels the shared `ApiContext::shutdown` token so
//! in-flight triage calls stop waiting on slow engines.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::triage_api_router;
use crate::api::types::ApiContext;
use crate::pipeline::triage::TriageError;

/// Metadata for a running server instance.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

/// Handle to a running triage API server.
pub struct TriageServer {
    pub session: ServerSession,
    ctx: ApiContext,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TriageServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        self.ctx.shutdown.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Triage API server shutdown signal sent");
        }
    }

    /// Wait for the background server task to finish.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Triage API server task failed: {e}");
            }
        }
    }
}

impl Drop for TriageServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the triage API on `addr`. Port 0 binds an ephemeral port; the
/// chosen one is reported in the returned session.
pub async fn start_server(
    ctx: ApiContext,
    addr: SocketAddr,
    allowed_origins: &[String],
) -> Result<TriageServer, TriageError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TriageError::Configuration(format!("Failed to bind {addr}: {e}")))?;

    let addr = listener
        .local_addr()
        .map_err(|e| TriageError::Configuration(format!("Failed to get server address: {e}")))?;

    tracing::info!(%addr, "Triage API server binding");

    let app = triage_api_router(ctx.clone(), allowed_origins);

    let session = ServerSession {
        session_id: Uuid::new_v4().to_string(),
        server_addr: addr.to_string(),
        port: addr.port(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Triage API server received shutdown signal");
        };

        tracing::info!(%addr, "Triage API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Triage API server error: {e}");
        }

        tracing::info!("Triage API server stopped");
    });

    Ok(TriageServer {
        session,
        ctx,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}
