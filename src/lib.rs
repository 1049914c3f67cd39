pub mod api;
pub mod config;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::TriageConfig;
use crate::pipeline::triage::{TriageError, TriageService};

/// Initialize tracing, resolve configuration, and serve the triage API
/// until Ctrl-C.
pub async fn run() -> Result<(), TriageError> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = TriageConfig::from_env()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        capability = ?config.capability(),
        remote_rules = config.backend_url.is_some(),
        "Configuration resolved"
    );

    let rules = Arc::new(config.load_rules()?);
    tracing::info!(rules = rules.rules().len(), "Triage rules loaded");

    let service = TriageService::from_config(&config, rules.clone())?;
    let exposed_rules = config.backend_url.is_none().then_some(rules);
    let ctx = ApiContext::new(Arc::new(service), exposed_rules);

    let mut server = api::start_server(ctx, config.bind_addr, &config.allowed_origins).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    tracing::info!("Shutting down");
    server.shutdown();
    server.stopped().await;

    Ok(())
}
