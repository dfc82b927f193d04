use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cnh_validator::{
    config::Configuration,
    router,
    services::{Orchestrator, SessionStore, WorkflowClient},
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    // Load configuration
    let configuration = Configuration::new()?;
    configuration.validate().map_err(anyhow::Error::msg)?;
    tracing::info!("Configuration loaded successfully");

    // Initialize services
    let session_store = Arc::new(
        SessionStore::open(
            &configuration.sessions.data_dir,
            configuration.sessions.validity(),
        )
        .await?,
    );
    let workflow_client = Arc::new(WorkflowClient::new(&configuration.workflow)?);
    let orchestrator = Arc::new(Orchestrator::new(session_store, workflow_client));

    let app_state = AppState {
        orchestrator,
        public_url: configuration.server.public_url.clone(),
    };

    let app = router(app_state, configuration.server.max_upload_bytes);

    // Start server
    let addr = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
