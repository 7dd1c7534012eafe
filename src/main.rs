// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::agent_gateway::AgentGateway;
use crate::application::alert_evaluator::AlertEvaluator;
use crate::application::conversation::ConversationOrchestrator;
use crate::application::session_state::SessionState;
use crate::application::subscribers::TelemetrySubscriber;
use crate::infrastructure::agent_client::HttpAgentClient;
use crate::infrastructure::config::load_console_config;
use crate::infrastructure::telemetry_stream::TelemetryStream;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_console_config()?;

    // Create agent client (infrastructure layer)
    let gateway: Arc<dyn AgentGateway> = Arc::new(HttpAgentClient::new(&config.agent)?);

    // Create session and use cases (application layer)
    let session = Arc::new(SessionState::new());
    let orchestrator = ConversationOrchestrator::new(session.clone(), gateway.clone());
    let evaluator = Arc::new(
        AlertEvaluator::new(config.alerts.critical_codes.clone(), session.clone())
            .with_listener(Arc::new(orchestrator.clone())),
    );

    // Session first so the alert evaluator sees a sample only after it is current
    let subscribers: Vec<Arc<dyn TelemetrySubscriber>> = vec![session.clone(), evaluator.clone()];
    let stream = match TelemetryStream::connect(&config.telemetry.endpoint, subscribers).await {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::error!("Telemetry unavailable: {}", e);
            session.on_close();
            None
        }
    };

    let state = Arc::new(AppState {
        session,
        orchestrator,
        evaluator,
        gateway,
        vehicle_registration: config.session.vehicle_registration.clone(),
    });

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting vehicle console on {}", addr);

    // Serve (presentation layer); telemetry and session are torn down on ctrl-c
    let listener = tokio::net::TcpListener::bind(addr).await?;
    presentation::serve(listener, state, stream, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await?;

    Ok(())
}
