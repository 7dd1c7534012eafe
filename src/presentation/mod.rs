// Presentation layer - HTTP surface over the session
pub mod app_state;
pub mod handlers;

use crate::infrastructure::telemetry_stream::StreamHandle;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_session, health_check, own_service_history, post_chat, post_clear_alert,
    post_voice_assist, service_history, stream_session,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/session", get(get_session))
        .route("/session/stream", get(stream_session))
        .route("/chat", post(post_chat))
        .route("/voice-assist", post(post_voice_assist))
        .route("/alert/clear", post(post_clear_alert))
        .route("/service-history", get(own_service_history))
        .route("/service-history/:registration", get(service_history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the console until `signal` resolves. The telemetry link is torn down
/// and the session ended before connections drain, which lets open
/// `/session/stream` responses finish.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    telemetry: Option<StreamHandle>,
    signal: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let session = state.session.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            signal.await;
            tracing::info!("Shutdown requested");
            if let Some(handle) = telemetry {
                handle.disconnect();
                handle.wait_closed().await;
            }
            session.end();
        })
        .await
}
