// Error taxonomy for the console core
use thiserror::Error;

/// A single inbound telemetry frame could not be turned into a sample.
/// The stream stays open.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed telemetry frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("telemetry field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("telemetry frame is not valid UTF-8")]
    NotUtf8,
}

/// The telemetry connection could not be opened or was dropped.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid telemetry endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("telemetry connection failed: {0}")]
    Connect(#[source] Box<tokio_tungstenite::tungstenite::Error>),
    #[error("telemetry connection lost: {0}")]
    Lost(#[source] Box<tokio_tungstenite::tungstenite::Error>),
}

/// An analysis query or side-effect dispatch failed. Always absorbed into
/// the message log, never surfaced to the caller of the orchestrator.
#[derive(Debug, Error)]
pub enum QueryFailure {
    #[error("agent unreachable: {0}")]
    Network(String),
    #[error("agent returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("agent returned a malformed body: {0}")]
    MalformedBody(String),
}

impl From<reqwest::Error> for QueryFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            QueryFailure::MalformedBody(e.to_string())
        } else {
            QueryFailure::Network(e.to_string())
        }
    }
}

/// Caller input rejected before any I/O.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query text is empty")]
    EmptyQuery,
}
