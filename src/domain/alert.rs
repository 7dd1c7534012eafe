// Alert domain model
use serde::{Deserialize, Serialize};

/// Alert flag as seen by presentation.
///
/// `active` goes false -> true on the first sample carrying a critical code and
/// stays set until an explicit clear; telemetry alone never resets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertState {
    pub active: bool,
    pub code: Option<String>,
    pub since_sample_id: Option<u64>,
}

impl AlertState {
    pub fn raised(code: String, sample_id: u64) -> Self {
        Self {
            active: true,
            code: Some(code),
            since_sample_id: Some(sample_id),
        }
    }
}

/// A diagnostic trouble code treated as critical, with its human-readable meaning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CriticalCode {
    pub code: String,
    pub description: String,
}

impl CriticalCode {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// P0217: engine coolant over-temperature.
    pub fn engine_overtemp() -> Self {
        Self::new("P0217", "Engine Overtemp")
    }
}

/// Edge-triggered alert emitted once per onset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub code: CriticalCode,
    pub sample_id: u64,
}
