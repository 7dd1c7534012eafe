// Gateway trait for the external analysis / voice / booking backend
use crate::domain::chat::AnalysisResponse;
use crate::domain::errors::QueryFailure;
use crate::domain::telemetry::TelemetrySample;
use async_trait::async_trait;
use serde::Serialize;

/// Body of an analysis query.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub query: String,
    pub vehicle_data: VehicleData,
}

/// Telemetry context attached to a query, in the backend's field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleData {
    pub rpm: u32,
    pub speed: f64,
    pub temp: f64,
    pub dtc: Option<String>,
}

impl From<&TelemetrySample> for VehicleData {
    fn from(sample: &TelemetrySample) -> Self {
        Self {
            rpm: sample.rpm,
            speed: sample.speed,
            temp: sample.temperature,
            dtc: sample.dtc.clone(),
        }
    }
}

/// One-shot external actions with no structured response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    VoiceAssist,
}

#[async_trait]
pub trait AgentGateway: Send + Sync {
    /// Ask the analysis agent about the vehicle
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, QueryFailure>;

    /// Fire a side-effect request; any acknowledgement counts as success
    async fn dispatch(&self, effect: SideEffect) -> Result<(), QueryFailure>;

    /// Fetch service history records for a registration, passed through as-is
    async fn service_history(&self, registration: &str) -> anyhow::Result<serde_json::Value>;
}
