// Conversation domain model
use super::alert::CriticalCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const WELCOME_NOTICE: &str = "System online. Monitoring vehicle telemetry...";
pub const QUERY_FAILURE_NOTICE: &str = "Error connecting to the analysis agent.";
pub const VOICE_ASSIST_PENDING: &str = "Initiating voice uplink...";
pub const VOICE_ASSIST_DISPATCHED: &str = "Voice call dispatched.";
pub const VOICE_ASSIST_FAILED: &str = "Error: could not connect to the voice service.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// An entry of the append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sequence: u64,
    pub sender: Sender,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A message waiting for its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub text: String,
}

impl MessageDraft {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }

    pub fn critical_alert(code: &CriticalCode) -> Self {
        Self::system(format!(
            "CRITICAL ALERT: OBD-II Code {} Detected ({}).",
            code.code, code.description
        ))
    }
}

/// Structured answer from the analysis agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
    #[serde(default, alias = "steps", deserialize_with = "null_as_empty")]
    pub recommended_steps: Vec<String>,
    #[serde(default)]
    pub booking_status: Option<String>,
}

/// Agents send `"steps": null` when there is nothing to recommend.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AnalysisResponse {
    /// Messages derived from this response, in log order: the analysis, then the
    /// combined steps if any, then the booking status if present.
    pub fn to_drafts(&self) -> Vec<MessageDraft> {
        let mut drafts = vec![MessageDraft::agent(self.analysis.clone())];

        if !self.recommended_steps.is_empty() {
            drafts.push(MessageDraft::agent(format!(
                "RECOMMENDED ACTIONS:\n{}",
                self.recommended_steps.join("\n")
            )));
        }

        if let Some(booking) = self.booking_status.as_deref().filter(|b| !b.trim().is_empty()) {
            drafts.push(MessageDraft::agent(format!("SERVICE UPDATE: {}", booking)));
        }

        drafts
    }
}
