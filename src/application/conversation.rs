// Conversation orchestrator - User queries and side-effect requests against the agent
use crate::application::agent_gateway::{AgentGateway, AnalysisRequest, SideEffect};
use crate::application::session_state::SessionState;
use crate::application::subscribers::AlertListener;
use crate::domain::alert::AlertEvent;
use crate::domain::chat::{
    AnalysisResponse, MessageDraft, QUERY_FAILURE_NOTICE, VOICE_ASSIST_DISPATCHED,
    VOICE_ASSIST_FAILED, VOICE_ASSIST_PENDING,
};
use crate::domain::errors::ValidationError;
use crate::domain::telemetry::TelemetrySample;
use std::sync::Arc;

/// How a query ended. Failures are already recorded in the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered(AnalysisResponse),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Dispatched,
    Failed,
}

/// Owns the message log side of the session.
///
/// Every public operation resolves; agent failures become log entries.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    session: Arc<SessionState>,
    gateway: Arc<dyn AgentGateway>,
}

impl ConversationOrchestrator {
    pub fn new(session: Arc<SessionState>, gateway: Arc<dyn AgentGateway>) -> Self {
        Self { session, gateway }
    }

    pub async fn post_user_query(
        &self,
        text: &str,
        context: &TelemetrySample,
    ) -> Result<QueryOutcome, ValidationError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        self.session.append_message(MessageDraft::user(text));

        let request = AnalysisRequest {
            query: text.to_string(),
            vehicle_data: context.into(),
        };

        match self.gateway.analyze(&request).await {
            Ok(response) => {
                let appended = self.session.append_messages(response.to_drafts());
                if appended.is_empty() {
                    tracing::debug!("Session ended before analysis completed; dropping response");
                }
                Ok(QueryOutcome::Answered(response))
            }
            Err(e) => {
                tracing::warn!("Analysis query failed: {}", e);
                self.session
                    .append_message(MessageDraft::agent(QUERY_FAILURE_NOTICE));
                Ok(QueryOutcome::Failed)
            }
        }
    }

    pub async fn dispatch_side_effect(&self, effect: SideEffect) -> DispatchOutcome {
        let (pending, dispatched, failed) = match effect {
            SideEffect::VoiceAssist => (
                VOICE_ASSIST_PENDING,
                VOICE_ASSIST_DISPATCHED,
                VOICE_ASSIST_FAILED,
            ),
        };

        self.session.append_message(MessageDraft::system(pending));

        match self.gateway.dispatch(effect).await {
            Ok(()) => {
                tracing::info!("Side effect {:?} dispatched", effect);
                self.session.append_message(MessageDraft::system(dispatched));
                DispatchOutcome::Dispatched
            }
            Err(e) => {
                tracing::warn!("Side effect {:?} failed: {}", effect, e);
                self.session.append_message(MessageDraft::agent(failed));
                DispatchOutcome::Failed
            }
        }
    }
}

impl AlertListener for ConversationOrchestrator {
    fn on_alert(&self, event: &AlertEvent) {
        tracing::debug!("Announcing alert {} from sample {}", event.code.code, event.sample_id);
        self.session
            .append_message(MessageDraft::critical_alert(&event.code));
    }
}
