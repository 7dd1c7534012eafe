// Application state for HTTP handlers
use crate::application::agent_gateway::AgentGateway;
use crate::application::alert_evaluator::AlertEvaluator;
use crate::application::conversation::ConversationOrchestrator;
use crate::application::session_state::SessionState;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionState>,
    pub orchestrator: ConversationOrchestrator,
    pub evaluator: Arc<AlertEvaluator>,
    pub gateway: Arc<dyn AgentGateway>,
    pub vehicle_registration: Option<String>,
}
