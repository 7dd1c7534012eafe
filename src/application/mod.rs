// Application layer - Session aggregate, alerting and conversation use cases
pub mod agent_gateway;
pub mod alert_evaluator;
pub mod conversation;
pub mod session_state;
pub mod subscribers;
