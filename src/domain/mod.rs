// Domain layer - Vehicle telemetry, alerts and conversation models
pub mod alert;
pub mod chat;
pub mod errors;
pub mod telemetry;
