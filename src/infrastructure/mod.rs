// Infrastructure layer - External dependencies and adapters
pub mod agent_client;
pub mod chunked_json;
pub mod config;
pub mod http_response;
pub mod telemetry_stream;
