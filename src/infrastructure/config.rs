use crate::domain::alert::CriticalCode;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    pub telemetry: TelemetrySettings,
    pub agent: AgentSettings,
    pub server: ServerSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentSettings {
    pub base_url: String,
    pub analyze_path: String,
    pub voice_assist_path: String,
    pub service_history_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionSettings {
    pub vehicle_registration: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    #[serde(default = "default_critical_codes")]
    pub critical_codes: Vec<CriticalCode>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            critical_codes: default_critical_codes(),
        }
    }
}

fn default_critical_codes() -> Vec<CriticalCode> {
    vec![CriticalCode::engine_overtemp()]
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("telemetry.endpoint", "ws://127.0.0.1:8000/ws/simulation")?
        .set_default("agent.base_url", "http://127.0.0.1:8000")?
        .set_default("agent.analyze_path", "/api/analyze")?
        .set_default("agent.voice_assist_path", "/api/voice-test")?
        .set_default(
            "agent.service_history_path",
            "/api/service-history/${registration}",
        )?
        .set_default("agent.timeout_secs", 30)?
        .set_default("server.bind", "0.0.0.0:8080")?)
}

/// Load `config/console.*` (optional) with `CONSOLE__SECTION__KEY` overrides.
pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/console").required(false))
        .add_source(config::Environment::with_prefix("CONSOLE").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Replace `${name}` placeholders in a path or URL template
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        let mut vars = HashMap::new();
        vars.insert("registration".to_string(), "TN-22-BJ-2730".to_string());

        let path = expand_template("/api/service-history/${registration}", &vars);

        assert_eq!(path, "/api/service-history/TN-22-BJ-2730");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [telemetry]
            endpoint = "ws://car.local:9000/stream"

            [[alerts.critical_codes]]
            code = "P0524"
            description = "Oil Pressure Too Low"
        "#;

        let config: ConsoleConfig = builder()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.telemetry.endpoint, "ws://car.local:9000/stream");
        assert_eq!(config.agent.analyze_path, "/api/analyze");
        assert_eq!(config.agent.timeout_secs, 30);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(
            config.alerts.critical_codes,
            vec![CriticalCode::new("P0524", "Oil Pressure Too Low")]
        );
        assert!(config.session.vehicle_registration.is_none());
    }

    #[test]
    fn test_defaults_alone_are_complete() {
        let config: ConsoleConfig = builder().unwrap().build().unwrap().try_deserialize().unwrap();

        assert_eq!(config.alerts.critical_codes, vec![CriticalCode::engine_overtemp()]);
        assert_eq!(config.agent.voice_assist_path, "/api/voice-test");
    }
}
