// HTTP client for the analysis / voice / booking backend
use crate::application::agent_gateway::{AgentGateway, AnalysisRequest, SideEffect};
use crate::domain::chat::AnalysisResponse;
use crate::domain::errors::QueryFailure;
use crate::infrastructure::config::{expand_template, AgentSettings};
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAgentClient {
    client: reqwest::Client,
    base_url: String,
    analyze_path: String,
    voice_assist_path: String,
    service_history_path: String,
}

impl HttpAgentClient {
    pub fn new(settings: &AgentSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build agent HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            analyze_path: settings.analyze_path.clone(),
            voice_assist_path: settings.voice_assist_path.clone(),
            service_history_path: settings.service_history_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Option<&AnalysisRequest>) -> Result<reqwest::Response, QueryFailure> {
        let mut request = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryFailure::Status { status, body });
        }

        Ok(response)
    }
}

#[async_trait]
impl AgentGateway for HttpAgentClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, QueryFailure> {
        tracing::debug!("Sending analysis query: {}", request.query);
        let response = self.post(&self.analyze_path, Some(request)).await?;

        let bytes = response.bytes().await?;
        serde_json::from_slice::<AnalysisResponse>(&bytes)
            .map_err(|e| QueryFailure::MalformedBody(e.to_string()))
    }

    async fn dispatch(&self, effect: SideEffect) -> Result<(), QueryFailure> {
        let path = match effect {
            SideEffect::VoiceAssist => &self.voice_assist_path,
        };
        self.post(path, None).await?;
        Ok(())
    }

    async fn service_history(&self, registration: &str) -> anyhow::Result<serde_json::Value> {
        let mut vars = HashMap::new();
        vars.insert(
            "registration".to_string(),
            urlencoding::encode(registration).into_owned(),
        );
        let url = self.url(&expand_template(&self.service_history_path, &vars));

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send service history request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Service history lookup failed with status {}: {}", status, body);
        }

        response
            .json::<serde_json::Value>()
            .await
            .context("Failed to parse service history response")
    }
}
