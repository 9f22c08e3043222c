//! Health probes for the configured backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model looked up in `models[].name`
//! - OpenAI: `GET {endpoint}/v1/models` with bearer auth, model looked up in `data[].id`
//!
//! [`HealthService::check`] never fails; every problem becomes `ok = false`
//! with a message, which is what a `/health` endpoint wants.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, HealthError, HttpError, make_snippet},
};

/// Serializable health snapshot for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.base_url().to_string(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Reuses one HTTP client across all probes.
pub struct HealthService {
    client: reqwest::Client,
}

/// Model names listed by a backend, or `None` if the listing could not be read.
type ModelListing = Option<Vec<String>>;

impl HealthService {
    /// Creates the service with a probe timeout (default 10 s).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HealthError::from)?;

        debug!(timeout_secs = timeout.as_secs(), "HealthService initialized");
        Ok(Self { client })
    }

    /// Probes one config. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let start = Instant::now();

        let result = match cfg.provider {
            LlmProvider::Ollama => self.list_ollama(cfg).await,
            LlmProvider::OpenAI => self.list_openai(cfg).await,
        };
        let latency = start.elapsed().as_millis();

        let status = match result {
            Ok(Some(models)) if models.iter().any(|m| m == &cfg.model) => {
                HealthStatus::new(cfg, true, latency, "backend is healthy; model is available")
            }
            Ok(Some(_)) => HealthStatus::new(
                cfg,
                false,
                latency,
                "backend is up, but the model is not listed",
            ),
            Ok(None) => HealthStatus::new(
                cfg,
                true,
                latency,
                "backend is reachable; model listing could not be decoded",
            ),
            Err(e) => HealthStatus::new(cfg, false, latency, e.to_string()),
        };

        if status.ok {
            info!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                "health probe completed"
            );
        } else {
            warn!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    /// Probes each config in order.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn list_ollama(&self, cfg: &LlmModelConfig) -> Result<ModelListing, HealthError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", cfg.base_url());
        let body = self.get_text(self.client.get(&url), &url).await?;

        // Ollama lists `llama3.2` as `llama3.2:latest`.
        Ok(serde_json::from_str::<Tags>(&body).ok().map(|t| {
            t.models
                .into_iter()
                .flat_map(|m| {
                    let short = m.name.strip_suffix(":latest").map(str::to_string);
                    std::iter::once(m.name).chain(short)
                })
                .collect()
        }))
    }

    async fn list_openai(&self, cfg: &LlmModelConfig) -> Result<ModelListing, HealthError> {
        #[derive(Deserialize)]
        struct Model {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<Model>,
        }

        let key = cfg.api_key.as_deref().ok_or(HealthError::MissingApiKey)?;
        let url = format!("{}/v1/models", cfg.base_url());
        let req = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {key}"));
        let body = self.get_text(req, &url).await?;

        Ok(serde_json::from_str::<Models>(&body)
            .ok()
            .map(|m| m.data.into_iter().map(|m| m.id).collect()))
    }

    async fn get_text(&self, req: reqwest::RequestBuilder, url: &str) -> Result<String, HealthError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HealthError::InvalidEndpoint(url.to_string()));
        }

        debug!("GET {}", url);
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet: make_snippet(&text),
            }));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::OllamaApi;

    fn cfg(provider: LlmProvider, endpoint: &str, api_key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: "m".into(),
            endpoint: endpoint.into(),
            api_key: api_key.map(str::to_string),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(2),
            ollama_api: OllamaApi::Chat,
        }
    }

    #[tokio::test]
    async fn invalid_endpoint_is_reported_not_raised() {
        let svc = HealthService::new(Some(2)).unwrap();
        let status = svc
            .check(&cfg(LlmProvider::Ollama, "localhost:11434", None))
            .await;
        assert!(!status.ok);
        assert!(status.message.contains("invalid endpoint"));
    }

    #[tokio::test]
    async fn openai_probe_without_key_fails_softly() {
        let svc = HealthService::new(Some(2)).unwrap();
        let status = svc
            .check(&cfg(LlmProvider::OpenAI, "https://api.openai.com", None))
            .await;
        assert!(!status.ok);
        assert_eq!(status.provider, "OpenAI");
    }
}
