use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::errors::{JobError, ProviderError};
use crate::language_utils;
use crate::settings::keys;
use crate::translation::params::CustomParams;
use crate::translation::prompts::{self, DEFAULT_PROMPT_TEMPLATE, PromptContext};

use super::{ModelInfo, TranslationService};

/// Default local endpoint
const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Ollama backend speaking the local generate API
pub struct OllamaService {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model to request
    model: String,
    /// Instruction template with {sourceLanguage}/{targetLanguage} slots
    prompt_template: String,
    /// Context-prompt configuration for this execution
    prompt_context: PromptContext,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    system: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<Value>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation response from the Ollama API (the subset we read)
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    /// Generated text
    response: String,
}

/// Model listing response from /api/tags
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Normalize an endpoint setting into a base URL with scheme and port
fn normalize_endpoint(endpoint: &str) -> Result<String, JobError> {
    let candidate = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| JobError::Configuration(format!("invalid ollama endpoint {}: {}", endpoint, e)))?;

    let host = url
        .host_str()
        .ok_or_else(|| JobError::Configuration(format!("invalid host in endpoint: {}", endpoint)))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "https" { 443 } else { 11434 });

    Ok(format!("{}://{}:{}", url.scheme(), host, port))
}

impl OllamaService {
    /// Build a service instance from the settings snapshot
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, JobError> {
        let endpoint = settings
            .get(&keys::endpoint_key("ollama"))
            .filter(|e| !e.is_empty())
            .map(String::as_str)
            .unwrap_or(OLLAMA_ENDPOINT);

        let model = settings
            .get(&keys::model_key("ollama"))
            .cloned()
            .unwrap_or_else(|| "llama3.2:3b".to_string());

        let prompt_template = settings
            .get(keys::AI_PROMPT)
            .filter(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        Ok(Self {
            base_url: normalize_endpoint(endpoint)?,
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                // Ollama speaks HTTP/1.1; keep connections alive across cues
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            model,
            prompt_template,
            prompt_context: super::prompt_context_from_settings(settings),
            max_retries: 3,
            backoff_base_ms: 1000,
        })
    }

    fn system_prompt(&self, source_language: &str, target_language: &str) -> String {
        let mut replacements = HashMap::new();
        replacements.insert(
            "sourceLanguage".to_string(),
            language_utils::display_name(source_language),
        );
        replacements.insert(
            "targetLanguage".to_string(),
            language_utils::display_name(target_language),
        );
        prompts::render(&self.prompt_template, &replacements)
    }

    /// Custom parameters land in the request's `options` object, which is
    /// where Ollama expects sampling knobs like temperature and top_p
    fn options_from(custom_parameters: Option<&CustomParams>) -> Option<Value> {
        let params = custom_parameters.filter(|p| !p.is_empty())?;

        let mut options = Map::new();
        for (key, value) in params {
            options.insert(key.clone(), value.to_json());
        }
        Some(Value::Object(options))
    }

    /// Generate text with the adapter's retry budget
    async fn generate(
        &self,
        request: &GenerationRequest,
        token: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut attempt = 0;
        let mut last_error: Option<ProviderError> = None;

        while attempt <= self.max_retries {
            if token.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let send = self.client.post(&url).json(request).send();
            let response = tokio::select! {
                _ = token.cancelled() => return Err(ProviderError::Cancelled),
                result = send => result,
            };

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<GenerationResponse>()
                            .await
                            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                        return Ok(parsed.response.trim().to_string());
                    }

                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    let err = ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message,
                    };

                    if !err.is_retryable() {
                        error!("Ollama API error ({}): {}", status, err);
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(e) => {
                    last_error = Some(ProviderError::ConnectionError(e.to_string()));
                }
            }

            attempt += 1;
            if attempt <= self.max_retries {
                let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
                let jitter_ms = rand::rng().random_range(0..=self.backoff_base_ms / 2);
                debug!(
                    "Retrying Ollama request in {} ms (attempt {}/{})",
                    backoff_ms + jitter_ms,
                    attempt + 1,
                    self.max_retries + 1
                );
                tokio::select! {
                    _ = token.cancelled() => return Err(ProviderError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)) => {}
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!(
                "request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }
}

#[async_trait]
impl TranslationService for OllamaService {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context_before: Option<&[String]>,
        context_after: Option<&[String]>,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let prompt =
            self.prompt_context
                .apply_context_if_enabled(text, context_before, context_after, None);

        let request = GenerationRequest {
            model: self.model.clone(),
            prompt,
            system: self.system_prompt(source_language, target_language),
            options: Self::options_from(custom_parameters),
            stream: false,
        };

        self.generate(&request, token).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let parsed = response
            .json::<TagsResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(parsed
            .models
            .into_iter()
            .map(|entry| ModelInfo {
                name: entry.name.clone(),
                id: entry.name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizeEndpoint_withBareHost_shouldAddSchemeAndPort() {
        assert_eq!(
            normalize_endpoint("localhost").unwrap(),
            "http://localhost:11434"
        );
    }

    #[test]
    fn test_normalizeEndpoint_withFullUrl_shouldKeepPort() {
        assert_eq!(
            normalize_endpoint("http://10.0.0.5:9999").unwrap(),
            "http://10.0.0.5:9999"
        );
    }

    #[test]
    fn test_normalizeEndpoint_withInvalidInput_shouldFail() {
        assert!(normalize_endpoint("http://").is_err());
    }

    #[test]
    fn test_fromSettings_shouldApplyDefaults() {
        let service = OllamaService::from_settings(&HashMap::new()).unwrap();

        assert_eq!(service.base_url, "http://localhost:11434");
        assert_eq!(service.model_name(), "llama3.2:3b");
    }

    #[test]
    fn test_optionsFrom_shouldBuildJsonObject() {
        use crate::translation::params::CustomParamValue;

        let params = vec![
            ("temperature".to_string(), CustomParamValue::Float(0.3)),
            ("num_predict".to_string(), CustomParamValue::Int(256)),
        ];

        let options = OllamaService::options_from(Some(&params)).unwrap();

        assert_eq!(options["temperature"], 0.3);
        assert_eq!(options["num_predict"], 256);
        assert!(OllamaService::options_from(None).is_none());
    }
}
