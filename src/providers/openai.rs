use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::errors::{JobError, ProviderError};
use crate::language_utils;
use crate::settings::keys;
use crate::translation::params::CustomParams;
use crate::translation::prompts::{self, DEFAULT_PROMPT_TEMPLATE, PromptContext};

use super::{ModelInfo, TranslationService};

/// Default public endpoint
const OPENAI_ENDPOINT: &str = "https://api.openai.com";

/// Default LM Studio local endpoint
const LMSTUDIO_ENDPOINT: &str = "http://localhost:1234";

// Batch marker lines: [#n] translated text
static BATCH_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[#(\d+)\]\s*(.*)$").unwrap());

/// OpenAI-compatible chat-completions backend.
///
/// Serves both the `openai` and `lmstudio` service names; LM Studio speaks
/// the same wire protocol on a local endpoint and does not need a real
/// API key.
pub struct OpenAiService {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL
    endpoint: String,
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

/// Chat completion response shape (the subset we read)
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiService {
    /// Build a service instance from the settings snapshot.
    ///
    /// `prefix` selects the per-service key namespace (`openai_*` or
    /// `lmstudio_*`).
    pub fn from_settings(
        settings: &HashMap<String, String>,
        prefix: &str,
    ) -> Result<Self, JobError> {
        let model = settings
            .get(&keys::model_key(prefix))
            .cloned()
            .unwrap_or_else(|| {
                if prefix == "lmstudio" {
                    "local-model".to_string()
                } else {
                    "gpt-4o-mini".to_string()
                }
            });

        let api_key = match settings.get(&keys::api_key_key(prefix)) {
            Some(key) if !key.is_empty() => key.clone(),
            // LM Studio ignores the key; anything non-empty will do
            _ if prefix == "lmstudio" => "lm-studio".to_string(),
            _ => {
                return Err(JobError::Configuration(format!(
                    "missing API key setting: {}",
                    keys::api_key_key(prefix)
                )));
            }
        };

        let endpoint = settings
            .get(&keys::endpoint_key(prefix))
            .filter(|e| !e.is_empty())
            .cloned()
            .unwrap_or_else(|| {
                if prefix == "lmstudio" {
                    LMSTUDIO_ENDPOINT.to_string()
                } else {
                    OPENAI_ENDPOINT.to_string()
                }
            });

        let prompt_template = settings
            .get(keys::AI_PROMPT)
            .filter(|t| !t.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string());

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
            model,
            prompt_template,
            prompt_context: super::prompt_context_from_settings(settings),
            max_retries: 3,
            backoff_base_ms: 1000,
        })
    }

    /// Render the instruction prompt for a language pair
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

    /// Execute one chat completion with the adapter's retry budget
    async fn complete(
        &self,
        system_prompt: &str,
        user_text: &str,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.endpoint.trim_end_matches('/')
        );

        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.model));
        body.insert(
            "messages".to_string(),
            json!([
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_text },
            ]),
        );
        if let Some(params) = custom_parameters {
            for (key, value) in params {
                body.insert(key.clone(), value.to_json());
            }
        }
        let body = Value::Object(body);

        let mut attempt = 0;
        let mut last_error: Option<ProviderError> = None;

        while attempt <= self.max_retries {
            if token.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }

            let send = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send();

            let response = tokio::select! {
                _ = token.cancelled() => return Err(ProviderError::Cancelled),
                result = send => result,
            };

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<ChatCompletionResponse>()
                            .await
                            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

                        let content = parsed
                            .choices
                            .first()
                            .map(|choice| choice.message.content.trim().to_string())
                            .filter(|content| !content.is_empty());

                        return content.ok_or_else(|| {
                            ProviderError::ParseError("empty completion response".to_string())
                        });
                    }

                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());

                    let err = match status.as_u16() {
                        401 | 403 => ProviderError::AuthenticationError(message),
                        429 => ProviderError::RateLimitExceeded(message),
                        code => ProviderError::ApiError {
                            status_code: code,
                            message,
                        },
                    };

                    if !err.is_retryable() {
                        error!("OpenAI-compatible API error ({}): {}", status, err);
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
                    "Retrying OpenAI-compatible request in {} ms (attempt {}/{})",
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
impl TranslationService for OpenAiService {
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
        let user_text =
            self.prompt_context
                .apply_context_if_enabled(text, context_before, context_after, None);

        self.complete(
            &self.system_prompt(source_language, target_language),
            &user_text,
            custom_parameters,
            token,
        )
        .await
    }

    async fn translate_batch(
        &self,
        lines: &[String],
        source_language: &str,
        target_language: &str,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let marked_input = lines
            .iter()
            .enumerate()
            .map(|(index, line)| format!("[#{}] {}", index + 1, line.replace('\n', " ")))
            .collect::<Vec<_>>()
            .join("\n");

        let system_prompt = format!(
            "{} The input contains {} numbered lines, each starting with a [#n] marker. \
             Translate every line and reply with exactly one line per marker, \
             keeping the markers unchanged.",
            self.system_prompt(source_language, target_language),
            lines.len()
        );

        let response = self
            .complete(&system_prompt, &marked_input, custom_parameters, token)
            .await?;

        parse_marked_response(&response, lines.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/v1/models", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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
            .json::<ModelListResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|entry| ModelInfo {
                name: entry.id.clone(),
                id: entry.id,
            })
            .collect())
    }
}

/// Parse a `[#n]`-marked batch response back into per-line translations.
///
/// Lines without a marker continue the previous entry (models sometimes
/// wrap long cues). Every marker from 1..=expected must appear exactly
/// once, in any order.
fn parse_marked_response(response: &str, expected: usize) -> Result<Vec<String>, ProviderError> {
    let mut translated: Vec<Option<String>> = vec![None; expected];
    let mut current: Option<usize> = None;

    for line in response.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = BATCH_MARKER_REGEX.captures(trimmed) {
            let index: usize = caps[1].parse().unwrap_or(0);
            if index == 0 || index > expected {
                continue;
            }
            translated[index - 1] = Some(caps[2].trim().to_string());
            current = Some(index - 1);
        } else if let Some(index) = current {
            if let Some(existing) = translated[index].as_mut() {
                existing.push(' ');
                existing.push_str(trimmed);
            }
        }
    }

    let actual = translated.iter().filter(|entry| entry.is_some()).count();
    if actual != expected {
        return Err(ProviderError::BatchMismatch { expected, actual });
    }

    Ok(translated.into_iter().map(|entry| entry.unwrap_or_default()).collect())
}
