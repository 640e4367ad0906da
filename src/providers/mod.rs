/*!
 * Backend adapter implementations for different translation services.
 *
 * This module contains the capability interface every AI/MT backend must
 * satisfy, plus client implementations:
 * - OpenAI: OpenAI-compatible chat completions (also serves LM Studio)
 * - Ollama: Local LLM server
 * - Mock: scripted test double
 *
 * Backends are selected by name at runtime through [`ServiceFactory`];
 * there is no class hierarchy, just one trait and a registry keyed by
 * configuration string.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::errors::{JobError, ProviderError};
use crate::language_utils;
use crate::settings::keys;
use crate::translation::params::CustomParams;

pub mod mock;
pub mod ollama;
pub mod openai;

/// A source language a backend can translate from, with its valid targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLanguage {
    /// ISO language code
    pub code: String,
    /// Display name
    pub name: String,
    /// Valid target codes (every supported code except this one)
    pub targets: Vec<String>,
}

/// A model a backend can run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier as the backend knows it
    pub id: String,
    /// Display name
    pub name: String,
}

/// Capability interface every translation backend implements.
///
/// One instance is created per job execution by the factory, configured
/// from the settings snapshot; it owns its retry budget, its prompt
/// context and nothing else. Transient failures (timeouts, rate limits)
/// are retried inside `translate`; an error surfaced to the caller means
/// the adapter's own budget is exhausted.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Translate one text unit.
    ///
    /// `context_before`/`context_after` carry the surrounding dialogue when
    /// context prompting is configured; adapters fold them into the prompt
    /// via their prompt context. `custom_parameters` merge into the
    /// outbound request body.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context_before: Option<&[String]>,
        context_after: Option<&[String]>,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<String, ProviderError>;

    /// Translate several lines in one unit.
    ///
    /// The default implementation loops over `translate`; adapters that
    /// speak a batch protocol may override it. Implementations must return
    /// exactly one line per input line.
    async fn translate_batch(
        &self,
        lines: &[String],
        source_language: &str,
        target_language: &str,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<Vec<String>, ProviderError> {
        let mut translated = Vec::with_capacity(lines.len());
        for line in lines {
            translated.push(
                self.translate(
                    line,
                    source_language,
                    target_language,
                    None,
                    None,
                    custom_parameters,
                    token,
                )
                .await?,
            );
        }
        Ok(translated)
    }

    /// Name of the model this service instance is configured to use
    fn model_name(&self) -> &str;

    /// Languages this backend supports.
    ///
    /// The default is the shared subtitle language set; backends with a
    /// narrower pairing can override.
    async fn languages(&self) -> Result<Vec<SourceLanguage>, ProviderError> {
        Ok(default_languages())
    }

    /// Models this backend can enumerate. A "no models" response is valid.
    async fn models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Language codes offered by default across backends
const DEFAULT_LANGUAGE_CODES: &[&str] = &[
    "ar", "cs", "da", "de", "el", "en", "es", "fi", "fr", "he", "hi", "hu", "id", "it", "ja",
    "ko", "nl", "no", "pl", "pt", "ro", "ru", "sv", "th", "tr", "uk", "vi", "zh",
];

/// Build the default language listing: every code may target every other
pub fn default_languages() -> Vec<SourceLanguage> {
    DEFAULT_LANGUAGE_CODES
        .iter()
        .map(|code| SourceLanguage {
            code: code.to_string(),
            name: language_utils::display_name(code),
            targets: DEFAULT_LANGUAGE_CODES
                .iter()
                .filter(|target| *target != code)
                .map(|target| target.to_string())
                .collect(),
        })
        .collect()
}

/// Creates backend adapters by configuration name.
///
/// Tests substitute their own factory; production uses
/// [`DefaultServiceFactory`].
pub trait ServiceFactory: Send + Sync {
    /// Instantiate the backend named by `service_type`, configured from the
    /// settings snapshot. An unknown name is a configuration error.
    fn create_translation_service(
        &self,
        service_type: &str,
        settings: &HashMap<String, String>,
    ) -> Result<Box<dyn TranslationService>, JobError>;
}

/// Registry of the built-in backends
pub struct DefaultServiceFactory;

impl ServiceFactory for DefaultServiceFactory {
    fn create_translation_service(
        &self,
        service_type: &str,
        settings: &HashMap<String, String>,
    ) -> Result<Box<dyn TranslationService>, JobError> {
        match service_type.to_lowercase().as_str() {
            "openai" => Ok(Box::new(openai::OpenAiService::from_settings(settings, "openai")?)),
            "lmstudio" => Ok(Box::new(openai::OpenAiService::from_settings(
                settings, "lmstudio",
            )?)),
            "ollama" => Ok(Box::new(ollama::OllamaService::from_settings(settings)?)),
            "mock" => Ok(Box::new(mock::MockService::working())),
            other => Err(JobError::Configuration(format!(
                "unknown translation service: {}",
                if other.is_empty() { "<unset>" } else { other }
            ))),
        }
    }
}

/// Read the per-service prompt configuration out of a settings snapshot
pub(crate) fn prompt_context_from_settings(
    settings: &HashMap<String, String>,
) -> crate::translation::prompts::PromptContext {
    let enabled = settings
        .get(keys::AI_CONTEXT_PROMPT_ENABLED)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let template = settings
        .get(keys::AI_CONTEXT_PROMPT)
        .cloned()
        .unwrap_or_default();

    crate::translation::prompts::PromptContext::new(enabled, &template)
}
