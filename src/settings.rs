/*!
 * Settings resolution for translation jobs.
 *
 * Settings live in the persistence layer as string key/value pairs and are
 * fetched once per job execution for an explicitly enumerated key set.
 * The raw map is immediately parsed into a strongly-typed [`JobSettings`]
 * so the rest of the pipeline never compares raw `"true"`/`"false"`
 * strings; missing or malformed values fall back to soft defaults and
 * never raise a key-lookup fault.
 */

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::translation::validator::SubtitleValidationOptions;

/// Setting keys used by the translation pipeline
pub mod keys {
    pub const SERVICE_TYPE: &str = "service_type";
    pub const FIX_OVERLAPPING_SUBTITLES: &str = "fix_overlapping_subtitles";
    pub const STRIP_SUBTITLE_FORMATTING: &str = "strip_subtitle_formatting";
    pub const ADD_TRANSLATOR_INFO: &str = "add_translator_info";
    pub const REMOVE_LANGUAGE_TAG: &str = "remove_language_tag";
    pub const USE_SUBTITLE_TAGGING: &str = "use_subtitle_tagging";
    pub const SUBTITLE_TAG: &str = "subtitle_tag";
    pub const AI_PROMPT: &str = "ai_prompt";
    pub const AI_CONTEXT_PROMPT: &str = "ai_context_prompt";
    pub const AI_CONTEXT_PROMPT_ENABLED: &str = "ai_context_prompt_enabled";
    pub const AI_CONTEXT_BEFORE: &str = "ai_context_before";
    pub const AI_CONTEXT_AFTER: &str = "ai_context_after";
    pub const USE_BATCH_TRANSLATION: &str = "use_batch_translation";
    pub const MAX_BATCH_SIZE: &str = "max_batch_size";
    pub const VALIDATE_SUBTITLES: &str = "validate_subtitles";
    pub const VALIDATION_FAILURE_MODE: &str = "validation_failure_mode";
    pub const MAX_FILE_SIZE_BYTES: &str = "max_file_size_bytes";
    pub const MAX_SUBTITLE_LENGTH: &str = "max_subtitle_length";
    pub const MIN_SUBTITLE_LENGTH: &str = "min_subtitle_length";
    pub const MIN_DURATION_MS: &str = "min_duration_ms";
    pub const MAX_DURATION_SECS: &str = "max_duration_secs";

    /// Service names the factory knows about
    pub const SERVICE_NAMES: &[&str] = &["openai", "lmstudio", "ollama", "mock"];

    /// Per-service setting key: model name
    pub fn model_key(service: &str) -> String {
        format!("{}_model", service)
    }

    /// Per-service setting key: API key
    pub fn api_key_key(service: &str) -> String {
        format!("{}_api_key", service)
    }

    /// Per-service setting key: endpoint URL
    pub fn endpoint_key(service: &str) -> String {
        format!("{}_endpoint", service)
    }

    /// Per-service setting key: custom parameter JSON
    pub fn custom_parameters_key(service: &str) -> String {
        format!("{}_custom_parameters", service)
    }

    /// The full, enumerated key set fetched once per job execution.
    ///
    /// Per-service keys for every known service are included so a single
    /// fetch covers whichever backend the `service_type` setting selects.
    pub fn job_execution_keys() -> Vec<String> {
        let mut keys: Vec<String> = [
            SERVICE_TYPE,
            FIX_OVERLAPPING_SUBTITLES,
            STRIP_SUBTITLE_FORMATTING,
            ADD_TRANSLATOR_INFO,
            REMOVE_LANGUAGE_TAG,
            USE_SUBTITLE_TAGGING,
            SUBTITLE_TAG,
            AI_PROMPT,
            AI_CONTEXT_PROMPT,
            AI_CONTEXT_PROMPT_ENABLED,
            AI_CONTEXT_BEFORE,
            AI_CONTEXT_AFTER,
            USE_BATCH_TRANSLATION,
            MAX_BATCH_SIZE,
            VALIDATE_SUBTITLES,
            VALIDATION_FAILURE_MODE,
            MAX_FILE_SIZE_BYTES,
            MAX_SUBTITLE_LENGTH,
            MIN_SUBTITLE_LENGTH,
            MIN_DURATION_MS,
            MAX_DURATION_SECS,
        ]
        .iter()
        .map(|k| k.to_string())
        .collect();

        for service in SERVICE_NAMES {
            keys.push(model_key(service));
            keys.push(api_key_key(service));
            keys.push(endpoint_key(service));
            keys.push(custom_parameters_key(service));
        }

        keys
    }
}

/// Read access to the settings store.
///
/// Implementations return a value for every requested key that has one and
/// omit the rest; callers treat absence as a soft default.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self, keys: &[&str]) -> Result<HashMap<String, String>>;
}

/// What a per-line validation failure does to the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationFailureMode {
    /// The whole request fails (safe default)
    #[default]
    FailRequest,
    /// The line keeps its source text and the job continues
    SkipLine,
}

impl FromStr for ValidationFailureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail" | "fail_request" => Ok(ValidationFailureMode::FailRequest),
            "skip" | "skip_line" => Ok(ValidationFailureMode::SkipLine),
            _ => Err(anyhow::anyhow!("Invalid validation failure mode: {}", s)),
        }
    }
}

/// Strongly-typed job configuration, parsed once at job start
#[derive(Debug, Clone)]
pub struct JobSettings {
    /// Backend service name the factory resolves
    pub service_type: String,
    pub fix_overlapping_subtitles: bool,
    pub strip_subtitle_formatting: bool,
    pub add_translator_info: bool,
    pub remove_language_tag: bool,
    pub use_subtitle_tagging: bool,
    pub subtitle_tag: String,
    pub context_prompt_enabled: bool,
    /// Context window size before the current line; missing key means 0
    pub context_before: usize,
    /// Context window size after the current line; missing key means 0
    pub context_after: usize,
    pub use_batch_translation: bool,
    pub max_batch_size: usize,
    pub validation: SubtitleValidationOptions,
    pub validation_failure_mode: ValidationFailureMode,
}

impl JobSettings {
    /// Parse the raw settings map. Absent or malformed values become soft
    /// defaults; nothing in here can fail.
    pub fn from_map(settings: &HashMap<String, String>) -> Self {
        let defaults = SubtitleValidationOptions::default();

        Self {
            service_type: settings
                .get(keys::SERVICE_TYPE)
                .cloned()
                .unwrap_or_default(),
            fix_overlapping_subtitles: bool_setting(settings, keys::FIX_OVERLAPPING_SUBTITLES, false),
            strip_subtitle_formatting: bool_setting(settings, keys::STRIP_SUBTITLE_FORMATTING, false),
            add_translator_info: bool_setting(settings, keys::ADD_TRANSLATOR_INFO, false),
            remove_language_tag: bool_setting(settings, keys::REMOVE_LANGUAGE_TAG, false),
            use_subtitle_tagging: bool_setting(settings, keys::USE_SUBTITLE_TAGGING, false),
            subtitle_tag: settings.get(keys::SUBTITLE_TAG).cloned().unwrap_or_default(),
            context_prompt_enabled: bool_setting(settings, keys::AI_CONTEXT_PROMPT_ENABLED, false),
            context_before: numeric_setting(settings, keys::AI_CONTEXT_BEFORE, 0),
            context_after: numeric_setting(settings, keys::AI_CONTEXT_AFTER, 0),
            use_batch_translation: bool_setting(settings, keys::USE_BATCH_TRANSLATION, false),
            max_batch_size: numeric_setting(settings, keys::MAX_BATCH_SIZE, 10),
            validation: SubtitleValidationOptions {
                enabled: bool_setting(settings, keys::VALIDATE_SUBTITLES, false),
                max_file_size_bytes: numeric_setting(
                    settings,
                    keys::MAX_FILE_SIZE_BYTES,
                    defaults.max_file_size_bytes,
                ),
                max_subtitle_length: numeric_setting(
                    settings,
                    keys::MAX_SUBTITLE_LENGTH,
                    defaults.max_subtitle_length,
                ),
                min_subtitle_length: numeric_setting(
                    settings,
                    keys::MIN_SUBTITLE_LENGTH,
                    defaults.min_subtitle_length,
                ),
                min_duration_ms: numeric_setting(
                    settings,
                    keys::MIN_DURATION_MS,
                    defaults.min_duration_ms,
                ),
                max_duration_secs: numeric_setting(
                    settings,
                    keys::MAX_DURATION_SECS,
                    defaults.max_duration_secs,
                ),
            },
            validation_failure_mode: settings
                .get(keys::VALIDATION_FAILURE_MODE)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default(),
        }
    }
}

fn bool_setting(settings: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match settings.get(key) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                warn!("Unrecognized boolean setting {}={}, using {}", key, other, default);
                default
            }
        },
        None => default,
    }
}

fn numeric_setting<T: FromStr + Copy>(
    settings: &HashMap<String, String>,
    key: &str,
    default: T,
) -> T {
    match settings.get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Unparseable numeric setting {}={}, using default", key, raw);
                default
            }
        },
        None => default,
    }
}
