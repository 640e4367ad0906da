/*!
 * Prompt templating for translation requests.
 *
 * Two pieces live here: the literal `{key}` template engine shared by all
 * backends, and the per-service `PromptContext` that folds the surrounding
 * dialogue into the outbound prompt when context prompting is enabled.
 */

use std::collections::{BTreeMap, HashMap};

use log::debug;

/// Default instruction template when no `ai_prompt` setting is configured
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are a professional subtitle translator. \
Translate from {sourceLanguage} to {targetLanguage}. Preserve line breaks and formatting. \
Only respond with the translated text, without any explanations or notes.";

/// Substitute `{key}` occurrences in `template` with values from `replacements`.
///
/// Substitution is literal string replacement, not regex-escaped, and keys
/// without a match are left verbatim. A key whose value itself contains a
/// brace form of a later key can therefore double-substitute; this matches
/// the historical behavior callers depend on and is kept as-is.
pub fn render(template: &str, replacements: &HashMap<String, String>) -> String {
    if template.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for (key, value) in replacements {
        result = result.replace(&format!("{{{}}}", key), value);
    }

    result
}

/// Format context lines with `[n] ` markers so individual subtitle entries
/// stay distinguishable inside the prompt
fn format_context_lines(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| format!("[{}] {}", index + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Context-prompt configuration resolved once per job execution.
///
/// Each backend service instance owns one of these; the replacement map
/// used for rendering is built locally per call so concurrent requests
/// against the same service never observe each other's state.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Whether context prompting is enabled
    pub enabled: bool,

    /// Template with `{contextBefore}` / `{lineToTranslate}` / `{contextAfter}` slots
    pub template: String,

    /// Base replacements shared by every render, e.g. language names
    pub replacements: HashMap<String, String>,
}

impl PromptContext {
    pub fn new(enabled: bool, template: &str) -> Self {
        Self {
            enabled,
            template: template.to_string(),
            replacements: HashMap::new(),
        }
    }

    /// Add a base replacement available to every rendered prompt
    pub fn with_replacement(mut self, key: &str, value: &str) -> Self {
        self.replacements.insert(key.to_string(), value.to_string());
        self
    }

    /// Fold the context window into the outbound text when enabled.
    ///
    /// When the feature flag is off or no template is configured this is the
    /// identity function on `text`. Otherwise the template is rendered with:
    /// `{contextBefore}` / `{contextAfter}` (marker-formatted line lists),
    /// `{lineToTranslate}`, one `{context.<key>}` slot per named property,
    /// a joined `{context}` view and a `{contextJson}` serialization.
    pub fn apply_context_if_enabled(
        &self,
        text: &str,
        context_before: Option<&[String]>,
        context_after: Option<&[String]>,
        context_properties: Option<&BTreeMap<String, String>>,
    ) -> String {
        if !self.enabled || self.template.is_empty() {
            debug!(
                "Context prompt disabled or empty (enabled={}, template_set={})",
                self.enabled,
                !self.template.is_empty()
            );
            return text.to_string();
        }

        let before = context_before.filter(|lines| !lines.is_empty());
        let after = context_after.filter(|lines| !lines.is_empty());

        // Local copy: never mutate the service-level replacement map
        let mut replacements = self.replacements.clone();
        replacements.insert(
            "contextBefore".to_string(),
            before.map(format_context_lines).unwrap_or_default(),
        );
        replacements.insert(
            "contextAfter".to_string(),
            after.map(format_context_lines).unwrap_or_default(),
        );
        replacements.insert("lineToTranslate".to_string(), text.to_string());

        if let Some(properties) = context_properties.filter(|p| !p.is_empty()) {
            for (key, value) in properties {
                replacements.insert(format!("context.{}", key), value.clone());
            }

            let joined = properties
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .collect::<Vec<_>>()
                .join("\n");
            replacements.insert("context".to_string(), joined);

            if let Ok(json) = serde_json::to_string(properties) {
                replacements.insert("contextJson".to_string(), json);
            }
        }

        render(&self.template, &replacements)
    }
}
