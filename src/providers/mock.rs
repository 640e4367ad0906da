/*!
 * Mock backend implementations for testing.
 *
 * This module provides a mock translation service that simulates different
 * backend behaviors:
 * - `MockService::working()` - Always succeeds with a deterministic echo
 * - `MockService::scripted(...)` - Returns prepared lines in order
 * - `MockService::failing()` - Always fails after "exhausting" its retries
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::errors::{JobError, ProviderError};
use crate::translation::params::CustomParams;
use crate::translation::prompts::PromptContext;

use super::{ServiceFactory, TranslationService};

/// Behavior mode for the mock service
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always succeeds, echoing the input with a target-language marker
    Working,
    /// Returns the prepared lines in order, then fails when exhausted
    Scripted(Vec<String>),
    /// Always fails with a request error
    Failing,
}

/// Mock translation service for exercising the pipeline without a network
pub struct MockService {
    /// Behavior mode
    behavior: MockBehavior,
    /// Remaining scripted lines
    script: Mutex<Vec<String>>,
    /// Number of translate calls observed
    call_count: Arc<AtomicUsize>,
    /// Context-prompt configuration, exercised like a real backend's
    prompt_context: PromptContext,
    /// Reported model name
    model: String,
}

impl MockService {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Self {
        let script = match &behavior {
            MockBehavior::Scripted(lines) => lines.clone(),
            _ => Vec::new(),
        };

        Self {
            behavior,
            script: Mutex::new(script),
            call_count: Arc::new(AtomicUsize::new(0)),
            prompt_context: PromptContext::default(),
            model: "mock-model".to_string(),
        }
    }

    /// Mock that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Mock that returns the given lines in order
    pub fn scripted<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockBehavior::Scripted(
            lines.into_iter().map(Into::into).collect(),
        ))
    }

    /// Mock that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Use a specific prompt context, e.g. to observe context application
    pub fn with_prompt_context(mut self, prompt_context: PromptContext) -> Self {
        self.prompt_context = prompt_context;
        self
    }

    /// Handle to the call counter, usable after the service is boxed
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.call_count.clone()
    }

    fn next_line(&self, fallback: &str, target_language: &str) -> Result<String, ProviderError> {
        match &self.behavior {
            MockBehavior::Working => Ok(format!("[{}] {}", target_language, fallback)),
            MockBehavior::Scripted(_) => {
                let mut script = self.script.lock();
                if script.is_empty() {
                    Err(ProviderError::RequestFailed("mock script exhausted".to_string()))
                } else {
                    Ok(script.remove(0))
                }
            }
            MockBehavior::Failing => Err(ProviderError::RequestFailed(
                "mock backend failure after retries".to_string(),
            )),
        }
    }
}

#[async_trait]
impl TranslationService for MockService {
    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
        context_before: Option<&[String]>,
        context_after: Option<&[String]>,
        _custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<String, ProviderError> {
        if token.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        self.call_count.fetch_add(1, Ordering::SeqCst);

        // Render the prompt the way a real backend would, even though the
        // mock ignores it, so context plumbing is exercised end-to-end
        let _prompt =
            self.prompt_context
                .apply_context_if_enabled(text, context_before, context_after, None);

        self.next_line(text, target_language)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Factory that hands out mock services, for wiring the orchestrator in
/// tests without touching the built-in registry
pub struct MockServiceFactory {
    behavior: MockBehavior,
}

impl MockServiceFactory {
    pub fn new(behavior: MockBehavior) -> Self {
        Self { behavior }
    }
}

impl ServiceFactory for MockServiceFactory {
    fn create_translation_service(
        &self,
        _service_type: &str,
        settings: &HashMap<String, String>,
    ) -> Result<Box<dyn TranslationService>, JobError> {
        let service = MockService::new(self.behavior.clone())
            .with_prompt_context(super::prompt_context_from_settings(settings));
        Ok(Box::new(service))
    }
}
