/*!
 * Tests for backend adapters and the service factory
 */

use tokio_util::sync::CancellationToken;

use polysub::errors::JobError;
use polysub::providers::{DefaultServiceFactory, ServiceFactory, default_languages};
use polysub::providers::mock::MockService;

use crate::common;

#[test]
fn test_factory_withUnknownService_shouldReturnConfigurationError() {
    let factory = DefaultServiceFactory;

    let result = factory.create_translation_service("doesnotexist", &common::settings_map(&[]));

    match result {
        Err(JobError::Configuration(message)) => {
            assert!(message.contains("doesnotexist"));
        }
        _ => panic!("expected a configuration error"),
    }
}

#[test]
fn test_factory_openaiWithoutApiKey_shouldReturnConfigurationError() {
    let factory = DefaultServiceFactory;

    let result = factory.create_translation_service("openai", &common::settings_map(&[]));

    assert!(matches!(result, Err(JobError::Configuration(_))));
}

#[test]
fn test_factory_shouldBuildConfiguredServices() {
    let factory = DefaultServiceFactory;
    let settings = common::settings_map(&[
        ("openai_api_key", "sk-test"),
        ("openai_model", "gpt-4o-mini"),
        ("ollama_model", "mistral"),
    ]);

    let openai = factory
        .create_translation_service("openai", &settings)
        .expect("openai service");
    assert_eq!(openai.model_name(), "gpt-4o-mini");

    let lmstudio = factory
        .create_translation_service("lmstudio", &settings)
        .expect("lmstudio service");
    assert_eq!(lmstudio.model_name(), "local-model");

    let ollama = factory
        .create_translation_service("ollama", &settings)
        .expect("ollama service");
    assert_eq!(ollama.model_name(), "mistral");
}

#[tokio::test]
async fn test_defaultLanguages_everyCodeTargetsAllOthers() {
    let languages = default_languages();

    for language in &languages {
        assert!(!language.targets.contains(&language.code));
        assert_eq!(language.targets.len(), languages.len() - 1);
    }
}

#[tokio::test]
async fn test_serviceTrait_defaultModels_shouldBeEmpty() {
    let service = MockService::working();

    let models = polysub::TranslationService::models(&service).await.unwrap();

    assert!(models.is_empty());
}

#[tokio::test]
async fn test_mockService_languages_shouldUseSharedListing() {
    let service = MockService::working();

    let languages = polysub::TranslationService::languages(&service).await.unwrap();

    assert!(languages.iter().any(|l| l.code == "en" && l.name == "English"));
}

#[tokio::test]
async fn test_translateBatch_default_shouldPreserveLineCount() {
    let service = MockService::scripted(["uno", "dos", "tres"]);
    let token = CancellationToken::new();
    let lines: Vec<String> = ["one", "two", "three"].iter().map(|s| s.to_string()).collect();

    let out = polysub::TranslationService::translate_batch(&service, &lines, "en", "es", None, &token)
        .await
        .unwrap();

    assert_eq!(out, vec!["uno", "dos", "tres"]);
}
