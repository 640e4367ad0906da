/*!
 * Tests for the SQLite repository layer
 */

use anyhow::Result;
use std::path::Path;
use tokio_test::assert_err;

use polysub::database::Repository;
use polysub::database::models::{MediaKind, RequestStatus, TranslationRequest};
use polysub::settings::SettingsStore;

fn sample_request() -> TranslationRequest {
    TranslationRequest::new(
        "Test Movie",
        MediaKind::Movie,
        Path::new("/tmp/test.srt"),
        "deadbeef",
        "en",
        "es",
    )
}

#[tokio::test]
async fn test_createAndGet_translationRequest_shouldRoundTrip() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    let request = sample_request();

    repository.create_translation_request(&request).await?;
    let loaded = repository
        .get_translation_request(&request.id)
        .await?
        .expect("request not found");

    assert_eq!(loaded.id, request.id);
    assert_eq!(loaded.title, "Test Movie");
    assert_eq!(loaded.status, RequestStatus::Pending);
    assert_eq!(loaded.source_language, "en");
    assert_eq!(loaded.target_language, "es");
    Ok(())
}

#[tokio::test]
async fn test_updateTranslationRequest_shouldPersistTerminalState() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    let request = sample_request();
    repository.create_translation_request(&request).await?;

    let failed = repository
        .update_translation_request(&request, RequestStatus::Failed, Some("backend error: boom"))
        .await?;

    assert_eq!(failed.status, RequestStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("backend error: boom"));
    assert!(failed.completed_at.is_some());

    let reloaded = repository
        .get_translation_request(&request.id)
        .await?
        .unwrap();
    assert_eq!(reloaded.status, RequestStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_updateTranslationRequest_unknownId_shouldFail() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    let request = sample_request();

    let result = repository
        .update_translation_request(&request, RequestStatus::InProgress, None)
        .await;

    assert_err!(result);
    Ok(())
}

#[tokio::test]
async fn test_listRequestsByStatus_shouldFilterAndOrder() -> Result<()> {
    let repository = Repository::new_in_memory()?;

    let first = sample_request();
    repository.create_translation_request(&first).await?;
    let second = sample_request();
    repository.create_translation_request(&second).await?;

    repository
        .update_translation_request(&first, RequestStatus::Completed, None)
        .await?;

    let pending = repository.list_requests_by_status(RequestStatus::Pending).await?;
    let completed = repository
        .list_requests_by_status(RequestStatus::Completed)
        .await?;

    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first.id);
    Ok(())
}

#[tokio::test]
async fn test_getSettings_shouldOmitUnsetKeys() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    repository.set_setting("service_type", "openai").await?;
    repository.set_setting("openai_model", "gpt-4o-mini").await?;

    let settings = repository
        .get_settings(&["service_type", "openai_model", "ai_context_before"])
        .await?;

    assert_eq!(settings.get("service_type").unwrap(), "openai");
    assert_eq!(settings.get("openai_model").unwrap(), "gpt-4o-mini");
    assert!(!settings.contains_key("ai_context_before"));
    Ok(())
}

#[tokio::test]
async fn test_setSetting_shouldReplaceExistingValue() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    repository.set_setting("service_type", "openai").await?;
    repository.set_setting("service_type", "ollama").await?;

    let settings = repository.get_settings(&["service_type"]).await?;

    assert_eq!(settings.get("service_type").unwrap(), "ollama");
    Ok(())
}

#[tokio::test]
async fn test_recordTranslation_shouldAccumulateTotals() -> Result<()> {
    let repository = Repository::new_in_memory()?;
    let request = sample_request();
    repository.create_translation_request(&request).await?;

    repository
        .record_translation(&request.id, 10, "mock", "mock-model")
        .await?;
    repository
        .record_translation(&request.id, 5, "mock", "mock-model")
        .await?;

    let rows = repository.list_statistics(&request.id).await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(repository.total_lines_translated().await?, 15);
    Ok(())
}
