/*!
 * End-to-end tests for the translation job pipeline
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use polysub::database::Repository;
use polysub::database::models::RequestStatus;
use polysub::file_utils::FileManager;
use polysub::progress::{NullStatisticsRecorder, RecordingProgressReporter, SqliteStatisticsRecorder};
use polysub::providers::mock::{MockBehavior, MockServiceFactory};
use polysub::providers::{DefaultServiceFactory, ServiceFactory};
use polysub::subtitle_processor::read_subtitles;
use polysub::translation::TranslationJob;

use crate::common;

/// Wire an orchestrator around an in-memory repository and a mock factory
fn build_job(repository: &Repository, factory: Arc<dyn ServiceFactory>) -> TranslationJob {
    TranslationJob::new(
        Arc::new(repository.clone()),
        repository.clone(),
        factory,
        Arc::new(RecordingProgressReporter::new()),
        Arc::new(NullStatisticsRecorder),
    )
}

fn scripted_factory(lines: &[&str]) -> Arc<dyn ServiceFactory> {
    Arc::new(MockServiceFactory::new(MockBehavior::Scripted(
        lines.iter().map(|s| s.to_string()).collect(),
    )))
}

#[tokio::test]
async fn test_execute_singleLine_shouldCompleteAndWriteOutput() -> Result<()> {
    // Scenario: context disabled, single line "Test subtitle", en -> es
    common::init_test_logging();
    let dir = common::create_temp_dir()?;
    let source = common::create_single_line_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, scripted_factory(&["Subtítulo de prueba"]));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    assert!(result.error_message.is_none());

    let output_path = dir.path().join("test.es.srt");
    assert_eq!(
        result.translated_path.as_deref(),
        Some(output_path.to_str().unwrap())
    );

    let items = read_subtitles(&output_path)?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text(), "Subtítulo de prueba");
    Ok(())
}

#[tokio::test]
async fn test_execute_withMissingContextKeys_shouldNotFault() -> Result<()> {
    // Scenario: context prompting enabled but the window-size keys are
    // absent from the settings store; effective window sizes are zero
    let mut settings = common::base_job_settings();
    settings.push(("ai_context_prompt_enabled", "true"));
    settings.push(("ai_context_prompt", "Before:\n{contextBefore}\nLine: {lineToTranslate}"));
    // ai_context_before / ai_context_after intentionally omitted

    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_execute_backendFailure_shouldFailWithoutOutput() -> Result<()> {
    // Scenario: the backend keeps failing after its own retries
    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;
    let request_id = request.id.clone();

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Failing)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Failed);
    let message = result.error_message.expect("failure message missing");
    assert!(!message.is_empty());
    assert!(message.starts_with("backend error:"));

    assert!(!dir.path().join("test.es.srt").exists());

    // The terminal state is persisted, not just returned
    let stored = repository.get_translation_request(&request_id).await?.unwrap();
    assert_eq!(stored.status, RequestStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn test_execute_unknownServiceName_shouldFailConfiguration() -> Result<()> {
    let mut settings = common::base_job_settings();
    common::override_setting(&mut settings, "service_type", "acme-translate");

    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    // The real registry performs the lookup
    let job = build_job(&repository, Arc::new(DefaultServiceFactory));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Failed);
    let message = result.error_message.unwrap();
    assert!(message.contains("configuration error"));
    assert!(message.contains("acme-translate"));
    Ok(())
}

#[tokio::test]
async fn test_execute_unreadableSource_shouldFailWithIoMessage() -> Result<()> {
    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(
        &repository,
        Path::new("/nonexistent/missing.srt"),
        "en",
        "es",
    )
    .await;

    // Hashing the missing file already fails at enqueue time in the
    // helper, so enqueue manually without a hash
    assert!(request.is_err());

    let request = polysub::TranslationRequest::new(
        "Missing",
        polysub::MediaKind::Movie,
        Path::new("/nonexistent/missing.srt"),
        "",
        "en",
        "es",
    );
    repository.create_translation_request(&request).await?;

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Failed);
    assert!(result.error_message.unwrap().starts_with("I/O error:"));
    Ok(())
}

#[tokio::test]
async fn test_execute_cancelledBeforeStart_shouldFailWithCancellationMessage() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let token = CancellationToken::new();
    token.cancel();

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, token).await?;

    assert_eq!(result.status, RequestStatus::Failed);
    assert_eq!(result.error_message.as_deref(), Some("translation cancelled"));
    assert!(!dir.path().join("test.es.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_execute_rerunOfCompletedRequest_shouldOverwriteDeterministically() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_single_line_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, scripted_factory(&["Primera"]));
    let first = job.execute(request, CancellationToken::new()).await?;
    assert_eq!(first.status, RequestStatus::Completed);
    let first_content = std::fs::read_to_string(dir.path().join("test.es.srt"))?;

    // Re-run the now-completed request with the same scripted output
    let job = build_job(&repository, scripted_factory(&["Primera"]));
    let second = job.execute(first, CancellationToken::new()).await?;

    assert_eq!(second.status, RequestStatus::Completed);
    let second_content = std::fs::read_to_string(dir.path().join("test.es.srt"))?;
    assert_eq!(first_content, second_content);
    Ok(())
}

#[tokio::test]
async fn test_execute_batchMode_shouldMatchLineByLineOutput() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let mut settings = common::base_job_settings();
    common::override_setting(&mut settings, "use_batch_translation", "true");
    common::override_setting(&mut settings, "max_batch_size", "2");

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, scripted_factory(&["uno", "dos", "tres"]));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    let items = read_subtitles(dir.path().join("test.es.srt"))?;
    let lines: Vec<String> = items.iter().map(|item| item.text()).collect();
    assert_eq!(lines, vec!["uno", "dos", "tres"]);
    Ok(())
}

#[tokio::test]
async fn test_execute_validationFailMode_shouldFailRequest() -> Result<()> {
    let mut settings = common::base_job_settings();
    common::override_setting(&mut settings, "validate_subtitles", "true");
    // Force every translated line to be too short to pass
    common::override_setting(&mut settings, "min_subtitle_length", "200");
    common::override_setting(&mut settings, "validation_failure_mode", "fail");

    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Failed);
    assert!(result.error_message.unwrap().starts_with("validation failed:"));
    assert!(!dir.path().join("test.es.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_execute_validationSkipMode_shouldKeepSourceText() -> Result<()> {
    let mut settings = common::base_job_settings();
    common::override_setting(&mut settings, "validate_subtitles", "true");
    common::override_setting(&mut settings, "min_subtitle_length", "200");
    common::override_setting(&mut settings, "validation_failure_mode", "skip");

    let dir = common::create_temp_dir()?;
    let source = common::create_single_line_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    let items = read_subtitles(dir.path().join("test.es.srt"))?;
    // The translation failed validation, so the source text survives
    assert_eq!(items[0].text(), "Test subtitle");
    Ok(())
}

#[tokio::test]
async fn test_execute_postProcessing_shouldApplyInFixedOrder() -> Result<()> {
    let mut settings = common::base_job_settings();
    common::override_setting(&mut settings, "strip_subtitle_formatting", "true");
    common::override_setting(&mut settings, "add_translator_info", "true");
    common::override_setting(&mut settings, "use_subtitle_tagging", "true");
    common::override_setting(&mut settings, "subtitle_tag", "[MT]");

    let dir = common::create_temp_dir()?;
    let source = common::create_single_line_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&settings).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;

    let job = build_job(&repository, scripted_factory(&["<i>Subtítulo</i>"]));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    let items = read_subtitles(dir.path().join("test.es.srt"))?;

    // translator info cue first, then the stripped and tagged line
    assert_eq!(items.len(), 2);
    assert!(items[0].text().contains("Translated with polysub"));
    assert_eq!(items[1].text(), "[MT] Subtítulo");
    Ok(())
}

#[tokio::test]
async fn test_execute_progressAndStatistics_shouldBeRecorded() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_test_subtitle(dir.path(), "test.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "es").await?;
    let request_id = request.id.clone();

    let progress = Arc::new(RecordingProgressReporter::new());
    let statistics = Arc::new(SqliteStatisticsRecorder::new(repository.clone()));
    let job = TranslationJob::new(
        Arc::new(repository.clone()),
        repository.clone(),
        Arc::new(MockServiceFactory::new(MockBehavior::Working)),
        progress.clone(),
        statistics,
    );

    let result = job.execute(request, CancellationToken::new()).await?;
    assert_eq!(result.status, RequestStatus::Completed);

    // One progress update per line, in order
    assert_eq!(progress.updates(), vec![(1, 3), (2, 3), (3, 3)]);

    // Exactly one statistics row for the request
    let rows = repository.list_statistics(&request_id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].line_count, 3);
    assert_eq!(rows[0].service_name, "mock");
    assert_eq!(rows[0].model_name, "mock-model");
    Ok(())
}

#[tokio::test]
async fn test_execute_outputPath_isSiblingWithLanguageCode() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let source = common::create_single_line_subtitle(dir.path(), "Episode.S01E01.srt")?;

    let repository = common::repository_with_settings(&common::base_job_settings()).await?;
    let request = common::enqueue_request(&repository, &source, "en", "fr").await?;

    let job = build_job(&repository, Arc::new(MockServiceFactory::new(MockBehavior::Working)));
    let result = job.execute(request, CancellationToken::new()).await?;

    assert_eq!(result.status, RequestStatus::Completed);
    let expected = FileManager::translated_sibling_path(&source, "fr");
    assert!(expected.ends_with("Episode.S01E01.fr.srt"));
    assert!(expected.exists());
    Ok(())
}
