/*!
 * Translation job orchestration.
 *
 * `TranslationJob` drives one persisted `TranslationRequest` through the
 * full pipeline: resolve settings → instantiate the backend → read the
 * source subtitle → translate unit by unit (line or batch) → post-process
 * → validate → write the output file → record statistics. Every failure
 * path funnels into exactly one terminal `failed` status write with a
 * stage-qualified message; no fault escapes `execute`.
 *
 * The pipeline is sequential within one request (context windows and
 * progress reporting depend on document order). Distinct requests may run
 * concurrently on independent workers; nothing in here assumes exclusive
 * access to process-wide state, and settings are re-fetched per execution.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::database::Repository;
use crate::database::models::{RequestStatus, TranslationRequest};
use crate::errors::{JobError, ProviderError};
use crate::file_utils::FileManager;
use crate::progress::{ProgressReporter, StatisticsRecorder};
use crate::providers::{ServiceFactory, TranslationService};
use crate::settings::{JobSettings, SettingsStore, ValidationFailureMode, keys};
use crate::subtitle_processor::{self, SubtitleItem};
use crate::translation::context::ContextBundle;
use crate::translation::params::{CustomParams, resolve_custom_parameters};
use crate::translation::post_process;
use crate::translation::validator::validate_subtitle;

/// Drives translation requests to completion or documented failure
pub struct TranslationJob {
    settings: Arc<dyn SettingsStore>,
    repository: Repository,
    factory: Arc<dyn ServiceFactory>,
    progress: Arc<dyn ProgressReporter>,
    statistics: Arc<dyn StatisticsRecorder>,
}

/// What a successful pipeline run produced
struct PipelineOutcome {
    output_path: PathBuf,
    lines_translated: usize,
    lines_skipped: usize,
    service_name: String,
    model_name: String,
}

impl TranslationJob {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        repository: Repository,
        factory: Arc<dyn ServiceFactory>,
        progress: Arc<dyn ProgressReporter>,
        statistics: Arc<dyn StatisticsRecorder>,
    ) -> Self {
        Self {
            settings,
            repository,
            factory,
            progress,
            statistics,
        }
    }

    /// Execute one translation request to a terminal state.
    ///
    /// Returns the updated request, which is always `completed` or `failed`
    /// on return — including on cancellation, which resolves to `failed`
    /// with a cancellation message. The only way this returns `Err` is
    /// when the terminal status itself cannot be persisted.
    ///
    /// Re-running a request that already completed is safe: the output
    /// path is a pure function of source path and target language, so the
    /// file is deterministically overwritten.
    pub async fn execute(
        &self,
        request: TranslationRequest,
        token: CancellationToken,
    ) -> Result<TranslationRequest> {
        if request.status.is_terminal() {
            info!(
                "Re-running request {} from terminal state {}",
                request.short_id(),
                request.status
            );
        }

        let request = self
            .repository
            .update_translation_request(&request, RequestStatus::InProgress, None)
            .await?;

        info!(
            "Translating \"{}\" ({} -> {}) [{}]",
            request.title,
            request.source_language,
            request.target_language,
            request.short_id()
        );

        match self.run_pipeline(&request, &token).await {
            Ok(outcome) => {
                let mut completed = request.clone();
                completed.translated_path =
                    Some(outcome.output_path.to_string_lossy().to_string());

                let updated = self
                    .repository
                    .update_translation_request(&completed, RequestStatus::Completed, None)
                    .await?;

                self.statistics
                    .record_translation(
                        &updated.id,
                        outcome.lines_translated,
                        &outcome.service_name,
                        &outcome.model_name,
                    )
                    .await;

                if outcome.lines_skipped > 0 {
                    warn!(
                        "Request {} completed with {} line(s) kept in the source language",
                        updated.short_id(),
                        outcome.lines_skipped
                    );
                }
                info!(
                    "Request {} completed: {} lines written to {}",
                    updated.short_id(),
                    outcome.lines_translated,
                    outcome.output_path.display()
                );

                Ok(updated)
            }
            Err(job_error) => {
                let message = job_error.to_string();
                error!("Request {} failed: {}", request.short_id(), message);

                let updated = self
                    .repository
                    .update_translation_request(&request, RequestStatus::Failed, Some(&message))
                    .await?;

                Ok(updated)
            }
        }
    }

    /// The fallible middle of the pipeline; every error is mapped to a
    /// stage-qualified [`JobError`] for the terminal status message.
    async fn run_pipeline(
        &self,
        request: &TranslationRequest,
        token: &CancellationToken,
    ) -> Result<PipelineOutcome, JobError> {
        ensure_live(token)?;

        // Step 1: resolve the settings snapshot for the enumerated key set
        // and parse it once into a typed configuration
        let key_strings = keys::job_execution_keys();
        let key_refs: Vec<&str> = key_strings.iter().map(String::as_str).collect();
        let settings_map = self
            .settings
            .get_settings(&key_refs)
            .await
            .map_err(|e| JobError::Configuration(format!("failed to resolve settings: {}", e)))?;
        let job = JobSettings::from_map(&settings_map);

        // Step 2: instantiate the backend named by the service-type setting
        ensure_live(token)?;
        let service = self
            .factory
            .create_translation_service(&job.service_type, &settings_map)?;

        // Custom parameters configured for the selected backend; malformed
        // JSON degrades to "no parameters" inside the resolver
        let custom_parameters = resolve_custom_parameters(
            settings_map
                .get(&keys::custom_parameters_key(&job.service_type))
                .map(String::as_str),
        );
        let custom_parameters =
            (!custom_parameters.is_empty()).then_some(custom_parameters);

        // Step 3: read the source subtitle
        let source_path = Path::new(&request.source_path);
        let items = subtitle_processor::read_subtitles(source_path)
            .map_err(|e| JobError::Io(format!("failed to read source subtitle: {:#}", e)))?;

        // Steps 4-7, 10: translate each unit with its context window,
        // reporting progress as units complete
        let translated_lines = if job.use_batch_translation && job.max_batch_size > 1 {
            self.translate_in_batches(
                &items,
                request,
                &job,
                service.as_ref(),
                custom_parameters.as_ref(),
                token,
            )
            .await?
        } else {
            self.translate_line_by_line(
                &items,
                request,
                &job,
                service.as_ref(),
                custom_parameters.as_ref(),
                token,
            )
            .await?
        };

        // Reassemble the document: translated text over original timing
        let mut translated_items: Vec<SubtitleItem> = items.clone();
        for (item, line) in translated_items.iter_mut().zip(&translated_lines) {
            item.set_text(line);
        }

        // Step 8: post-processing in fixed, deterministic order
        if job.fix_overlapping_subtitles {
            post_process::fix_overlapping_items(&mut translated_items);
        }
        if job.strip_subtitle_formatting {
            post_process::strip_formatting(&mut translated_items);
        }
        if job.add_translator_info {
            post_process::add_translator_info(
                &mut translated_items,
                &job.service_type,
                service.model_name(),
            );
        }
        if job.remove_language_tag {
            post_process::remove_language_tags(&mut translated_items);
        }
        if job.use_subtitle_tagging {
            post_process::apply_subtitle_tag(&mut translated_items, &job.subtitle_tag);
        }

        // Step 9: validate each translated line. The injected translator
        // info cue, when present, shifts translated items by one and is
        // itself exempt from validation.
        let mut lines_skipped = 0;
        if job.validation.enabled {
            let offset = usize::from(job.add_translator_info);
            for (index, original) in items.iter().enumerate() {
                let item = &mut translated_items[index + offset];
                let text = item.text();
                if validate_subtitle(&text, Some(item.duration_ms()), &job.validation) {
                    continue;
                }

                match job.validation_failure_mode {
                    ValidationFailureMode::FailRequest => {
                        return Err(JobError::Validation(format!(
                            "translated line {} failed validation",
                            original.position
                        )));
                    }
                    ValidationFailureMode::SkipLine => {
                        warn!(
                            "Line {} failed validation, keeping source text",
                            original.position
                        );
                        item.lines = original.lines.clone();
                        lines_skipped += 1;
                    }
                }
            }
        }

        // Step 11: write the output as a sibling of the source
        ensure_live(token)?;
        let output_path =
            FileManager::translated_sibling_path(source_path, &request.target_language);
        subtitle_processor::write_subtitles(&output_path, &translated_items).map_err(|e| {
            JobError::Io(format!(
                "failed to write {}: {:#}",
                output_path.display(),
                e
            ))
        })?;

        Ok(PipelineOutcome {
            output_path,
            lines_translated: items.len() - lines_skipped,
            lines_skipped,
            service_name: job.service_type.clone(),
            model_name: service.model_name().to_string(),
        })
    }

    /// Translate one line at a time, each with its own context window
    #[allow(clippy::too_many_arguments)]
    async fn translate_line_by_line(
        &self,
        items: &[SubtitleItem],
        request: &TranslationRequest,
        job: &JobSettings,
        service: &dyn TranslationService,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<Vec<String>, JobError> {
        // Window sizes only matter when context prompting is on; missing
        // settings have already defaulted to zero
        let before_count = if job.context_prompt_enabled { job.context_before } else { 0 };
        let after_count = if job.context_prompt_enabled { job.context_after } else { 0 };

        let mut translated = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            ensure_live(token)?;

            // Fresh bundle per line; the window truncates at the document
            // boundaries
            let bundle = ContextBundle::for_item(items, index, before_count, after_count)
                .with_property("title", &request.title)
                .with_property("mediaKind", &request.media_kind.to_string());

            let line = service
                .translate(
                    &item.text(),
                    &request.source_language,
                    &request.target_language,
                    Some(&bundle.before),
                    Some(&bundle.after),
                    custom_parameters,
                    token,
                )
                .await
                .map_err(map_provider_error)?;

            translated.push(line);
            self.progress.report(&request.id, index + 1, items.len());
        }

        Ok(translated)
    }

    /// Translate in chunks of at most `max_batch_size` lines per call
    #[allow(clippy::too_many_arguments)]
    async fn translate_in_batches(
        &self,
        items: &[SubtitleItem],
        request: &TranslationRequest,
        job: &JobSettings,
        service: &dyn TranslationService,
        custom_parameters: Option<&CustomParams>,
        token: &CancellationToken,
    ) -> Result<Vec<String>, JobError> {
        let total = items.len();
        let mut translated = Vec::with_capacity(total);

        for chunk in items.chunks(job.max_batch_size) {
            ensure_live(token)?;

            let batch: Vec<String> = chunk.iter().map(|item| item.text()).collect();
            let lines = service
                .translate_batch(
                    &batch,
                    &request.source_language,
                    &request.target_language,
                    custom_parameters,
                    token,
                )
                .await
                .map_err(map_provider_error)?;

            if lines.len() != batch.len() {
                return Err(JobError::Backend(ProviderError::BatchMismatch {
                    expected: batch.len(),
                    actual: lines.len(),
                }));
            }

            translated.extend(lines);
            self.progress.report(&request.id, translated.len(), total);
        }

        Ok(translated)
    }
}

/// Cooperative cancellation check between pipeline units
fn ensure_live(token: &CancellationToken) -> Result<(), JobError> {
    if token.is_cancelled() {
        Err(JobError::Cancelled)
    } else {
        Ok(())
    }
}

fn map_provider_error(error: ProviderError) -> JobError {
    match error {
        ProviderError::Cancelled => JobError::Cancelled,
        other => JobError::Backend(other),
    }
}
