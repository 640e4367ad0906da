/*!
 * Common test utilities for the polysub test suite
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use polysub::database::Repository;
use polysub::database::models::{MediaKind, TranslationRequest};
use polysub::file_utils::FileManager;

/// Initialize test logging once; respects RUST_LOG
#[allow(dead_code)]
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample three-entry subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Creates a single-entry subtitle file matching the canonical
/// "Test subtitle" scenario
pub fn create_single_line_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = "1\n00:00:01,000 --> 00:00:04,000\nTest subtitle\n";
    create_test_file(dir, filename, content)
}

/// Creates an in-memory repository with the given settings applied
pub async fn repository_with_settings(settings: &[(&str, &str)]) -> Result<Repository> {
    let repository = Repository::new_in_memory()?;
    for (key, value) in settings {
        repository.set_setting(key, value).await?;
    }
    Ok(repository)
}

/// Creates a pending translation request for a subtitle file and persists it
pub async fn enqueue_request(
    repository: &Repository,
    source_path: &Path,
    source_language: &str,
    target_language: &str,
) -> Result<TranslationRequest> {
    let hash = FileManager::hash_file(source_path)?;
    let request = TranslationRequest::new(
        "Test Movie",
        MediaKind::Movie,
        source_path,
        &hash,
        source_language,
        target_language,
    );
    repository.create_translation_request(&request).await?;
    Ok(request)
}

/// Base settings most job tests start from: mock backend, everything off
pub fn base_job_settings() -> Vec<(&'static str, &'static str)> {
    vec![
        ("service_type", "mock"),
        ("fix_overlapping_subtitles", "false"),
        ("strip_subtitle_formatting", "false"),
        ("add_translator_info", "false"),
        ("remove_language_tag", "false"),
        ("use_subtitle_tagging", "false"),
        ("subtitle_tag", ""),
        ("validate_subtitles", "false"),
        ("use_batch_translation", "false"),
        ("max_batch_size", "10000"),
    ]
}

/// Override (or add) one entry in a settings list
pub fn override_setting(
    settings: &mut Vec<(&'static str, &'static str)>,
    key: &'static str,
    value: &'static str,
) {
    match settings.iter_mut().find(|(k, _)| *k == key) {
        Some(entry) => entry.1 = value,
        None => settings.push((key, value)),
    }
}

/// Helper turning a settings slice into an owned map
pub fn settings_map(settings: &[(&str, &str)]) -> HashMap<String, String> {
    settings
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
