/*!
 * # polysub - AI subtitle translation for media libraries
 *
 * A Rust library for translating subtitle files using pluggable AI/MT
 * backends, tracking each translation as a persisted request that
 * survives process restarts.
 *
 * ## Features
 *
 * - Persisted, resumable translation requests with lifecycle status
 * - Context-window prompting with the surrounding dialogue
 * - Line-by-line or batched backend calls
 * - Deterministic post-processing (overlap fix, formatting strip,
 *   translator info, language-tag removal, subtitle tagging)
 * - Size/length/duration validation of translated lines
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `settings`: Settings resolution and typed job configuration
 * - `subtitle_processor`: Subtitle file handling and processing
 * - `translation`: The translation job pipeline:
 *   - `translation::job`: The orchestrator state machine
 *   - `translation::context`: Context window construction
 *   - `translation::prompts`: Prompt templating
 *   - `translation::params`: Custom parameter resolution
 *   - `translation::post_process`: Post-processing passes
 *   - `translation::validator`: Subtitle validation policy
 * - `providers`: Backend adapters for LLM/MT providers:
 *   - `providers::openai`: OpenAI-compatible API client (also LM Studio)
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Scripted test double
 * - `database`: SQLite persistence for requests, settings and statistics
 * - `progress`: Progress reporting and statistics recording
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod progress;
pub mod providers;
pub mod settings;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use database::Repository;
pub use database::models::{MediaKind, RequestStatus, TranslationRequest};
pub use errors::{AppError, JobError, ProviderError};
pub use providers::{DefaultServiceFactory, ServiceFactory, TranslationService};
pub use settings::{JobSettings, SettingsStore};
pub use subtitle_processor::SubtitleItem;
pub use translation::TranslationJob;
