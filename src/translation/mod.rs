/*!
 * The translation job pipeline.
 *
 * This module contains the core of the application: the orchestration that
 * turns a persisted translation request into a translated subtitle file.
 * It is split into several submodules:
 *
 * - `job`: The orchestrator state machine driving one request end to end
 * - `context`: Context window construction around the line being translated
 * - `prompts`: Literal `{key}` template engine and context prompt building
 * - `params`: Backend-specific custom parameter resolution
 * - `post_process`: Deterministic post-processing of translated subtitles
 * - `validator`: Size/length/duration policy over translated lines
 */

// Re-export main types for easier usage
pub use self::context::{ContextBundle, context_window};
pub use self::job::TranslationJob;
pub use self::prompts::PromptContext;
pub use self::validator::SubtitleValidationOptions;

// Submodules
pub mod context;
pub mod job;
pub mod params;
pub mod post_process;
pub mod prompts;
pub mod validator;
