/*!
 * Database entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use uuid::Uuid;

/// Lifecycle status of a translation request.
///
/// Transitions are monotonic within one execution:
/// `Pending → InProgress → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Request enqueued, awaiting a worker
    Pending,
    /// A worker is driving the request right now
    InProgress,
    /// Translated file written, terminal
    Completed,
    /// Unrecoverable error occurred, terminal
    Failed,
}

impl RequestStatus {
    /// Whether the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::InProgress => write!(f, "in_progress"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "in_progress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid request status: {}", s)),
        }
    }
}

/// Kind of media a subtitle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Episode,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Episode => write!(f, "episode"),
        }
    }
}

impl std::str::FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "episode" => Ok(MediaKind::Episode),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

/// A persisted translation request.
///
/// Created in `Pending` by whoever enqueues work; mutated exclusively by
/// the job orchestrator; never deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Unique request identifier (UUID)
    pub id: String,
    /// Display title of the media
    pub title: String,
    /// Movie or episode
    pub media_kind: MediaKind,
    /// Path to the subtitle file to translate
    pub source_path: String,
    /// SHA-256 hash of the source file at enqueue time
    pub source_hash: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Current lifecycle status
    pub status: RequestStatus,
    /// Human-readable failure message, if failed
    pub error_message: Option<String>,
    /// Path of the written translation, once completed
    pub translated_path: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
    /// Completion timestamp (RFC 3339), if terminal
    pub completed_at: Option<String>,
}

impl TranslationRequest {
    /// Create a new pending request
    pub fn new(
        title: &str,
        media_kind: MediaKind,
        source_path: &Path,
        source_hash: &str,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            media_kind,
            source_path: source_path.to_string_lossy().to_string(),
            source_hash: source_hash.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            status: RequestStatus::Pending,
            error_message: None,
            translated_path: None,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        }
    }

    /// Short identifier for log lines
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// One recorded translation, written on successful completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationStatistic {
    /// Database ID
    pub id: i64,
    /// Request this record belongs to
    pub request_id: String,
    /// Number of lines translated
    pub line_count: i64,
    /// Backend service used
    pub service_name: String,
    /// Model used, if the backend reports one
    pub model_name: String,
    /// Record timestamp (RFC 3339)
    pub created_at: String,
}
