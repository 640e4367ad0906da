/*!
 * Progress reporting and statistics recording collaborators.
 *
 * The job orchestrator reports progress after every processed unit and
 * records one statistics row per successful request. Both interfaces are
 * fire-and-forget from the pipeline's point of view: a lost progress
 * update or a failed statistics write never fails a translation.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::database::Repository;

/// Receives per-unit progress updates during a job execution
pub trait ProgressReporter: Send + Sync {
    /// Report that `processed` of `total` units are done for a request
    fn report(&self, request_id: &str, processed: usize, total: usize);
}

/// Progress reporter that writes log lines
pub struct LogProgressReporter;

impl ProgressReporter for LogProgressReporter {
    fn report(&self, request_id: &str, processed: usize, total: usize) {
        debug!(
            "Request {}: translated {}/{} units",
            &request_id[..request_id.len().min(8)],
            processed,
            total
        );
    }
}

/// Progress reporter that drops updates (for tests)
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn report(&self, _request_id: &str, _processed: usize, _total: usize) {}
}

/// Progress reporter that remembers the updates it saw (for tests)
#[derive(Default)]
pub struct RecordingProgressReporter {
    updates: Mutex<Vec<(usize, usize)>>,
}

impl RecordingProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The (processed, total) pairs observed so far
    pub fn updates(&self) -> Vec<(usize, usize)> {
        self.updates.lock().clone()
    }
}

impl ProgressReporter for RecordingProgressReporter {
    fn report(&self, _request_id: &str, processed: usize, total: usize) {
        self.updates.lock().push((processed, total));
    }
}

/// Records one statistics entry per successfully translated request
#[async_trait]
pub trait StatisticsRecorder: Send + Sync {
    async fn record_translation(
        &self,
        request_id: &str,
        line_count: usize,
        service_name: &str,
        model_name: &str,
    );
}

/// Statistics recorder backed by the SQLite repository.
///
/// Keeps a cheap in-process running total alongside the durable rows so
/// callers can show session totals without a query.
pub struct SqliteStatisticsRecorder {
    repository: Repository,
    session_lines: Mutex<u64>,
}

impl SqliteStatisticsRecorder {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            session_lines: Mutex::new(0),
        }
    }

    /// Lines recorded through this instance since construction
    pub fn session_lines(&self) -> u64 {
        *self.session_lines.lock()
    }
}

#[async_trait]
impl StatisticsRecorder for SqliteStatisticsRecorder {
    async fn record_translation(
        &self,
        request_id: &str,
        line_count: usize,
        service_name: &str,
        model_name: &str,
    ) {
        if let Err(e) = self
            .repository
            .record_translation(request_id, line_count, service_name, model_name)
            .await
        {
            warn!("Failed to record translation statistics for {}: {}", request_id, e);
            return;
        }

        *self.session_lines.lock() += line_count as u64;
    }
}

/// Statistics recorder that drops records (for tests)
pub struct NullStatisticsRecorder;

#[async_trait]
impl StatisticsRecorder for NullStatisticsRecorder {
    async fn record_translation(
        &self,
        _request_id: &str,
        _line_count: usize,
        _service_name: &str,
        _model_name: &str,
    ) {
    }
}
