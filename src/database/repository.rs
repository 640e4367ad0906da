/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for all database operations,
 * abstracting away the SQL details and providing type-safe access.
 */

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::settings::SettingsStore;

use super::connection::DatabaseConnection;
use super::models::{MediaKind, RequestStatus, TranslationRequest, TranslationStatistic};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    // =========================================================================
    // Translation Request Operations
    // =========================================================================

    /// Persist a newly enqueued translation request
    pub async fn create_translation_request(&self, request: &TranslationRequest) -> Result<()> {
        let request = request.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translation_requests (
                        id, title, media_kind, source_path, source_hash,
                        source_language, target_language, status, error_message,
                        translated_path, created_at, updated_at, completed_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                    "#,
                    params![
                        request.id,
                        request.title,
                        request.media_kind.to_string(),
                        request.source_path,
                        request.source_hash,
                        request.source_language,
                        request.target_language,
                        request.status.to_string(),
                        request.error_message,
                        request.translated_path,
                        request.created_at,
                        request.updated_at,
                        request.completed_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Get a translation request by ID
    pub async fn get_translation_request(&self, id: &str) -> Result<Option<TranslationRequest>> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        &format!("{} WHERE id = ?1", SELECT_REQUEST),
                        [id],
                        map_request_row,
                    )
                    .optional()?;
                Ok(result)
            })
            .await
    }

    /// List requests in a given lifecycle status, oldest first
    pub async fn list_requests_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<TranslationRequest>> {
        let status = status.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE status = ?1 ORDER BY created_at ASC",
                    SELECT_REQUEST
                ))?;
                let requests = stmt
                    .query_map([status], map_request_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(requests)
            })
            .await
    }

    /// Update a request's lifecycle status.
    ///
    /// Writes status, error message and translated path; stamps
    /// `updated_at` always and `completed_at` on terminal transitions.
    /// Returns the updated request.
    pub async fn update_translation_request(
        &self,
        request: &TranslationRequest,
        status: RequestStatus,
        message: Option<&str>,
    ) -> Result<TranslationRequest> {
        let mut updated = request.clone();
        updated.status = status;
        updated.error_message = message.map(str::to_string);
        updated.updated_at = chrono::Utc::now().to_rfc3339();
        if status.is_terminal() {
            updated.completed_at = Some(updated.updated_at.clone());
        }

        let row = updated.clone();
        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    r#"
                    UPDATE translation_requests
                    SET status = ?2, error_message = ?3, translated_path = ?4,
                        updated_at = ?5, completed_at = ?6
                    WHERE id = ?1
                    "#,
                    params![
                        row.id,
                        row.status.to_string(),
                        row.error_message,
                        row.translated_path,
                        row.updated_at,
                        row.completed_at,
                    ],
                )?;
                if changed == 0 {
                    anyhow::bail!("Translation request not found: {}", row.id);
                }
                Ok(())
            })
            .await?;

        debug!("Request {} -> {}", updated.short_id(), updated.status);
        Ok(updated)
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    /// Fetch the requested setting keys; keys with no value are omitted
    pub async fn get_settings_map(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();

        self.db
            .execute_async(move |conn| {
                let placeholders = vec!["?"; keys.len()].join(",");
                let mut stmt = conn.prepare(&format!(
                    "SELECT key, value FROM settings WHERE key IN ({})",
                    placeholders
                ))?;

                let mut map = HashMap::new();
                let rows = stmt.query_map(params_from_iter(keys.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                for row in rows {
                    let (key, value) = row?;
                    map.insert(key, value);
                }
                Ok(map)
            })
            .await
    }

    /// Insert or replace one setting
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Statistics Operations
    // =========================================================================

    /// Record one completed translation
    pub async fn record_translation(
        &self,
        request_id: &str,
        line_count: usize,
        service_name: &str,
        model_name: &str,
    ) -> Result<()> {
        let request_id = request_id.to_string();
        let service_name = service_name.to_string();
        let model_name = model_name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translation_statistics (
                        request_id, line_count, service_name, model_name, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![request_id, line_count as i64, service_name, model_name, created_at],
                )?;
                Ok(())
            })
            .await
    }

    /// List statistics rows for a request
    pub async fn list_statistics(&self, request_id: &str) -> Result<Vec<TranslationStatistic>> {
        let request_id = request_id.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, request_id, line_count, service_name, model_name, created_at
                    FROM translation_statistics WHERE request_id = ?1 ORDER BY id ASC
                    "#,
                )?;
                let stats = stmt
                    .query_map([request_id], |row| {
                        Ok(TranslationStatistic {
                            id: row.get(0)?,
                            request_id: row.get(1)?,
                            line_count: row.get(2)?,
                            service_name: row.get(3)?,
                            model_name: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(stats)
            })
            .await
    }

    /// Total number of lines translated across all requests
    pub async fn total_lines_translated(&self) -> Result<i64> {
        self.db
            .execute_async(|conn| {
                let total: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(line_count), 0) FROM translation_statistics",
                    [],
                    |row| row.get(0),
                )?;
                Ok(total)
            })
            .await
    }
}

#[async_trait]
impl SettingsStore for Repository {
    async fn get_settings(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        self.get_settings_map(keys).await
    }
}

const SELECT_REQUEST: &str = r#"
    SELECT id, title, media_kind, source_path, source_hash,
           source_language, target_language, status, error_message,
           translated_path, created_at, updated_at, completed_at
    FROM translation_requests
"#;

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranslationRequest> {
    Ok(TranslationRequest {
        id: row.get(0)?,
        title: row.get(1)?,
        media_kind: row
            .get::<_, String>(2)?
            .parse()
            .unwrap_or(MediaKind::Movie),
        source_path: row.get(3)?,
        source_hash: row.get(4)?,
        source_language: row.get(5)?,
        target_language: row.get(6)?,
        status: row
            .get::<_, String>(7)?
            .parse()
            .unwrap_or(RequestStatus::Pending),
        error_message: row.get(8)?,
        translated_path: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        completed_at: row.get(12)?,
    })
}
