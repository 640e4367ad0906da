/*!
 * Database module for persistent storage of translation requests.
 *
 * This module provides SQLite-based persistence for:
 * - Translation requests and their lifecycle status
 * - The settings store backing job configuration
 * - Per-request translation statistics
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::Repository;
