//! Error types for bulksync
//!
//! This module defines the error hierarchy covering:
//! - Configuration file and CLI validation errors
//! - Planning errors (malformed row locators, bad block sizes)
//! - Sync engine errors (PostgreSQL, checkpoint storage, search index)
//! - Worker thread errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include the offending value and file
//! - Preserve error chains for debugging

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the bulksync application
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Planning errors
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Sync engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel closed unexpectedly
    #[error("Work queue channel closed unexpectedly")]
    ChannelClosed,
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file missing or unreadable
    #[error("Failed to read config file '{path}': {reason}")]
    FileRead { path: PathBuf, reason: String },

    /// Config file is not valid JSON or misses required fields
    #[error("Malformed config file '{path}': {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Config file parsed but defines nothing to sync
    #[error("Config file '{path}' defines no sync targets")]
    NoTargets { path: PathBuf },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid block size
    #[error("Invalid block size {size}: must be at least 1")]
    InvalidBlockSize { size: usize },

    /// Invalid table reference
    #[error("Invalid table reference '{name}': {reason}")]
    InvalidTable { name: String, reason: String },

    /// Checkpoint directory error
    #[error("Invalid checkpoint directory '{path}': {reason}")]
    InvalidCheckpointDir { path: PathBuf, reason: String },
}

/// Planning-phase errors
///
/// These are synchronous and fail the whole cycle before any parallel
/// work begins.
#[derive(Error, Debug)]
pub enum PlanError {
    /// A physical row locator did not match the expected "(page,row)" shape
    #[error("Malformed row locator '{value}': {reason}")]
    BadLocator { value: String, reason: String },

    /// Zero block size would loop forever
    #[error("Invalid block size {size}: must be at least 1")]
    InvalidBlockSize { size: usize },
}

/// Sync engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// PostgreSQL error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    /// Search index error
    #[error("Search index error: {0}")]
    Index(#[from] IndexError),

    /// Locator parse error during a replay re-scan
    #[error("Locator error: {0}")]
    Plan(#[from] PlanError),

    /// Checkpoint state file could not be read
    #[error("Failed to load checkpoint from '{path}': {reason}")]
    CheckpointLoad { path: PathBuf, reason: String },

    /// Checkpoint state file could not be written
    #[error("Failed to store checkpoint at '{path}': {reason}")]
    CheckpointStore { path: PathBuf, reason: String },

    /// Persisted checkpoint is newer than the source's current transaction id
    #[error("Checkpoint {checkpoint} is ahead of current transaction id {current}")]
    CheckpointAhead { checkpoint: u64, current: u64 },

    /// A fetched row could not be decoded into an index document
    #[error("Failed to decode document '{id}': {reason}")]
    Document { id: String, reason: String },

    /// Generic engine error
    #[error("{0}")]
    Other(String),
}

/// Search index errors
#[derive(Error, Debug)]
pub enum IndexError {
    /// Bulk request never reached the index
    #[error("Bulk request transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Index rejected the whole bulk request
    #[error("Bulk request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Bulk request succeeded but an individual document failed
    #[error("Indexing failed for document '{id}': {reason}")]
    ItemFailed { id: String, reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker could not build its private engine session
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Worker panicked
    #[error("Worker {id} panicked")]
    Panicked { id: usize },

    /// Task execution (fetch/transform/bulk-index) failed
    #[error("Worker {id} task execution failed: {reason}")]
    TaskFailed { id: usize, reason: String },
}

/// Result type alias for SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Result type alias for EngineError
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for IndexError
pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let plan_err = PlanError::BadLocator {
            value: "(0;1)".into(),
            reason: "expected '(page,row)'".into(),
        };
        let sync_err: SyncError = plan_err.into();
        assert!(matches!(sync_err, SyncError::Plan(_)));
    }

    #[test]
    fn test_bad_locator_names_value() {
        let err = PlanError::BadLocator {
            value: "(12)".into(),
            reason: "missing comma".into(),
        };
        let message = err.to_string();
        assert!(message.contains("(12)"));
        assert!(message.contains("missing comma"));
    }

    #[test]
    fn test_checkpoint_ahead_message() {
        let err = EngineError::CheckpointAhead {
            checkpoint: 200,
            current: 150,
        };
        assert!(err.to_string().contains("200"));
        assert!(err.to_string().contains("150"));
    }
}
