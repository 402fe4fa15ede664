use chrono::{DateTime, Utc};
use serde::Serialize;

/// Progress report handed to bulk callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkProgress {
    pub processed: usize,
    pub total: usize,
}

pub type ProgressCallback = Box<dyn FnMut(BulkProgress) + Send>;

/// Options for `add_bulk`.
pub struct BulkOptions {
    /// Fixed batch size, used when `adaptive` is off.
    pub batch_size: usize,
    /// Re-estimate each batch from document byte sizes instead of using the
    /// fixed size.
    pub adaptive: bool,
    /// Memory budget per adaptive batch.
    pub max_memory_mb: usize,
    pub min_batch_size: usize,
    pub max_batch_size: usize,
    pub on_progress: Option<ProgressCallback>,
    /// Report per-document (every `progress_interval` documents) instead of
    /// the throttled per-batch default.
    pub streaming_progress: bool,
    pub progress_interval: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        BulkOptions {
            batch_size: 100,
            adaptive: false,
            max_memory_mb: 64,
            min_batch_size: 10,
            max_batch_size: 1000,
            on_progress: None,
            streaming_progress: false,
            progress_interval: 100,
        }
    }
}

/// One failed document captured on the recovery path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDocument {
    pub index: usize,
    pub doc_id: String,
    pub error: String,
}

/// Progress record returned by `add_bulk_with_recovery` and handed to the
/// checkpoint callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCheckpoint {
    pub processed_count: usize,
    pub last_successful_batch: usize,
    pub failed_documents: Vec<FailedDocument>,
    pub timestamp: DateTime<Utc>,
}

pub type CheckpointCallback = Box<dyn FnMut(&BulkCheckpoint) + Send>;

/// Options for `add_bulk_with_recovery`.
pub struct RecoveryOptions {
    pub bulk: BulkOptions,
    /// Keep going past failed documents, collecting them in the checkpoint.
    /// When off, the first failure terminates and the checkpoint is
    /// returned.
    pub continue_on_error: bool,
    pub enable_checkpointing: bool,
    /// Flush and fire the checkpoint callback every this many processed
    /// documents.
    pub checkpoint_interval: usize,
    pub on_checkpoint: Option<CheckpointCallback>,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        RecoveryOptions {
            bulk: BulkOptions::default(),
            continue_on_error: true,
            enable_checkpointing: false,
            checkpoint_interval: 1000,
            on_checkpoint: None,
        }
    }
}
