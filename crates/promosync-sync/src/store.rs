//! Persistence boundary for promotion snapshots.

use async_trait::async_trait;
use chrono::NaiveDate;
use promosync_core::{PromotionRecord, PromotionUpdate, StoredRecord};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ResolvePartition,
    LoadSnapshot,
    Insert,
    Update,
    Delete,
    DeleteWindow,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOp::ResolvePartition => "resolve partition",
            StoreOp::LoadSnapshot => "load snapshot",
            StoreOp::Insert => "insert",
            StoreOp::Update => "update",
            StoreOp::Delete => "delete",
            StoreOp::DeleteWindow => "delete window",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("partition not found: {0}")]
    PartitionNotFound(String),

    #[error("{op} failed: {reason}")]
    Operation { op: StoreOp, reason: String },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn operation(op: StoreOp, reason: impl std::fmt::Display) -> Self {
        Self::Operation {
            op,
            reason: reason.to_string(),
        }
    }
}

/// Reads and mutates the persisted snapshot of promotion records.
///
/// Every method is a single independent operation; there is no transaction
/// spanning calls. Implementations assume one writer per partition at a time.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Maps a registered brand name to its partition id.
    ///
    /// # Errors
    ///
    /// [`StoreError::PartitionNotFound`] if `name` is not registered.
    async fn resolve_partition(&self, name: &str) -> Result<Uuid, StoreError>;

    /// All stored records for `(partition_id, start_date)`.
    async fn load_snapshot(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Inserts one batch and returns how many rows were written.
    async fn insert(
        &self,
        partition_id: Uuid,
        records: &[PromotionRecord],
    ) -> Result<usize, StoreError>;

    /// Writes only the fields carried by `update`.
    async fn update(&self, id: Uuid, update: &PromotionUpdate) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deletes every record for `(partition_id, start_date)` and returns the
    /// number removed.
    async fn delete_window(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<usize, StoreError>;
}
