//! Applies a [`SyncPlan`] to a [`SnapshotStore`].

use std::fmt;

use promosync_core::{AppConfig, KeyMode, PromotionRecord, SyncStats};
use thiserror::Error;
use uuid::Uuid;

use crate::diff::{plan_sync, SyncPlan};
use crate::store::{SnapshotStore, StoreError};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Mutations that reached the store before a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppliedCounts {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl fmt::Display for AppliedCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} updated={} deleted={}",
            self.inserted, self.updated, self.deleted
        )
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("partition not found: {0}")]
    PartitionNotFound(String),

    /// A store operation failed. Mutations counted in `applied` were already
    /// written and are not rolled back.
    #[error("{source} (applied before failure: {applied})")]
    Store {
        #[source]
        source: StoreError,
        applied: AppliedCounts,
    },
}

impl SyncError {
    pub(crate) fn store(source: StoreError, applied: AppliedCounts) -> Self {
        match source {
            StoreError::PartitionNotFound(name) => Self::PartitionNotFound(name),
            other => Self::Store {
                source: other,
                applied,
            },
        }
    }

    /// Progress made before the failure, if any.
    #[must_use]
    pub fn applied(&self) -> AppliedCounts {
        match self {
            Self::PartitionNotFound(_) => AppliedCounts::default(),
            Self::Store { applied, .. } => *applied,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(source: StoreError) -> Self {
        Self::store(source, AppliedCounts::default())
    }
}

/// Diff-mode reconciliation of one partition.
///
/// Mutations are applied one store call at a time with no surrounding
/// transaction: inserts first (in batches), then updates, then deletes, so a
/// failure part-way leaves extra rows rather than missing ones. Re-running the
/// same input after a failure converges, because already-applied mutations
/// show up as unchanged keys.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    batch_size: usize,
    key_mode: KeyMode,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, KeyMode::default())
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(batch_size: usize, key_mode: KeyMode) -> Self {
        Self {
            batch_size: batch_size.max(1),
            key_mode,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.insert_batch_size, config.key_mode())
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Loads the snapshot and computes the plan without writing anything.
    ///
    /// An empty `fresh` set yields an empty plan and touches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the snapshot cannot be loaded.
    pub async fn plan<S>(
        &self,
        store: &S,
        partition_id: Uuid,
        fresh: &[PromotionRecord],
    ) -> Result<SyncPlan, SyncError>
    where
        S: SnapshotStore + ?Sized,
    {
        let Some(first) = fresh.first() else {
            return Ok(SyncPlan::default());
        };
        // Every record from one run shares the campaign window.
        let start_date = first.start_date;
        let stored = store.load_snapshot(partition_id, start_date).await?;
        Ok(plan_sync(partition_id, fresh, &stored, self.key_mode))
    }

    /// Brings the stored snapshot for `partition_id` in line with `fresh`.
    ///
    /// An empty `fresh` set returns all-zero stats without loading or
    /// mutating anything, so a crawl that silently found nothing can never
    /// wipe the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] on the first failing store call. No
    /// further mutations are attempted and earlier ones stay applied.
    pub async fn reconcile<S>(
        &self,
        store: &S,
        partition_id: Uuid,
        fresh: &[PromotionRecord],
    ) -> Result<SyncStats, SyncError>
    where
        S: SnapshotStore + ?Sized,
    {
        if fresh.is_empty() {
            tracing::info!(%partition_id, "no fresh records, snapshot left untouched");
            return Ok(SyncStats::default());
        }

        let plan = self.plan(store, partition_id, fresh).await?;
        self.apply(store, partition_id, &plan).await?;

        tracing::info!(
            %partition_id,
            new = plan.stats.new,
            updated = plan.stats.updated,
            deleted = plan.stats.deleted,
            unchanged = plan.stats.unchanged,
            total = plan.stats.total,
            "reconciliation complete"
        );
        Ok(plan.stats)
    }

    async fn apply<S>(
        &self,
        store: &S,
        partition_id: Uuid,
        plan: &SyncPlan,
    ) -> Result<AppliedCounts, SyncError>
    where
        S: SnapshotStore + ?Sized,
    {
        let mut applied = AppliedCounts::default();

        for batch in plan.inserts.chunks(self.batch_size) {
            let written = store
                .insert(partition_id, batch)
                .await
                .map_err(|e| SyncError::store(e, applied))?;
            applied.inserted += written;
            tracing::debug!(%partition_id, batch = batch.len(), written, "inserted batch");
        }

        for planned in &plan.updates {
            store
                .update(planned.id, &planned.update)
                .await
                .map_err(|e| SyncError::store(e, applied))?;
            applied.updated += 1;
            tracing::debug!(key = %planned.key, "updated");
        }

        for planned in &plan.deletes {
            store
                .delete(planned.id)
                .await
                .map_err(|e| SyncError::store(e, applied))?;
            applied.deleted += 1;
            tracing::debug!(key = %planned.key, "deleted");
        }

        Ok(applied)
    }
}
