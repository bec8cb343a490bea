use promosync_core::{PromotionRecord, SyncMode, SyncStats};

use crate::reconcile::{Reconciler, SyncError};
use crate::replace::{dedupe_by_title, replace_month};
use crate::store::SnapshotStore;

/// What one partition sync did (or, in a dry run, would do).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Diff(SyncStats),
    ReplaceMonth { inserted: usize },
}

/// Resolves `partition` and writes `fresh` to it in the given mode.
///
/// The partition is resolved before anything else, so an unregistered
/// partition aborts with no mutation attempted. With `dry_run` the snapshot
/// is read but never written.
///
/// # Errors
///
/// Returns [`SyncError::PartitionNotFound`] for an unknown partition, or
/// [`SyncError::Store`] when a store call fails.
pub async fn sync_partition<S>(
    store: &S,
    reconciler: &Reconciler,
    partition: &str,
    mode: SyncMode,
    fresh: &[PromotionRecord],
    dry_run: bool,
) -> Result<SyncOutcome, SyncError>
where
    S: SnapshotStore + ?Sized,
{
    let partition_id = store.resolve_partition(partition).await?;
    tracing::info!(%partition, %partition_id, %mode, records = fresh.len(), dry_run, "syncing partition");

    match (mode, dry_run) {
        (SyncMode::Diff, false) => reconciler
            .reconcile(store, partition_id, fresh)
            .await
            .map(SyncOutcome::Diff),
        (SyncMode::Diff, true) => {
            let plan = reconciler.plan(store, partition_id, fresh).await?;
            Ok(SyncOutcome::Diff(plan.stats))
        }
        (SyncMode::ReplaceMonth, false) => {
            replace_month(store, partition_id, fresh, reconciler.batch_size())
                .await
                .map(|inserted| SyncOutcome::ReplaceMonth { inserted })
        }
        (SyncMode::ReplaceMonth, true) => Ok(SyncOutcome::ReplaceMonth {
            inserted: dedupe_by_title(fresh).len(),
        }),
    }
}
