//! Replace-month mode: wipe the campaign window, then insert the fresh set.

use std::collections::HashSet;

use promosync_core::PromotionRecord;
use uuid::Uuid;

use crate::reconcile::{AppliedCounts, SyncError};
use crate::store::SnapshotStore;

/// Keeps the first record for each title, logging and dropping the rest.
#[must_use]
pub fn dedupe_by_title(records: &[PromotionRecord]) -> Vec<PromotionRecord> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| {
            let first = seen.insert(record.title.as_str());
            if !first {
                tracing::debug!(title = %record.title, "duplicate title skipped");
            }
            first
        })
        .cloned()
        .collect()
}

/// Deletes every stored record for the window of `fresh` and inserts the
/// deduplicated fresh set in batches. Returns the number of rows inserted.
///
/// An empty `fresh` set is a no-op returning 0.
///
/// # Errors
///
/// Returns [`SyncError::Store`] if the delete or any insert batch fails.
/// Batches inserted before the failure remain.
pub async fn replace_month<S>(
    store: &S,
    partition_id: Uuid,
    fresh: &[PromotionRecord],
    batch_size: usize,
) -> Result<usize, SyncError>
where
    S: SnapshotStore + ?Sized,
{
    let Some(first) = fresh.first() else {
        tracing::info!(%partition_id, "no fresh records, snapshot left untouched");
        return Ok(0);
    };
    let start_date = first.start_date;

    let removed = store.delete_window(partition_id, start_date).await?;
    tracing::info!(%partition_id, %start_date, removed, "cleared campaign window");

    let unique = dedupe_by_title(fresh);
    let mut applied = AppliedCounts {
        deleted: removed,
        ..AppliedCounts::default()
    };
    for batch in unique.chunks(batch_size.max(1)) {
        let written = store
            .insert(partition_id, batch)
            .await
            .map_err(|e| SyncError::store(e, applied))?;
        applied.inserted += written;
        tracing::debug!(%partition_id, written, total = applied.inserted, "inserted batch");
    }

    Ok(applied.inserted)
}
