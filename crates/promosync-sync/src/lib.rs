pub mod diff;
pub mod memory;
pub mod reconcile;
pub mod replace;
mod run;
pub mod store;

pub use diff::{plan_sync, PlannedDelete, PlannedUpdate, SyncPlan};
pub use memory::{MemoryStore, Mutation};
pub use reconcile::{AppliedCounts, Reconciler, SyncError, DEFAULT_BATCH_SIZE};
pub use replace::{dedupe_by_title, replace_month};
pub use run::{sync_partition, SyncOutcome};
pub use store::{SnapshotStore, StoreError, StoreOp};
