//! In-process [`SnapshotStore`] that records every mutation, for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use promosync_core::{PromotionRecord, PromotionUpdate, StoredRecord};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{SnapshotStore, StoreError, StoreOp};

/// A mutation as it reached the store, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert { partition_id: Uuid, count: usize },
    Update { id: Uuid, columns: Vec<&'static str> },
    Delete { id: Uuid },
    DeleteWindow { partition_id: Uuid, start_date: NaiveDate },
}

#[derive(Debug, Default)]
struct State {
    partitions: HashMap<String, Uuid>,
    rows: Vec<StoredRecord>,
    log: Vec<Mutation>,
    /// Remaining successful calls per operation before it starts failing.
    fail_after: HashMap<StoreOp, usize>,
}

impl State {
    fn check(&mut self, op: StoreOp) -> Result<(), StoreError> {
        match self.fail_after.get_mut(&op) {
            Some(0) => Err(StoreError::operation(op, "injected failure")),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a partition and returns its id. Re-registering a name
    /// returns the existing id.
    pub async fn register_partition(&self, name: &str) -> Uuid {
        let mut state = self.state.lock().await;
        *state
            .partitions
            .entry(name.to_owned())
            .or_insert_with(Uuid::new_v4)
    }

    /// Inserts rows directly, bypassing the mutation log.
    pub async fn seed(&self, partition_id: Uuid, records: Vec<PromotionRecord>) {
        let mut state = self.state.lock().await;
        state
            .rows
            .extend(records.into_iter().map(|record| StoredRecord {
                id: Uuid::new_v4(),
                partition_id,
                record,
            }));
    }

    /// Lets `op` succeed `successes` more times, then fail every call.
    pub async fn fail_after(&self, op: StoreOp, successes: usize) {
        self.state
            .lock()
            .await
            .fail_after
            .insert(op, successes);
    }

    /// Every stored row for a partition, in insertion order.
    pub async fn rows(&self, partition_id: Uuid) -> Vec<StoredRecord> {
        self.state
            .lock()
            .await
            .rows
            .iter()
            .filter(|r| r.partition_id == partition_id)
            .cloned()
            .collect()
    }

    pub async fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().await.log.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn resolve_partition(&self, name: &str) -> Result<Uuid, StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::ResolvePartition)?;
        state
            .partitions
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::PartitionNotFound(name.to_owned()))
    }

    async fn load_snapshot(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::LoadSnapshot)?;
        Ok(state
            .rows
            .iter()
            .filter(|r| r.partition_id == partition_id && r.record.start_date == start_date)
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        partition_id: Uuid,
        records: &[PromotionRecord],
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::Insert)?;
        state.rows.extend(records.iter().map(|record| StoredRecord {
            id: Uuid::new_v4(),
            partition_id,
            record: record.clone(),
        }));
        state.log.push(Mutation::Insert {
            partition_id,
            count: records.len(),
        });
        Ok(records.len())
    }

    async fn update(&self, id: Uuid, update: &PromotionUpdate) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::Update)?;
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::operation(StoreOp::Update, format!("no row {id}")))?;
        for change in &update.changes {
            change.apply_to(&mut row.record);
        }
        let columns = update.changes.iter().map(|c| c.column()).collect();
        state.log.push(Mutation::Update { id, columns });
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::Delete)?;
        state.rows.retain(|r| r.id != id);
        state.log.push(Mutation::Delete { id });
        Ok(())
    }

    async fn delete_window(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::DeleteWindow)?;
        let before = state.rows.len();
        state
            .rows
            .retain(|r| !(r.partition_id == partition_id && r.record.start_date == start_date));
        let removed = before - state.rows.len();
        state.log.push(Mutation::DeleteWindow {
            partition_id,
            start_date,
        });
        Ok(removed)
    }
}
