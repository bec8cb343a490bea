//! Pure delta computation between a fresh crawl and the stored snapshot.

use std::collections::HashMap;

use promosync_core::{
    KeyMode, PromotionKey, PromotionRecord, PromotionUpdate, StoredRecord, SyncStats,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub id: Uuid,
    pub key: PromotionKey,
    pub update: PromotionUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDelete {
    pub id: Uuid,
    pub key: PromotionKey,
}

/// Mutations that bring the stored snapshot in line with the fresh set.
///
/// `inserts` and `updates` follow the order of the fresh records, `deletes`
/// the order of the stored snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub inserts: Vec<PromotionRecord>,
    pub updates: Vec<PlannedUpdate>,
    pub deletes: Vec<PlannedDelete>,
    pub stats: SyncStats,
}

impl SyncPlan {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Keyed view of a record list that keeps first-seen order. A later record
/// with an existing key replaces the earlier one in place.
struct KeyedRecords<'a, T> {
    order: Vec<PromotionKey>,
    by_key: HashMap<PromotionKey, &'a T>,
}

impl<'a, T> KeyedRecords<'a, T> {
    fn build(
        items: &'a [T],
        key_of: impl Fn(&T) -> PromotionKey,
        side: &'static str,
    ) -> Self {
        let mut order = Vec::with_capacity(items.len());
        let mut by_key = HashMap::with_capacity(items.len());
        for item in items {
            let key = key_of(item);
            if by_key.insert(key.clone(), item).is_some() {
                tracing::debug!(%key, side, "duplicate key, last occurrence wins");
            } else {
                order.push(key);
            }
        }
        Self { order, by_key }
    }

    fn contains(&self, key: &PromotionKey) -> bool {
        self.by_key.contains_key(key)
    }

    fn get(&self, key: &PromotionKey) -> Option<&'a T> {
        self.by_key.get(key).copied()
    }

    fn iter(&self) -> impl Iterator<Item = (&PromotionKey, &'a T)> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.by_key.get(key).map(|item| (key, *item)))
    }
}

/// Classifies every key as new, updated, deleted or unchanged.
///
/// Only `sale_price`, `normal_price` and `image_url` are compared for keys
/// present on both sides; all other fields are immutable per key.
#[must_use]
pub fn plan_sync(
    partition_id: Uuid,
    fresh: &[PromotionRecord],
    stored: &[StoredRecord],
    mode: KeyMode,
) -> SyncPlan {
    let fresh_keyed = KeyedRecords::build(
        fresh,
        |r| PromotionKey::for_record(partition_id, r, mode),
        "fresh",
    );
    let stored_keyed = KeyedRecords::build(
        stored,
        |s| PromotionKey::for_record(partition_id, &s.record, mode),
        "stored",
    );

    let mut plan = SyncPlan::default();

    for (key, record) in fresh_keyed.iter() {
        match stored_keyed.get(key) {
            None => plan.inserts.push(record.clone()),
            Some(existing) => {
                let update = PromotionUpdate::between(&existing.record, record);
                if update.is_empty() {
                    plan.stats.unchanged += 1;
                } else {
                    plan.updates.push(PlannedUpdate {
                        id: existing.id,
                        key: key.clone(),
                        update,
                    });
                }
            }
        }
    }

    // Stored rows superseded by a later row with the same key are removed too,
    // otherwise they would never be compared again.
    for existing in stored {
        let key = PromotionKey::for_record(partition_id, &existing.record, mode);
        let superseded = stored_keyed
            .get(&key)
            .is_some_and(|kept| kept.id != existing.id);
        if superseded {
            tracing::warn!(%key, id = %existing.id, "stored duplicate superseded, deleting");
        }
        if superseded || !fresh_keyed.contains(&key) {
            plan.deletes.push(PlannedDelete { id: existing.id, key });
        }
    }

    plan.stats.new = plan.inserts.len();
    plan.stats.updated = plan.updates.len();
    plan.stats.deleted = plan.deletes.len();
    plan.stats.total = fresh_keyed.order.len();
    plan
}

#[cfg(test)]
#[path = "diff_test.rs"]
mod tests;
