//! Postgres-backed [`SnapshotStore`].

use async_trait::async_trait;
use chrono::NaiveDate;
use promosync_core::{PromotionRecord, PromotionUpdate, StoredRecord};
use promosync_sync::{SnapshotStore, StoreError, StoreOp};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{brands, promos, DbError};

/// Each trait call runs as its own statement against the pool; nothing spans
/// a transaction.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_store_error(op: StoreOp, err: DbError) -> StoreError {
    match err {
        DbError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
            StoreError::Backend(err.to_string())
        }
        other => StoreError::operation(op, other),
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn resolve_partition(&self, name: &str) -> Result<Uuid, StoreError> {
        match brands::get_brand_by_name(&self.pool, name).await {
            Ok(brand) => Ok(brand.id),
            Err(DbError::NotFound) => Err(StoreError::PartitionNotFound(name.to_owned())),
            Err(e) => Err(to_store_error(StoreOp::ResolvePartition, e)),
        }
    }

    async fn load_snapshot(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        promos::load_promos(&self.pool, partition_id, start_date)
            .await
            .map_err(|e| to_store_error(StoreOp::LoadSnapshot, e))
    }

    async fn insert(
        &self,
        partition_id: Uuid,
        records: &[PromotionRecord],
    ) -> Result<usize, StoreError> {
        promos::insert_promos(&self.pool, partition_id, records)
            .await
            .map_err(|e| to_store_error(StoreOp::Insert, e))
    }

    async fn update(&self, id: Uuid, update: &PromotionUpdate) -> Result<(), StoreError> {
        promos::update_promo(&self.pool, id, update)
            .await
            .map_err(|e| to_store_error(StoreOp::Update, e))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let removed = promos::delete_promo(&self.pool, id)
            .await
            .map_err(|e| to_store_error(StoreOp::Delete, e))?;
        if !removed {
            tracing::debug!(%id, "promo already gone");
        }
        Ok(())
    }

    async fn delete_window(
        &self,
        partition_id: Uuid,
        start_date: NaiveDate,
    ) -> Result<usize, StoreError> {
        let removed = promos::delete_promo_window(&self.pool, partition_id, start_date)
            .await
            .map_err(|e| to_store_error(StoreOp::DeleteWindow, e))?;
        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }
}
