//! Database operations for the `brand` table. Each brand is one partition.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `brand` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns all registered brands, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(pool: &PgPool) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, created_at, updated_at FROM brand ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns the brand registered under `name`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no brand has that name, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_brand_by_name(pool: &PgPool, name: &str) -> Result<BrandRow, DbError> {
    sqlx::query_as::<_, BrandRow>(
        "SELECT id, name, created_at, updated_at FROM brand WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Registers every partition name as a brand, skipping names that already
/// exist.
///
/// Returns the number of names processed. All inserts run inside a single
/// transaction; if any fails the whole batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_partitions<S: AsRef<str>>(pool: &PgPool, names: &[S]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for name in names {
        let name = name.as_ref();
        let inserted = sqlx::query(
            "INSERT INTO brand (name) VALUES ($1) \
             ON CONFLICT (name) DO UPDATE SET updated_at = NOW()",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?;
        tracing::debug!(name, rows = inserted.rows_affected(), "seeded partition");
        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
