//! Database operations for the `promo` table.

use chrono::{DateTime, NaiveDate, Utc};
use promosync_core::{DealType, FieldChange, PromotionRecord, PromotionUpdate, StoredRecord};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `promo` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromoRow {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    pub raw_title: String,
    /// Stored as `DealType::as_str`, e.g. `"ONE_PLUS_ONE"`.
    pub deal_type: String,
    pub normal_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PromoRow> for StoredRecord {
    type Error = DbError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        let deal_type = row
            .deal_type
            .parse::<DealType>()
            .map_err(|reason| DbError::InvalidRow {
                id: row.id,
                column: "deal_type",
                reason,
            })?;

        Ok(StoredRecord {
            id: row.id,
            partition_id: row.brand_id,
            record: PromotionRecord {
                title: row.title,
                raw_title: row.raw_title,
                deal_type,
                normal_price: row.normal_price,
                sale_price: row.sale_price,
                image_url: row.image_url,
                source_url: row.source_url,
                category: row.category,
                barcode: row.barcode,
                description: row.description,
                start_date: row.start_date,
                end_date: row.end_date,
            },
        })
    }
}

const PROMO_COLUMNS: &str = "id, brand_id, title, raw_title, deal_type, normal_price, sale_price, \
     image_url, source_url, category, barcode, description, start_date, end_date, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every promotion of `brand_id` whose campaign starts on
/// `start_date`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored deal type is not recognized.
pub async fn load_promos(
    pool: &PgPool,
    brand_id: Uuid,
    start_date: NaiveDate,
) -> Result<Vec<StoredRecord>, DbError> {
    let rows = sqlx::query_as::<_, PromoRow>(&format!(
        "SELECT {PROMO_COLUMNS} FROM promo \
         WHERE brand_id = $1 AND start_date = $2 \
         ORDER BY created_at, id"
    ))
    .bind(brand_id)
    .bind(start_date)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(StoredRecord::try_from).collect()
}

/// Inserts `records` for `brand_id` in one multi-row statement.
///
/// Returns the number of rows written. An empty slice writes nothing.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_promos(
    pool: &PgPool,
    brand_id: Uuid,
    records: &[PromotionRecord],
) -> Result<usize, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO promo \
             (brand_id, title, raw_title, deal_type, normal_price, sale_price, \
              image_url, source_url, category, barcode, description, start_date, end_date) ",
    );
    builder.push_values(records, |mut row, record| {
        row.push_bind(brand_id)
            .push_bind(record.title.clone())
            .push_bind(record.raw_title.clone())
            .push_bind(record.deal_type.as_str())
            .push_bind(record.normal_price)
            .push_bind(record.sale_price)
            .push_bind(record.image_url.clone())
            .push_bind(record.source_url.clone())
            .push_bind(record.category.clone())
            .push_bind(record.barcode.clone())
            .push_bind(record.description.clone())
            .push_bind(record.start_date)
            .push_bind(record.end_date);
    });

    let result = builder.build().execute(pool).await?;
    Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
}

/// Writes only the columns carried by `update`; `updated_at` is refreshed.
///
/// An empty update is a no-op.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_promo(pool: &PgPool, id: Uuid, update: &PromotionUpdate) -> Result<(), DbError> {
    if update.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new("UPDATE promo SET ");
    {
        let mut columns = builder.separated(", ");
        for change in &update.changes {
            columns.push(format!("{} = ", change.column()));
            match change {
                FieldChange::SalePrice(value) | FieldChange::NormalPrice(value) => {
                    columns.push_bind_unseparated(*value);
                }
                FieldChange::ImageUrl(value) => {
                    columns.push_bind_unseparated(value.clone());
                }
            }
        }
        columns.push("updated_at = NOW()");
    }
    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Deletes one promotion. Returns whether a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_promo(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM promo WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Deletes every promotion of `brand_id` starting on `start_date`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_promo_window(
    pool: &PgPool,
    brand_id: Uuid,
    start_date: NaiveDate,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM promo WHERE brand_id = $1 AND start_date = $2")
        .bind(brand_id)
        .bind(start_date)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
