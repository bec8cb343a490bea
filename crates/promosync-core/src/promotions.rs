//! Promotion records shared by the scrapers, the reconciler, and the store.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of promotional deal attached to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealType {
    OnePlusOne,
    TwoPlusOne,
    Gift,
    Discount,
}

impl DealType {
    /// Stored representation, e.g. `"ONE_PLUS_ONE"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DealType::OnePlusOne => "ONE_PLUS_ONE",
            DealType::TwoPlusOne => "TWO_PLUS_ONE",
            DealType::Gift => "GIFT",
            DealType::Discount => "DISCOUNT",
        }
    }
}

impl fmt::Display for DealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONE_PLUS_ONE" => Ok(DealType::OnePlusOne),
            "TWO_PLUS_ONE" => Ok(DealType::TwoPlusOne),
            "GIFT" => Ok(DealType::Gift),
            "DISCOUNT" => Ok(DealType::Discount),
            other => Err(format!("unknown deal type '{other}'")),
        }
    }
}

/// A single promotional listing, normalized from any source.
///
/// Prices are in minor currency units (KRW has no subunit, so `2,000원` is
/// `2000`). A price that could not be parsed is `None`, never `0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub title: String,
    /// Title as scraped, before any cleanup. Kept for auditing.
    pub raw_title: String,
    pub deal_type: DealType,
    pub normal_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub category: Option<String>,
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PromotionRecord {
    /// A record must carry a non-blank title to reach the reconciler.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// First and last calendar day of a campaign month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CampaignWindow {
    /// Window covering the month that contains `date`.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date - Days::new(u64::from(date.day0()));
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(start);
        Self { start, end }
    }

    /// Window for the current local month.
    #[must_use]
    pub fn current() -> Self {
        Self::for_date(chrono::Local::now().date_naive())
    }
}

/// Which record fields participate in [`PromotionKey`] identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyMode {
    /// `(partition, title, start_date)`. Compatible with existing snapshots.
    #[default]
    Title,
    /// Adds the barcode when the record has one, so distinct products that
    /// share a display title stay distinct.
    TitleAndBarcode,
}

/// Identity used to match records across crawl runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromotionKey {
    pub partition_id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub barcode: Option<String>,
}

impl PromotionKey {
    #[must_use]
    pub fn for_record(partition_id: Uuid, record: &PromotionRecord, mode: KeyMode) -> Self {
        let barcode = match mode {
            KeyMode::Title => None,
            KeyMode::TitleAndBarcode => record
                .barcode
                .as_deref()
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .map(str::to_owned),
        };
        Self {
            partition_id,
            title: record.title.clone(),
            start_date: record.start_date,
            barcode,
        }
    }
}

impl fmt::Display for PromotionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.partition_id, self.title, self.start_date)?;
        if let Some(barcode) = &self.barcode {
            write!(f, "_{barcode}")?;
        }
        Ok(())
    }
}

/// A record as currently persisted, addressed by its store identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: Uuid,
    pub partition_id: Uuid,
    pub record: PromotionRecord,
}

/// One mutable field that changed between the stored and fresh record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    SalePrice(Option<i64>),
    NormalPrice(Option<i64>),
    ImageUrl(Option<String>),
}

impl FieldChange {
    /// Column name in the `promo` table.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            FieldChange::SalePrice(_) => "sale_price",
            FieldChange::NormalPrice(_) => "normal_price",
            FieldChange::ImageUrl(_) => "image_url",
        }
    }

    /// Applies the change to `record` in place.
    pub fn apply_to(&self, record: &mut PromotionRecord) {
        match self {
            FieldChange::SalePrice(v) => record.sale_price = *v,
            FieldChange::NormalPrice(v) => record.normal_price = *v,
            FieldChange::ImageUrl(v) => record.image_url.clone_from(v),
        }
    }
}

/// Partial update carrying only the fields that differ.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PromotionUpdate {
    pub changes: Vec<FieldChange>,
}

impl PromotionUpdate {
    /// Compares the mutable fields (`sale_price`, `normal_price`, `image_url`)
    /// of `stored` and `fresh`. Every other field is immutable once a key
    /// exists and is ignored here.
    #[must_use]
    pub fn between(stored: &PromotionRecord, fresh: &PromotionRecord) -> Self {
        let mut changes = Vec::new();
        if stored.sale_price != fresh.sale_price {
            changes.push(FieldChange::SalePrice(fresh.sale_price));
        }
        if stored.normal_price != fresh.normal_price {
            changes.push(FieldChange::NormalPrice(fresh.normal_price));
        }
        if stored.image_url != fresh.image_url {
            changes.push(FieldChange::ImageUrl(fresh.image_url.clone()));
        }
        Self { changes }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Outcome counts of one diff-mode reconciliation.
///
/// `total` is the number of distinct fresh keys, which always equals
/// `new + updated + unchanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub new: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub total: usize,
}

impl SyncStats {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.new + self.updated + self.unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(title: &str) -> PromotionRecord {
        PromotionRecord {
            title: title.to_owned(),
            raw_title: title.to_owned(),
            deal_type: DealType::OnePlusOne,
            normal_price: Some(2000),
            sale_price: Some(2000),
            image_url: Some("https://img.example.com/a.jpg".to_owned()),
            source_url: None,
            category: None,
            barcode: Some("8801234".to_owned()),
            description: None,
            start_date: date(2025, 10, 1),
            end_date: date(2025, 10, 31),
        }
    }

    #[test]
    fn deal_type_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&DealType::TwoPlusOne).unwrap();
        assert_eq!(json, "\"TWO_PLUS_ONE\"");
        assert_eq!("GIFT".parse::<DealType>().unwrap(), DealType::Gift);
        assert!("BOGO".parse::<DealType>().is_err());
    }

    #[test]
    fn blank_title_is_invalid() {
        assert!(record("콜라").is_valid());
        assert!(!record("   ").is_valid());
    }

    #[test]
    fn campaign_window_mid_month() {
        let w = CampaignWindow::for_date(date(2025, 10, 17));
        assert_eq!(w.start, date(2025, 10, 1));
        assert_eq!(w.end, date(2025, 10, 31));
    }

    #[test]
    fn campaign_window_february_leap_year() {
        let w = CampaignWindow::for_date(date(2024, 2, 29));
        assert_eq!(w.start, date(2024, 2, 1));
        assert_eq!(w.end, date(2024, 2, 29));
    }

    #[test]
    fn campaign_window_december_rolls_year() {
        let w = CampaignWindow::for_date(date(2025, 12, 1));
        assert_eq!(w.end, date(2025, 12, 31));
    }

    #[test]
    fn key_ignores_barcode_in_title_mode() {
        let partition = Uuid::new_v4();
        let mut other = record("콜라");
        other.barcode = Some("999".to_owned());
        assert_eq!(
            PromotionKey::for_record(partition, &record("콜라"), KeyMode::Title),
            PromotionKey::for_record(partition, &other, KeyMode::Title)
        );
    }

    #[test]
    fn key_separates_barcodes_when_widened() {
        let partition = Uuid::new_v4();
        let mut other = record("콜라");
        other.barcode = Some("999".to_owned());
        assert_ne!(
            PromotionKey::for_record(partition, &record("콜라"), KeyMode::TitleAndBarcode),
            PromotionKey::for_record(partition, &other, KeyMode::TitleAndBarcode)
        );
    }

    #[test]
    fn widened_key_treats_blank_barcode_as_absent() {
        let partition = Uuid::new_v4();
        let mut r = record("콜라");
        r.barcode = Some("  ".to_owned());
        let key = PromotionKey::for_record(partition, &r, KeyMode::TitleAndBarcode);
        assert!(key.barcode.is_none());
    }

    #[test]
    fn update_between_tracks_only_mutable_fields() {
        let stored = record("콜라");
        let mut fresh = record("콜라");
        fresh.category = Some("음료".to_owned());
        fresh.deal_type = DealType::Discount;
        fresh.description = Some("new".to_owned());
        assert!(PromotionUpdate::between(&stored, &fresh).is_empty());

        fresh.sale_price = Some(1500);
        fresh.image_url = None;
        let update = PromotionUpdate::between(&stored, &fresh);
        assert_eq!(
            update.changes,
            vec![FieldChange::SalePrice(Some(1500)), FieldChange::ImageUrl(None)]
        );
    }

    #[test]
    fn field_change_applies_in_place() {
        let mut r = record("콜라");
        FieldChange::NormalPrice(None).apply_to(&mut r);
        FieldChange::ImageUrl(Some("x".to_owned())).apply_to(&mut r);
        assert_eq!(r.normal_price, None);
        assert_eq!(r.image_url.as_deref(), Some("x"));
    }

    #[test]
    fn default_stats_are_consistent() {
        assert!(SyncStats::default().is_consistent());
        let bad = SyncStats {
            new: 1,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            total: 2,
        };
        assert!(!bad.is_consistent());
    }
}
