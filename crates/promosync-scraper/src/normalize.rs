//! Shared helpers that turn scraped text into [`PromotionRecord`] fields.
//!
//! Site-specific selector logic lives in [`crate::sources`]; this module owns
//! the parts every source agrees on: price text, URLs, deal-type labels and the
//! per-item collection loop that drops untitled items.

use promosync_core::{DealType, PromotionRecord};
use reqwest::Url;

/// Extracts an integer price from display text such as `"2,000원"`.
///
/// Every non-digit character is discarded. Returns `None` for absent or
/// digit-free text, never `Some(0)` by default.
#[must_use]
pub fn parse_price(text: Option<&str>) -> Option<i64> {
    let digits: String = text?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok()
}

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a scraped `href`/`src` against the page it came from.
///
/// - `//host/path` takes the scheme of `base`.
/// - `/path` and `path` are joined onto `base`.
/// - Absolute `http(s)` URLs are returned unchanged.
///
/// Blank values and `javascript:` pseudo-links yield `None`.
#[must_use]
pub fn absolutize_url(raw: &str, base: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_owned());
    }

    let base = Url::parse(base).ok()?;
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("{}://{rest}", base.scheme()));
    }
    base.join(raw).ok().map(String::from)
}

/// Maps a listing tab or item badge to a [`DealType`].
///
/// Both ASCII `+` and the fullwidth `＋` used on some storefronts are accepted.
#[must_use]
pub fn deal_type_from_label(label: &str) -> DealType {
    let label = label.replace('＋', "+");
    let compact: String = label.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("1+1") {
        DealType::OnePlusOne
    } else if compact.contains("2+1") {
        DealType::TwoPlusOne
    } else if compact.contains("증정") {
        DealType::Gift
    } else {
        DealType::Discount
    }
}

/// Runs `normalize` over each raw item in page order.
///
/// A record is kept only if it has a non-blank title. `None` marks an item
/// the source chose to skip; both cases are logged at `debug`.
pub fn collect_normalized<T, F>(source_name: &str, items: Vec<T>, mut normalize: F) -> Vec<PromotionRecord>
where
    F: FnMut(T) -> Option<PromotionRecord>,
{
    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match normalize(item) {
            Some(record) if record.is_valid() => records.push(record),
            Some(_) | None => {
                tracing::debug!(source = %source_name, index, "item without a title skipped");
            }
        }
    }
    records
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
