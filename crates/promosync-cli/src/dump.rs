//! Backup copy of each source's normalized crawl result.

use std::path::{Path, PathBuf};

use anyhow::Context;
use promosync_core::PromotionRecord;

/// File name for a source's dump, e.g. `seven-eleven` -> `seven_eleven_products.json`.
pub(crate) fn dump_file_name(source_name: &str) -> String {
    let slug: String = source_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{slug}_products.json")
}

/// Writes `records` as pretty JSON under `dir`, creating it if needed.
/// Returns the path written.
pub(crate) fn dump_records(
    dir: &Path,
    source_name: &str,
    records: &[PromotionRecord],
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create data dir {}", dir.display()))?;
    let path = dir.join(dump_file_name(source_name));
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
