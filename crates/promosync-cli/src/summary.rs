//! JSON run summary emitted after every `sync`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use promosync_core::{SyncMode, SyncStats};
use promosync_sync::SyncOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SourceStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SourceSummary {
    pub status: SourceStatus,
    pub mode: SyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<SyncStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceSummary {
    pub(crate) fn from_outcome(mode: SyncMode, outcome: SyncOutcome) -> Self {
        let (stats, inserted) = match outcome {
            SyncOutcome::Diff(stats) => (Some(stats), None),
            SyncOutcome::ReplaceMonth { inserted } => (None, Some(inserted)),
        };
        Self {
            status: SourceStatus::Ok,
            mode,
            stats,
            inserted,
            error: None,
        }
    }

    pub(crate) fn failed(mode: SyncMode, error: impl Into<String>) -> Self {
        Self {
            status: SourceStatus::Failed,
            mode,
            stats: None,
            inserted: None,
            error: Some(error.into()),
        }
    }
}

/// Keyed by source name; sorted so the output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct RunSummary {
    pub sources: BTreeMap<String, SourceSummary>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, source: &str, summary: SourceSummary) {
        self.sources.insert(source.to_string(), summary);
    }

    pub(crate) fn failed_sources(&self) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|(_, s)| s.status == SourceStatus::Failed)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub(crate) fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Prints the summary to stdout and, when `path` is given, writes it there.
    pub(crate) fn emit(&self, path: Option<&Path>) -> anyhow::Result<()> {
        let json = self.to_json()?;
        println!("{json}");
        if let Some(path) = path {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write summary to {}", path.display()))?;
            tracing::info!(path = %path.display(), "run summary written");
        }
        Ok(())
    }
}
