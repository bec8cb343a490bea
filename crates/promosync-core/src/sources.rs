use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How a source's crawl result is written to the snapshot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Incremental diff: insert new keys, update changed prices/images,
    /// delete keys that disappeared.
    #[default]
    Diff,
    /// Delete the whole campaign month for the partition, then insert the
    /// fresh set deduplicated by title.
    ReplaceMonth,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Diff => write!(f, "diff"),
            SyncMode::ReplaceMonth => write!(f, "replace_month"),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Selector used on the command line and as the run-summary key.
    pub name: String,
    /// Brand name the store uses to resolve the partition id.
    pub partition: String,
    #[serde(default)]
    pub mode: SyncMode,
    /// Overrides the source's built-in page ceiling.
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Looks a source up by name, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Load and validate the source registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sources(&content)
}

/// Parse and validate a source registry from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile = serde_yaml::from_str(content)?;
    validate_sources(&sources_file)?;
    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in &sources_file.sources {
        let name = source.name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if name.eq_ignore_ascii_case("all") {
            return Err(ConfigError::Validation(
                "'all' is reserved as the run-everything selector".to_string(),
            ));
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Validation(format!(
                "source name '{name}' may only contain ASCII letters, digits, '-' and '_'"
            )));
        }

        if source.partition.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{name}' has an empty partition"
            )));
        }

        if source.max_pages == Some(0) {
            return Err(ConfigError::Validation(format!(
                "source '{name}' has max_pages 0; must be at least 1"
            )));
        }

        if !seen_names.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{name}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
