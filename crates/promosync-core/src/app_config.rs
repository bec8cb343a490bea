use std::path::PathBuf;

use crate::promotions::KeyMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Run-scoped configuration. Built once at startup and passed down
/// explicitly to the transport, paginator, and reconciler.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Total attempts per transport call, including the first.
    pub max_retries: u32,
    /// Throttle applied after every successful response.
    pub crawl_delay_ms: u64,
    pub backoff_base_secs: u64,
    pub insert_batch_size: usize,
    pub key_includes_barcode: bool,
    /// When set, each source's crawl result is dumped here as JSON.
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    #[must_use]
    pub fn key_mode(&self) -> KeyMode {
        if self.key_includes_barcode {
            KeyMode::TitleAndBarcode
        } else {
            KeyMode::Title
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("crawl_delay_ms", &self.crawl_delay_ms)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .field("insert_batch_size", &self.insert_batch_size)
            .field("key_includes_barcode", &self.key_includes_barcode)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}
