pub mod app_config;
pub mod config;
pub mod promotions;
pub mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{
    load_app_config, load_app_config_from_env, DEFAULT_USER_AGENT, MAX_INSERT_BATCH_SIZE,
};
pub use promotions::{
    CampaignWindow, DealType, FieldChange, KeyMode, PromotionKey, PromotionRecord,
    PromotionUpdate, StoredRecord, SyncStats,
};
pub use sources::{load_sources, SourceConfig, SourcesFile, SyncMode};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
