pub mod app_config;
pub mod attributes;
pub mod catalog;
pub mod config;
pub mod lease;
pub mod patches;
pub mod ports;
pub mod products;
pub mod sync_run;

pub use app_config::{AppConfig, Environment};
pub use attributes::{Attribute, AttributeKey, AttributeSet};
pub use catalog::{
    CatalogEntry, CatalogId, CatalogVariant, EntryUpdate, StockStatus, StoredEntry,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use lease::{LeaseHolder, LeaseOutcome, LeaseState};
pub use patches::{
    load_record_patches, DimensionOverride, RecordPatch, RecordPatches, TitleCorrection,
};
pub use ports::{
    CatalogError, CatalogPort, NotificationError, NotificationPort, ProductFeed, RunLease,
    RunRecorder,
};
pub use products::{raw_fields, CanonicalProduct, SupplierCode};
pub use sync_run::{CreatedItem, ItemError, SyncProgress, SyncStats, SyncStatus};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read record patches file {path}: {source}")]
    PatchesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse record patches file: {0}")]
    PatchesFileParse(#[source] serde_yaml::Error),

    #[error("record patches validation failed: {0}")]
    Validation(String),
}
