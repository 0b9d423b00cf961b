use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("settings not found at {0}: run 'marketlist init'")]
    NotInitialized(String),

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("region is required to resolve '{0}'")]
    MissingRegion(String),

    #[error("selector config missing for {region}/{category}")]
    ConfigMissing { region: String, category: String },

    #[error("invalid selector key '{0}': expected dotted path of lowercase identifiers")]
    InvalidSelectorKey(String),

    #[error("invalid selector variant '{0}': must be primary, fallback, or description")]
    InvalidVariant(String),

    #[error("no usable selector for '{key}' in {region}/{category}")]
    SelectorUnresolved {
        key: String,
        region: String,
        category: String,
    },

    #[error("critical operation failed at {state}: {reason}")]
    CriticalOperationFailed { state: String, reason: String },

    #[error("failed to acquire session for browser {browser_id}: {reason}")]
    SessionAcquisitionFailed { browser_id: String, reason: String },

    #[error("session provider unavailable: {0}")]
    SessionInfrastructure(String),

    #[error("failed to write progress store {path}: {reason}")]
    ProgressWrite { path: String, reason: String },

    #[error("no listing flow registered for {region}/{category}")]
    UnsupportedCombination { region: String, category: String },

    #[error("run aborted: {0}")]
    Aborted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ListingError>;
