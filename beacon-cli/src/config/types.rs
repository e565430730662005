use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default collector for events
pub const DEFAULT_COLLECTOR_URL: &str = "https://plausible.io";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBeaconConfig {
    #[serde(default)]
    pub collector: RawCollectorConfig,

    #[serde(default)]
    pub tracking: RawTrackingConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCollectorConfig {
    /// Base URL of the collector
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTrackingConfig {
    /// Site identifier reported instead of the page hostname
    pub domain: Option<String>,

    /// Report first-touch referrer and source
    pub track_acquisition: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    /// Cookie jar file
    pub cookie_jar: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BeaconConfig {
    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub url: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_COLLECTOR_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackingConfig {
    pub domain: Option<String>,

    #[serde(default)]
    pub track_acquisition: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub cookie_jar: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cookie_jar: beacon_paths::cookie_jar_path(),
        }
    }
}
