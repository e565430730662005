use super::types::{
    BeaconConfig, CollectorConfig, DEFAULT_COLLECTOR_URL, RawBeaconConfig, RawCollectorConfig,
    RawStorageConfig, RawTrackingConfig, StorageConfig, TrackingConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<BeaconConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Load and merge the given files in order; later files win
    pub fn load_layers(paths: &[PathBuf]) -> Result<BeaconConfig> {
        let mut raw = RawBeaconConfig::default();

        for path in paths.iter().filter(|p| p.exists()) {
            debug!(path = %path.display(), "Loading config layer");
            let layer = Self::read_raw(path)?;
            raw = Self::merge_raw(raw, layer);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        beacon_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with BEACON_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("BEACON_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".beacon/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawBeaconConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawBeaconConfig, overlay: RawBeaconConfig) -> RawBeaconConfig {
        RawBeaconConfig {
            collector: RawCollectorConfig {
                url: overlay.collector.url.or(base.collector.url),
            },
            tracking: RawTrackingConfig {
                domain: overlay.tracking.domain.or(base.tracking.domain),
                track_acquisition: overlay
                    .tracking
                    .track_acquisition
                    .or(base.tracking.track_acquisition),
            },
            storage: RawStorageConfig {
                cookie_jar: overlay.storage.cookie_jar.or(base.storage.cookie_jar),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawBeaconConfig) -> BeaconConfig {
        BeaconConfig {
            collector: CollectorConfig {
                url: raw
                    .collector
                    .url
                    .unwrap_or_else(|| DEFAULT_COLLECTOR_URL.to_string()),
            },
            tracking: TrackingConfig {
                domain: raw.tracking.domain,
                track_acquisition: raw.tracking.track_acquisition.unwrap_or(false),
            },
            storage: raw
                .storage
                .cookie_jar
                .map(|cookie_jar| StorageConfig { cookie_jar })
                .unwrap_or_default(),
        }
    }
}
