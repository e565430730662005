//! Runtime configuration set through the `configure` operation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BeaconError, Result};

/// Option name overriding the reported site identifier
pub const DOMAIN_KEY: &str = "domain";

/// Option name enabling first-touch attribution fields
pub const TRACK_ACQUISITION_KEY: &str = "trackAcquisition";

/// Options read by the payload builder on every trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub domain: String,
    #[serde(rename = "trackAcquisition")]
    pub track_acquisition: bool,
    /// Unrecognized options, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RuntimeConfig {
    /// Defaults for a page served from `hostname`
    pub fn for_hostname(hostname: impl Into<String>) -> Self {
        Self {
            domain: hostname.into(),
            track_acquisition: false,
            extra: BTreeMap::new(),
        }
    }

    /// Set one option. Recognized options are type-checked.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        match key {
            DOMAIN_KEY => match value {
                Value::String(domain) => self.domain = domain,
                other => {
                    return Err(BeaconError::invalid_arguments(
                        "configure",
                        format!("{} must be a string, got {}", DOMAIN_KEY, other),
                    ));
                }
            },
            TRACK_ACQUISITION_KEY => match value {
                Value::Bool(enabled) => self.track_acquisition = enabled,
                other => {
                    return Err(BeaconError::invalid_arguments(
                        "configure",
                        format!("{} must be a boolean, got {}", TRACK_ACQUISITION_KEY, other),
                    ));
                }
            },
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Current value of an option
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            DOMAIN_KEY => Some(Value::String(self.domain.clone())),
            TRACK_ACQUISITION_KEY => Some(Value::Bool(self.track_acquisition)),
            _ => self.extra.get(key).cloned(),
        }
    }
}
