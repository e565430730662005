//! First-touch attribution
//!
//! The visitor's first referrer and acquisition source are stored once in a
//! long-lived first-party cookie and reported unchanged on every later event.
//!
//! Cookie value layout: `percent(JSON)` where the JSON object's string fields
//! are themselves percent-encoded. [`AttributionStore::read`] undoes both
//! layers, so a write followed by a read returns byte-identical strings.

use std::borrow::Cow;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cookie::{Cookie, CookieJar, SameSite};
use crate::error::StorageError;

/// Name of the attribution cookie
pub const COOKIE_NAME: &str = "plausible_user";

/// How long the attribution cookie lives
pub const RETENTION_DAYS: i64 = 3 * 365;

/// The visitor's first observed acquisition context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionRecord {
    pub initial_referrer: Option<String>,
    pub initial_source: Option<String>,
}

/// Reads and writes the attribution cookie
pub struct AttributionStore<'a> {
    jar: &'a dyn CookieJar,
}

impl<'a> AttributionStore<'a> {
    pub fn new(jar: &'a dyn CookieJar) -> Self {
        Self { jar }
    }

    /// Stored record, or `None` when the cookie is absent or unreadable
    pub fn read(&self) -> Option<AttributionRecord> {
        let raw = self.jar.get(COOKIE_NAME)?;
        let json = match urlencoding::decode(&raw) {
            Ok(json) => json,
            Err(e) => {
                debug!("Ignoring undecodable attribution cookie: {}", e);
                return None;
            }
        };
        let stored: Option<AttributionRecord> = match serde_json::from_str(&json) {
            Ok(stored) => stored,
            Err(e) => {
                debug!("Ignoring malformed attribution cookie: {}", e);
                return None;
            }
        };
        let stored = stored?;

        Some(AttributionRecord {
            initial_referrer: decode_field(stored.initial_referrer)?,
            initial_source: decode_field(stored.initial_source)?,
        })
    }

    /// Persist `record` for [`RETENTION_DAYS`], `SameSite=Strict`, path `/`
    pub fn write(&self, record: &AttributionRecord) -> Result<(), StorageError> {
        let encoded = AttributionRecord {
            initial_referrer: record.initial_referrer.as_deref().map(encode_field),
            initial_source: record.initial_source.as_deref().map(encode_field),
        };
        let json = serde_json::to_string(&encoded)?;

        let cookie = Cookie::new(COOKIE_NAME, urlencoding::encode(&json))
            .with_expires(Utc::now() + Duration::days(RETENTION_DAYS))
            .with_same_site(SameSite::Strict)
            .with_path("/");
        self.jar.set(cookie)
    }

    /// Return the stored record, creating it from the current context if
    /// there is none yet. First touch wins.
    pub fn get_or_create(
        &self,
        current_referrer: Option<&str>,
        current_source: Option<&str>,
    ) -> AttributionRecord {
        if let Some(record) = self.read() {
            return record;
        }

        let record = AttributionRecord {
            initial_referrer: current_referrer.map(str::to_string),
            initial_source: current_source.map(str::to_string),
        };
        match self.write(&record) {
            Ok(()) => debug!(?record, "Stored first-touch attribution"),
            Err(e) => warn!("Failed to persist attribution cookie: {}", e),
        }
        record
    }
}

fn encode_field(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// `None` when a present field fails to decode
fn decode_field(value: Option<String>) -> Option<Option<String>> {
    value
        .map(|v| urlencoding::decode(&v).map(Cow::into_owned))
        .transpose()
        .ok()
}
