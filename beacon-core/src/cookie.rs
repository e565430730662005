//! First-party cookie storage
//!
//! The agent persists exactly one cookie, but the jar is a general
//! name → [`Cookie`] map so hosts can plug in whatever storage they have.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;

/// SameSite policy of a cookie
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Lax,
    Strict,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Lax => write!(f, "lax"),
            SameSite::Strict => write!(f, "strict"),
            SameSite::None => write!(f, "none"),
        }
    }
}

/// A single cookie with the attributes the agent cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Session cookie when absent
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Create a session cookie scoped to `/`
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: None,
            same_site: SameSite::default(),
            path: default_path(),
        }
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Whether the cookie has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Render the cookie the way a `document.cookie` assignment spells it
    pub fn header_value(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);
        if let Some(expires) = self.expires {
            header.push_str(&format!(
                "; expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        header.push_str(&format!("; samesite={}; path={}", self.same_site, self.path));
        header
    }
}

/// Storage for first-party cookies
pub trait CookieJar: Send + Sync {
    /// Value of an unexpired cookie
    fn get(&self, name: &str) -> Option<String>;

    /// Store a cookie, replacing any previous cookie with the same name
    fn set(&self, cookie: Cookie) -> Result<(), StorageError>;
}

/// In-memory cookie jar, lives as long as the page
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full cookie including attributes, expired or not
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.get(name).cloned()
    }

    /// Store a raw value without going through encoding, e.g. to simulate
    /// a cookie written by an older script
    pub fn insert_raw(&self, name: &str, value: &str) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.insert(name.to_string(), Cookie::new(name, value));
    }

    pub fn is_empty(&self) -> bool {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.is_empty()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.insert(cookie.name.clone(), cookie);
        Ok(())
    }
}

/// JSON-file-backed cookie jar
///
/// Used by the CLI so attribution survives between runs. Expired cookies are
/// dropped on load.
#[derive(Debug)]
pub struct FileCookieJar {
    path: PathBuf,
    cookies: Mutex<HashMap<String, Cookie>>,
}

impl FileCookieJar {
    /// Load the jar at `path`, or start empty if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let cookies = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let stored: Vec<Cookie> = serde_json::from_str(&content)
                .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))?;
            let now = Utc::now();
            stored
                .into_iter()
                .filter(|cookie| !cookie.is_expired(now))
                .map(|cookie| (cookie.name.clone(), cookie))
                .collect()
        } else {
            HashMap::new()
        };

        debug!(path = %path.display(), count = cookies.len(), "Loaded cookie jar");

        Ok(Self {
            path: path.to_path_buf(),
            cookies: Mutex::new(cookies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All cookies currently held, sorted by name
    pub fn cookies(&self) -> Vec<Cookie> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<_> = cookies.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    fn persist(&self, cookies: &HashMap<String, Cookie>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut list: Vec<_> = cookies.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        let content = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies
            .get(name)
            .filter(|cookie| !cookie.is_expired(Utc::now()))
            .map(|cookie| cookie.value.clone())
    }

    fn set(&self, cookie: Cookie) -> Result<(), StorageError> {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.insert(cookie.name.clone(), cookie);
        self.persist(&cookies)
    }
}
