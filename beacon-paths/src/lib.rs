//! XDG Base Directory paths for beacon.
//!
//! The `beacon` CLI keeps its settings and its cookie jar under XDG paths on
//! every platform, so a jar written on one run is found again on the next.

use std::path::PathBuf;

/// File name of the persisted cookie jar inside [`data_dir`].
pub const COOKIE_JAR_FILE: &str = "cookies.json";

/// Get the beacon config directory.
///
/// Returns `$XDG_CONFIG_HOME/beacon` if set, otherwise `~/.config/beacon`.
///
/// # Examples
///
/// ```
/// use beacon_paths::config_dir;
///
/// let settings = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join("beacon")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config/beacon")
    } else {
        PathBuf::from(".config/beacon")
    }
}

/// Get the beacon data directory.
///
/// Returns `$XDG_DATA_HOME/beacon` if set, otherwise `~/.local/share/beacon`.
/// The first-party cookie jar lives here.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join("beacon")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share/beacon")
    } else {
        PathBuf::from(".local/share/beacon")
    }
}

/// Default location of the cookie jar.
pub fn cookie_jar_path() -> PathBuf {
    data_dir().join(COOKIE_JAR_FILE)
}
