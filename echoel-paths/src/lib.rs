//! XDG Base Directory paths for echoel.
//!
//! The host uses XDG paths on every platform rather than platform-native
//! locations, so config and plugin data live in the same place everywhere.

use std::path::PathBuf;

const APP_DIR: &str = "echoel";

fn xdg_dir(env_var: &str, home_fallback: &str) -> PathBuf {
    if let Ok(dir) = std::env::var(env_var)
        && !dir.is_empty()
    {
        PathBuf::from(dir).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_fallback).join(APP_DIR)
    } else {
        PathBuf::from(home_fallback).join(APP_DIR)
    }
}

/// Get the echoel config directory.
///
/// Returns `$XDG_CONFIG_HOME/echoel` if set, otherwise `~/.config/echoel`.
///
/// # Examples
///
/// ```
/// use echoel_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the echoel data directory.
///
/// Returns `$XDG_DATA_HOME/echoel` if set, otherwise `~/.local/share/echoel`.
/// Per-plugin data directories are created under it.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Get the echoel cache directory.
///
/// Returns `$XDG_CACHE_HOME/echoel` if set, otherwise `~/.cache/echoel`.
pub fn cache_dir() -> PathBuf {
    xdg_dir("XDG_CACHE_HOME", ".cache")
}
