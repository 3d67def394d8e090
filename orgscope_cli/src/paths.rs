//! Centralized path management for the orgscope CLI
//!
//! Configuration lives under the platform config directory and CSV exports
//! default to the current directory.

use std::path::PathBuf;

/// Directory name used under the platform config directory
const APP_DIR: &str = "orgscope";

const CONFIG_FILE: &str = "config.toml";

/// Returns the configuration directory
///
/// `$XDG_CONFIG_HOME/orgscope` when that variable is set (outside Windows),
/// otherwise the platform config directory:
/// - Linux: `~/.config/orgscope`
/// - macOS: `~/Library/Application Support/orgscope`
/// - Windows: `%APPDATA%\orgscope`
///
/// Falls back to `.orgscope` in the current directory when no home exists.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".orgscope"))
}

/// Returns the path to the configuration file
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}
