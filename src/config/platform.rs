//! Platform-specific locations.

use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const HOME_ENV: &str = "FAST_SSH_HOME";

/// Returns the config directory.
///
/// - `$FAST_SSH_HOME` when set and non-empty
/// - `%AppData%\FastSSH` on Windows
/// - `~/.config/fast-ssh` elsewhere
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    default_config_dir()
}

#[cfg(windows)]
fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("FastSSH")
}

#[cfg(not(windows))]
fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fast-ssh")
}
