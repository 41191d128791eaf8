//! Platform-specific paths for the persisted configuration file (§6.6).
//!
//! # Directory structure
//!
//! - Linux: `~/.config/eas-station/`
//! - macOS: `~/Library/Application Support/eas-station/`
//! - Windows: `%APPDATA%\eas-station\`

use std::path::PathBuf;

/// Application name used for directory paths.
const APP_NAME: &str = "eas-station";

/// Filename of the persisted configuration document.
const CONFIG_FILE_NAME: &str = "station.toml";

/// Returns the user-specific configuration directory.
///
/// Falls back to the current directory if it cannot be determined (no
/// `$HOME`/`%APPDATA%`).
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
}

/// The default path of the persisted configuration document, inside
/// [`user_config_dir`].
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE_NAME)
}

/// Ensure the user configuration directory exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_user_config_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_config_dir();
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_config_dir_is_namespaced() {
        let dir = user_config_dir();
        assert!(dir.to_string_lossy().contains(APP_NAME));
    }

    #[test]
    fn default_config_path_sits_under_the_config_dir() {
        let path = default_config_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
        assert_eq!(path.parent().unwrap(), user_config_dir());
    }
}
