//! Unified path management for quill configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/quill/             # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! └── agents/                  # One JSON history file per agent
//!     ├── main.json
//!     └── <id>.json
//! ```

use quill_core::{QuillError, Result};
use std::path::PathBuf;

/// Unified path management for quill.
pub struct QuillPaths;

impl QuillPaths {
    /// Returns the quill configuration directory (`~/.config/quill`).
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the home directory cannot be determined.
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| QuillError::config("could not determine home directory"))?;
        Ok(home.join(".config").join("quill"))
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the directory holding per-agent history files.
    pub fn agents_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("agents"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_dir_ends_with_quill() {
        let config_dir = QuillPaths::config_dir().unwrap();
        assert!(config_dir.ends_with("quill"));
    }

    #[test]
    fn config_file_is_under_config_dir() {
        let config_file = QuillPaths::config_file().unwrap();
        assert!(config_file.ends_with("config.toml"));
        assert!(config_file.starts_with(QuillPaths::config_dir().unwrap()));
    }

    #[test]
    fn secret_file_is_under_config_dir() {
        let secret_file = QuillPaths::secret_file().unwrap();
        assert!(secret_file.ends_with("secret.json"));
        assert!(secret_file.starts_with(QuillPaths::config_dir().unwrap()));
    }

    #[test]
    fn agents_dir_is_under_config_dir() {
        let agents_dir = QuillPaths::agents_dir().unwrap();
        assert!(agents_dir.ends_with("agents"));
        assert!(agents_dir.starts_with(QuillPaths::config_dir().unwrap()));
    }
}
