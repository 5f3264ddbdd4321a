//! Configuration file management for quill.
//!
//! Credentials come from `~/.config/quill/secret.json` with environment
//! variables as fallback. Optional interface defaults come from
//! `~/.config/quill/config.toml`. Both files are optional; a malformed file
//! is reported as a warning and ignored, never fatal.

use quill_core::{QuillError, Result};
use quill_infrastructure::QuillPaths;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Environment fallback for the openai credential.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Environment fallback for the openrouter credential.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Root structure of secret.json.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<ProviderSecret>,
    #[serde(default)]
    pub openrouter: Option<ProviderSecret>,
}

/// Credential entry for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSecret {
    pub api_key: String,
}

/// Optional interface defaults from config.toml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub default_provider: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub quiet: Option<bool>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Loads and parses a secret.json file.
///
/// # Errors
///
/// Returns a `Config` error naming the path when the file cannot be read or
/// parsed.
pub fn load_secret_file(path: &Path) -> Result<SecretConfig> {
    let content = fs::read_to_string(path).map_err(|err| {
        QuillError::config(format!(
            "failed to read secret file at {}: {err}",
            path.display()
        ))
    })?;

    serde_json::from_str(&content).map_err(|err| {
        QuillError::config(format!(
            "failed to parse secret file at {}: {err}",
            path.display()
        ))
    })
}

/// Resolves credentials from the secret file, then the environment.
///
/// Priority per provider:
/// 1. `~/.config/quill/secret.json`
/// 2. Environment variables (`OPENAI_API_KEY`, `OPENROUTER_API_KEY`)
///
/// Missing credentials are left unset; they surface as configuration
/// warnings at the point of use.
pub fn resolve_secrets() -> SecretConfig {
    let mut secrets = match QuillPaths::secret_file() {
        Ok(path) if path.exists() => load_secret_file(&path).unwrap_or_else(|err| {
            tracing::warn!("{err}");
            SecretConfig::default()
        }),
        Ok(_) => SecretConfig::default(),
        Err(err) => {
            tracing::warn!("{err}");
            SecretConfig::default()
        }
    };

    if secrets.openai.is_none() {
        if let Ok(api_key) = env::var(OPENAI_API_KEY_ENV) {
            secrets.openai = Some(ProviderSecret { api_key });
        }
    }
    if secrets.openrouter.is_none() {
        if let Ok(api_key) = env::var(OPENROUTER_API_KEY_ENV) {
            secrets.openrouter = Some(ProviderSecret { api_key });
        }
    }

    secrets
}

/// Loads and parses a config.toml file.
///
/// # Errors
///
/// Returns a `Config` error naming the path when the file cannot be read or
/// parsed.
pub fn load_config_file(path: &Path) -> Result<QuillConfig> {
    let content = fs::read_to_string(path).map_err(|err| {
        QuillError::config(format!(
            "failed to read config file at {}: {err}",
            path.display()
        ))
    })?;

    toml::from_str(&content).map_err(|err| {
        QuillError::config(format!(
            "failed to parse config file at {}: {err}",
            path.display()
        ))
    })
}

/// Loads the interface defaults, falling back to built-in defaults when the
/// file is absent or malformed.
pub fn load_config() -> QuillConfig {
    match QuillPaths::config_file() {
        Ok(path) if path.exists() => load_config_file(&path).unwrap_or_else(|err| {
            tracing::warn!("{err}");
            QuillConfig::default()
        }),
        _ => QuillConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn secret_file_parses_partial_configs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(&path, r#"{"openai": {"api_key": "sk-test"}}"#).unwrap();

        let secrets = load_secret_file(&path).unwrap();

        assert_eq!(secrets.openai.unwrap().api_key, "sk-test");
        assert!(secrets.openrouter.is_none());
    }

    #[test]
    fn malformed_secret_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_secret_file(&path).unwrap_err();

        assert!(err.is_config());
    }

    #[test]
    fn config_file_parses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "default_provider = \"openrouter\"\nquiet = true\ntemperature = 0.2\n",
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();

        assert_eq!(config.default_provider.as_deref(), Some("openrouter"));
        assert_eq!(config.default_model, None);
        assert_eq!(config.quiet, Some(true));
        assert_eq!(config.temperature, Some(0.2));
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();

        let err = load_config_file(&dir.path().join("absent.toml")).unwrap_err();

        assert!(err.is_config());
    }
}
