//! Provider registry.
//!
//! Static, read-at-startup mapping of provider keys to an endpoint, an
//! optional credential, and an ordered catalog of model keys to remote model
//! names. Both built-in providers speak the OpenAI-compatible
//! chat-completions wire format with a bearer credential, so the completion
//! client needs no per-provider codec.

use crate::config::SecretConfig;
use quill_core::{QuillError, Result};

/// The designated primary provider; failures here trigger the fallback policy.
pub const PRIMARY_PROVIDER: &str = "openai";
/// The designated secondary provider used by the fallback policy.
pub const SECONDARY_PROVIDER: &str = "openrouter";
/// The secondary provider's designated fallback model key.
pub const FALLBACK_MODEL: &str = "claude-sonnet";

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// One entry of a provider's model catalog: a short key the user selects,
/// mapped to the opaque model name the provider expects on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub key: String,
    pub remote_name: String,
}

impl ModelSpec {
    fn new(key: &str, remote_name: &str) -> Self {
        Self {
            key: key.to_string(),
            remote_name: remote_name.to_string(),
        }
    }
}

/// Static configuration of one completion provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Ordered catalog; the first entry is the provider's default model.
    pub models: Vec<ModelSpec>,
}

/// The full provider catalog, in a stable listing order.
pub struct ProviderRegistry {
    providers: Vec<(String, ProviderConfig)>,
}

/// A fully resolved completion target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget<'a> {
    pub provider: &'a str,
    pub endpoint: &'a str,
    pub api_key: &'a str,
    pub remote_model: &'a str,
}

impl ProviderRegistry {
    /// Builds the built-in registry, attaching whatever credentials are
    /// configured. Providers without a credential stay listed; they fail
    /// with a configuration warning at the point of use.
    pub fn builtin(secrets: &SecretConfig) -> Self {
        let openai = ProviderConfig {
            endpoint: OPENAI_ENDPOINT.to_string(),
            api_key: secrets.openai.as_ref().map(|s| s.api_key.clone()),
            models: vec![
                ModelSpec::new("gpt-5", "gpt-5"),
                ModelSpec::new("gpt-5-mini", "gpt-5-mini"),
                ModelSpec::new("gpt-4.1", "gpt-4.1"),
            ],
        };
        let openrouter = ProviderConfig {
            endpoint: OPENROUTER_ENDPOINT.to_string(),
            api_key: secrets.openrouter.as_ref().map(|s| s.api_key.clone()),
            models: vec![
                ModelSpec::new("claude-sonnet", "anthropic/claude-sonnet-4.5"),
                ModelSpec::new("gpt-5", "openai/gpt-5"),
                ModelSpec::new("llama-70b", "meta-llama/llama-3.3-70b-instruct"),
            ],
        };

        Self {
            providers: vec![
                (PRIMARY_PROVIDER.to_string(), openai),
                (SECONDARY_PROVIDER.to_string(), openrouter),
            ],
        }
    }

    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|(key, _)| key == provider)
            .map(|(_, config)| config)
    }

    pub fn provider_keys(&self) -> Vec<&str> {
        self.providers.iter().map(|(key, _)| key.as_str()).collect()
    }

    pub fn has_credential(&self, provider: &str) -> bool {
        self.get(provider)
            .is_some_and(|config| config.api_key.is_some())
    }

    pub fn has_model(&self, provider: &str, model: &str) -> bool {
        self.get(provider)
            .is_some_and(|config| config.models.iter().any(|spec| spec.key == model))
    }

    /// The provider's default model: the first entry of its catalog.
    pub fn first_model(&self, provider: &str) -> Option<&str> {
        self.get(provider)
            .and_then(|config| config.models.first())
            .map(|spec| spec.key.as_str())
    }

    /// The startup selection: primary provider and its default model.
    pub fn default_selection(&self) -> (String, String) {
        let model = self
            .first_model(PRIMARY_PROVIDER)
            .unwrap_or_default()
            .to_string();
        (PRIMARY_PROVIDER.to_string(), model)
    }

    /// The selection the fallback policy degrades to.
    pub fn fallback_selection(&self) -> (String, String) {
        (SECONDARY_PROVIDER.to_string(), FALLBACK_MODEL.to_string())
    }

    /// Resolves a (provider, model) selection into a callable target.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the provider is unknown, the model key
    /// is absent under the provider, or the provider has no credential.
    pub fn resolve(&self, provider: &str, model: &str) -> Result<ResolvedTarget<'_>> {
        let (key, config) = self
            .providers
            .iter()
            .find(|(key, _)| key == provider)
            .ok_or_else(|| QuillError::config(format!("unknown provider '{provider}'")))?;

        let spec = config
            .models
            .iter()
            .find(|spec| spec.key == model)
            .ok_or_else(|| {
                QuillError::config(format!("provider '{provider}' has no model '{model}'"))
            })?;

        let api_key = config.api_key.as_deref().ok_or_else(|| {
            QuillError::config(format!("no credential configured for provider '{provider}'"))
        })?;

        Ok(ResolvedTarget {
            provider: key,
            endpoint: &config.endpoint,
            api_key,
            remote_model: &spec.remote_name,
        })
    }
}
