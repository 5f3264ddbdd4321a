//! Provider selection and remote completion for quill.
//!
//! This crate owns everything between the session layer and the remote
//! endpoint: credential/config loading, the static provider registry, and
//! the completion client with its degrade-and-stay fallback policy.

pub mod completion;
pub mod config;
pub mod provider;

pub use completion::{
    CompletionBackend, CompletionClient, CompletionTarget, DEFAULT_TEMPERATURE,
    HttpCompletionBackend,
};
pub use config::{
    ProviderSecret, QuillConfig, SecretConfig, load_config, load_config_file, load_secret_file,
    resolve_secrets,
};
pub use provider::{
    FALLBACK_MODEL, ModelSpec, PRIMARY_PROVIDER, ProviderConfig, ProviderRegistry, ResolvedTarget,
    SECONDARY_PROVIDER,
};
