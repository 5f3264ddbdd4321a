//! Error types for the quill application.

use thiserror::Error;

/// A shared error type for the entire quill application.
///
/// Variants follow the failure taxonomy of the session layer: user input
/// mistakes, persistence failures, remote call failures, and configuration
/// problems. None of these are fatal to the interactive session.
#[derive(Error, Debug, Clone)]
pub enum QuillError {
    /// Invalid user input (unknown command, missing argument, bad selection)
    #[error("{0}")]
    UserInput(String),

    /// Entity not found error with type information
    #[error("{entity_type} '{id}' does not exist")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Entity already exists (duplicate fork target)
    #[error("{entity_type} '{id}' already exists")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },

    /// Agent store read/write failure
    #[error("persistence error: {message}")]
    Persistence { message: String },

    /// Remote completion call failure (transport or non-success status)
    #[error("remote call to '{provider}' failed: {message}")]
    RemoteCall { provider: String, message: String },

    /// Configuration error (missing credential, unknown model key, bad config file)
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },
}

impl QuillError {
    /// Creates a UserInput error
    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an AlreadyExists error
    pub fn already_exists(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Creates a RemoteCall error
    pub fn remote_call(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCall {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a persistence error
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    /// Check if this is a remote call error
    pub fn is_remote_call(&self) -> bool {
        matches!(self, Self::RemoteCall { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for QuillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for QuillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for QuillError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, QuillError>`.
pub type Result<T> = std::result::Result<T, QuillError>;
