//! Agent store trait.
//!
//! Defines the interface for agent history persistence. Each agent's history
//! is one individually addressable artifact, keyed by its normalized id, and
//! `save` always replaces the full history so re-flushes are idempotent.

use crate::agent::{AgentId, ConversationMessage};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for per-agent conversation histories.
///
/// Implementations decouple the session layer from the storage mechanism.
/// Persistence failures are never fatal to a session: callers downgrade
/// errors to warnings, an unreadable history degrades to empty.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Reads the persisted history for `id`.
    ///
    /// A missing artifact is not an error: it yields an empty history.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Persistence` when the artifact exists but cannot
    /// be read or parsed.
    async fn load(&self, id: &AgentId) -> Result<Vec<ConversationMessage>>;

    /// Writes the full history for `id`, replacing any previous artifact.
    ///
    /// # Errors
    ///
    /// Returns `QuillError::Persistence` on write failure (disk full,
    /// permission denied).
    async fn save(&self, id: &AgentId, history: &[ConversationMessage]) -> Result<()>;

    /// Removes the persisted artifact for `id`. Idempotent if absent.
    async fn delete(&self, id: &AgentId) -> Result<()>;

    /// Enumerates the ids of all persisted agents.
    async fn list(&self) -> Result<Vec<AgentId>>;
}
