//! Directory-backed agent store.
//!
//! One artifact per agent under a base directory:
//!
//! ```text
//! agents/
//! ├── main.json
//! └── work.json
//! ```
//!
//! Each file is a pretty-printed JSON array of message records, replaced
//! wholesale on every save so re-flushes are idempotent.

use crate::paths::QuillPaths;
use async_trait::async_trait;
use quill_core::agent::{AgentId, ConversationMessage};
use quill_core::store::AgentStore;
use quill_core::{QuillError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Agent store keeping one JSON history file per normalized agent id.
pub struct DirAgentStore {
    agents_dir: PathBuf,
}

impl DirAgentStore {
    /// Creates a store rooted at the default location (`~/.config/quill/agents`).
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(QuillPaths::agents_dir()?))
    }

    /// Creates a store rooted at `agents_dir`. The directory is created
    /// lazily on the first save.
    pub fn new(agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
        }
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    fn path_for(&self, id: &AgentId) -> PathBuf {
        self.agents_dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl AgentStore for DirAgentStore {
    async fn load(&self, id: &AgentId) -> Result<Vec<ConversationMessage>> {
        let path = self.path_for(id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!("no artifact for '{id}', starting empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(QuillError::persistence(format!(
                    "reading {}: {err}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|err| {
            QuillError::persistence(format!("parsing {}: {err}", path.display()))
        })
    }

    async fn save(&self, id: &AgentId, history: &[ConversationMessage]) -> Result<()> {
        fs::create_dir_all(&self.agents_dir).await.map_err(|err| {
            QuillError::persistence(format!(
                "creating {}: {err}",
                self.agents_dir.display()
            ))
        })?;

        let path = self.path_for(id);
        let serialized = serde_json::to_string_pretty(history)
            .map_err(|err| QuillError::persistence(format!("serializing '{id}': {err}")))?;
        fs::write(&path, serialized).await.map_err(|err| {
            QuillError::persistence(format!("writing {}: {err}", path.display()))
        })
    }

    async fn delete(&self, id: &AgentId) -> Result<()> {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(QuillError::persistence(format!(
                "removing {}: {err}",
                path.display()
            ))),
        }
    }

    async fn list(&self) -> Result<Vec<AgentId>> {
        let mut entries = match fs::read_dir(&self.agents_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(QuillError::persistence(format!(
                    "listing {}: {err}",
                    self.agents_dir.display()
                )));
            }
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            QuillError::persistence(format!(
                "listing {}: {err}",
                self.agents_dir.display()
            ))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                // Stems were written normalized; sanitize guards stray files.
                ids.push(AgentId::sanitize(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
