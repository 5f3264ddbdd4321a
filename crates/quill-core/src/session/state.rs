//! Session state machine.
//!
//! `SessionState` is the single mutable record behind the interactive
//! session: the active agent, its in-memory history, the registry of known
//! agents, and the provider/model selection cells. All operations are serial
//! with respect to the dispatch loop; there is no locking discipline because
//! there is no concurrency.
//!
//! Persistence timing is a deliberate policy, not save-on-every-change: the
//! active history is flushed only at agent-boundary events (`fork`,
//! `subfork`, `switch`, normal exit), never after an individual chat round.
//! Turns entered between boundaries are lost on abnormal termination; that
//! durability trade-off is accepted.

use crate::agent::{AgentId, ConversationMessage};
use crate::error::{QuillError, Result};
use crate::store::AgentStore;
use std::collections::BTreeSet;
use std::sync::Arc;

/// What a session operation did, for the UI layer to render.
///
/// The `flush_ok`/`load_ok`/`copy_saved` flags report persistence results;
/// persistence failures degrade to warnings and never fail the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// A fresh agent was created and activated with an empty history.
    Forked { id: AgentId, flush_ok: bool },
    /// A fresh agent was created with a copy of the current history.
    Subforked {
        id: AgentId,
        flush_ok: bool,
        copy_saved: bool,
    },
    /// The active agent changed; the target's history was loaded from storage.
    Switched {
        id: AgentId,
        flush_ok: bool,
        load_ok: bool,
    },
    /// A non-active agent was deleted.
    Deleted { id: AgentId },
    /// The active agent was deleted; the session fell back to `main`.
    DeletedActive { id: AgentId, load_ok: bool },
}

/// Snapshot of the session for `/status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub provider: String,
    pub model: String,
    pub active: AgentId,
    pub message_count: usize,
}

/// The mutable record of one interactive session.
///
/// Invariants: `active` is always a member of `agents`; `agents` always
/// contains `main`; `history` mirrors the active agent and is authoritative
/// until the next flush boundary.
pub struct SessionState {
    active: AgentId,
    history: Vec<ConversationMessage>,
    agents: BTreeSet<AgentId>,
    provider: String,
    model: String,
    store: Arc<dyn AgentStore>,
}

impl SessionState {
    /// Opens a session on `main`.
    ///
    /// The registry is seeded with `main` plus every agent the store knows
    /// about; `main`'s history is loaded, degrading to empty on failure.
    pub async fn open(
        store: Arc<dyn AgentStore>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let mut agents = BTreeSet::new();
        agents.insert(AgentId::main());
        match store.list().await {
            Ok(known) => agents.extend(known),
            Err(err) => {
                tracing::warn!("could not enumerate stored agents: {err}");
            }
        }

        let main = AgentId::main();
        let (history, _) = load_or_empty(store.as_ref(), &main).await;

        Self {
            active: main,
            history,
            agents,
            provider: provider.into(),
            model: model.into(),
            store,
        }
    }

    pub fn active(&self) -> &AgentId {
        &self.active
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Replaces both selection cells at once (provider switch, fallback).
    pub fn set_selection(&mut self, provider: impl Into<String>, model: impl Into<String>) {
        self.provider = provider.into();
        self.model = model.into();
    }

    /// Replaces the model cell, keeping the provider.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Creates a fresh agent with an empty history and activates it.
    ///
    /// The history of the agent being left is flushed first.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` (state unchanged) when the normalized id is
    /// already registered, or `UserInput` when the id normalizes to nothing.
    pub async fn fork(&mut self, raw_id: &str) -> Result<SessionOutcome> {
        let id = self.check_fresh(raw_id)?;
        let flush_ok = self.flush().await;
        self.active = id.clone();
        self.history = Vec::new();
        self.agents.insert(id.clone());
        Ok(SessionOutcome::Forked { id, flush_ok })
    }

    /// Creates a fresh agent whose history is a copy of the current one.
    ///
    /// The copy is independent from that point on and is persisted
    /// immediately, so the new agent survives even if the session never
    /// reaches another flush boundary.
    pub async fn subfork(&mut self, raw_id: &str) -> Result<SessionOutcome> {
        let id = self.check_fresh(raw_id)?;
        let flush_ok = self.flush().await;
        let copied = self.history.clone();
        let copy_saved = match self.store.save(&id, &copied).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("could not persist subfork '{id}': {err}");
                false
            }
        };
        self.active = id.clone();
        self.history = copied;
        self.agents.insert(id.clone());
        Ok(SessionOutcome::Subforked {
            id,
            flush_ok,
            copy_saved,
        })
    }

    /// Activates a registered agent, loading its history from storage.
    ///
    /// The history of the agent being left is flushed first; whatever was in
    /// memory is replaced by the loaded history (empty on read failure).
    pub async fn switch(&mut self, raw_id: &str) -> Result<SessionOutcome> {
        let id = self.check_registered(raw_id)?;
        let flush_ok = self.flush().await;
        let (history, load_ok) = load_or_empty(self.store.as_ref(), &id).await;
        self.active = id.clone();
        self.history = history;
        Ok(SessionOutcome::Switched {
            id,
            flush_ok,
            load_ok,
        })
    }

    /// Deletes a registered agent and its persisted artifact.
    ///
    /// Deleting `main` is rejected. Deleting the active agent falls back to
    /// `main`, reloading its history from storage; the doomed in-memory
    /// history is discarded, not flushed.
    pub async fn delete(&mut self, raw_id: &str) -> Result<SessionOutcome> {
        let id = AgentId::sanitize(raw_id);
        if id.is_main() {
            return Err(QuillError::user_input("the 'main' agent cannot be deleted"));
        }
        if !self.agents.contains(&id) {
            return Err(QuillError::not_found("agent", id.as_str()));
        }

        if let Err(err) = self.store.delete(&id).await {
            tracing::warn!("could not remove artifact for '{id}': {err}");
        }
        self.agents.remove(&id);

        if self.active == id {
            let main = AgentId::main();
            let (history, load_ok) = load_or_empty(self.store.as_ref(), &main).await;
            self.active = main;
            self.history = history;
            return Ok(SessionOutcome::DeletedActive { id, load_ok });
        }

        Ok(SessionOutcome::Deleted { id })
    }

    /// Registry contents in lexicographic order.
    pub fn list_agents(&self) -> Vec<AgentId> {
        self.agents.iter().cloned().collect()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            provider: self.provider.clone(),
            model: self.model.clone(),
            active: self.active.clone(),
            message_count: self.history.len(),
        }
    }

    /// Builds the request turn sequence for a chat round: the in-memory
    /// history followed by a new user turn holding `user_line`.
    ///
    /// Nothing is recorded here; see [`SessionState::record_round`].
    pub fn turns_for_request(&self, user_line: &str) -> Vec<ConversationMessage> {
        let mut turns = self.history.clone();
        turns.push(ConversationMessage::user(user_line));
        turns
    }

    /// Records a completed chat round: the user line and the assistant
    /// content, in that order, restoring the even-length invariant.
    pub fn record_round(&mut self, user_line: &str, assistant_content: &str) {
        self.history.push(ConversationMessage::user(user_line));
        self.history
            .push(ConversationMessage::assistant(assistant_content));
    }

    /// Flushes the active agent's in-memory history to storage.
    ///
    /// Returns `false` (after logging) on failure; a failed flush never
    /// aborts the session.
    pub async fn flush(&mut self) -> bool {
        match self.store.save(&self.active, &self.history).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("could not save agent '{}': {err}", self.active);
                false
            }
        }
    }

    fn check_fresh(&self, raw_id: &str) -> Result<AgentId> {
        let id = AgentId::sanitize(raw_id);
        if id.as_str().is_empty() {
            return Err(QuillError::user_input("agent id must not be empty"));
        }
        if self.agents.contains(&id) {
            return Err(QuillError::already_exists("agent", id.as_str()));
        }
        Ok(id)
    }

    fn check_registered(&self, raw_id: &str) -> Result<AgentId> {
        let id = AgentId::sanitize(raw_id);
        if !self.agents.contains(&id) {
            return Err(QuillError::not_found("agent", id.as_str()));
        }
        Ok(id)
    }
}

async fn load_or_empty(store: &dyn AgentStore, id: &AgentId) -> (Vec<ConversationMessage>, bool) {
    match store.load(id).await {
        Ok(history) => (history, true),
        Err(err) => {
            tracing::warn!("could not load history for '{id}': {err}");
            (Vec::new(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::MessageRole;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Mock AgentStore for testing
    #[derive(Default)]
    struct MockAgentStore {
        histories: Mutex<HashMap<AgentId, Vec<ConversationMessage>>>,
    }

    impl MockAgentStore {
        fn persisted(&self, id: &str) -> Option<Vec<ConversationMessage>> {
            self.histories
                .lock()
                .unwrap()
                .get(&AgentId::sanitize(id))
                .cloned()
        }
    }

    #[async_trait]
    impl AgentStore for MockAgentStore {
        async fn load(&self, id: &AgentId) -> Result<Vec<ConversationMessage>> {
            Ok(self
                .histories
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_default())
        }

        async fn save(&self, id: &AgentId, history: &[ConversationMessage]) -> Result<()> {
            self.histories
                .lock()
                .unwrap()
                .insert(id.clone(), history.to_vec());
            Ok(())
        }

        async fn delete(&self, id: &AgentId) -> Result<()> {
            self.histories.lock().unwrap().remove(id);
            Ok(())
        }

        async fn list(&self) -> Result<Vec<AgentId>> {
            let mut ids: Vec<_> = self.histories.lock().unwrap().keys().cloned().collect();
            ids.sort();
            Ok(ids)
        }
    }

    async fn open_session(store: Arc<MockAgentStore>) -> SessionState {
        SessionState::open(store, "openai", "gpt-5").await
    }

    fn contents(history: &[ConversationMessage]) -> Vec<&str> {
        history.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn open_seeds_registry_from_store() {
        let store = Arc::new(MockAgentStore::default());
        store
            .save(&AgentId::sanitize("old"), &[])
            .await
            .unwrap();

        let session = open_session(store).await;

        let agents = session.list_agents();
        assert_eq!(agents, vec![AgentId::main(), AgentId::sanitize("old")]);
        assert_eq!(session.active(), &AgentId::main());
    }

    #[tokio::test]
    async fn fork_creates_empty_agent_and_flushes_previous() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");

        let outcome = session.fork("Work").await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Forked {
                id: AgentId::sanitize("work"),
                flush_ok: true,
            }
        );
        assert_eq!(session.active().as_str(), "work");
        assert!(session.history().is_empty());
        assert_eq!(session.list_agents().len(), 2);
        assert_eq!(
            contents(&store.persisted("main").unwrap()),
            vec!["hi", "hello"]
        );
    }

    #[tokio::test]
    async fn fork_duplicate_is_rejected_and_state_unchanged() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");
        session.fork("work").await.unwrap();
        session.switch("main").await.unwrap();

        let err = session.fork("WORK").await.unwrap_err();

        assert!(matches!(err, QuillError::AlreadyExists { .. }));
        assert_eq!(session.active().as_str(), "main");
        assert_eq!(contents(session.history()), vec!["hi", "hello"]);
        assert_eq!(session.list_agents().len(), 2);
    }

    #[tokio::test]
    async fn fork_empty_id_is_rejected() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;

        let err = session.fork("").await.unwrap_err();

        assert!(matches!(err, QuillError::UserInput(_)));
    }

    #[tokio::test]
    async fn subfork_copies_history_and_persists_the_copy() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");

        let outcome = session.subfork("branch").await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Subforked {
                id: AgentId::sanitize("branch"),
                flush_ok: true,
                copy_saved: true,
            }
        );
        assert_eq!(contents(session.history()), vec!["hi", "hello"]);
        assert_eq!(
            contents(&store.persisted("branch").unwrap()),
            vec!["hi", "hello"]
        );
    }

    #[tokio::test]
    async fn subfork_copy_is_independent_of_the_source() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");
        session.subfork("branch").await.unwrap();

        session.record_round("more", "words");

        // Source agent's persisted history is untouched by the copy's growth.
        assert_eq!(
            contents(&store.persisted("main").unwrap()),
            vec!["hi", "hello"]
        );
        session.switch("main").await.unwrap();
        assert_eq!(contents(session.history()), vec!["hi", "hello"]);
        assert_eq!(
            contents(&store.persisted("branch").unwrap()),
            vec!["hi", "hello", "more", "words"]
        );
    }

    #[tokio::test]
    async fn switch_unknown_agent_is_rejected() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;

        let err = session.switch("ghost").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(session.active().as_str(), "main");
    }

    #[tokio::test]
    async fn delete_main_is_rejected() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;

        let err = session.delete("main").await.unwrap_err();

        assert!(matches!(err, QuillError::UserInput(_)));
        assert!(session.list_agents().contains(&AgentId::main()));
    }

    #[tokio::test]
    async fn delete_unknown_agent_is_rejected() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;

        let err = session.delete("ghost").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_non_active_agent_keeps_the_active_one() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.fork("work").await.unwrap();
        session.switch("main").await.unwrap();

        let outcome = session.delete("work").await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::Deleted {
                id: AgentId::sanitize("work"),
            }
        );
        assert_eq!(session.active().as_str(), "main");
        assert!(store.persisted("work").is_none());
        assert_eq!(session.list_agents(), vec![AgentId::main()]);
    }

    #[tokio::test]
    async fn delete_active_agent_falls_back_to_main() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");
        session.fork("work").await.unwrap();
        session.record_round("scratch", "reply");

        let outcome = session.delete("work").await.unwrap();

        assert_eq!(
            outcome,
            SessionOutcome::DeletedActive {
                id: AgentId::sanitize("work"),
                load_ok: true,
            }
        );
        assert_eq!(session.active(), &AgentId::main());
        assert_eq!(contents(session.history()), vec!["hi", "hello"]);
        assert!(store.persisted("work").is_none());
    }

    #[tokio::test]
    async fn record_round_appends_exactly_two_messages_in_order() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;

        session.record_round("hi", "hello");

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, MessageRole::User);
        assert_eq!(session.history()[0].content, "hi");
        assert_eq!(session.history()[1].role, MessageRole::Assistant);
        assert_eq!(session.history()[1].content, "hello");
    }

    #[tokio::test]
    async fn turns_for_request_appends_user_turn_without_recording() {
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store).await;
        session.record_round("hi", "hello");

        let turns = session.turns_for_request("next");

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].role, MessageRole::User);
        assert_eq!(turns[2].content, "next");
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn fork_then_switch_round_trips_main_history() {
        // The canonical session walk: chat on main, fork, switch back.
        let store = Arc::new(MockAgentStore::default());
        let mut session = open_session(store.clone()).await;
        session.record_round("hi", "hello");

        session.fork("work").await.unwrap();
        assert_eq!(session.active().as_str(), "work");
        assert!(session.history().is_empty());
        assert_eq!(
            contents(&store.persisted("main").unwrap()),
            vec!["hi", "hello"]
        );

        session.switch("main").await.unwrap();
        assert_eq!(contents(session.history()), vec!["hi", "hello"]);
    }
}
