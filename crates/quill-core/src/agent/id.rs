//! Agent identifiers.
//!
//! Agent ids are normalized tokens: lower-cased, with every character outside
//! `[a-z0-9_-]` replaced by `_`. Two raw inputs that normalize identically
//! refer to the same agent. The id `main` is reserved and always registered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved root agent. Always present, never deletable.
pub const MAIN_AGENT: &str = "main";

/// A normalized agent identifier.
///
/// Construct via [`AgentId::sanitize`]; the inner string is guaranteed to
/// contain only `[a-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Normalizes a raw user-supplied identifier.
    ///
    /// Lower-cases the input and replaces every character outside
    /// `[a-z0-9_-]` with `_`. Normalization is idempotent.
    pub fn sanitize(raw: &str) -> Self {
        let normalized = raw
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(normalized)
    }

    /// Returns the reserved `main` agent id.
    pub fn main() -> Self {
        Self(MAIN_AGENT.to_string())
    }

    /// True if this is the reserved `main` agent.
    pub fn is_main(&self) -> bool {
        self.0 == MAIN_AGENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_replaces_disallowed_chars() {
        assert_eq!(AgentId::sanitize("Work").as_str(), "work");
        assert_eq!(AgentId::sanitize("my agent!").as_str(), "my_agent_");
        assert_eq!(AgentId::sanitize("a.b/c").as_str(), "a_b_c");
        assert_eq!(AgentId::sanitize("ok_-2").as_str(), "ok_-2");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = AgentId::sanitize("Déjà Vu #1");
        let twice = AgentId::sanitize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn inputs_differing_only_by_case_normalize_identically() {
        assert_eq!(AgentId::sanitize("WORK"), AgentId::sanitize("work"));
        assert_eq!(AgentId::sanitize("My-Agent"), AgentId::sanitize("my-agent"));
    }

    #[test]
    fn main_is_reserved() {
        assert!(AgentId::main().is_main());
        assert!(AgentId::sanitize("MAIN").is_main());
        assert!(!AgentId::sanitize("maine").is_main());
    }
}
