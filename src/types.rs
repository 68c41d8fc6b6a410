//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based identity of one connection
//! - `JoinOutcome`: result of asking the hub to admit a nickname

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Nicknames are not unique, so registry cleanup compares this id to make
/// sure a connection only ever removes its own entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Answer to a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Registered, history replayed, join announced
    Joined,
    /// Another client holds the nickname and the policy forbids overwriting it
    NameTaken,
}
