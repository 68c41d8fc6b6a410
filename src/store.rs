//! Append-only message history
//!
//! Holds every chat event for the lifetime of the process, in insertion
//! order. Owned exclusively by the hub actor, so there is a single writer.

use crate::message::Message;

/// Insertion-ordered log of chat events
///
/// Sequence ids are `len() + 1` at append time: strictly increasing by one,
/// starting at 1, never reused. Nothing is ever pruned.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new event and return a copy of it
    pub fn append(&mut self, sender: &str, content: &str) -> Message {
        let message = Message::new(sender, content, self.messages.len() as u64 + 1);
        self.messages.push(message.clone());
        message
    }

    /// All stored events in insertion order
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
