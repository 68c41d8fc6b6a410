//! Connected client registry
//!
//! Maps display names to the outbound channel of the connection that chose
//! them. This is the authoritative set of clients that receive broadcasts.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::types::ClientId;

/// Outbound write capability for one connection
///
/// Lines pushed here are written to the socket, in order, by that
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Identity of the owning connection
    pub id: ClientId,
    /// Peer address, for logging
    pub peer: String,
    /// Hub → writer task line channel
    sender: mpsc::UnboundedSender<String>,
}

impl ClientHandle {
    pub fn new(id: ClientId, peer: impl Into<String>, sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            peer: peer.into(),
            sender,
        }
    }

    /// Queue a line for this client
    ///
    /// Never blocks. Returns an error if the writer task has ended.
    pub fn send(&self, line: String) -> Result<(), SendError> {
        self.sender.send(line).map_err(|_| SendError::ChannelClosed)
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Nickname → handle mapping
///
/// Names are not required to be unique: `register` overwrites silently and
/// hands back the displaced handle.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, ClientHandle>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `name`
    ///
    /// Returns the previous handle if one was displaced.
    pub fn register(&mut self, name: &str, handle: ClientHandle) -> Option<ClientHandle> {
        self.clients.insert(name.to_string(), handle)
    }

    /// Remove the entry for `name`, if any
    pub fn unregister(&mut self, name: &str) -> Option<ClientHandle> {
        self.clients.remove(name)
    }

    /// Remove the entry for `name` only if it still belongs to `id`
    pub fn unregister_client(&mut self, name: &str, id: ClientId) -> Option<ClientHandle> {
        match self.clients.get(name) {
            Some(handle) if handle.id == id => self.clients.remove(name),
            _ => None,
        }
    }

    /// Every registered client except the one named `excluded_name`
    pub fn each_except<'a>(
        &'a self,
        excluded_name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a ClientHandle)> + 'a {
        self.clients
            .iter()
            .filter(move |(name, _)| name.as_str() != excluded_name)
            .map(|(name, handle)| (name.as_str(), handle))
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&ClientHandle> {
        self.clients.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clients.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
