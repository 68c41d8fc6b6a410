//! Fan-out of chat events to connected clients

use tracing::warn;

use crate::message::Message;
use crate::registry::ClientRegistry;

/// Pushes a message to every registered client except its sender
///
/// Best effort: a recipient whose channel is closed is logged and skipped,
/// delivery to the others continues.
pub struct Broadcaster<'a> {
    registry: &'a ClientRegistry,
}

impl<'a> Broadcaster<'a> {
    pub fn new(registry: &'a ClientRegistry) -> Self {
        Self { registry }
    }

    /// Forward `message` as `"{sender_name}: {content}\n"`
    ///
    /// Returns how many recipients accepted the line.
    pub fn forward(&self, sender_name: &str, message: &Message) -> usize {
        let line = format!("{}: {}\n", sender_name, message.content);
        let mut delivered = 0;

        for (name, handle) in self.registry.each_except(sender_name) {
            match handle.send(line.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Dropping message {} for {} ({}): {}",
                        message.sequence_id, name, handle.peer, e
                    );
                }
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClientHandle;
    use crate::types::ClientId;
    use tokio::sync::mpsc;

    fn register(
        registry: &mut ClientRegistry,
        name: &str,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(name, ClientHandle::new(ClientId::new(), "test", tx));
        rx
    }

    #[test]
    fn test_forward_skips_sender() {
        let mut registry = ClientRegistry::new();
        let mut alice = register(&mut registry, "alice");
        let mut bob = register(&mut registry, "bob");
        let mut carol = register(&mut registry, "carol");

        let msg = Message::new("alice", "hello", 1);
        let delivered = Broadcaster::new(&registry).forward("alice", &msg);

        assert_eq!(delivered, 2);
        assert_eq!(bob.try_recv().ok().as_deref(), Some("alice: hello\n"));
        assert_eq!(carol.try_recv().ok().as_deref(), Some("alice: hello\n"));
        assert!(alice.try_recv().is_err());
        // Exactly once
        assert!(bob.try_recv().is_err());
        assert!(carol.try_recv().is_err());
    }

    #[test]
    fn test_closed_recipient_does_not_abort_delivery() {
        let mut registry = ClientRegistry::new();
        let gone = register(&mut registry, "gone");
        let mut bob = register(&mut registry, "bob");
        let mut carol = register(&mut registry, "carol");
        drop(gone);

        let msg = Message::new("alice", "still here?", 4);
        let delivered = Broadcaster::new(&registry).forward("alice", &msg);

        assert_eq!(delivered, 2);
        assert_eq!(bob.try_recv().ok().as_deref(), Some("alice: still here?\n"));
        assert_eq!(carol.try_recv().ok().as_deref(), Some("alice: still here?\n"));
    }

    #[test]
    fn test_forward_to_empty_registry() {
        let registry = ClientRegistry::new();
        let msg = Message::new("carol", "joined the chat", 1);
        assert_eq!(Broadcaster::new(&registry).forward("carol", &msg), 0);
    }
}
