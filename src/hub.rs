//! ChatHub actor implementation
//!
//! The single owner of the message history and the client registry.
//! Connection handlers never touch either directly: they send commands
//! through a `HubHandle` and the hub applies them one at a time.
//!
//! Because the hub is the only writer to both structures *and* the only
//! task that enqueues lines on client channels, every client observes
//! messages in global append order, and a joining client's history replay
//! is followed exactly by the live messages appended after it.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::broadcast::Broadcaster;
use crate::config::NicknamePolicy;
use crate::error::AppError;
use crate::message::{separator_line, JOINED_CONTENT, LEFT_CONTENT};
use crate::registry::{ClientHandle, ClientRegistry};
use crate::store::MessageStore;
use crate::types::{ClientId, JoinOutcome};

/// Commands sent from connection handlers to the hub
#[derive(Debug)]
pub enum HubCommand {
    /// Nickname chosen: register, replay history, announce
    Join {
        nickname: String,
        handle: ClientHandle,
        respond: oneshot::Sender<JoinOutcome>,
    },
    /// New chat message from a joined client
    Chat { nickname: String, content: String },
    /// Connection closed: deregister and announce
    Leave {
        nickname: String,
        client_id: ClientId,
    },
}

/// The hub actor
pub struct ChatHub {
    store: MessageStore,
    registry: ClientRegistry,
    policy: NicknamePolicy,
    receiver: mpsc::UnboundedReceiver<HubCommand>,
}

impl ChatHub {
    pub fn new(receiver: mpsc::UnboundedReceiver<HubCommand>, policy: NicknamePolicy) -> Self {
        Self {
            store: MessageStore::new(),
            registry: ClientRegistry::new(),
            policy,
            receiver,
        }
    }

    /// Start a hub on the current runtime and return its handle
    pub fn spawn(policy: NicknamePolicy) -> HubHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(ChatHub::new(rx, policy).run());
        HubHandle::new(tx)
    }

    /// Run the hub event loop
    ///
    /// Processes commands until every `HubHandle` is dropped.
    pub async fn run(mut self) {
        info!("ChatHub started ({:?} nickname policy)", self.policy);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            "ChatHub shutting down with {} stored messages",
            self.store.len()
        );
    }

    fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Join {
                nickname,
                handle,
                respond,
            } => {
                let outcome = self.handle_join(&nickname, handle);
                // Handler may have gone away while waiting
                let _ = respond.send(outcome);
            }
            HubCommand::Chat { nickname, content } => {
                self.handle_chat(&nickname, &content);
            }
            HubCommand::Leave {
                nickname,
                client_id,
            } => {
                self.handle_leave(&nickname, client_id);
            }
        }
    }

    fn handle_join(&mut self, nickname: &str, handle: ClientHandle) -> JoinOutcome {
        if self.policy == NicknamePolicy::Reject && self.registry.contains(nickname) {
            info!("Nickname '{}' refused for {}: already taken", nickname, handle.peer);
            return JoinOutcome::NameTaken;
        }

        let peer = handle.peer.clone();
        if let Some(orphan) = self.registry.register(nickname, handle.clone()) {
            warn!(
                "Nickname '{}' taken over by {}; {} no longer receives messages",
                nickname, peer, orphan.peer
            );
        }

        let joined = self.store.append(nickname, JOINED_CONTENT);
        info!("{} ({}) {}", peer, nickname, JOINED_CONTENT);

        // Ack, then every earlier message in order
        let mut replay = std::iter::once(separator_line()).chain(
            self.store
                .all()
                .iter()
                .filter(|m| m.sequence_id != joined.sequence_id)
                .map(|m| m.render()),
        );
        if replay.try_for_each(|line| handle.send(line)).is_err() {
            debug!("{} closed before history replay finished", peer);
        }

        Broadcaster::new(&self.registry).forward(nickname, &joined);

        debug!(
            "Total clients: {}, stored messages: {}",
            self.registry.len(),
            self.store.len()
        );
        JoinOutcome::Joined
    }

    fn handle_chat(&mut self, nickname: &str, content: &str) {
        let message = self.store.append(nickname, content);
        let delivered = Broadcaster::new(&self.registry).forward(nickname, &message);
        debug!(
            "#{} {}: {:?} -> {} recipients",
            message.sequence_id, nickname, message.content, delivered
        );
    }

    fn handle_leave(&mut self, nickname: &str, client_id: ClientId) {
        if self.registry.unregister_client(nickname, client_id).is_none() {
            debug!(
                "No registry entry for '{}' owned by {}; already replaced or removed",
                nickname, client_id
            );
        }

        let left = self.store.append(nickname, LEFT_CONTENT);
        Broadcaster::new(&self.registry).forward(nickname, &left);
        info!("{} ({}) {}", nickname, client_id, LEFT_CONTENT);

        debug!(
            "Total clients: {}, stored messages: {}",
            self.registry.len(),
            self.store.len()
        );
    }
}

/// Cloneable sender side of the hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    pub fn new(sender: mpsc::UnboundedSender<HubCommand>) -> Self {
        Self { sender }
    }

    /// Ask to join under `nickname`
    ///
    /// On `Joined`, the separator and history replay are already queued on
    /// `handle` ahead of any live message.
    pub async fn join(&self, nickname: &str, handle: ClientHandle) -> Result<JoinOutcome, AppError> {
        let (respond, outcome) = oneshot::channel();
        self.sender
            .send(HubCommand::Join {
                nickname: nickname.to_string(),
                handle,
                respond,
            })
            .map_err(|_| AppError::HubClosed)?;
        outcome.await.map_err(|_| AppError::HubClosed)
    }

    pub fn chat(&self, nickname: &str, content: String) -> Result<(), AppError> {
        self.sender
            .send(HubCommand::Chat {
                nickname: nickname.to_string(),
                content,
            })
            .map_err(|_| AppError::HubClosed)
    }

    /// Synchronous so it can run from `Drop`
    pub fn leave(&self, nickname: &str, client_id: ClientId) -> Result<(), AppError> {
        self.sender
            .send(HubCommand::Leave {
                nickname: nickname.to_string(),
                client_id,
            })
            .map_err(|_| AppError::HubClosed)
    }
}
