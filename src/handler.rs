//! Per-connection handler
//!
//! Drives one client through `AwaitingNickname → Active → Closed`:
//! prompt for a nickname, join the hub (which replays history), then relay
//! every inbound unit to the hub until end-of-stream. Leaving the hub is
//! tied to a drop guard, so it happens on clean EOF, on error, and if the
//! handler future is dropped.
//!
//! Outbound traffic never touches the socket from here directly: every line
//! goes through an unbounded channel drained by a dedicated writer task, so
//! the hub can enqueue without waiting on slow peers.

use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec::InboundCodec;
use crate::config::ChatSettings;
use crate::error::AppError;
use crate::hub::HubHandle;
use crate::message::{name_taken_line, NICKNAME_PROMPT};
use crate::registry::ClientHandle;
use crate::types::{ClientId, JoinOutcome};

type Inbound<R> = FramedRead<R, InboundCodec>;

/// A joined client's place in the hub
///
/// Dropping it sends `Leave`: deregister, then announce the departure.
/// It exists from the moment `Join` is sent, so a handler dropped while
/// waiting for the hub's answer still cleans up.
struct Membership {
    hub: HubHandle,
    nickname: String,
    client_id: ClientId,
    armed: bool,
}

impl Membership {
    fn new(hub: &HubHandle, nickname: String, client_id: ClientId) -> Self {
        Self {
            hub: hub.clone(),
            nickname,
            client_id,
            armed: true,
        }
    }

    /// The hub refused the name; nothing to leave
    fn disarm(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.nickname)
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.hub.leave(&self.nickname, self.client_id).is_err() {
            debug!("Hub gone before '{}' could leave", self.nickname);
        }
    }
}

/// Handle a new connection
///
/// Returns once the client has disconnected and every queued line has been
/// written (or the socket has failed).
pub async fn handle_connection<S>(
    stream: S,
    peer: String,
    hub: HubHandle,
    settings: ChatSettings,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer);

    let (read_half, write_half) = tokio::io::split(stream);

    // Server -> client lines
    let (line_tx, line_rx) = mpsc::unbounded_channel::<String>();
    let write_task = tokio::spawn(write_lines(write_half, line_rx, peer.clone()));

    let mut inbound = FramedRead::new(
        read_half,
        InboundCodec::new(settings.framing, settings.nickname_chunk_size),
    );

    let outcome = run_session(&mut inbound, &line_tx, &hub, client_id, &peer, &settings).await;

    // Writer finishes once the hub has dropped its copy of our handle
    drop(line_tx);
    drop(inbound);
    if let Err(e) = write_task.await {
        warn!("Write task for {} panicked: {}", peer, e);
    }

    info!("Client {} ({}) disconnected", client_id, peer);
    outcome
}

async fn run_session<R>(
    inbound: &mut Inbound<R>,
    line_tx: &mpsc::UnboundedSender<String>,
    hub: &HubHandle,
    client_id: ClientId,
    peer: &str,
    settings: &ChatSettings,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    let Some(membership) = choose_nickname(inbound, line_tx, hub, client_id, peer).await? else {
        debug!("{} closed before choosing a nickname", peer);
        return Ok(());
    };

    inbound
        .decoder_mut()
        .set_chunk_limit(settings.message_chunk_size);

    relay_messages(inbound, &membership).await
}

/// AwaitingNickname: prompt, read, trim, try to join
///
/// Returns `None` if the stream ends first.
async fn choose_nickname<R>(
    inbound: &mut Inbound<R>,
    line_tx: &mpsc::UnboundedSender<String>,
    hub: &HubHandle,
    client_id: ClientId,
    peer: &str,
) -> Result<Option<Membership>, AppError>
where
    R: AsyncRead + Unpin,
{
    loop {
        let _ = line_tx.send(NICKNAME_PROMPT.to_string());

        let Some(raw) = inbound.next().await.transpose()? else {
            return Ok(None);
        };
        let nickname = raw.trim().to_string();

        let handle = ClientHandle::new(client_id, peer, line_tx.clone());
        let pending = Membership::new(hub, nickname, client_id);
        match hub.join(&pending.nickname, handle).await? {
            JoinOutcome::Joined => return Ok(Some(pending)),
            JoinOutcome::NameTaken => {
                let nickname = pending.disarm();
                let _ = line_tx.send(name_taken_line(&nickname));
            }
        }
    }
}

/// Active: every inbound unit becomes one stored, broadcast message
async fn relay_messages<R>(inbound: &mut Inbound<R>, membership: &Membership) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    while let Some(content) = inbound.next().await {
        let content = content?;
        debug!("{}: {:?}", membership.nickname, content);
        membership.hub.chat(&membership.nickname, content)?;
    }
    Ok(())
}

/// Drain queued lines to the socket, flushing after each
async fn write_lines<W>(mut writer: W, mut lines: mpsc::UnboundedReceiver<String>, peer: String)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            debug!("Write to {} failed, ending write task: {}", peer, e);
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!("Flush to {} failed, ending write task: {}", peer, e);
            break;
        }
    }

    let _ = writer.shutdown().await;
    debug!("Write task ended for {}", peer);
}
