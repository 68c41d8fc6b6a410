//! TCP accept loop
//!
//! Binds the listener, starts the hub, and spawns one handler task per
//! accepted connection until told to shut down.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info};

use crate::config::ChatSettings;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::hub::{ChatHub, HubHandle};

/// Listening chat relay
pub struct Server {
    listener: TcpListener,
    hub: HubHandle,
    settings: ChatSettings,
}

impl Server {
    /// Bind `addr` and start a fresh hub
    pub async fn bind<A: ToSocketAddrs>(addr: A, settings: ChatSettings) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await?;
        let hub = ChatHub::spawn(settings.nickname_policy);
        Ok(Self {
            listener,
            hub,
            settings,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Handlers already running are left to finish on their own.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server is shutting down...");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            info!("New connection from {}", addr);
                            let hub = self.hub.clone();
                            let settings = self.settings.clone();

                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr.to_string(), hub, settings).await {
                                    error!("Connection handler error for {}: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Framing, NicknamePolicy};
    use crate::message::{separator_line, NICKNAME_PROMPT};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio_util::sync::CancellationToken;

    async fn start(settings: ChatSettings) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
        let server = Server::bind("127.0.0.1:0", settings).await.unwrap();
        let addr = server.local_addr().unwrap();
        let token = CancellationToken::new();
        let shutdown = token.clone();
        let task = tokio::spawn(server.run(async move { shutdown.cancelled().await }));
        (addr, token, task)
    }

    async fn expect(stream: &mut TcpStream, expected: &str) {
        let mut buf = vec![0u8; expected.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    async fn join(addr: SocketAddr, nickname: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        expect(&mut stream, NICKNAME_PROMPT).await;
        stream
            .write_all(format!("{}\n", nickname).as_bytes())
            .await
            .unwrap();
        expect(&mut stream, &separator_line()).await;
        stream
    }

    #[tokio::test]
    async fn test_alice_bob_over_tcp() {
        let (addr, token, _task) = start(ChatSettings::default()).await;

        let mut alice = join(addr, "alice").await;
        let mut bob = join(addr, "bob").await;
        expect(&mut bob, "alice: joined the chat\n").await;
        expect(&mut alice, "bob: joined the chat\n").await;

        alice.write_all(b"hello\n").await.unwrap();
        expect(&mut bob, "alice: hello\n").await;

        drop(bob);
        expect(&mut alice, "bob: left the chat\n").await;

        token.cancel();
    }

    #[tokio::test]
    async fn test_three_clients_see_global_order() {
        let (addr, token, _task) = start(ChatSettings::default()).await;

        let mut a = join(addr, "a").await;
        let mut b = join(addr, "b").await;
        expect(&mut b, "a: joined the chat\n").await;
        expect(&mut a, "b: joined the chat\n").await;
        let mut c = join(addr, "c").await;
        expect(&mut c, "a: joined the chat\n").await;
        expect(&mut c, "b: joined the chat\n").await;
        expect(&mut a, "c: joined the chat\n").await;
        expect(&mut b, "c: joined the chat\n").await;

        a.write_all(b"from a\n").await.unwrap();
        expect(&mut c, "a: from a\n").await;
        b.write_all(b"from b\n").await.unwrap();
        expect(&mut c, "b: from b\n").await;

        // a sees only b's line, b sees only a's line, in append order
        expect(&mut a, "b: from b\n").await;
        expect(&mut b, "a: from a\n").await;

        token.cancel();
    }

    #[tokio::test]
    async fn test_duplicate_nickname_overwrites() {
        let settings = ChatSettings {
            framing: Framing::Lines,
            nickname_policy: NicknamePolicy::Overwrite,
            ..ChatSettings::default()
        };
        let (addr, token, _task) = start(settings).await;

        let mut watcher = join(addr, "watcher").await;
        let first = join(addr, "dave").await;
        expect(&mut watcher, "dave: joined the chat\n").await;
        let mut second = join(addr, "dave").await;
        expect(&mut watcher, "dave: joined the chat\n").await;
        expect(&mut second, "watcher: joined the chat\n").await;
        expect(&mut second, "dave: joined the chat\n").await;

        // Only the second dave is registered now
        watcher.write_all(b"who is there?\n").await.unwrap();
        expect(&mut second, "watcher: who is there?\n").await;

        // The orphaned first dave leaving does not evict the second
        drop(first);
        expect(&mut watcher, "dave: left the chat\n").await;
        watcher.write_all(b"still there?\n").await.unwrap();
        expect(&mut second, "watcher: still there?\n").await;

        token.cancel();
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let (addr, token, task) = start(ChatSettings::default()).await;

        token.cancel();
        task.await.unwrap();

        assert!(TcpStream::connect(addr).await.is_err());
    }
}
