//! Line-oriented TCP Chat Relay Library
//!
//! Clients connect over TCP, pick a nickname, and every message they send
//! is stored in an in-memory history and relayed to all other connected
//! clients. New clients get the full history replayed before live traffic.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatHub` owns the `MessageStore` and `ClientRegistry` and is the only
//!   task that mutates them or enqueues lines for clients
//! - Each connection runs `handle_connection`, which talks to the hub
//!   through a `HubHandle` and owns a writer task draining its line channel
//! - `Server` accepts connections and spawns one handler per connection
//!
//! # Example
//! ```ignore
//! use chat_relay::{ChatSettings, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind("127.0.0.1:8888", ChatSettings::default())
//!         .await
//!         .unwrap();
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod registry;
pub mod server;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use client::ChatClient;
pub use codec::InboundCodec;
pub use config::{ChatSettings, Config, Framing, NicknamePolicy, ServerConfig};
pub use error::{AppError, ConfigError, SendError};
pub use handler::handle_connection;
pub use hub::{ChatHub, HubCommand, HubHandle};
pub use message::Message;
pub use registry::{ClientHandle, ClientRegistry};
pub use server::Server;
pub use store::MessageStore;
pub use types::{ClientId, JoinOutcome};
