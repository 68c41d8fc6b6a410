//! Chat Relay Server - Entry Point
//!
//! Loads configuration, starts the listener and hub, and accepts
//! connections until Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_relay::{Config, Framing, NicknamePolicy, Server};

/// Line-oriented TCP chat relay
#[derive(Parser, Debug)]
#[command(name = "chat_relay")]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CHAT_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host (overrides the config file)
    #[arg(long, env = "CHAT_RELAY_HOST")]
    host: Option<String>,

    /// Bind port (overrides the config file)
    #[arg(short, long, env = "CHAT_RELAY_PORT")]
    port: Option<u16>,

    /// Inbound framing (overrides the config file)
    #[arg(long, value_enum)]
    framing: Option<Framing>,

    /// Duplicate nickname handling (overrides the config file)
    #[arg(long, value_enum)]
    nickname_policy: Option<NicknamePolicy>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_relay=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(framing) = args.framing {
        config.chat.framing = framing;
    }
    if let Some(policy) = args.nickname_policy {
        config.chat.nickname_policy = policy;
    }
    config.validate()?;

    let server = Server::bind(config.server.addr(), config.chat.clone()).await?;
    info!(
        "Serving on {} ({:?} framing)",
        server.local_addr()?,
        config.chat.framing
    );

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}
