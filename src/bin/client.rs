//! Chat Relay Client - Entry Point
//!
//! Connects to a relay and wires stdin/stdout to the chat session.

use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use chat_relay::{ChatClient, Framing};

/// Terminal client for the chat relay
#[derive(Parser, Debug)]
#[command(name = "chat_relay_client")]
#[command(version, about)]
struct Args {
    /// Server address
    #[arg(short, long, env = "CHAT_RELAY_ADDR", default_value = "127.0.0.1:8888")]
    addr: String,

    /// Must match the server's framing
    #[arg(long, value_enum, default_value_t = Framing::Lines)]
    framing: Framing,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr and default to warnings so the chat stays readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=warn")),
        )
        .init();

    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(run(args));

    // Stdin reads sit on a blocking thread that cannot be interrupted
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let stream = TcpStream::connect(&args.addr).await?;
    info!("Connected to {}", args.addr);
    let (from_server, to_server) = stream.into_split();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            on_interrupt.cancel();
        }
    });

    ChatClient::new(args.framing)
        .run(
            from_server,
            to_server,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            cancel,
        )
        .await?;

    Ok(())
}
