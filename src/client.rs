//! Terminal chat client
//!
//! Runs two loops over one connection: one prints whatever the server sends,
//! the other forwards the user's lines. Each loop holds a drop guard on a
//! shared `CancellationToken`, so whichever ends first stops its sibling.

use bytes::BytesMut;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Framing;
use crate::error::AppError;

/// Typing this ends the session; it is not sent
pub const EXIT_COMMAND: &str = "exit";

/// Shown after every incoming message
pub const INPUT_PROMPT: &str = "You: ";

/// Erase the current terminal line and return the cursor
const CLEAR_LINE: &str = "\x1b[2K\r";

const READ_BUFFER_SIZE: usize = 1000;

/// Connected client session
#[derive(Debug, Clone, Copy)]
pub struct ChatClient {
    framing: Framing,
}

impl ChatClient {
    pub fn new(framing: Framing) -> Self {
        Self { framing }
    }

    /// Run until the user exits, input ends, the server closes, or `cancel`
    /// fires
    pub async fn run<SR, SW, I, O>(
        &self,
        from_server: SR,
        to_server: SW,
        input: I,
        output: O,
        cancel: CancellationToken,
    ) -> Result<(), AppError>
    where
        SR: AsyncRead + Unpin,
        SW: AsyncWrite + Unpin,
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (received, sent) = tokio::join!(
            receive_loop(from_server, output, cancel.clone()),
            send_loop(input, to_server, self.framing, cancel),
        );
        received?;
        sent
    }
}

async fn receive_loop<R, O>(mut server: R, mut output: O, cancel: CancellationToken) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let _done = cancel.clone().drop_guard();
    let mut pending = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        pending.reserve(READ_BUFFER_SIZE);
        let n = tokio::select! {
            _ = cancel.cancelled() => break,
            read = server.read_buf(&mut pending) => read?,
        };
        if n == 0 {
            debug!("Server closed the connection");
            break;
        }

        let text = take_complete_text(&mut pending);
        if text.is_empty() {
            continue;
        }
        let screen = format!("{}{}\n{}", CLEAR_LINE, text.trim(), INPUT_PROMPT);
        output.write_all(screen.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}

/// Split off everything up to a trailing partial character
///
/// The partial character stays in `pending` for the next read. Bytes that
/// can never become valid are shown as U+FFFD.
fn take_complete_text(pending: &mut BytesMut) -> String {
    let complete = match std::str::from_utf8(&pending[..]) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let chunk = pending.split_to(complete);
    String::from_utf8_lossy(&chunk).into_owned()
}

async fn send_loop<I, W>(
    input: I,
    mut server: W,
    framing: Framing,
    cancel: CancellationToken,
) -> Result<(), AppError>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let _done = cancel.clone().drop_guard();
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };
        if line.trim().eq_ignore_ascii_case(EXIT_COMMAND) {
            break;
        }

        let payload = match framing {
            Framing::Lines => format!("{}\n", line),
            Framing::Chunked => line,
        };
        server.write_all(payload.as_bytes()).await?;
        server.flush().await?;
    }

    let _ = server.shutdown().await;
    Ok(())
}
