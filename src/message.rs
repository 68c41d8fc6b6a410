//! Chat message and wire protocol definitions
//!
//! The protocol is plain text: a nickname prompt, a separator line, and one
//! `"{sender}: {content}\n"` line per stored or forwarded message.

/// Prompt sent to every new connection
pub const NICKNAME_PROMPT: &str = "Please choose a nickname: ";

/// Width of the separator line sent after a nickname is accepted
pub const SEPARATOR_WIDTH: usize = 100;

/// Content of the event appended when a client joins
pub const JOINED_CONTENT: &str = "joined the chat";

/// Content of the event appended when a client leaves
pub const LEFT_CONTENT: &str = "left the chat";

/// Separator line: 100 underscores followed by a newline
pub fn separator_line() -> String {
    let mut line = "_".repeat(SEPARATOR_WIDTH);
    line.push('\n');
    line
}

/// Notice sent when a nickname is refused under the reject policy
pub fn name_taken_line(nickname: &str) -> String {
    format!("Nickname '{}' is already taken\n", nickname)
}

/// A stored chat event
///
/// Immutable once created. The sequence id is assigned by `MessageStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Nickname of the author
    pub sender: String,
    /// Raw message text
    pub content: String,
    /// Position in the global history, starting at 1
    pub sequence_id: u64,
}

impl Message {
    pub fn new(sender: impl Into<String>, content: impl Into<String>, sequence_id: u64) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            sequence_id,
        }
    }

    /// Render as a wire line, `"{sender}: {content}\n"`
    pub fn render(&self) -> String {
        format!("{}: {}\n", self.sender, self.content)
    }
}
