//! Error types for the chat relay
//!
//! Defines connection-level errors, recipient send errors and configuration
//! errors. Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Connection-scoped errors
///
/// None of these ever reach the accept loop; the handler logs them and
/// runs its cleanup.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error on the client socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound bytes were not valid UTF-8
    #[error("Invalid UTF-8 in client input: {0}")]
    Decode(#[from] std::str::Utf8Error),

    /// Hub actor is gone (server shutting down)
    #[error("Chat hub unavailable")]
    HubClosed,
}

/// Message send errors
///
/// Occurs when pushing a line to a recipient whose writer task has ended.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for our schema
    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
