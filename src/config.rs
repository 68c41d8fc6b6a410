//! Server configuration
//!
//! Layered as defaults, then an optional TOML file, then command line
//! overrides applied by the binary.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8888
//!
//! [chat]
//! framing = "lines"            # or "chunked"
//! nickname_policy = "overwrite" # or "reject"
//! nickname_chunk_size = 1000
//! message_chunk_size = 100
//! ```

use std::path::Path;

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8888;

/// How inbound bytes are cut into nicknames and messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// Newline-delimited messages
    #[default]
    Lines,
    /// Whatever one read returns, capped at the chunk size
    Chunked,
}

/// What happens when a nickname is already registered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NicknamePolicy {
    /// Newcomer silently replaces the existing registry entry
    #[default]
    Overwrite,
    /// Newcomer is told the name is taken and prompted again
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-connection protocol settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatSettings {
    pub framing: Framing,
    pub nickname_policy: NicknamePolicy,
    /// Read cap while waiting for a nickname (chunked framing only)
    pub nickname_chunk_size: usize,
    /// Read cap for chat messages (chunked framing only)
    pub message_chunk_size: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            nickname_policy: NicknamePolicy::default(),
            nickname_chunk_size: 1000,
            message_chunk_size: 100,
        }
    }
}

impl Config {
    /// Load from `path` if given, otherwise use defaults, then validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        if self.chat.nickname_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chat.nickname_chunk_size must be at least 1".into(),
            ));
        }
        if self.chat.message_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chat.message_chunk_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
