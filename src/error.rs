//! Error types shared by the harness library.

use std::io;
use std::net::SocketAddr;
use std::str::Utf8Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// No datagram socket could be allocated. Fatal at startup.
    #[error("failed to open datagram socket on {addr}: {source}")]
    Open {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to send datagram: {0}")]
    Send(#[source] io::Error),
    #[error("failed to receive datagram: {0}")]
    Receive(#[source] io::Error),
    /// The transport was closed while a receive was pending.
    #[error("transport closed")]
    Closed,
    /// An inbound payload was not valid UTF-8.
    #[error("inbound payload is not valid UTF-8: {0}")]
    Decode(#[from] Utf8Error),
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidConfig { key: &'static str, value: String },
    #[error("failed to start receiver thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("{0}")]
    Paths(String),
    #[error("terminal error: {0}")]
    Terminal(#[source] io::Error),
}

impl HarnessError {
    /// Whether the receiver loop should stop on this error rather than skip it.
    pub fn is_terminal_for_receiver(&self) -> bool {
        matches!(self, HarnessError::Closed)
    }
}
