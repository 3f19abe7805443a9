//! Duplex transport between the two nodes
//!
//! The edge node is the [`Acceptor`]: it binds once, waits for a single
//! peer before sampling starts, then polls for tokens with a short timeout
//! every tick. The vision node is the [`Initiator`]: it dials out and owns
//! one [`TransportLink`] at a time, replaced wholesale on every reconnect.

pub mod acceptor;
pub mod initiator;
pub mod token;

pub use acceptor::{Acceptor, AcceptorStats, LinkState, Received};
pub use initiator::{Initiator, SendOutcome, TransportLink};
pub use token::{RemoteVerdict, Token};

use std::net::SocketAddr;
use thiserror::Error;

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Accept failed: {0}")]
    Accept(std::io::Error),

    #[error("Connection refused by {0}")]
    ConnectRefused(String),

    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        source: std::io::Error,
    },

    #[error("Acceptor is not listening")]
    NotListening,

    #[error("Already connected to {0}; single-peer protocol")]
    AlreadyConnected(SocketAddr),
}
