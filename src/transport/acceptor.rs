//! Acceptor role: bind, admit one peer, poll for tokens each tick

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::token::{RemoteVerdict, Token};
use super::TransportError;
use crate::config::defaults::RECEIVE_BUFFER_SIZE;

/// Result of one receive poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Token(Token),
    /// Data arrived but was not exactly one token.
    Unrecognized(String),
    /// Nothing arrived within the receive timeout, or there is no peer.
    Empty,
    /// The peer went away during this poll.
    PeerClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Bound, no peer yet
    Listening,
    Connected(SocketAddr),
    /// Peer gone, or the acceptor was never bound
    Disconnected,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptorStats {
    pub tokens_received: u64,
    pub unrecognized: u64,
    pub disconnects: u64,
}

/// Listening side of the link. Owns at most one peer.
pub struct Acceptor {
    listener: Option<TcpListener>,
    peer: Option<(TcpStream, SocketAddr)>,
    state: LinkState,
    verdict: RemoteVerdict,
    receive_timeout: Duration,
    buf: Vec<u8>,
    stats: AcceptorStats,
}

impl Acceptor {
    /// Bind and listen on `addr`.
    pub async fn bind(addr: &str, receive_timeout: Duration) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, "[Transport] Listening for vision node");
        }
        Ok(Self::with_listener(Some(listener), LinkState::Listening, receive_timeout))
    }

    /// An acceptor that never has a peer. Every receive is `Empty`.
    pub fn disabled(receive_timeout: Duration) -> Self {
        Self::with_listener(None, LinkState::Disconnected, receive_timeout)
    }

    fn with_listener(
        listener: Option<TcpListener>,
        state: LinkState,
        receive_timeout: Duration,
    ) -> Self {
        Self {
            listener,
            peer: None,
            state,
            verdict: RemoteVerdict::Absent,
            receive_timeout,
            buf: vec![0u8; RECEIVE_BUFFER_SIZE],
            stats: AcceptorStats::default(),
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub const fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub const fn state(&self) -> LinkState {
        self.state
    }

    pub const fn verdict(&self) -> RemoteVerdict {
        self.verdict
    }

    pub const fn stats(&self) -> AcceptorStats {
        self.stats
    }

    /// Wait for one peer. Blocks until a connection arrives.
    ///
    /// Cancel-safe: dropping the future leaves the acceptor listening.
    pub async fn accept_peer(&mut self) -> Result<SocketAddr, TransportError> {
        if let Some((_, addr)) = &self.peer {
            return Err(TransportError::AlreadyConnected(*addr));
        }
        let listener = self.listener.as_ref().ok_or(TransportError::NotListening)?;
        let (stream, addr) = listener.accept().await.map_err(TransportError::Accept)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "[Transport] set_nodelay failed");
        }

        self.peer = Some((stream, addr));
        self.state = LinkState::Connected(addr);
        self.verdict = RemoteVerdict::Absent;
        info!(peer = %addr, "🔗 [Transport] Vision node connected");
        Ok(addr)
    }

    /// Poll the peer once, waiting at most the receive timeout.
    ///
    /// A recognized token replaces the verdict. Unrecognized data leaves it
    /// untouched. A closed or reset peer drops the verdict to `Absent`.
    pub async fn receive(&mut self) -> Received {
        let Some((stream, _)) = self.peer.as_mut() else {
            return Received::Empty;
        };

        let read = tokio::time::timeout(self.receive_timeout, stream.read(&mut self.buf)).await;
        match read {
            Err(_elapsed) => Received::Empty,
            Ok(Ok(0)) => self.drop_peer("closed by peer"),
            Ok(Ok(n)) => {
                let bytes = &self.buf[..n];
                if let Some(token) = Token::parse(bytes) {
                    self.verdict = token.into();
                    self.stats.tokens_received += 1;
                    debug!(%token, "[Transport] Token received");
                    Received::Token(token)
                } else {
                    let text = String::from_utf8_lossy(bytes).into_owned();
                    self.stats.unrecognized += 1;
                    warn!(payload = %text.escape_debug(), "[Transport] Ignoring unrecognized message");
                    Received::Unrecognized(text)
                }
            }
            Ok(Err(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                ) =>
            {
                Received::Empty
            }
            Ok(Err(e)) => {
                warn!(error = %e, "[Transport] Receive failed");
                self.drop_peer("connection error")
            }
        }
    }

    fn drop_peer(&mut self, reason: &str) -> Received {
        if let Some((_, addr)) = self.peer.take() {
            warn!(peer = %addr, reason, "🔌 [Transport] Vision node disconnected, remote verdict cleared");
        }
        self.verdict = RemoteVerdict::Absent;
        self.state = LinkState::Disconnected;
        self.stats.disconnects += 1;
        Received::PeerClosed
    }

    /// Shut down the peer connection and stop listening.
    pub async fn close(&mut self) {
        if let Some((mut stream, addr)) = self.peer.take() {
            let _ = stream.shutdown().await;
            info!(peer = %addr, "[Transport] Link closed");
        }
        self.listener = None;
        self.verdict = RemoteVerdict::Absent;
        self.state = LinkState::Disconnected;
    }
}
