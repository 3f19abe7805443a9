//! Initiator role: dial the edge node and push verdict tokens

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::token::Token;
use super::TransportError;
use crate::config::defaults::{KEEPALIVE_IDLE_SECS, KEEPALIVE_INTERVAL_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// The write failed; the link is now degraded.
    Failed,
    /// A previous send failed; nothing was written.
    SkippedDegraded,
    /// No link is open.
    NoLink,
}

/// One established connection to the edge node.
///
/// Never repaired in place: after a failed send it stays degraded until
/// the owner replaces it through [`Initiator::connect`].
#[derive(Debug)]
pub struct TransportLink {
    stream: TcpStream,
    peer: SocketAddr,
    degraded: bool,
    sends: u64,
}

impl TransportLink {
    /// Fire-and-forget write of one token. Never retries.
    pub async fn send(&mut self, token: Token) -> SendOutcome {
        if self.degraded {
            debug!(%token, peer = %self.peer, "[Transport] Link degraded, send skipped");
            return SendOutcome::SkippedDegraded;
        }
        match self.stream.write_all(token.as_bytes()).await {
            Ok(()) => {
                self.sends += 1;
                debug!(%token, "[Transport] Sent");
                SendOutcome::Sent
            }
            Err(e) => {
                warn!(%token, peer = %self.peer, error = %e, "[Transport] Send failed, link degraded until reconnect");
                self.degraded = true;
                SendOutcome::Failed
            }
        }
    }

    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub const fn sends(&self) -> u64 {
        self.sends
    }

    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
        debug!(peer = %self.peer, "[Transport] Link closed");
    }
}

/// Connection manager for the vision node. Holds at most one link.
pub struct Initiator {
    host: String,
    port: u16,
    connect_timeout: Duration,
    link: Option<TransportLink>,
    connects: u64,
}

impl Initiator {
    pub fn new(host: &str, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            connect_timeout,
            link: None,
            connects: 0,
        }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Close any current link, then open a fresh one.
    pub async fn connect(&mut self) -> Result<&mut TransportLink, TransportError> {
        if let Some(old) = self.link.take() {
            info!(peer = %old.peer_addr(), "[Transport] Closing previous link before reconnect");
            old.close().await;
        }

        let addr = self.target();
        info!(address = %addr, "[Transport] Connecting to edge node");

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| TransportError::ConnectTimeout(addr.clone()))?
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::ConnectionRefused {
                    TransportError::ConnectRefused(addr.clone())
                } else {
                    TransportError::ConnectFailed {
                        addr: addr.clone(),
                        source,
                    }
                }
            })?;

        // Detect a dead edge node between sparse sends
        let sock_ref = socket2::SockRef::from(&stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(Duration::from_secs(KEEPALIVE_IDLE_SECS))
            .with_interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
        let _ = sock_ref.set_tcp_keepalive(&keepalive);
        let _ = stream.set_nodelay(true);

        let peer = stream.peer_addr().map_err(|source| TransportError::ConnectFailed {
            addr: addr.clone(),
            source,
        })?;
        self.connects += 1;
        info!(peer = %peer, "🔗 [Transport] Connected to edge node");

        Ok(self.link.insert(TransportLink {
            stream,
            peer,
            degraded: false,
            sends: 0,
        }))
    }

    /// Send on the current link, if any.
    pub async fn send(&mut self, token: Token) -> SendOutcome {
        match self.link.as_mut() {
            Some(link) => link.send(token).await,
            None => {
                debug!(%token, "[Transport] No link, send skipped");
                SendOutcome::NoLink
            }
        }
    }

    pub fn link(&self) -> Option<&TransportLink> {
        self.link.as_ref()
    }

    /// True when a link is open and not degraded.
    pub fn is_active(&self) -> bool {
        self.link.as_ref().is_some_and(|l| !l.is_degraded())
    }

    pub const fn connects(&self) -> u64 {
        self.connects
    }

    pub async fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const CONNECT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_send_writes_bare_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let mut initiator = Initiator::new("127.0.0.1", port, CONNECT);

        let (connected, accepted) = tokio::join!(initiator.connect(), listener.accept());
        connected.expect("connect");
        let (mut server, _) = accepted.expect("accept");

        assert_eq!(initiator.send(Token::Danger).await, SendOutcome::Sent);
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).await.expect("read");
        assert_eq!(&buf[..n], b"DANGER");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            l.local_addr().expect("addr").port()
        };
        let mut initiator = Initiator::new("127.0.0.1", port, CONNECT);
        assert!(matches!(
            initiator.connect().await,
            Err(TransportError::ConnectRefused(_))
        ));
        assert!(!initiator.is_active());
        assert_eq!(initiator.send(Token::Safe).await, SendOutcome::NoLink);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_link() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let mut initiator = Initiator::new("127.0.0.1", port, CONNECT);

        let (first, accepted) = tokio::join!(initiator.connect(), listener.accept());
        let first_local = first.expect("connect").stream.local_addr().expect("local");
        let (mut old_server, _) = accepted.expect("accept");

        let (second, _accepted) = tokio::join!(initiator.connect(), listener.accept());
        let second_local = second.expect("reconnect").stream.local_addr().expect("local");
        assert_ne!(first_local, second_local);
        assert_eq!(initiator.connects(), 2);

        // The old connection was closed by the reconnect
        let mut buf = [0u8; 8];
        let n = old_server.read(&mut buf).await.expect("read");
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_failed_send_degrades_link() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let mut initiator = Initiator::new("127.0.0.1", port, CONNECT);

        let (connected, accepted) = tokio::join!(initiator.connect(), listener.accept());
        connected.expect("connect");
        drop(accepted.expect("accept"));

        // The first write after the peer vanished may still be buffered;
        // the reset surfaces on a later one.
        let mut outcome = SendOutcome::Sent;
        for _ in 0..50 {
            outcome = initiator.send(Token::Safe).await;
            if outcome != SendOutcome::Sent {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(outcome, SendOutcome::Failed);
        assert!(!initiator.is_active());
        assert_eq!(initiator.send(Token::Safe).await, SendOutcome::SkippedDegraded);
        assert!(initiator.link().is_some_and(TransportLink::is_degraded));
    }
}
