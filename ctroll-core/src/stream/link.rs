//! Tick-driven TCP connection with a reconnect cooldown.
//!
//! Both channels own one [`Link`]. It is polled once per tick: a missing
//! connection is attempted (bounded by the connect timeout). After a
//! failed attempt, and after losing an established connection, the next
//! `retry_ticks` polls only count down. The caller's tick rate therefore
//! sets how aggressively the link reconnects.
//!
//! ```text
//!  Disconnected ──poll──► attempt ──failed──► Connecting{retry_ticks}
//!                            │  ▲                    │ poll (n>0): n-1
//!                     success│  └──── poll (n=0) ────┘
//!                            ▼                       ▲
//!                        Connected ── I/O failure ───┘
//! ```

use std::fmt;
use std::io::ErrorKind;
use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::StreamError;

// ── ConnectionState ──────────────────────────────────────────────

/// Lifecycle of a [`Link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket and no pending cooldown.
    #[default]
    Disconnected,
    /// No socket; `cooldown` polls remain before the next connect attempt.
    Connecting { cooldown: u32 },
    /// The socket is up.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting { cooldown } => write!(f, "Connecting (cooldown {cooldown})"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// What a [`Link::poll`] call observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPoll {
    /// The connection was already up.
    Up,
    /// The connection was established by this poll.
    JustConnected,
    /// No connection this tick.
    Down,
}

// ── Link ─────────────────────────────────────────────────────────

/// A single outbound TCP session with cooldown-throttled reconnects.
pub struct Link {
    name: &'static str,
    addr: SocketAddr,
    config: LinkConfig,
    stream: Option<TcpStream>,
    state: ConnectionState,
    attempts: u64,
    connects: u64,
}

impl Link {
    pub fn new(name: &'static str, addr: SocketAddr, config: LinkConfig) -> Self {
        Self {
            name,
            addr,
            config,
            stream: None,
            state: ConnectionState::Disconnected,
            attempts: 0,
            connects: 0,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Connect attempts made so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Successful connects so far.
    pub fn connects(&self) -> u64 {
        self.connects
    }

    /// Advance the connection lifecycle by one tick.
    pub async fn poll(&mut self) -> LinkPoll {
        let state = self.state;
        match state {
            ConnectionState::Connected => LinkPoll::Up,
            ConnectionState::Connecting { cooldown } if cooldown > 0 => {
                self.state = ConnectionState::Connecting {
                    cooldown: cooldown - 1,
                };
                LinkPoll::Down
            }
            ConnectionState::Disconnected | ConnectionState::Connecting { .. } => {
                match self.attempt().await {
                    Ok(stream) => {
                        info!("{} link connected to {}", self.name, self.addr);
                        self.stream = Some(stream);
                        self.state = ConnectionState::Connected;
                        self.connects += 1;
                        LinkPoll::JustConnected
                    }
                    Err(e) => {
                        debug!("{} link: {e}", self.name);
                        self.state = ConnectionState::Connecting {
                            cooldown: self.config.retry_ticks,
                        };
                        LinkPoll::Down
                    }
                }
            }
        }
    }

    /// Drop the socket after `reason` made it unusable. The next attempt
    /// waits out the usual cooldown.
    pub fn disconnect(&mut self, reason: &StreamError) {
        if self.stream.take().is_some() {
            warn!("{} link to {} lost: {reason}", self.name, self.addr);
        }
        self.state = ConnectionState::Connecting {
            cooldown: self.config.retry_ticks,
        };
    }

    /// Write all of `buf`, bounded by the write timeout.
    ///
    /// Any failure drops the connection.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        let timeout = self.config.write_timeout();
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;

        let result = match tokio::time::timeout(timeout, stream.write_all(buf)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(StreamError::WriteFailed(e)),
            Err(_) => Err(StreamError::Timeout(timeout)),
        };
        if let Err(e) = &result {
            self.disconnect(e);
        }
        result
    }

    /// Read whatever is already buffered, without waiting.
    ///
    /// Returns `Ok(None)` when nothing is available. Peer close and read
    /// errors drop the connection.
    pub fn try_read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StreamError> {
        let stream = self.stream.as_mut().ok_or(StreamError::NotConnected)?;

        let result = match stream.try_read(buf) {
            Ok(0) if !buf.is_empty() => Err(StreamError::PeerClosed),
            Ok(n) => return Ok(Some(n)),
            Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(None),
            Err(e) => Err(StreamError::ReadFailed(e)),
        };
        if let Err(e) = &result {
            self.disconnect(e);
        }
        result
    }

    async fn attempt(&mut self) -> Result<TcpStream, StreamError> {
        self.attempts += 1;
        let timeout = self.config.connect_timeout();
        let stream = tokio::time::timeout(timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| StreamError::Timeout(timeout))?
            .map_err(|source| StreamError::ConnectFailed {
                addr: self.addr,
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

// ── Tests ────────────────────────────────────────────────────────
