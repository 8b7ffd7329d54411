//! Connection ownership and reconnection.
//!
//! A [`ConnectionManager`] holds at most one live connection for one logical
//! use (the event subscription, or outbound commands). Callers `take` the
//! connection exclusively and either `put` it back or `discard` it after a
//! failure, so the next `take` dials a fresh replacement instead of handing
//! out a dead stream.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use super::connection::{IpcConnection, SocketSource};
use super::IpcError;

/// Initial delay between dial attempts
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Cap for the exponential backoff
const MAX_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection is live (idle in the manager or taken by a caller)
    Connected,
    /// The last connection was discarded; the next `take` redials
    Reconnecting,
    /// The last `take` ran out of patience
    Failed,
}

/// Produces new connections
pub trait Dialer {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    async fn dial(&mut self) -> Result<IpcConnection<Self::Stream>, IpcError>;
}

impl Dialer for SocketSource {
    type Stream = UnixStream;

    async fn dial(&mut self) -> Result<IpcConnection<UnixStream>, IpcError> {
        IpcConnection::connect(self).await
    }
}

pub struct ConnectionManager<D: Dialer = SocketSource> {
    /// Used in log messages to tell managers apart
    name: &'static str,
    dialer: D,
    idle: Option<IpcConnection<D::Stream>>,
    state: ConnectionState,
}

impl<D: Dialer> ConnectionManager<D> {
    pub fn new(name: &'static str, dialer: D) -> Self {
        ConnectionManager {
            name,
            dialer,
            idle: None,
            state: ConnectionState::Reconnecting,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Take the connection, dialing with backoff for at most `patience`.
    pub async fn take(&mut self, patience: Duration) -> Result<IpcConnection<D::Stream>, IpcError> {
        if let Some(conn) = self.idle.take() {
            return Ok(conn);
        }

        let deadline = Instant::now() + patience;
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            let last_error = match timeout(remaining, self.dialer.dial()).await {
                Ok(Ok(conn)) => {
                    if self.state != ConnectionState::Connected {
                        info!("{} connection established after {} attempt(s)", self.name, attempt);
                    }
                    self.state = ConnectionState::Connected;
                    return Ok(conn);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => "dial timed out".to_string(),
            };

            let now = Instant::now();
            if now >= deadline {
                self.state = ConnectionState::Failed;
                warn!(
                    attempts = attempt,
                    last_error = %last_error,
                    "Giving up on {} connection", self.name
                );
                return Err(IpcError::Timeout {
                    waited: patience,
                    last_error,
                });
            }

            warn!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "{} connection failed, retrying...", self.name
            );
            sleep(delay.min(deadline - now)).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY);
        }
    }

    /// Hand a healthy connection back for reuse
    pub fn put(&mut self, conn: IpcConnection<D::Stream>) {
        self.idle = Some(conn);
        self.state = ConnectionState::Connected;
    }

    /// Surrender a broken connection; it is dropped and the next `take` redials
    pub fn discard(&mut self, conn: IpcConnection<D::Stream>, error: &IpcError) {
        drop(conn);
        self.idle = None;
        self.state = ConnectionState::Reconnecting;
        warn!("Discarding {} connection: {}", self.name, error);
    }

    /// Put the connection back or discard it, depending on how its last use went
    pub fn release<T>(&mut self, conn: IpcConnection<D::Stream>, result: &Result<T, IpcError>) {
        match result {
            Err(e) if e.is_connection_fatal() => self.discard(conn, e),
            _ => {
                debug!("Returning {} connection", self.name);
                self.put(conn);
            }
        }
    }
}
