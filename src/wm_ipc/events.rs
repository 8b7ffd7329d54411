//! Window event subscription with automatic reconnection.
//!
//! ```text
//! +----------------+      +--------+      +--------------+
//! | event listener | ---> | mpsc   | ---> | Daemon event |
//! | (own conn)     |      | channel|      | loop         |
//! +----------------+      +--------+      +--------------+
//! ```
//!
//! The listener owns its own [`ConnectionManager`]. On any framing or I/O
//! error it discards the connection, redials (re-running socket discovery),
//! resubscribes and carries on. It only returns an error once reconnecting
//! has exhausted its patience, which the daemon treats as fatal.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::manager::{ConnectionManager, Dialer};
use super::types::{ChangeEvent, WmEvent};
use super::IpcError;

/// Event types the listener subscribes to
const SUBSCRIPTIONS: &[&str] = &["window"];

/// Pause before retrying after a rejected subscription
const RESUBSCRIBE_DELAY: Duration = Duration::from_millis(500);

/// Forward window events to `tx` until the receiver goes away.
///
/// `patience` bounds each outage, from the moment a connection breaks until a
/// subscription succeeds again. Dial failures and rejected subscriptions both
/// spend it; running out ends the listener with [`IpcError::Timeout`].
pub async fn listen_for_window_events<D: Dialer>(
    mut manager: ConnectionManager<D>,
    patience: Duration,
    tx: mpsc::Sender<ChangeEvent>,
) -> Result<(), IpcError> {
    let mut deadline = Instant::now() + patience;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut conn = match manager.take(remaining).await {
            Ok(conn) => conn,
            Err(IpcError::Timeout { last_error, .. }) => {
                return Err(IpcError::Timeout {
                    waited: patience,
                    last_error,
                });
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = conn.subscribe(SUBSCRIPTIONS).await {
            let last_error = e.to_string();
            manager.discard(conn, &e);

            let now = Instant::now();
            if now >= deadline {
                warn!(last_error = %last_error, "Giving up on window event subscription");
                return Err(IpcError::Timeout {
                    waited: patience,
                    last_error,
                });
            }
            sleep(RESUBSCRIBE_DELAY.min(deadline - now)).await;
            continue;
        }
        info!("Subscribed to window events");

        loop {
            let result = conn.read_event().await;
            match result {
                Ok(WmEvent::Window(event)) => {
                    debug!(
                        "Window event: {:?} for container {}",
                        event.change,
                        event.container_id()
                    );
                    if tx.send(event).await.is_err() {
                        info!("Event receiver dropped, stopping listener");
                        return Ok(());
                    }
                }
                Ok(WmEvent::Acknowledgement) => {
                    debug!("Skipping acknowledgement on event connection");
                }
                Ok(WmEvent::Other(message_type)) => {
                    debug!("Skipping message type 0x{:x}", message_type);
                }
                Err(e) if !e.is_connection_fatal() => {
                    warn!("Skipping undecodable event: {}", e);
                }
                Err(e) => {
                    manager.discard(conn, &e);
                    deadline = Instant::now() + patience;
                    break;
                }
            }
        }
    }
}
