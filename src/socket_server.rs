use crate::ipc::{socket_addr, ControlCommand, ControlError};
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// How long a connected client gets to send its command byte
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Start the control socket server on the abstract socket `name`.
/// Returns a receiver for incoming commands.
///
/// Binding fails if another daemon already owns the name.
pub fn start_server(name: &str) -> Result<mpsc::UnboundedReceiver<ControlCommand>> {
    let addr = socket_addr(name).context("Invalid control socket name")?;
    let std_listener = std::os::unix::net::UnixListener::bind_addr(&addr).with_context(|| {
        format!(
            "Failed to bind control socket @{}. Is another focus-last daemon running?",
            name
        )
    })?;
    std_listener.set_nonblocking(true)?;
    let listener = UnixListener::from_std(std_listener)?;

    info!("Control socket listening at @{}", name);

    let (tx, rx) = mpsc::unbounded_channel();

    // Connections are handled one at a time
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => match read_command(stream).await {
                    Ok(cmd) => {
                        debug!("Received control command: {}", cmd);
                        if tx.send(cmd).is_err() {
                            info!("Daemon stopped, closing control socket");
                            return;
                        }
                    }
                    Err(e @ ControlError::InvalidCommand(_)) => {
                        warn!("Ignoring control connection: {}", e);
                    }
                    Err(e) => {
                        debug!("Client connection error: {}", e);
                    }
                },
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    });

    Ok(rx)
}

/// Read exactly one command byte; the stream is closed on return
async fn read_command(mut stream: UnixStream) -> Result<ControlCommand, ControlError> {
    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf))
        .await
        .map_err(|_| ControlError::Timeout)??;

    if n == 0 {
        return Err(ControlError::Empty);
    }

    ControlCommand::from_byte(buf[0])
}
