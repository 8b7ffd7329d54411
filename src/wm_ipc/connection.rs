//! IPC connection to i3/Sway.
//!
//! Socket discovery, the typed request/response operations, and event reads
//! on a subscribed connection. Errors are surfaced as-is; reconnecting is the
//! caller's job (see [`super::ConnectionManager`]).

use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::process::Command;
use tracing::debug;

use super::codec::{self, Frame, MessageType, WINDOW_EVENT};
use super::types::{CommandOutcome, SubscribeReply, WindowId, WmEvent};
use super::IpcError;
use crate::config::WindowManager;
use crate::window_tree::WindowNode;

/// Where the window manager socket is found
#[derive(Debug, Clone)]
pub struct SocketSource {
    pub window_manager: WindowManager,
    /// Skips discovery when set
    pub path_override: Option<PathBuf>,
}

/// Ask the window manager binary for its IPC socket path.
///
/// Runs `<wm> --get-socketpath` and trims the trailing newline.
pub async fn discover_socket_path(source: &SocketSource) -> Result<PathBuf, IpcError> {
    if let Some(path) = &source.path_override {
        return Ok(path.clone());
    }

    let binary = source.window_manager.binary();
    let output = Command::new(binary)
        .arg("--get-socketpath")
        .output()
        .await
        .map_err(|e| IpcError::Discovery(format!("failed to run `{binary} --get-socketpath`: {e}")))?;

    if !output.status.success() {
        return Err(IpcError::Discovery(format!(
            "`{binary} --get-socketpath` exited with {}",
            output.status
        )));
    }

    parse_socket_path(&output.stdout)
}

fn parse_socket_path(stdout: &[u8]) -> Result<PathBuf, IpcError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|_| IpcError::Discovery("socket path is not valid UTF-8".to_string()))?;
    let path = text.strip_suffix('\n').unwrap_or(text);
    if path.is_empty() {
        return Err(IpcError::Discovery("window manager returned an empty socket path".to_string()));
    }
    Ok(PathBuf::from(path))
}

/// A single request/response and event channel to the window manager
#[derive(Debug)]
pub struct IpcConnection<S = UnixStream> {
    stream: S,
}

impl IpcConnection<UnixStream> {
    /// Discover the socket and connect to it
    pub async fn connect(source: &SocketSource) -> Result<Self, IpcError> {
        let socket_path = discover_socket_path(source).await?;
        let stream = UnixStream::connect(&socket_path)
            .await
            .map_err(IpcError::Io)?;
        debug!("Connected to {}", socket_path.display());
        Ok(Self::new(stream))
    }
}

impl<S> IpcConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        IpcConnection { stream }
    }

    /// Send a request and wait for its reply.
    ///
    /// Replies carry no correlation id; they arrive in request order, so any
    /// event frames interleaved on a subscribed connection are skipped.
    async fn request(&mut self, message_type: MessageType, payload: &[u8]) -> Result<Frame, IpcError> {
        codec::write_frame(&mut self.stream, message_type, payload).await?;

        loop {
            let frame = codec::read_frame(&mut self.stream).await?;
            if frame.is_event() {
                debug!("Skipping event 0x{:x} while awaiting reply", frame.message_type);
                continue;
            }
            return Ok(frame);
        }
    }

    /// Run a command (e.g. `[con_id=42] focus`)
    pub async fn command(&mut self, text: &str) -> Result<(), IpcError> {
        let reply = self.request(MessageType::RunCommand, text.as_bytes()).await?;
        let outcomes: Vec<CommandOutcome> =
            serde_json::from_slice(&reply.payload).map_err(IpcError::Decode)?;

        match outcomes.into_iter().find(|o| !o.success) {
            Some(failed) => Err(IpcError::CommandFailed(
                failed
                    .error
                    .unwrap_or_else(|| format!("command `{text}` failed")),
            )),
            None => Ok(()),
        }
    }

    /// Fetch the window tree snapshot
    pub async fn tree(&mut self) -> Result<WindowNode, IpcError> {
        let reply = self.request(MessageType::GetTree, &[]).await?;
        serde_json::from_slice(&reply.payload).map_err(IpcError::Decode)
    }

    /// Subscribe this connection to the named event types
    pub async fn subscribe(&mut self, events: &[&str]) -> Result<(), IpcError> {
        let payload = serde_json::to_vec(events).map_err(IpcError::Decode)?;
        let reply = self.request(MessageType::Subscribe, &payload).await?;
        let reply: SubscribeReply =
            serde_json::from_slice(&reply.payload).map_err(IpcError::Decode)?;

        if reply.success {
            Ok(())
        } else {
            Err(IpcError::CommandFailed(format!(
                "subscription to {events:?} rejected"
            )))
        }
    }

    /// Wait for the next frame on a subscribed connection
    pub async fn read_event(&mut self) -> Result<WmEvent, IpcError> {
        let frame = codec::read_frame(&mut self.stream).await?;

        if !frame.has_object_payload() {
            return Ok(WmEvent::Acknowledgement);
        }

        match frame.event_type() {
            Some(WINDOW_EVENT) => serde_json::from_slice(&frame.payload)
                .map(WmEvent::Window)
                .map_err(IpcError::Decode),
            _ => Ok(WmEvent::Other(frame.message_type)),
        }
    }

    /// Focus a window by its container id
    pub async fn focus_window(&mut self, window_id: WindowId) -> Result<(), IpcError> {
        self.command(&format!("[con_id={}] focus", window_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm_ipc::codec::{read_frame, EVENT_FLAG, HEADER_LEN};
    use crate::wm_ipc::types::WindowChange;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    fn raw_frame(message_type: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = codec::MAGIC.to_vec();
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&message_type.to_le_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    fn pair() -> (IpcConnection<DuplexStream>, DuplexStream) {
        let (client, server) = duplex(64 * 1024);
        (IpcConnection::new(client), server)
    }

    #[test]
    fn test_parse_socket_path_trims_newline() {
        let path = parse_socket_path(b"/run/user/1000/sway-ipc.1000.123.sock\n").unwrap();
        assert_eq!(path, PathBuf::from("/run/user/1000/sway-ipc.1000.123.sock"));
    }

    #[test]
    fn test_parse_socket_path_empty() {
        assert!(matches!(parse_socket_path(b"\n"), Err(IpcError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_discover_uses_override() {
        let source = SocketSource {
            window_manager: WindowManager::Sway,
            path_override: Some(PathBuf::from("/tmp/wm.sock")),
        };
        assert_eq!(
            discover_socket_path(&source).await.unwrap(),
            PathBuf::from("/tmp/wm.sock")
        );
    }

    #[tokio::test]
    async fn test_focus_window_sends_command() {
        let (mut conn, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let request = read_frame(&mut server).await.unwrap();
            server
                .write_all(&raw_frame(0, br#"[{"success":true}]"#))
                .await
                .unwrap();
            request
        });

        conn.focus_window(42).await.unwrap();
        let request = server_task.await.unwrap();
        assert_eq!(request.message_type, 0);
        assert_eq!(request.payload, b"[con_id=42] focus");
    }

    #[tokio::test]
    async fn test_command_failure_is_surfaced() {
        let (mut conn, mut server) = pair();

        tokio::spawn(async move {
            let _ = read_frame(&mut server).await.unwrap();
            server
                .write_all(&raw_frame(
                    0,
                    br#"[{"success":false,"error":"No matching node"}]"#,
                ))
                .await
                .unwrap();
            server
        });

        match conn.focus_window(7).await {
            Err(IpcError::CommandFailed(message)) => assert_eq!(message, "No matching node"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tree_skips_interleaved_events() {
        let (mut conn, mut server) = pair();

        tokio::spawn(async move {
            let request = read_frame(&mut server).await.unwrap();
            assert_eq!(request.message_type, 4);
            server
                .write_all(&raw_frame(
                    EVENT_FLAG | WINDOW_EVENT,
                    br#"{"change":"focus","container":{"id":5}}"#,
                ))
                .await
                .unwrap();
            server
                .write_all(&raw_frame(
                    4,
                    br#"{"id":1,"nodes":[{"id":5,"focused":true}]}"#,
                ))
                .await
                .unwrap();
            server
        });

        let tree = conn.tree().await.unwrap();
        assert_eq!(tree.id, 1);
        assert_eq!(tree.nodes[0].id, 5);
    }

    #[tokio::test]
    async fn test_tree_malformed_payload() {
        let (mut conn, mut server) = pair();

        tokio::spawn(async move {
            let _ = read_frame(&mut server).await.unwrap();
            server.write_all(&raw_frame(4, br#"{"nodes":"#)).await.unwrap();
            server
        });

        assert!(matches!(conn.tree().await, Err(IpcError::Decode(_))));
    }

    #[tokio::test]
    async fn test_subscribe_payload_and_reply() {
        let (mut conn, mut server) = pair();

        let server_task = tokio::spawn(async move {
            let request = read_frame(&mut server).await.unwrap();
            server
                .write_all(&raw_frame(2, br#"{"success":true}"#))
                .await
                .unwrap();
            (request, server)
        });

        conn.subscribe(&["window"]).await.unwrap();
        let (request, _server) = server_task.await.unwrap();
        assert_eq!(request.message_type, 2);
        assert_eq!(request.payload, br#"["window"]"#);
    }

    #[tokio::test]
    async fn test_subscribe_rejected() {
        let (mut conn, mut server) = pair();

        tokio::spawn(async move {
            let _ = read_frame(&mut server).await.unwrap();
            server
                .write_all(&raw_frame(2, br#"{"success":false}"#))
                .await
                .unwrap();
            server
        });

        assert!(matches!(
            conn.subscribe(&["window"]).await,
            Err(IpcError::CommandFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_read_event_kinds() {
        let (mut conn, mut server) = pair();

        server
            .write_all(&raw_frame(
                EVENT_FLAG | WINDOW_EVENT,
                br#"{"change":"close","container":{"id":9}}"#,
            ))
            .await
            .unwrap();
        server
            .write_all(&raw_frame(0, br#"[{"success":true}]"#))
            .await
            .unwrap();
        server
            .write_all(&raw_frame(EVENT_FLAG, br#"{"change":"focus"}"#))
            .await
            .unwrap();

        match conn.read_event().await.unwrap() {
            WmEvent::Window(event) => {
                assert_eq!(event.change, WindowChange::Close);
                assert_eq!(event.container_id(), 9);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(conn.read_event().await.unwrap(), WmEvent::Acknowledgement);
        assert_eq!(conn.read_event().await.unwrap(), WmEvent::Other(EVENT_FLAG));
    }

    #[tokio::test]
    async fn test_read_event_malformed_window_event() {
        let (mut conn, mut server) = pair();
        server
            .write_all(&raw_frame(EVENT_FLAG | WINDOW_EVENT, br#"{"change":"focus"}"#))
            .await
            .unwrap();

        assert!(matches!(conn.read_event().await, Err(IpcError::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_event_closed_mid_frame() {
        let (mut conn, mut server) = pair();
        let frame = raw_frame(EVENT_FLAG | WINDOW_EVENT, br#"{"change":"focus"}"#);
        server.write_all(&frame[..HEADER_LEN + 3]).await.unwrap();
        drop(server);

        let err = conn.read_event().await.unwrap_err();
        assert!(err.is_connection_fatal());
        assert!(matches!(err, IpcError::Truncated { section: "payload" }));
    }
}
