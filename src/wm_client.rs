//! Window manager operations used by the daemon.
//!
//! This module provides a trait over the two requests the daemon makes,
//! allowing for mock implementations in tests.

use std::time::Duration;

use crate::window_tree::WindowNode;
use crate::wm_ipc::{ConnectionManager, IpcError, SocketSource, WindowId};

/// Trait for the outbound window manager requests.
pub trait WmClient {
    /// Get the full window tree
    async fn get_tree(&mut self) -> Result<WindowNode, IpcError>;

    /// Focus a window by its container ID
    async fn focus_window(&mut self, window_id: WindowId) -> Result<(), IpcError>;
}

/// Real implementation backed by a pooled IPC connection
pub struct RealWmClient {
    manager: ConnectionManager<SocketSource>,
    /// Bounded wait for a connection before a request fails
    connect_timeout: Duration,
}

impl RealWmClient {
    pub fn new(source: SocketSource, connect_timeout: Duration) -> Self {
        RealWmClient {
            manager: ConnectionManager::new("command", source),
            connect_timeout,
        }
    }
}

impl WmClient for RealWmClient {
    async fn get_tree(&mut self) -> Result<WindowNode, IpcError> {
        let mut conn = self.manager.take(self.connect_timeout).await?;
        let result = conn.tree().await;
        self.manager.release(conn, &result);
        result
    }

    async fn focus_window(&mut self, window_id: WindowId) -> Result<(), IpcError> {
        let mut conn = self.manager.take(self.connect_timeout).await?;
        let result = conn.focus_window(window_id).await;
        self.manager.release(conn, &result);
        result
    }
}
