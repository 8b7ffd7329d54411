//! i3/Sway IPC client
//!
//! ## Architecture
//!
//! - `codec`: binary framing (`i3-ipc` magic, length, type, payload)
//! - `IpcConnection`: typed requests and event reads over one stream
//! - `ConnectionManager`: exclusive ownership of a connection, redialing
//!   with backoff after failures
//! - `listen_for_window_events`: the self-healing event subscription
//!
//! Two managers are used at runtime: one owned by the event listener task and
//! one owned by the daemon for outbound commands.

pub mod codec;
mod connection;
mod error;
mod events;
mod manager;
mod types;

pub use connection::SocketSource;
pub use error::IpcError;
pub use events::listen_for_window_events;
pub use manager::ConnectionManager;
pub use types::{ChangeEvent, WindowChange, WindowId};
