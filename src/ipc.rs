//! Control channel between the CLI and the daemon.
//!
//! The daemon listens on a Linux abstract-namespace socket named
//! `focus-last/<uid>`. A client connects, writes a single command byte and
//! disconnects; there is no reply.

use std::fmt;
use std::io;
use std::os::linux::net::SocketAddrExt;
use std::os::unix::net::SocketAddr;

use thiserror::Error;

/// Navigation commands sent from CLI client to daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Toggle to the previously visited window
    Last,
    /// Move forward in the history
    Next,
    /// Move back in the history
    Prev,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("invalid control command byte 0x{0:02x}")]
    InvalidCommand(u8),

    #[error("client disconnected without sending a command")]
    Empty,

    #[error("timed out waiting for a command byte")]
    Timeout,

    #[error("control socket I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ControlCommand {
    pub fn to_byte(self) -> u8 {
        match self {
            ControlCommand::Last => b's',
            ControlCommand::Next => b'n',
            ControlCommand::Prev => b'p',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, ControlError> {
        match byte {
            b's' => Ok(ControlCommand::Last),
            b'n' => Ok(ControlCommand::Next),
            b'p' => Ok(ControlCommand::Prev),
            other => Err(ControlError::InvalidCommand(other)),
        }
    }
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlCommand::Last => "switch",
            ControlCommand::Next => "next",
            ControlCommand::Prev => "prev",
        };
        write!(f, "{}", s)
    }
}

/// Abstract socket name for the current user
pub fn socket_name() -> String {
    // SAFETY: getuid has no preconditions and cannot fail
    let uid = unsafe { libc::getuid() };
    format!("focus-last/{}", uid)
}

/// Abstract-namespace address for `name`
pub fn socket_addr(name: &str) -> io::Result<SocketAddr> {
    SocketAddr::from_abstract_name(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(ControlCommand::from_byte(b's').unwrap(), ControlCommand::Last);
        assert_eq!(ControlCommand::from_byte(b'n').unwrap(), ControlCommand::Next);
        assert_eq!(ControlCommand::from_byte(b'p').unwrap(), ControlCommand::Prev);

        for cmd in [ControlCommand::Last, ControlCommand::Next, ControlCommand::Prev] {
            assert_eq!(ControlCommand::from_byte(cmd.to_byte()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_invalid_command_byte() {
        match ControlCommand::from_byte(b'x') {
            Err(ControlError::InvalidCommand(byte)) => assert_eq!(byte, b'x'),
            other => panic!("unexpected result: {other:?}"),
        }
        let err = ControlCommand::from_byte(0).unwrap_err();
        assert_eq!(err.to_string(), "invalid control command byte 0x00");
    }

    #[test]
    fn test_command_display() {
        assert_eq!(ControlCommand::Last.to_string(), "switch");
        assert_eq!(ControlCommand::Next.to_string(), "next");
        assert_eq!(ControlCommand::Prev.to_string(), "prev");
    }

    #[test]
    fn test_socket_name_is_per_user() {
        let name = socket_name();
        assert!(name.starts_with("focus-last/"));
        let uid: u32 = name.trim_start_matches("focus-last/").parse().unwrap();
        assert_eq!(uid, unsafe { libc::getuid() });
    }

    #[test]
    fn test_socket_addr_is_abstract() {
        let addr = socket_addr("focus-last/test").unwrap();
        assert_eq!(addr.as_abstract_name(), Some(&b"focus-last/test"[..]));
        assert!(addr.as_pathname().is_none());
    }
}
