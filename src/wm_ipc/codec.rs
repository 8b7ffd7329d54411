//! Framing for the i3/Sway binary IPC protocol.
//!
//! Every message on the socket, in either direction, is
//! `"i3-ipc" ‖ le32(payload length) ‖ le32(message type) ‖ payload`.
//! Events pushed after a SUBSCRIBE use the same framing with the high bit of
//! the message type set.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::IpcError;

/// Magic token opening every frame
pub const MAGIC: [u8; 6] = *b"i3-ipc";

/// Magic + length + type
pub const HEADER_LEN: usize = MAGIC.len() + 4 + 4;

/// Bit set on the message type of pushed events
pub const EVENT_FLAG: u32 = 1 << 31;

/// Event type of `window` events (without [`EVENT_FLAG`])
pub const WINDOW_EVENT: u32 = 3;

/// Preallocation cap so a bogus length can't force a huge allocation upfront
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Request message types
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    GetWorkspaces = 1,
    Subscribe = 2,
    GetOutputs = 3,
    GetTree = 4,
    GetMarks = 5,
    GetBarConfig = 6,
    GetVersion = 7,
}

impl MessageType {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// One complete frame read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Whether this frame is a pushed event rather than a reply
    pub fn is_event(&self) -> bool {
        self.message_type & EVENT_FLAG != 0
    }

    /// Event type with the event bit stripped, or `None` for replies
    pub fn event_type(&self) -> Option<u32> {
        self.is_event().then_some(self.message_type & !EVENT_FLAG)
    }

    /// Whether the payload is a JSON object (events and most replies) as
    /// opposed to an array (command acknowledgements)
    pub fn has_object_payload(&self) -> bool {
        self.payload
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|&b| b == b'{')
    }
}

/// Encode one request frame
pub fn encode(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&message_type.code().to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Encode and send one request frame
pub async fn write_frame<W>(
    writer: &mut W,
    message_type: MessageType,
    payload: &[u8],
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&encode(message_type, payload))
        .await
        .map_err(IpcError::Io)?;
    writer.flush().await.map_err(IpcError::Io)
}

/// Read exactly one frame.
///
/// Either a complete frame is returned or an error; a stream that ends in the
/// middle of the header or payload yields [`IpcError::Truncated`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, IpcError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            IpcError::Truncated { section: "header" }
        } else {
            IpcError::Io(e)
        }
    })?;

    let mut magic = [0u8; 6];
    magic.copy_from_slice(&header[..MAGIC.len()]);
    if magic != MAGIC {
        return Err(IpcError::InvalidMagic { found: magic });
    }

    let length = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
    let message_type = u32::from_le_bytes([header[10], header[11], header[12], header[13]]);

    let mut payload = Vec::with_capacity(length.min(INITIAL_PAYLOAD_CAPACITY));
    reader
        .take(length as u64)
        .read_to_end(&mut payload)
        .await
        .map_err(IpcError::Io)?;
    if payload.len() != length {
        return Err(IpcError::Truncated { section: "payload" });
    }

    Ok(Frame {
        message_type,
        payload,
    })
}
