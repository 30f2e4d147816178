pub mod interface;
pub mod mock;
pub mod protocol;
pub mod response;

pub use interface::{SerialInterface, Transport};
pub use mock::MockTransport;
pub use protocol::{Command, CommandKind};
pub use response::{decode, DecodeError, Response, SpectrumCursor};

use serde::{Deserialize, Serialize};

/// Link state as seen by the dispatcher
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Device not connected")]
    NotConnected,

    #[error("Another command in flight")]
    Busy,

    #[error("Communication timeout after {ticks} polls")]
    Timeout { ticks: u32 },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
