pub mod export;
pub mod manager;
pub mod models;
pub mod spectrum;

pub use manager::Spectrometer;
pub use models::*;
pub use spectrum::SpectrumSession;

use crate::serial::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Invalid device configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Instrument rejected {0}")]
    Rejected(String),

    #[error("Unexpected response to {command}: {detail}")]
    UnexpectedResponse { command: &'static str, detail: String },

    #[error("Undecodable response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] crate::serial::SerialError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
