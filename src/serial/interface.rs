use std::io::{Read, Write};
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};

use super::{ConnectionState, Result, SerialError};
use crate::config::{ParityMode, SerialSettings};

/// Byte-level link to the instrument.
///
/// `bytes_available` and `read_exact` must return immediately: the dispatcher
/// only asks for `n` bytes once it has seen at least `n` waiting.
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Write a whole frame and flush it
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Number of bytes waiting in the input buffer
    fn bytes_available(&mut self) -> Result<usize>;

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Drop the link; the transport reports `Disconnected` afterwards
    fn disconnect(&mut self);

    fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
}

/// `Transport` over an OS serial port
pub struct SerialInterface {
    port: Option<Box<dyn SerialPort>>,
    port_name: Option<String>,
}

impl SerialInterface {
    pub fn new() -> Self {
        Self {
            port: None,
            port_name: None,
        }
    }

    /// Open `port_name` with the instrument's line settings
    pub fn connect(&mut self, port_name: &str, settings: &SerialSettings) -> Result<()> {
        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => {
                return Err(SerialError::ConnectionFailed(format!(
                    "unsupported data bits: {}",
                    other
                )))
            }
        };
        let stop_bits = match settings.stop_bits {
            1 => StopBits::One,
            2 => StopBits::Two,
            other => {
                return Err(SerialError::ConnectionFailed(format!(
                    "unsupported stop bits: {}",
                    other
                )))
            }
        };
        let parity = match settings.parity {
            ParityMode::None => Parity::None,
            ParityMode::Odd => Parity::Odd,
            ParityMode::Even => Parity::Even,
        };

        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(1000))
            .open()
            .map_err(|e| SerialError::ConnectionFailed(e.to_string()))?;

        self.port = Some(port);
        self.port_name = Some(port_name.to_string());

        log::info!(
            "Connected to spectrometer on {} ({} baud)",
            port_name,
            settings.baud_rate
        );
        Ok(())
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(SerialError::NotConnected)
    }
}

impl Default for SerialInterface {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialInterface {
    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let port = self.port_mut()?;
        Ok(port.bytes_to_read()? as usize)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let mut buffer = vec![0u8; n];
        port.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn disconnect(&mut self) {
        if let Some(name) = &self.port_name {
            log::info!("Disconnecting from {}", name);
        }
        self.port = None;
        self.port_name = None;
    }
}
