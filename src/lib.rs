//! Driver for Secomam S250 and Prim spectrophotometers.
//!
//! `serial` holds the transport and the binary frame codec, `dispatch` the
//! poll-driven single-command state machine, and `device` the session object
//! that sequences instrument workflows (absorbance, baseline, spectrum).
pub mod chart;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod serial;

pub use config::SessionConfig;
pub use device::{DeviceError, Spectrometer};
pub use dispatch::{CommandDispatcher, PollDriver, PollStatus};
pub use serial::{Command, CommandKind, Response, SerialError, SerialInterface, Transport};
