//! In-memory transport for driving the protocol without hardware.
//!
//! Clones share state, so a test can hand one clone to the dispatcher and keep
//! another to feed response bytes and inspect written frames.
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Result, SerialError, Transport};

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    written: Vec<Vec<u8>>,
    input: VecDeque<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport that starts out connected
    pub fn connected() -> Self {
        let mock = Self::default();
        mock.lock().connected = true;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make bytes available to the next reads
    pub fn feed(&self, bytes: &[u8]) {
        self.lock().input.extend(bytes.iter().copied());
    }

    /// Frames written so far, one entry per `write` call
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }

    /// Simulate an unplugged cable: availability queries and reads error out
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn reconnect(&self) {
        self.lock().connected = true;
    }
}

impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        if !state.connected {
            return Err(SerialError::NotConnected);
        }
        if state.fail_writes {
            return Err(SerialError::IoError(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock write failure",
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let state = self.lock();
        if !state.connected {
            return Err(SerialError::NotConnected);
        }
        if state.fail_reads {
            return Err(SerialError::IoError(io::Error::new(
                io::ErrorKind::NotConnected,
                "mock device unplugged",
            )));
        }
        Ok(state.input.len())
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut state = self.lock();
        if state.fail_reads {
            return Err(SerialError::IoError(io::Error::new(
                io::ErrorKind::NotConnected,
                "mock device unplugged",
            )));
        }
        if state.input.len() < n {
            return Err(SerialError::IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted {} bytes, {} buffered", n, state.input.len()),
            )));
        }
        Ok(state.input.drain(..n).collect())
    }

    fn disconnect(&mut self) {
        self.lock().connected = false;
    }
}
