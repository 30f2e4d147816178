use std::time::Instant;

use super::types::{PendingCommand, PollStatus};
use crate::config::SessionConfig;
use crate::serial::{
    decode, Command, CommandKind, ConnectionState, Response, Result, SerialError, SpectrumCursor,
    Transport,
};

/// Poll-driven command dispatcher.
///
/// One command may be in flight at a time. `send` writes the frame and
/// records the continuations; the host calls `poll` on a fixed cadence until
/// the expected bytes are buffered, the tick budget runs out, or the link
/// errors. Exactly one continuation fires per accepted command that expects a
/// response. Timeouts and I/O failures disconnect the transport: the protocol
/// has no way to resynchronise mid-stream, so a fresh `Init` is required.
pub struct CommandDispatcher<T: Transport> {
    transport: T,
    pending: Option<PendingCommand>,
    cursor: Option<SpectrumCursor>,
    timeout_ticks: u32,
}

impl<T: Transport> CommandDispatcher<T> {
    pub fn new(transport: T, timeout_ticks: u32) -> Self {
        Self {
            transport,
            pending: None,
            cursor: None,
            timeout_ticks: timeout_ticks.max(1),
        }
    }

    pub fn from_config(transport: T, config: &SessionConfig) -> Self {
        Self::new(transport, config.timeout_ticks())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_command(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    pub fn spectrum_cursor(&self) -> Option<&SpectrumCursor> {
        self.cursor.as_ref()
    }

    pub fn timeout_ticks(&self) -> u32 {
        self.timeout_ticks
    }

    /// Send `command` and arm the continuations.
    ///
    /// Returns `Ok(false)` when the link is down (or the write fails, which
    /// takes it down); no continuation fires in that case. Commands without a
    /// response complete here and never fire a continuation either. Sending
    /// while another command is awaited is rejected with `SerialError::Busy`
    /// and leaves the pending command untouched.
    pub fn send<S, F>(&mut self, command: Command, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        let kind = command.kind();
        if let Some(pending) = &self.pending {
            log::warn!(
                "Rejected {} while {} is in flight",
                kind.name(),
                pending.command.kind().name()
            );
            return Err(SerialError::Busy);
        }
        if !self.transport.is_connected() {
            log::debug!("Not sending {}: spectrometer disconnected", kind.name());
            return Ok(false);
        }

        if kind == CommandKind::SpectrumHeader {
            self.cursor = None;
        }

        let frame = command.encode();
        if !frame.is_empty() {
            log::trace!("-> {} [{}]", kind.name(), hex::encode(&frame));
            if let Err(e) = self.transport.write(&frame) {
                log::error!("Failed to send {}: {}", kind.name(), e);
                self.force_disconnect();
                return Ok(false);
            }
        }

        let expected = command.response_len();
        if expected == 0 {
            log::debug!("{} sent, no response expected", kind.name());
            return Ok(true);
        }

        self.pending = Some(PendingCommand {
            command,
            expected,
            attempts_remaining: self.timeout_ticks,
            budget: self.timeout_ticks,
            started: Instant::now(),
            on_success: Box::new(on_success),
            on_failure: Box::new(on_failure),
        });
        Ok(true)
    }

    /// One scheduler tick
    pub fn poll(&mut self) -> PollStatus {
        let Some(mut pending) = self.pending.take() else {
            return PollStatus::Idle;
        };

        match self.transport.bytes_available() {
            Err(e) => return self.fail(pending, e),
            Ok(available) if available < pending.expected => {
                pending.attempts_remaining = pending.attempts_remaining.saturating_sub(1);
                if pending.attempts_remaining == 0 {
                    let ticks = pending.budget;
                    return self.fail(pending, SerialError::Timeout { ticks });
                }
                let attempts_remaining = pending.attempts_remaining;
                self.pending = Some(pending);
                return PollStatus::Waiting { attempts_remaining };
            }
            Ok(_) => {}
        }

        let raw = match self.transport.read_exact(pending.expected) {
            Ok(raw) => raw,
            Err(e) => return self.fail(pending, e),
        };
        let kind = pending.command.kind();
        log::trace!("<- {} [{}]", kind.name(), hex::encode(&raw));

        let response = match decode(kind, &raw, &mut self.cursor) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Could not decode {} response: {}", kind.name(), e);
                Response::Undecodable(e)
            }
        };
        log::debug!(
            "{} completed after {:?} ({} polls)",
            kind.name(),
            pending.started.elapsed(),
            pending.budget - pending.attempts_remaining + 1
        );

        (pending.on_success)(response);
        PollStatus::Completed
    }

    fn fail(&mut self, pending: PendingCommand, error: SerialError) -> PollStatus {
        log::warn!(
            "{} failed after {:?}: {}",
            pending.command.kind().name(),
            pending.started.elapsed(),
            error
        );
        self.force_disconnect();
        (pending.on_failure)(error);
        PollStatus::Failed
    }

    fn force_disconnect(&mut self) {
        self.cursor = None;
        self.transport.disconnect();
    }

    /// Start the instrument (expects the init acknowledgement)
    pub fn start<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::Init, on_success, on_failure)
    }

    /// Fire-and-forget stop
    pub fn stop(&mut self) -> Result<bool> {
        self.send(Command::Stop, |_| {}, |_| {})
    }

    pub fn firmware<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::Firmware, on_success, on_failure)
    }

    pub fn model<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::Model, on_success, on_failure)
    }

    pub fn autotest<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::Autotest, on_success, on_failure)
    }

    pub fn set_wavelength<S, F>(
        &mut self,
        wavelength: u16,
        gain: u8,
        on_success: S,
        on_failure: F,
    ) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::SetWavelength { wavelength, gain }, on_success, on_failure)
    }

    pub fn get_zero<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::GetZeroAbs, on_success, on_failure)
    }

    pub fn get_absorbance<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::GetAbs, on_success, on_failure)
    }

    pub fn get_absorbance_data<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::GetAbsData, on_success, on_failure)
    }

    pub fn baseline<S, F>(
        &mut self,
        start: u16,
        end: u16,
        speed: u8,
        on_success: S,
        on_failure: F,
    ) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::Baseline { start, end, speed }, on_success, on_failure)
    }

    pub fn spectrum_header<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::SpectrumHeader, on_success, on_failure)
    }

    pub fn spectrum_sample<S, F>(&mut self, on_success: S, on_failure: F) -> Result<bool>
    where
        S: FnOnce(Response) + Send + 'static,
        F: FnOnce(SerialError) + Send + 'static,
    {
        self.send(Command::SpectrumSample, on_success, on_failure)
    }
}
