use std::time::Instant;

use crate::serial::{Command, Response, SerialError};

pub type SuccessFn = Box<dyn FnOnce(Response) + Send>;
pub type FailureFn = Box<dyn FnOnce(SerialError) + Send>;

/// The single in-flight request
pub struct PendingCommand {
    pub command: Command,
    pub expected: usize,
    /// Poll ticks left before the command times out
    pub attempts_remaining: u32,
    pub budget: u32,
    pub started: Instant,
    pub(crate) on_success: SuccessFn,
    pub(crate) on_failure: FailureFn,
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("command", &self.command)
            .field("expected", &self.expected)
            .field("attempts_remaining", &self.attempts_remaining)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Outcome of one `poll()` tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Nothing in flight
    Idle,
    Waiting { attempts_remaining: u32 },
    /// `on_success` was invoked during this tick
    Completed,
    /// `on_failure` was invoked and the transport is now disconnected
    Failed,
}

impl PollStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, PollStatus::Completed | PollStatus::Failed)
    }
}
