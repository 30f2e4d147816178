//! Async host for the dispatcher: ticks `poll()` on a tokio interval.
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use super::{CommandDispatcher, PollStatus};
use crate::config::SessionConfig;
use crate::serial::{Command, Response, Result, SerialError, Transport};

pub struct PollDriver<T: Transport> {
    dispatcher: CommandDispatcher<T>,
    poll_interval: Duration,
}

impl<T: Transport> PollDriver<T> {
    pub fn new(dispatcher: CommandDispatcher<T>, poll_interval: Duration) -> Self {
        Self {
            dispatcher,
            poll_interval,
        }
    }

    pub fn from_config(transport: T, config: &SessionConfig) -> Self {
        Self::new(
            CommandDispatcher::from_config(transport, config),
            config.poll_interval(),
        )
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<T> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut CommandDispatcher<T> {
        &mut self.dispatcher
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher.transport().is_connected()
    }

    /// Send a command that has no response
    pub fn fire(&mut self, command: Command) -> Result<()> {
        if command.response_len() != 0 {
            return Err(SerialError::ProtocolError(format!(
                "{} expects a response",
                command.kind().name()
            )));
        }
        if self.dispatcher.send(command, |_| {}, |_| {})? {
            Ok(())
        } else {
            Err(SerialError::NotConnected)
        }
    }

    /// Send `command` and poll until one of its continuations fires.
    ///
    /// A command left in flight by an earlier `execute` that was dropped
    /// before finishing is polled to completion first; its continuations fire
    /// into a closed channel.
    pub async fn execute(&mut self, command: Command) -> Result<Response> {
        if command.response_len() == 0 {
            return Err(SerialError::ProtocolError(format!(
                "{} has no response",
                command.kind().name()
            )));
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let abandoned = self.dispatcher.pending_command().map(|p| p.command.kind());
        if let Some(kind) = abandoned {
            log::debug!(
                "Finishing abandoned {} before {}",
                kind.name(),
                command.kind().name()
            );
            self.run_until_idle(&mut ticker).await;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let failure_tx = tx.clone();
        let started = self.dispatcher.send(
            command,
            move |response| {
                let _ = tx.send(Ok(response));
            },
            move |error| {
                let _ = failure_tx.send(Err(error));
            },
        )?;
        if !started {
            return Err(SerialError::NotConnected);
        }

        self.run_until_idle(&mut ticker).await;

        rx.try_recv().unwrap_or_else(|_| {
            Err(SerialError::ProtocolError(
                "command finished without a result".to_string(),
            ))
        })
    }

    async fn run_until_idle(&mut self, ticker: &mut Interval) {
        loop {
            ticker.tick().await;
            let status = self.dispatcher.poll();
            if status.is_finished() || status == PollStatus::Idle {
                break;
            }
        }
    }
}
