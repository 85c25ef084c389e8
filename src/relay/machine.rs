use std::time::Duration;

use super::backoff::ReconnectBackoff;
use crate::config::ReconnectPolicy;
use crate::event::{ConnectionNotice, ConnectionState};

/// A reconnect the driver must perform after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPlan {
    /// Closes since the last successful open, starting at 1.
    pub attempt: u32,
    pub delay: Duration,
}

/// Relay connection lifecycle without any I/O.
///
/// `Disconnected -> Connecting -> Connected -> Disconnected`, forever, until
/// `stop`. Each close schedules at most one reconnect; a second close before the
/// next connection attempt schedules nothing.
#[derive(Debug)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: ReconnectBackoff,
    reconnect_pending: bool,
    attempts: u32,
    stopped: bool,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff: ReconnectBackoff::new(policy),
            reconnect_pending: false,
            attempts: 0,
            stopped: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Start a connection attempt. Returns `false` once stopped.
    pub fn start_connecting(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.reconnect_pending = false;
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn on_open(&mut self) -> ConnectionNotice {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.backoff.reset();
        ConnectionNotice::None
    }

    /// Errors only raise the notice; scheduling is left to the close that follows.
    pub fn on_error(&mut self) -> ConnectionNotice {
        ConnectionNotice::error()
    }

    pub fn on_close(&mut self) -> Option<ReconnectPlan> {
        self.state = ConnectionState::Disconnected;
        if self.stopped || self.reconnect_pending {
            return None;
        }
        self.reconnect_pending = true;
        self.attempts = self.attempts.saturating_add(1);
        Some(ReconnectPlan {
            attempt: self.attempts,
            delay: self.backoff.next_delay(),
        })
    }

    /// Teardown: no further connects, any pending reconnect is void.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.reconnect_pending = false;
        self.state = ConnectionState::Disconnected;
    }
}
