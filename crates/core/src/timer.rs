//! Countdown timer for timed sessions.
//!
//! Remaining time is always derived from an absolute expiry instant, never from
//! counting ticks, so a scheduler that fires late or skips ticks (backgrounded
//! window, suspended laptop) still reports the correct value on the next tick.

use chrono::{DateTime, Utc};

use crate::time::{millis, millis_between};

/// Lifecycle of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
    Stopped,
}

impl TimerState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Stopped)
    }
}

/// Notifications produced by [`CountdownTimer::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    RemainingTimeChanged(u64),
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownTimer {
    state: TimerState,
    duration_millis: u64,
    expires_at: Option<DateTime<Utc>>,
    remaining_millis: u64,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownTimer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            duration_millis: 0,
            expires_at: None,
            remaining_millis: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn duration_millis(&self) -> u64 {
        self.duration_millis
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Begin counting down. Returns `false` (and changes nothing) unless the timer is idle.
    pub fn start(&mut self, duration_millis: u64, now: DateTime<Utc>) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        self.duration_millis = duration_millis;
        self.remaining_millis = duration_millis;
        self.expires_at = Some(deadline(now, duration_millis));
        self.state = TimerState::Running;
        true
    }

    /// Recompute remaining time against `now`.
    ///
    /// Emits `RemainingTimeChanged` when the value moved since the last tick and
    /// `Expired` the first time it reaches zero. Ticks outside `Running` are silent.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        if self.state != TimerState::Running {
            return events;
        }
        let Some(expires_at) = self.expires_at else {
            return events;
        };

        let remaining = millis_between(now, expires_at);
        if remaining != self.remaining_millis {
            self.remaining_millis = remaining;
            events.push(TimerEvent::RemainingTimeChanged(remaining));
        }
        if remaining == 0 {
            self.state = TimerState::Expired;
            self.expires_at = None;
            events.push(TimerEvent::Expired);
        }
        events
    }

    /// Freeze the countdown. Returns `false` if the timer was not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        if let Some(expires_at) = self.expires_at.take() {
            self.remaining_millis = millis_between(now, expires_at);
        }
        self.state = TimerState::Paused;
        true
    }

    /// Continue a paused countdown from where it stopped.
    pub fn resume(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        self.expires_at = Some(deadline(now, self.remaining_millis));
        self.state = TimerState::Running;
        true
    }

    /// Terminal stop. Remaining time is frozen at `now`.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if self.state.is_terminal() {
            return;
        }
        self.remaining_millis = self.remaining_millis(now);
        self.expires_at = None;
        self.state = TimerState::Stopped;
    }

    /// Remaining time as of `now`, without emitting events.
    #[must_use]
    pub fn remaining_millis(&self, now: DateTime<Utc>) -> u64 {
        match (self.state, self.expires_at) {
            (TimerState::Running, Some(expires_at)) => millis_between(now, expires_at),
            (TimerState::Expired, _) => 0,
            _ => self.remaining_millis,
        }
    }

    /// Counted-down time as of `now`; pauses are excluded.
    #[must_use]
    pub fn elapsed_millis(&self, now: DateTime<Utc>) -> u64 {
        if self.state == TimerState::Idle {
            return 0;
        }
        self.duration_millis
            .saturating_sub(self.remaining_millis(now))
    }
}

fn deadline(now: DateTime<Utc>, duration_millis: u64) -> DateTime<Utc> {
    now.checked_add_signed(millis(duration_millis))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
