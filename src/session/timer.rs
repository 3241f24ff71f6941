// src/session/timer.rs

use chrono::{DateTime, Duration, Utc};

/// What the countdown looks like at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerReading {
    pub remaining_seconds: i64,
    /// Below the low-time threshold. Presentation only.
    pub running_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(TimerReading),
    /// Reported once, on the first tick at or past the deadline.
    Expired,
    /// Already expired or cancelled; nothing to do.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Fired,
    Cancelled,
}

/// Countdown to an attempt's deadline.
///
/// Remaining time is recomputed from the wall clock on every tick instead of
/// being decremented, so throttled or skipped ticks cannot make it drift.
#[derive(Debug, Clone)]
pub struct Countdown {
    deadline: DateTime<Utc>,
    low_time_threshold: Duration,
    phase: Phase,
}

impl Countdown {
    pub fn new(started_at: DateTime<Utc>, duration_seconds: i64, low_time_threshold: Duration) -> Self {
        Self {
            deadline: started_at + Duration::seconds(duration_seconds.max(0)),
            low_time_threshold,
            phase: Phase::Running,
        }
    }

    /// Whole seconds left, rounded up, never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.deadline - now).num_milliseconds();
        if millis <= 0 { 0 } else { (millis + 999) / 1000 }
    }

    pub fn reading(&self, now: DateTime<Utc>) -> TimerReading {
        let remaining_seconds = self.remaining_seconds(now);
        TimerReading {
            remaining_seconds,
            running_out: remaining_seconds < self.low_time_threshold.num_seconds(),
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.phase != Phase::Running {
            return Tick::Stopped;
        }
        if now >= self.deadline {
            self.phase = Phase::Fired;
            return Tick::Expired;
        }
        Tick::Running(self.reading(now))
    }

    pub fn cancel(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Cancelled;
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}
