// src/session/mod.rs

//! Client side of a proctored attempt.
//!
//! [`controller::SessionController`] is the state machine administering one
//! timed attempt. It is driven by [`driver::spawn`], which feeds it user and
//! integrity events plus a one-second tick, and publishes a [`driver::SessionView`]
//! for the presentation layer. Violation reports run on their own tasks, so
//! a slow service never holds up answering or the countdown.

use std::sync::Arc;
use std::time::Duration;

pub mod answers;
pub mod api;
pub mod controller;
pub mod driver;
pub mod host;
pub mod monitor;
pub mod reporter;
pub mod timer;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AttemptApi, HttpAttemptApi};
pub use controller::{Outcome, SessionController, SessionState, SubmitConfirmation, SubmitReason};
pub use driver::{SessionEvent, SessionHandle, SessionView};
pub use host::{Clock, Destination, FullscreenControl, Navigator, Notifier, SystemClock};
pub use monitor::{IntegrityEvent, IntegrityObserver};

/// Below this many seconds the countdown is shown as running out.
pub const LOW_TIME_THRESHOLD_SECONDS: i64 = 300;

/// Upper bound on any single call to the attempt service.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side tunables.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub low_time_threshold: chrono::Duration,
    /// Pause before asking for fullscreen again after the user left it.
    pub fullscreen_retry_delay: Duration,
    pub tick_period: Duration,
    /// A start, report or submit that takes longer counts as failed.
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            low_time_threshold: chrono::Duration::seconds(LOW_TIME_THRESHOLD_SECONDS),
            fullscreen_retry_delay: Duration::from_millis(1000),
            tick_period: Duration::from_secs(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Everything a controller needs from its surroundings.
pub struct SessionHost {
    pub api: Arc<dyn AttemptApi>,
    pub observer: Box<dyn IntegrityObserver>,
    pub fullscreen: Arc<dyn FullscreenControl>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}
