// src/session/host.rs
//
// Collaborators supplied by the embedding UI. Each one is a small trait so
// the controller can run against fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fullscreen mode of the exam window.
#[async_trait]
pub trait FullscreenControl: Send + Sync {
    fn is_active(&self) -> bool;

    async fn request(&self) -> Result<(), String>;

    async fn exit(&self) -> Result<(), String>;
}

/// Where the session hands control once it is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Regular post-submission view (manual submit or time up).
    Submitted { assessment_id: i64 },
    /// Results view, used when the attempt was closed for violations.
    Results { assessment_id: i64 },
    /// The attempt could not be started.
    Away,
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Blocking, user-visible notification.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}
