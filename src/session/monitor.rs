// src/session/monitor.rs

use crate::models::violation::ViolationCategory;

/// Raw signal from the exam window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityEvent {
    /// The document became hidden.
    VisibilityHidden,
    VisibilityVisible,
    WindowBlur,
    WindowFocus,
    FullscreenExited,
    FullscreenEntered,
    ContextMenu,
    Copy,
    Cut,
    Paste,
}

impl IntegrityEvent {
    /// Violation this event stands for, if any.
    pub fn category(self) -> Option<ViolationCategory> {
        match self {
            IntegrityEvent::VisibilityHidden => Some(ViolationCategory::TabSwitch),
            IntegrityEvent::WindowBlur => Some(ViolationCategory::WindowBlur),
            IntegrityEvent::FullscreenExited => Some(ViolationCategory::FullscreenExit),
            IntegrityEvent::ContextMenu => Some(ViolationCategory::RightClick),
            IntegrityEvent::Copy | IntegrityEvent::Cut | IntegrityEvent::Paste => {
                Some(ViolationCategory::CopyPaste)
            }
            IntegrityEvent::VisibilityVisible
            | IntegrityEvent::WindowFocus
            | IntegrityEvent::FullscreenEntered => None,
        }
    }
}

/// Source of integrity events (the browser's listeners in production).
///
/// `install` attaches the listeners, `pause` stops delivery without
/// detaching, `remove` detaches for good.
pub trait IntegrityObserver: Send {
    fn install(&mut self) -> Result<(), String>;

    fn pause(&mut self);

    fn remove(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorPhase {
    Idle,
    Active,
    Paused,
    Removed,
}

/// Wraps an observer so it is installed at most once and removed at most
/// once, and classifies events only while active.
pub struct AntiCheatMonitor {
    observer: Box<dyn IntegrityObserver>,
    phase: MonitorPhase,
}

impl AntiCheatMonitor {
    pub fn new(observer: Box<dyn IntegrityObserver>) -> Self {
        Self {
            observer,
            phase: MonitorPhase::Idle,
        }
    }

    pub fn install(&mut self) -> Result<(), String> {
        if self.phase != MonitorPhase::Idle {
            tracing::warn!(phase = ?self.phase, "Integrity observer already installed once");
            return Err("integrity observer already installed".to_string());
        }
        self.observer.install()?;
        self.phase = MonitorPhase::Active;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.phase == MonitorPhase::Active {
            self.observer.pause();
            self.phase = MonitorPhase::Paused;
        }
    }

    /// Safe to call any number of times; the observer sees one removal.
    pub fn remove(&mut self) {
        match self.phase {
            MonitorPhase::Active | MonitorPhase::Paused => {
                self.observer.remove();
                self.phase = MonitorPhase::Removed;
            }
            // Never installed: block a late install instead.
            MonitorPhase::Idle => self.phase = MonitorPhase::Removed,
            MonitorPhase::Removed => {}
        }
    }

    /// Violation to forward for `event`, or `None` when not active.
    pub fn classify(&self, event: IntegrityEvent) -> Option<ViolationCategory> {
        if self.phase != MonitorPhase::Active {
            return None;
        }
        event.category()
    }
}
