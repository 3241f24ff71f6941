// src/models/violation.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of an exam-integrity violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// The page became hidden (tab or application switch).
    TabSwitch,
    WindowBlur,
    FullscreenExit,
    RightClick,
    CopyPaste,
}

impl ViolationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationCategory::TabSwitch => "tab_switch",
            ViolationCategory::WindowBlur => "window_blur",
            ViolationCategory::FullscreenExit => "fullscreen_exit",
            ViolationCategory::RightClick => "right_click",
            ViolationCategory::CopyPaste => "copy_paste",
        }
    }
}

impl fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DTO for reporting a violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportViolationRequest {
    pub category: ViolationCategory,
}

/// Backend verdict after a violation was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    /// Total violations recorded for the attempt so far.
    pub violation_count: i64,
    /// Set once the threshold is reached; the client must submit immediately.
    pub auto_submitted: bool,
}
