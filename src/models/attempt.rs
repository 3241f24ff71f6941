// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::models::assessment::PublicAssessment;

/// Lifecycle of an attempt row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    /// Submitted after the violation threshold was crossed.
    AutoSubmitted,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::AutoSubmitted => "auto_submitted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(AttemptStatus::InProgress),
            "submitted" => Some(AttemptStatus::Submitted),
            "auto_submitted" => Some(AttemptStatus::AutoSubmitted),
            _ => None,
        }
    }
}

/// Represents the 'attempts' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct AttemptRecord {
    pub id: String,
    pub user_id: i64,
    pub assessment_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_seconds: i64,
    pub violation_count: i64,
    /// Set by the backend once the violation threshold is reached.
    pub auto_submitted: bool,
    pub status: String,
    pub score: Option<i64>,
    pub correct_count: Option<i64>,
    pub answers: Option<Json<Vec<AnswerEntry>>>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AttemptRecord {
    pub fn status(&self) -> Option<AttemptStatus> {
        AttemptStatus::parse(&self.status)
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.status(), Some(AttemptStatus::InProgress))
    }

    pub fn deadline(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at + chrono::Duration::seconds(self.duration_seconds)
    }

    pub fn to_wire(&self) -> Attempt {
        Attempt {
            id: self.id.clone(),
            started_at: self.started_at,
            duration_seconds: self.duration_seconds,
            violation_count: self.violation_count,
            auto_submitted: self.auto_submitted,
        }
    }

    /// Answers as they were submitted; empty before submission.
    pub fn submitted_answers(&self) -> Vec<AnswerEntry> {
        self.answers
            .as_ref()
            .map(|answers| answers.0.clone())
            .unwrap_or_default()
    }
}

/// An attempt as seen by the test taker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_seconds: i64,
    pub violation_count: i64,
    /// The backend already demanded submission; the attempt must not resume.
    #[serde(default)]
    pub auto_submitted: bool,
}

/// DTO returned by the start endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt: Attempt,
    pub assessment: PublicAssessment,
}

/// One submitted answer. An empty `selected_answer` means unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_index: usize,
    pub selected_answer: String,
}

/// DTO for submitting an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AnswerEntry>,
}

/// Graded outcome of an attempt, shown on the results view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub attempt_id: String,
    pub score: i64,
    pub total_points: i64,
    pub correct_count: i64,
    pub total_questions: usize,
    pub violation_count: i64,
    pub submitted_due_to_violations: bool,
    /// Submitted after the deadline plus grace period.
    pub late: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    /// What was handed in, one entry per question.
    #[serde(default)]
    pub answers: Vec<AnswerEntry>,
}
