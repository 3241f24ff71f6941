// src/models/assessment.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::MAX_DURATION_SECONDS;
use crate::models::question::{Question, QuestionRecord};

/// Represents the 'assessments' table in the database.
#[derive(Debug, Clone, FromRow)]
pub struct Assessment {
    pub id: i64,
    pub title: String,

    /// Allotted time for one attempt.
    pub duration_seconds: i64,

    /// Questions with their answer keys, stored as a JSON array.
    pub questions: Json<Vec<QuestionRecord>>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Assessment {
    pub fn total_points(&self) -> i64 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// The assessment as handed to a test taker: no answer keys.
    pub fn to_public(&self) -> PublicAssessment {
        PublicAssessment {
            id: self.id,
            title: self.title.clone(),
            duration_seconds: self.duration_seconds,
            questions: self
                .questions
                .iter()
                .enumerate()
                .map(|(index, q)| q.to_public(index))
                .collect(),
        }
    }

    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            id: self.id,
            title: self.title.clone(),
            duration_seconds: self.duration_seconds,
            question_count: self.questions.len(),
            total_points: self.total_points(),
        }
    }
}

/// DTO returned when an attempt starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAssessment {
    pub id: i64,
    pub title: String,
    pub duration_seconds: i64,
    pub questions: Vec<Question>,
}

/// DTO for the assessment landing view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    pub id: i64,
    pub title: String,
    pub duration_seconds: i64,
    pub question_count: usize,
    pub total_points: i64,
}

/// DTO for creating a new assessment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(range(min = 1, max = MAX_DURATION_SECONDS))]
    pub duration_seconds: i64,

    #[validate(length(min = 1, max = 200))]
    #[validate(nested)]
    pub questions: Vec<QuestionRecord>,
}

impl CreateAssessmentRequest {
    /// Checks that go beyond per-field validation.
    pub fn check_answer_keys(&self) -> Result<(), String> {
        match self.questions.iter().position(|q| !q.answer_in_range()) {
            Some(index) => Err(format!(
                "Question {} has an answer key without a matching option",
                index
            )),
            None => Ok(()),
        }
    }
}
