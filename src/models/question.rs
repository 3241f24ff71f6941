// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Highest number of options a question may offer (labelled A-D).
pub const MAX_OPTIONS: usize = 4;

/// Label of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    /// Parses a submitted label. Only the exact upper-case letters are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A" => Some(OptionLabel::A),
            "B" => Some(OptionLabel::B),
            "C" => Some(OptionLabel::C),
            "D" => Some(OptionLabel::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question as stored inside an assessment, answer key included.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,

    /// Option texts, in label order (first is A).
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    pub correct_answer: OptionLabel,

    #[validate(range(min = 1, max = 100))]
    pub points: i64,
}

impl QuestionRecord {
    /// True when the answer key points at an option that exists.
    pub fn answer_in_range(&self) -> bool {
        self.correct_answer.index() < self.options.len()
    }

    pub fn to_public(&self, index: usize) -> Question {
        Question {
            index,
            text: self.text.clone(),
            options: self.options.clone(),
            points: self.points,
        }
    }
}

/// DTO for sending a question to the test taker (excludes the answer key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Ordinal position inside the assessment, starting at 0.
    pub index: usize,
    pub text: String,
    pub options: Vec<String>,
    pub points: i64,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("too_few_options"));
    }
    if options.len() > MAX_OPTIONS {
        return Err(validator::ValidationError::new("too_many_options"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("invalid_option_length"));
        }
    }
    Ok(())
}
