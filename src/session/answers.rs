// src/session/answers.rs

use crate::models::{
    attempt::AnswerEntry,
    question::{OptionLabel, Question},
};

/// Selected answers and review marks for one attempt, plus the cursor of
/// the question currently on screen.
///
/// Every per-question vector covers exactly the question index range `[0, N)`.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    answers: Vec<Option<OptionLabel>>,
    marked: Vec<bool>,
    option_counts: Vec<usize>,
    current: usize,
}

impl AnswerSheet {
    pub fn new(questions: &[Question]) -> Self {
        Self {
            answers: vec![None; questions.len()],
            marked: vec![false; questions.len()],
            option_counts: questions.iter().map(|q| q.options.len()).collect(),
            current: 0,
        }
    }

    /// Records `label` for question `index`, replacing any earlier pick.
    /// Returns false when the index or the label does not exist.
    pub fn set_answer(&mut self, index: usize, label: OptionLabel) -> bool {
        match self.option_counts.get(index) {
            Some(&count) if label.index() < count => {
                self.answers[index] = Some(label);
                true
            }
            _ => false,
        }
    }

    pub fn clear_answer(&mut self, index: usize) -> bool {
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Flips the "marked for review" flag. Independent of the answer.
    pub fn toggle_marked(&mut self, index: usize) -> bool {
        match self.marked.get_mut(index) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    /// Moves the cursor, clamped to `[0, N-1]`. Returns the new position.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.current = index.min(self.total().saturating_sub(1));
        self.current
    }

    pub fn next(&mut self) -> usize {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> usize {
        self.go_to(self.current.saturating_sub(1))
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn answer(&self, index: usize) -> Option<OptionLabel> {
        self.answers.get(index).copied().flatten()
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.get(index).copied().unwrap_or(false)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn marked_count(&self) -> usize {
        self.marked.iter().filter(|m| **m).count()
    }

    pub fn total(&self) -> usize {
        self.answers.len()
    }

    /// Submission payload: one entry per question in index order, with an
    /// empty string for unanswered questions.
    pub fn to_entries(&self) -> Vec<AnswerEntry> {
        self.answers
            .iter()
            .enumerate()
            .map(|(question_index, answer)| AnswerEntry {
                question_index,
                selected_answer: answer.map(|l| l.as_str().to_string()).unwrap_or_default(),
            })
            .collect()
    }
}
