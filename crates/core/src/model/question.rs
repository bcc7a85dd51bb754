use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Number of answer options on every question.
pub const ANSWER_COUNT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("correct answer index {index} is out of range")]
    CorrectIndexOutOfRange { index: usize },
}

/// A multiple-choice question with exactly four answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    answers: [String; ANSWER_COUNT],
    correct_answer_index: usize,
    hint: Option<String>,
    difficulty_points: u32,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank or the correct index is not
    /// one of the four answers.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        answers: [String; ANSWER_COUNT],
        correct_answer_index: usize,
        hint: Option<String>,
        difficulty_points: u32,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if correct_answer_index >= ANSWER_COUNT {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_answer_index,
            });
        }
        let hint = hint
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());

        Ok(Self {
            id,
            text,
            answers,
            correct_answer_index,
            hint,
            difficulty_points,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn answers(&self) -> &[String; ANSWER_COUNT] {
        &self.answers
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn difficulty_points(&self) -> u32 {
        self.difficulty_points
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct_answer_index
    }

    /// Indices of the three wrong answers.
    #[must_use]
    pub fn wrong_answer_indices(&self) -> Vec<usize> {
        (0..ANSWER_COUNT)
            .filter(|i| *i != self.correct_answer_index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> [String; ANSWER_COUNT] {
        ["Bark".into(), "Meow".into(), "Moo".into(), "Quack".into()]
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Question::new(QuestionId::new("q1").unwrap(), "Dogs say?", answers(), 4, None, 10)
            .unwrap_err();
        assert_eq!(err, QuestionError::CorrectIndexOutOfRange { index: 4 });
    }

    #[test]
    fn rejects_blank_text() {
        let err = Question::new(QuestionId::new("q1").unwrap(), "  ", answers(), 0, None, 10)
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn blank_hint_is_dropped() {
        let q = Question::new(
            QuestionId::new("q1").unwrap(),
            "Dogs say?",
            answers(),
            0,
            Some("   ".into()),
            10,
        )
        .unwrap();
        assert!(q.hint().is_none());
        assert!(q.is_correct(0));
        assert_eq!(q.wrong_answer_indices(), vec![1, 2, 3]);
    }
}
