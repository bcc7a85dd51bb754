use std::collections::BTreeSet;

use async_trait::async_trait;
use rand::rng;
use rand::seq::SliceRandom;

use dogdog_core::model::{PathId, Question, QuestionId};

use crate::error::SupplyError;

/// What the session knows about the player when it asks for questions.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyContext {
    pub path_id: PathId,
    pub questions_answered: u32,
    pub accuracy: f64,
    pub streak: u32,
    /// Ids that must not be returned again.
    pub exclude: BTreeSet<QuestionId>,
}

/// Source of questions for a session.
///
/// Implementations choose difficulty however they like but must not return
/// ids listed in `DifficultyContext::exclude`. Returning fewer questions than
/// requested is allowed and means the source is running dry.
#[async_trait]
pub trait QuestionSupply: Send + Sync {
    /// # Errors
    ///
    /// Returns `SupplyError` if the source cannot be reached.
    async fn get_questions(
        &self,
        count: usize,
        context: &DifficultyContext,
    ) -> Result<Vec<Question>, SupplyError>;
}

/// Difficulty points the bank aims for at the given progress.
///
/// Grows by five points every ten answered questions, nudged up for strong
/// players and down for struggling ones.
#[must_use]
pub fn target_difficulty(context: &DifficultyContext) -> u32 {
    let base = 10 + 5 * (context.questions_answered / 10);
    if context.questions_answered >= 5 && context.accuracy >= 0.8 {
        base + 5
    } else if context.questions_answered >= 5 && context.accuracy < 0.5 {
        base.saturating_sub(5)
    } else {
        base
    }
}

/// In-memory question bank.
///
/// Picks the unused questions closest to [`target_difficulty`]. With
/// shuffling enabled, questions at equal distance come out in random order.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
    shuffle: bool,
}

impl QuestionBank {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn select(&self, count: usize, context: &DifficultyContext) -> Vec<Question> {
        let target = target_difficulty(context);
        let mut candidates: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| !context.exclude.contains(q.id()))
            .collect();

        if self.shuffle {
            candidates.shuffle(&mut rng());
            candidates.sort_by_key(|q| q.difficulty_points().abs_diff(target));
        } else {
            candidates.sort_by(|a, b| {
                a.difficulty_points()
                    .abs_diff(target)
                    .cmp(&b.difficulty_points().abs_diff(target))
                    .then_with(|| a.id().cmp(b.id()))
            });
        }

        candidates.into_iter().take(count).cloned().collect()
    }
}

#[async_trait]
impl QuestionSupply for QuestionBank {
    async fn get_questions(
        &self,
        count: usize,
        context: &DifficultyContext,
    ) -> Result<Vec<Question>, SupplyError> {
        Ok(self.select(count, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, points: u32) -> Question {
        Question::new(
            QuestionId::new(id).unwrap(),
            format!("Question {id}?"),
            ["a".into(), "b".into(), "c".into(), "d".into()],
            0,
            None,
            points,
        )
        .unwrap()
    }

    fn context(answered: u32, accuracy: f64) -> DifficultyContext {
        DifficultyContext {
            path_id: PathId::new("breeds").unwrap(),
            questions_answered: answered,
            accuracy,
            streak: 0,
            exclude: BTreeSet::new(),
        }
    }

    #[test]
    fn target_grows_with_progress_and_accuracy() {
        assert_eq!(target_difficulty(&context(0, 0.0)), 10);
        assert_eq!(target_difficulty(&context(20, 0.6)), 20);
        assert_eq!(target_difficulty(&context(20, 0.9)), 25);
        assert_eq!(target_difficulty(&context(20, 0.2)), 15);
    }

    #[tokio::test]
    async fn bank_prefers_questions_near_target() {
        let bank = QuestionBank::new(vec![
            question("hard", 30),
            question("easy", 10),
            question("medium", 15),
        ]);
        let picked = bank.get_questions(2, &context(0, 0.0)).await.unwrap();
        let ids: Vec<_> = picked.iter().map(|q| q.id().as_str()).collect();
        assert_eq!(ids, vec!["easy", "medium"]);
    }

    #[tokio::test]
    async fn bank_never_returns_excluded_ids() {
        let bank = QuestionBank::new(vec![question("a", 10), question("b", 10)]).with_shuffle(true);
        let mut ctx = context(0, 0.0);
        ctx.exclude.insert(QuestionId::new("a").unwrap());

        let picked = bank.get_questions(5, &ctx).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id().as_str(), "b");
    }
}
