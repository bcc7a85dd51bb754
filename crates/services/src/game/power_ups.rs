use rand::rng;
use rand::seq::SliceRandom;

use dogdog_core::model::{PowerUpInventory, PowerUpKind, Question};

use crate::error::PowerUpDenied;

/// Number of wrong answers hidden by a fifty-fifty.
pub const FIFTY_FIFTY_HIDES: usize = 2;

/// Per-question power-up bookkeeping, cleared whenever a new question starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct QuestionTurn {
    pub hidden_answers: Vec<usize>,
    pub hint_revealed: bool,
}

impl QuestionTurn {
    pub fn fifty_fifty_used(&self) -> bool {
        !self.hidden_answers.is_empty()
    }
}

/// Snapshot of everything a power-up precondition looks at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UsageContext<'a> {
    pub active: bool,
    pub question: Option<&'a Question>,
    pub turn: &'a QuestionTurn,
    pub timer_running: bool,
    pub lives: u32,
    pub max_lives: u32,
    pub inventory: &'a PowerUpInventory,
}

/// Decide whether `kind` may be used now.
///
/// `question` is `None` unless a question is waiting for an answer.
pub(crate) fn check(kind: PowerUpKind, ctx: &UsageContext<'_>) -> Result<(), PowerUpDenied> {
    if !ctx.active {
        return Err(PowerUpDenied::SessionInactive);
    }

    match kind {
        PowerUpKind::FiftyFifty => {
            ctx.question.ok_or(PowerUpDenied::NoQuestionInPlay)?;
            if ctx.turn.fifty_fifty_used() {
                return Err(PowerUpDenied::AlreadyUsed);
            }
        }
        PowerUpKind::Hint => {
            let question = ctx.question.ok_or(PowerUpDenied::NoQuestionInPlay)?;
            if question.hint().is_none() {
                return Err(PowerUpDenied::NoHint);
            }
            if ctx.turn.hint_revealed {
                return Err(PowerUpDenied::AlreadyUsed);
            }
        }
        PowerUpKind::ExtraTime => {
            ctx.question.ok_or(PowerUpDenied::NoQuestionInPlay)?;
            if !ctx.timer_running {
                return Err(PowerUpDenied::TimerNotRunning);
            }
        }
        PowerUpKind::Skip => {
            ctx.question.ok_or(PowerUpDenied::NoQuestionInPlay)?;
        }
        PowerUpKind::SecondChance => {
            if ctx.lives >= ctx.max_lives {
                return Err(PowerUpDenied::LivesFull);
            }
        }
    }

    if ctx.inventory.has(kind) {
        Ok(())
    } else {
        Err(PowerUpDenied::NoneLeft(kind))
    }
}

/// Pick the wrong answers a fifty-fifty hides, in ascending order.
pub(crate) fn pick_hidden_answers(question: &Question) -> Vec<usize> {
    let mut wrong = question.wrong_answer_indices();
    wrong.shuffle(&mut rng());
    wrong.truncate(FIFTY_FIFTY_HIDES);
    wrong.sort_unstable();
    wrong
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogdog_core::model::QuestionId;

    fn question(hint: Option<&str>) -> Question {
        Question::new(
            QuestionId::new("q1").unwrap(),
            "Which breed is the smallest?",
            [
                "Chihuahua".into(),
                "Great Dane".into(),
                "Pug".into(),
                "Beagle".into(),
            ],
            0,
            hint.map(str::to_string),
            10,
        )
        .unwrap()
    }

    fn ctx<'a>(
        question: Option<&'a Question>,
        turn: &'a QuestionTurn,
        inventory: &'a PowerUpInventory,
    ) -> UsageContext<'a> {
        UsageContext {
            active: true,
            question,
            turn,
            timer_running: true,
            lives: 3,
            max_lives: 3,
            inventory,
        }
    }

    #[test]
    fn empty_inventory_is_denied() {
        let q = question(Some("tiny"));
        let turn = QuestionTurn::default();
        let inv = PowerUpInventory::empty();
        assert_eq!(
            check(PowerUpKind::Hint, &ctx(Some(&q), &turn, &inv)),
            Err(PowerUpDenied::NoneLeft(PowerUpKind::Hint))
        );
    }

    #[test]
    fn kind_specific_preconditions() {
        let q = question(None);
        let turn = QuestionTurn::default();
        let inv = PowerUpInventory::uniform(1);
        let base = ctx(Some(&q), &turn, &inv);

        assert_eq!(check(PowerUpKind::Hint, &base), Err(PowerUpDenied::NoHint));
        assert_eq!(check(PowerUpKind::SecondChance, &base), Err(PowerUpDenied::LivesFull));
        assert!(check(PowerUpKind::SecondChance, &UsageContext { lives: 2, ..base }).is_ok());
        assert_eq!(
            check(PowerUpKind::ExtraTime, &UsageContext { timer_running: false, ..base }),
            Err(PowerUpDenied::TimerNotRunning)
        );
        assert_eq!(
            check(PowerUpKind::Skip, &UsageContext { question: None, ..base }),
            Err(PowerUpDenied::NoQuestionInPlay)
        );
        assert_eq!(
            check(PowerUpKind::FiftyFifty, &UsageContext { active: false, ..base }),
            Err(PowerUpDenied::SessionInactive)
        );
    }

    #[test]
    fn fifty_fifty_only_once_per_question() {
        let q = question(None);
        let turn = QuestionTurn {
            hidden_answers: vec![1, 2],
            hint_revealed: false,
        };
        let inv = PowerUpInventory::uniform(2);
        assert_eq!(
            check(PowerUpKind::FiftyFifty, &ctx(Some(&q), &turn, &inv)),
            Err(PowerUpDenied::AlreadyUsed)
        );
    }

    #[test]
    fn hidden_answers_never_include_the_correct_one() {
        let q = question(None);
        for _ in 0..50 {
            let hidden = pick_hidden_answers(&q);
            assert_eq!(hidden.len(), FIFTY_FIFTY_HIDES);
            assert!(!hidden.contains(&q.correct_answer_index()));
            assert!(hidden.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
