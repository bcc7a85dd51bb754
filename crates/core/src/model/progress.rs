use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::checkpoint::{Checkpoint, CheckpointTable};
use crate::model::ids::{CheckpointId, PathId, QuestionId};

//
// ─── INTEGRITY ─────────────────────────────────────────────────────────────────
//

/// A violated progress invariant, reported (and already repaired) by
/// [`PathProgress::repair_integrity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    CorrectExceedsAnswered { correct: u32, answered: u32 },
    CheckpointBeyondCount { id: CheckpointId, required: u32, answered: u32 },
    UnknownCheckpoint(CheckpointId),
    StaleLastCheckpoint {
        stored: Option<CheckpointId>,
        expected: Option<CheckpointId>,
    },
}

//
// ─── PATH PROGRESS ─────────────────────────────────────────────────────────────
//

/// Progress of one learning path (or category) across play sessions.
///
/// Invariants kept by every mutating method:
/// - `correct_answers <= questions_answered`
/// - every completed checkpoint has `questions_required <= questions_answered`
/// - `last_completed_checkpoint` is the completed checkpoint with the largest
///   requirement, or `None` when nothing is completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathProgress {
    path_id: PathId,
    questions_answered: u32,
    correct_answers: u32,
    completed_checkpoints: BTreeSet<CheckpointId>,
    last_completed_checkpoint: Option<CheckpointId>,
    used_question_ids: BTreeSet<QuestionId>,
    total_score: u64,
    last_played_at: Option<DateTime<Utc>>,
}

impl PathProgress {
    /// Fresh progress for a path that has never been played.
    #[must_use]
    pub fn initial(path_id: PathId) -> Self {
        Self {
            path_id,
            questions_answered: 0,
            correct_answers: 0,
            completed_checkpoints: BTreeSet::new(),
            last_completed_checkpoint: None,
            used_question_ids: BTreeSet::new(),
            total_score: 0,
            last_played_at: None,
        }
    }

    /// Rehydrate progress from persisted storage without validation.
    ///
    /// Callers are expected to run [`PathProgress::repair_integrity`] afterwards.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        path_id: PathId,
        questions_answered: u32,
        correct_answers: u32,
        completed_checkpoints: BTreeSet<CheckpointId>,
        last_completed_checkpoint: Option<CheckpointId>,
        used_question_ids: BTreeSet<QuestionId>,
        total_score: u64,
        last_played_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            path_id,
            questions_answered,
            correct_answers,
            completed_checkpoints,
            last_completed_checkpoint,
            used_question_ids,
            total_score,
            last_played_at,
        }
    }

    #[must_use]
    pub fn path_id(&self) -> &PathId {
        &self.path_id
    }

    #[must_use]
    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn completed_checkpoints(&self) -> &BTreeSet<CheckpointId> {
        &self.completed_checkpoints
    }

    #[must_use]
    pub fn last_completed_checkpoint(&self) -> Option<CheckpointId> {
        self.last_completed_checkpoint
    }

    #[must_use]
    pub fn used_question_ids(&self) -> &BTreeSet<QuestionId> {
        &self.used_question_ids
    }

    #[must_use]
    pub fn total_score(&self) -> u64 {
        self.total_score
    }

    #[must_use]
    pub fn last_played_at(&self) -> Option<DateTime<Utc>> {
        self.last_played_at
    }

    /// Ratio of correct answers, `0.0` before the first answer.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.questions_answered == 0 {
            return 0.0;
        }
        f64::from(self.correct_answers) / f64::from(self.questions_answered)
    }

    #[must_use]
    pub fn next_checkpoint<'t>(&self, table: &'t CheckpointTable) -> Option<&'t Checkpoint> {
        table.next(&self.completed_checkpoints)
    }

    #[must_use]
    pub fn is_path_completed(&self, table: &CheckpointTable) -> bool {
        self.next_checkpoint(table).is_none()
    }

    /// Fraction of the way from the last reached requirement to the next
    /// checkpoint, in `[0, 1]`. A completed path reports `1.0`.
    #[must_use]
    pub fn progress_to_next_checkpoint(&self, table: &CheckpointTable) -> f32 {
        let Some(next) = self.next_checkpoint(table) else {
            return 1.0;
        };
        let floor = self
            .last_completed_checkpoint
            .and_then(|id| table.requirement_for(id))
            .unwrap_or(0);
        let span = next.questions_required().saturating_sub(floor);
        if span == 0 {
            return 1.0;
        }
        let done = self.questions_answered.saturating_sub(floor).min(span);
        #[allow(clippy::cast_precision_loss)]
        let ratio = done as f32 / span as f32;
        ratio.clamp(0.0, 1.0)
    }

    /// Count one answered question and complete at most one checkpoint.
    ///
    /// Returns the checkpoint completed by this answer, if any. Even when the
    /// count jumps past several thresholds only the first eligible checkpoint
    /// is completed; the next call picks up the following one.
    pub fn record_answer(
        &mut self,
        table: &CheckpointTable,
        is_correct: bool,
        score_delta: u32,
        question_id: QuestionId,
        answered_at: DateTime<Utc>,
    ) -> Option<CheckpointId> {
        self.questions_answered = self.questions_answered.saturating_add(1);
        if is_correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.used_question_ids.insert(question_id);
        self.total_score = self.total_score.saturating_add(u64::from(score_delta));
        self.last_played_at = Some(answered_at);

        let reached = table
            .all()
            .iter()
            .find(|c| {
                !self.completed_checkpoints.contains(&c.id())
                    && c.questions_required() <= self.questions_answered
            })
            .map(Checkpoint::id)?;

        self.completed_checkpoints.insert(reached);
        self.refresh_last_completed(table);
        Some(reached)
    }

    /// Roll back to `checkpoint`: the question count becomes its requirement
    /// and later checkpoints are forgotten.
    pub fn reset_to_checkpoint(&mut self, table: &CheckpointTable, checkpoint: &Checkpoint) {
        let required = checkpoint.questions_required();
        self.questions_answered = required;
        self.correct_answers = self.correct_answers.min(required);
        self.completed_checkpoints.retain(|id| {
            table
                .requirement_for(*id)
                .is_some_and(|req| req <= required)
        });
        self.completed_checkpoints.insert(checkpoint.id());
        self.last_completed_checkpoint = Some(checkpoint.id());
    }

    /// Zero every counter while keeping the path identity.
    pub fn reset(&mut self) {
        *self = Self::initial(self.path_id.clone());
    }

    /// Check the invariants and repair any violation in place.
    ///
    /// Returns the issues found; an empty list means the progress was valid.
    pub fn repair_integrity(&mut self, table: &CheckpointTable) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        if self.correct_answers > self.questions_answered {
            issues.push(IntegrityIssue::CorrectExceedsAnswered {
                correct: self.correct_answers,
                answered: self.questions_answered,
            });
            self.correct_answers = self.questions_answered;
        }

        let answered = self.questions_answered;
        let mut invalid = Vec::new();
        for id in &self.completed_checkpoints {
            match table.requirement_for(*id) {
                None => invalid.push(IntegrityIssue::UnknownCheckpoint(*id)),
                Some(required) if required > answered => {
                    invalid.push(IntegrityIssue::CheckpointBeyondCount {
                        id: *id,
                        required,
                        answered,
                    });
                }
                Some(_) => {}
            }
        }
        for issue in &invalid {
            match issue {
                IntegrityIssue::UnknownCheckpoint(id)
                | IntegrityIssue::CheckpointBeyondCount { id, .. } => {
                    self.completed_checkpoints.remove(id);
                }
                _ => {}
            }
        }
        issues.extend(invalid);

        let expected = table.highest_of(&self.completed_checkpoints).map(Checkpoint::id);
        if self.last_completed_checkpoint != expected {
            issues.push(IntegrityIssue::StaleLastCheckpoint {
                stored: self.last_completed_checkpoint,
                expected,
            });
            self.last_completed_checkpoint = expected;
        }

        issues
    }

    fn refresh_last_completed(&mut self, table: &CheckpointTable) {
        self.last_completed_checkpoint =
            table.highest_of(&self.completed_checkpoints).map(Checkpoint::id);
    }
}
