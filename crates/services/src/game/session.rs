use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use dogdog_core::model::{
    ANSWER_COUNT, Checkpoint, CheckpointId, GameState, PathId, PowerUpInventory, PowerUpKind,
    Question, QuestionId,
};
use dogdog_core::reward::RewardCalculator;

use crate::config::GameConfig;
use crate::error::{PowerUpDenied, ProgressionError, SessionError};
use crate::events::{EventBus, ListenerKey};
use crate::progression::ProgressionTracker;
use crate::question_supply::{DifficultyContext, QuestionSupply};
use crate::ticker::Ticker;

use super::fallback::{FallbackHandler, FallbackSummary};
use super::power_ups::{self, QuestionTurn, UsageContext};

//
// ─── OUTCOMES & EVENTS ─────────────────────────────────────────────────────────
//

/// Where the session is in its question loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Not initialized yet, or reset.
    Idle,
    AwaitingAnswer,
    ShowingFeedback,
    Ended,
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    SupplyExhausted,
    EndedByPlayer,
}

/// Result of resolving one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    /// `None` when the timer ran out.
    pub chosen: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    pub points: u32,
    pub lives_remaining: u32,
    /// Checkpoint completed by this answer.
    pub checkpoint: Option<CheckpointId>,
    /// Present when this answer emptied the lives and a fallback ran.
    pub fallback: Option<FallbackSummary>,
}

impl AnswerFeedback {
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.chosen.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// The session was not accepting answers; nothing changed.
    Ignored,
    Resolved(AnswerFeedback),
}

/// Notifications emitted by [`GameSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    StateChanged,
    AnswerResolved(AnswerFeedback),
    TimerTick { remaining: u32 },
    PowerUpUsed { kind: PowerUpKind },
    CheckpointReached { checkpoint: CheckpointId, granted: PowerUpInventory },
    FallbackApplied(FallbackSummary),
    SessionEnded { reason: EndReason },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One play-through of a path: questions, lives, score, streak, timer and
/// power-ups.
///
/// Every answered question is reported to the [`ProgressionTracker`]. Losing
/// the last life does not end the game; the [`FallbackHandler`] rolls
/// progress back to the last completed checkpoint and the session continues.
pub struct GameSession {
    config: GameConfig,
    tracker: ProgressionTracker,
    supply: Arc<dyn QuestionSupply>,
    ticker: Box<dyn Ticker>,
    fallback: FallbackHandler,
    state: GameState,
    phase: SessionPhase,
    paused: bool,
    questions: Vec<Question>,
    current: usize,
    turn: QuestionTurn,
    session_answered: u32,
    session_correct: u32,
    events: EventBus<GameEvent>,
}

impl GameSession {
    #[must_use]
    pub fn new(
        config: GameConfig,
        tracker: ProgressionTracker,
        supply: Arc<dyn QuestionSupply>,
        ticker: Box<dyn Ticker>,
        rewards: RewardCalculator,
    ) -> Self {
        let state = GameState::new(config.max_lives(), config.starting_inventory());
        Self {
            config,
            tracker,
            supply,
            ticker,
            fallback: FallbackHandler::new(rewards),
            state,
            phase: SessionPhase::Idle,
            paused: false,
            questions: Vec::new(),
            current: 0,
            turn: QuestionTurn::default(),
            session_answered: 0,
            session_correct: 0,
            events: EventBus::new(),
        }
    }

    /// Select `path_id`, load the first batch of questions and start the
    /// first question.
    ///
    /// # Errors
    ///
    /// - `ExhaustedSupply` if the supply has no question to offer; the session
    ///   stays inactive
    /// - `Supply` if the supply fails
    pub async fn initialize(&mut self, path_id: PathId) -> Result<(), SessionError> {
        self.ticker.cancel();
        self.tracker.select_path(path_id.clone()).await;
        self.state = GameState::new(self.config.max_lives(), self.config.starting_inventory());
        self.phase = SessionPhase::Idle;
        self.paused = false;
        self.questions.clear();
        self.current = 0;
        self.turn = QuestionTurn::default();
        self.session_answered = 0;
        self.session_correct = 0;

        let requested = self.config.batch_size();
        let batch = self.fetch_batch().await?;
        if batch.is_empty() {
            warn!(path = %path_id, "no questions available; session not started");
            return Err(SessionError::ExhaustedSupply {
                requested,
                received: 0,
            });
        }
        if batch.len() < requested {
            warn!(path = %path_id, requested, received = batch.len(), "short question batch");
        }

        self.questions = batch;
        self.state.set_active(true);
        info!(
            path = %path_id,
            questions = self.questions.len(),
            lives = self.state.lives(),
            "session started"
        );
        self.begin_question();
        Ok(())
    }

    /// Answer the current question with the answer at `index`.
    ///
    /// # Errors
    ///
    /// - `InvalidAnswerIndex` if `index` is not one of the four answers
    /// - `NotInitialized` if [`Self::initialize`] has not run
    /// - `Progression` / `Reward` if the tracker or rewards reject the update
    pub async fn answer(&mut self, index: usize) -> Result<AnswerOutcome, SessionError> {
        if index >= ANSWER_COUNT {
            return Err(SessionError::InvalidAnswerIndex { index });
        }
        if self.phase == SessionPhase::Idle {
            return Err(SessionError::NotInitialized);
        }
        if !self.accepts_answer() {
            return Ok(AnswerOutcome::Ignored);
        }
        let feedback = self.resolve(Some(index)).await?;
        Ok(AnswerOutcome::Resolved(feedback))
    }

    /// Move on from the feedback of the last answer.
    ///
    /// Returns the new question, or `None` once the session has ended. While a
    /// question still waits for an answer this returns it unchanged.
    ///
    /// # Errors
    ///
    /// - `NotInitialized` if [`Self::initialize`] has not run
    /// - `Supply` if refilling the batch fails; the session stays on the
    ///   feedback so the call can be retried
    pub async fn next_question(&mut self) -> Result<Option<&Question>, SessionError> {
        match self.phase {
            SessionPhase::Idle => return Err(SessionError::NotInitialized),
            SessionPhase::Ended => return Ok(None),
            SessionPhase::AwaitingAnswer => return Ok(self.questions.get(self.current)),
            SessionPhase::ShowingFeedback => {}
        }
        if self.advance().await? {
            Ok(self.questions.get(self.current))
        } else {
            Ok(None)
        }
    }

    /// Deliver one timer tick produced under `epoch`.
    ///
    /// Ticks are ignored unless they come from the current timer, the ticker
    /// is running and a question waits for an answer. A tick queued before the
    /// previous question resolved therefore never touches the next one. When
    /// the countdown reaches zero the question resolves as incorrect, exactly
    /// like a wrong answer.
    ///
    /// # Errors
    ///
    /// See [`Self::answer`].
    pub async fn tick(&mut self, epoch: u64) -> Result<Option<AnswerFeedback>, SessionError> {
        if epoch != self.ticker.epoch() {
            debug!(epoch, current = self.ticker.epoch(), "stale tick dropped");
            return Ok(None);
        }
        if !self.ticker.is_running() || !self.accepts_answer() {
            return Ok(None);
        }
        let remaining = self.state.tick_down();
        self.events.emit(&GameEvent::TimerTick { remaining });
        if remaining > 0 {
            return Ok(None);
        }
        debug!(question = ?self.questions.get(self.current).map(Question::id), "time ran out");
        self.resolve(None).await.map(Some)
    }

    /// Pause the countdown. Returns `false` if no question is in play.
    pub fn pause(&mut self) -> bool {
        if !self.accepts_answer() {
            return false;
        }
        self.ticker.pause();
        self.paused = true;
        self.events.emit(&GameEvent::StateChanged);
        true
    }

    /// Resume a paused countdown from the preserved time.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.ticker.resume();
        self.events.emit(&GameEvent::StateChanged);
        true
    }

    /// Recover from losing every life.
    ///
    /// Safe to call repeatedly: once lives are restored further calls only
    /// report the current situation with `applied: false`.
    ///
    /// # Errors
    ///
    /// Returns `Progression` if lives are gone but no path is selected.
    pub async fn handle_game_over(&mut self) -> Result<FallbackSummary, SessionError> {
        let accuracy = self.session_accuracy();
        let summary = self
            .fallback
            .apply(&mut self.tracker, &mut self.state, accuracy)
            .await?;
        if summary.applied {
            self.events.emit(&GameEvent::FallbackApplied(summary.clone()));
            self.events.emit(&GameEvent::StateChanged);
        }
        Ok(summary)
    }

    /// Stop the timer and deactivate the session.
    pub fn end_session(&mut self) {
        if matches!(self.phase, SessionPhase::Idle | SessionPhase::Ended) {
            return;
        }
        info!(score = self.state.score(), answered = self.session_answered, "session ended");
        self.finish(EndReason::EndedByPlayer);
    }

    /// Drop all session state. Progress already recorded by the tracker stays.
    pub fn reset(&mut self) {
        self.ticker.cancel();
        self.state = GameState::new(self.config.max_lives(), self.config.starting_inventory());
        self.phase = SessionPhase::Idle;
        self.paused = false;
        self.questions.clear();
        self.current = 0;
        self.turn = QuestionTurn::default();
        self.session_answered = 0;
        self.session_correct = 0;
        self.events.emit(&GameEvent::StateChanged);
    }

    // ─── power-ups ────────────────────────────────────────────────────────

    /// Why `kind` cannot be used right now, if it cannot.
    ///
    /// # Errors
    ///
    /// Returns the first failed precondition as `PowerUpDenied`.
    pub fn availability(&self, kind: PowerUpKind) -> Result<(), PowerUpDenied> {
        power_ups::check(kind, &self.usage_context())
    }

    #[must_use]
    pub fn can_use(&self, kind: PowerUpKind) -> bool {
        self.availability(kind).is_ok()
    }

    /// Use any power-up by kind. Returns `false` if it is not available.
    ///
    /// # Errors
    ///
    /// Only skipping can fail, when refilling the question batch fails.
    pub async fn use_power_up(&mut self, kind: PowerUpKind) -> Result<bool, SessionError> {
        Ok(match kind {
            PowerUpKind::FiftyFifty => self.use_fifty_fifty(),
            PowerUpKind::Hint => self.use_hint(),
            PowerUpKind::ExtraTime => self.use_extra_time(),
            PowerUpKind::Skip => return self.use_skip().await,
            PowerUpKind::SecondChance => self.use_second_chance(),
        })
    }

    /// Hide two wrong answers of the current question.
    pub fn use_fifty_fifty(&mut self) -> bool {
        if !self.permits(PowerUpKind::FiftyFifty) {
            return false;
        }
        let Some(question) = self.questions.get(self.current) else {
            return false;
        };
        self.turn.hidden_answers = power_ups::pick_hidden_answers(question);
        self.spend(PowerUpKind::FiftyFifty)
    }

    /// Reveal the hint of the current question.
    pub fn use_hint(&mut self) -> bool {
        if !self.permits(PowerUpKind::Hint) {
            return false;
        }
        self.turn.hint_revealed = true;
        self.spend(PowerUpKind::Hint)
    }

    pub fn use_extra_time(&mut self) -> bool {
        if !self.permits(PowerUpKind::ExtraTime) {
            return false;
        }
        self.state.add_time(self.config.extra_time_secs());
        self.spend(PowerUpKind::ExtraTime)
    }

    /// Win back one life.
    pub fn use_second_chance(&mut self) -> bool {
        if !self.permits(PowerUpKind::SecondChance) {
            return false;
        }
        self.state.gain_life();
        self.spend(PowerUpKind::SecondChance)
    }

    /// Leave the current question without answering it.
    ///
    /// # Errors
    ///
    /// Returns `Supply` if the next batch cannot be fetched; nothing is spent.
    /// Nothing is spent either when the supply runs dry and the session ends
    /// instead of moving on.
    pub async fn use_skip(&mut self) -> Result<bool, SessionError> {
        if !self.permits(PowerUpKind::Skip) {
            return Ok(false);
        }
        debug!(question = ?self.questions.get(self.current).map(Question::id), "question skipped");
        if !self.advance().await? {
            return Ok(false);
        }
        Ok(self.spend(PowerUpKind::Skip))
    }

    // ─── getters ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        self.state.lives()
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.state.score()
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.state.streak()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining()
    }

    #[must_use]
    pub fn inventory(&self) -> &PowerUpInventory {
        self.state.inventory()
    }

    /// The question on screen, answered or not.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            SessionPhase::AwaitingAnswer | SessionPhase::ShowingFeedback => {
                self.questions.get(self.current)
            }
            SessionPhase::Idle | SessionPhase::Ended => None,
        }
    }

    /// Answer indices hidden by a fifty-fifty on the current question.
    #[must_use]
    pub fn hidden_answers(&self) -> &[usize] {
        &self.turn.hidden_answers
    }

    #[must_use]
    pub fn revealed_hint(&self) -> Option<&str> {
        if !self.turn.hint_revealed {
            return None;
        }
        self.current_question().and_then(Question::hint)
    }

    /// Correct answers over answered questions in this session, `0.0` before
    /// the first answer.
    #[must_use]
    pub fn session_accuracy(&self) -> f64 {
        if self.session_answered == 0 {
            return 0.0;
        }
        f64::from(self.session_correct) / f64::from(self.session_answered)
    }

    #[must_use]
    pub fn next_checkpoint(&self) -> Option<&Checkpoint> {
        self.tracker.next_checkpoint()
    }

    #[must_use]
    pub fn progress_to_next_checkpoint(&self) -> f32 {
        self.tracker.progress_to_next_checkpoint()
    }

    #[must_use]
    pub fn tracker(&self) -> &ProgressionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ProgressionTracker {
        &mut self.tracker
    }

    pub fn subscribe(&mut self, listener: impl Fn(&GameEvent) + Send + Sync + 'static) -> ListenerKey {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, key: ListenerKey) -> bool {
        self.events.unsubscribe(key)
    }

    // ─── internals ────────────────────────────────────────────────────────

    fn accepts_answer(&self) -> bool {
        self.state.is_active() && !self.paused && self.phase == SessionPhase::AwaitingAnswer
    }

    fn question_in_play(&self) -> Option<&Question> {
        if self.accepts_answer() {
            self.questions.get(self.current)
        } else {
            None
        }
    }

    fn usage_context(&self) -> UsageContext<'_> {
        UsageContext {
            active: self.state.is_active(),
            question: self.question_in_play(),
            turn: &self.turn,
            timer_running: self.ticker.is_running(),
            lives: self.state.lives(),
            max_lives: self.state.max_lives(),
            inventory: self.state.inventory(),
        }
    }

    fn permits(&self, kind: PowerUpKind) -> bool {
        match self.availability(kind) {
            Ok(()) => true,
            Err(reason) => {
                debug!(%kind, %reason, "power-up denied");
                false
            }
        }
    }

    fn spend(&mut self, kind: PowerUpKind) -> bool {
        let spent = self.state.inventory_mut().try_consume(kind);
        if spent {
            debug!(%kind, left = self.state.inventory().get(kind), "power-up used");
            self.events.emit(&GameEvent::PowerUpUsed { kind });
            self.events.emit(&GameEvent::StateChanged);
        }
        spent
    }

    fn points_for(&self, question: &Question) -> u32 {
        let base = match question.difficulty_points() {
            0 => self.config.base_points(),
            points => points,
        };
        base.saturating_mul(self.config.streak_multiplier(self.state.streak()))
    }

    async fn resolve(&mut self, chosen: Option<usize>) -> Result<AnswerFeedback, SessionError> {
        let Some(question) = self.questions.get(self.current).cloned() else {
            return Err(SessionError::NotInitialized);
        };
        self.ticker.cancel();
        self.phase = SessionPhase::ShowingFeedback;
        self.session_answered += 1;

        let is_correct = chosen.is_some_and(|index| question.is_correct(index));
        let points = if is_correct {
            self.points_for(&question)
        } else {
            0
        };
        if is_correct {
            self.session_correct += 1;
            self.state.add_score(points);
            self.state.increment_streak();
        } else {
            self.state.lose_life();
            self.state.reset_streak();
        }

        let reached = self
            .tracker
            .record_answer(is_correct, points, question.id().clone())
            .await?;
        if let Some(checkpoint) = &reached {
            self.grant_checkpoint_reward(checkpoint)?;
        }

        let fallback = if self.state.is_out_of_lives() {
            Some(self.handle_game_over().await?)
        } else {
            None
        };

        let feedback = AnswerFeedback {
            question_id: question.id().clone(),
            chosen,
            correct_index: question.correct_answer_index(),
            is_correct,
            points,
            lives_remaining: self.state.lives(),
            checkpoint: reached.as_ref().map(Checkpoint::id),
            fallback,
        };
        debug!(
            question = %feedback.question_id,
            correct = is_correct,
            points,
            lives = feedback.lives_remaining,
            "answer resolved"
        );
        self.events.emit(&GameEvent::AnswerResolved(feedback.clone()));
        self.events.emit(&GameEvent::StateChanged);
        Ok(feedback)
    }

    fn grant_checkpoint_reward(&mut self, checkpoint: &Checkpoint) -> Result<(), SessionError> {
        let granted = self.fallback.rewards().rewards_for(
            self.tracker.table(),
            checkpoint,
            self.session_accuracy(),
        )?;
        self.state.inventory_mut().merge(&granted);
        info!(checkpoint = checkpoint.display_name(), ?granted, "checkpoint reward granted");
        self.events.emit(&GameEvent::CheckpointReached {
            checkpoint: checkpoint.id(),
            granted,
        });
        Ok(())
    }

    /// Returns `false` when the supply ran dry and the session ended.
    async fn advance(&mut self) -> Result<bool, SessionError> {
        if self.current + 1 < self.questions.len() {
            self.current += 1;
        } else {
            let batch = self.fetch_batch().await?;
            if batch.is_empty() {
                warn!(answered = self.session_answered, "question supply exhausted; ending session");
                self.finish(EndReason::SupplyExhausted);
                return Ok(false);
            }
            self.questions = batch;
            self.current = 0;
        }
        self.begin_question();
        Ok(true)
    }

    fn begin_question(&mut self) {
        self.turn = QuestionTurn::default();
        self.phase = SessionPhase::AwaitingAnswer;
        self.paused = false;
        self.state.set_time_remaining(self.config.question_time_secs());
        self.ticker.start();
        self.events.emit(&GameEvent::StateChanged);
    }

    fn finish(&mut self, reason: EndReason) {
        self.ticker.cancel();
        self.state.set_active(false);
        self.phase = SessionPhase::Ended;
        self.paused = false;
        self.events.emit(&GameEvent::SessionEnded { reason });
        self.events.emit(&GameEvent::StateChanged);
    }

    async fn fetch_batch(&self) -> Result<Vec<Question>, SessionError> {
        let context = self.difficulty_context()?;
        let mut batch = self
            .supply
            .get_questions(self.config.batch_size(), &context)
            .await?;

        let received = batch.len();
        let mut seen = BTreeSet::new();
        batch.retain(|q| !context.exclude.contains(q.id()) && seen.insert(q.id().clone()));
        if batch.len() < received {
            debug!(dropped = received - batch.len(), "supply repeated questions");
        }
        Ok(batch)
    }

    fn difficulty_context(&self) -> Result<DifficultyContext, ProgressionError> {
        let progress = self.tracker.progress().ok_or(ProgressionError::NoActivePath)?;
        let mut exclude = progress.used_question_ids().clone();
        exclude.extend(self.questions.iter().map(|q| q.id().clone()));
        Ok(DifficultyContext {
            path_id: progress.path_id().clone(),
            questions_answered: progress.questions_answered(),
            accuracy: progress.accuracy(),
            streak: self.state.streak(),
            exclude,
        })
    }
}
