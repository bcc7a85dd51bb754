use serde::Serialize;
use tracing::info;

use dogdog_core::model::{GameState, PathId, PowerUpInventory};
use dogdog_core::reward::RewardCalculator;

use crate::error::SessionError;
use crate::progression::ProgressionTracker;

/// How a game-over was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// Rolled back to the last completed checkpoint.
    CheckpointRestart,
    /// No checkpoint reached yet; the path starts over.
    PathRestart,
}

/// Outcome of [`FallbackHandler::apply`], shaped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackSummary {
    pub action: FallbackAction,
    pub current_path: Option<PathId>,
    pub completed_checkpoints: usize,
    pub restored_lives: u32,
    /// Power-ups merged into the inventory by this call.
    pub granted: PowerUpInventory,
    /// `false` when lives were left and nothing changed.
    pub applied: bool,
}

/// Replaces game-over with a rollback to the last completed checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackHandler {
    rewards: RewardCalculator,
}

impl FallbackHandler {
    #[must_use]
    pub fn new(rewards: RewardCalculator) -> Self {
        Self { rewards }
    }

    #[must_use]
    pub fn rewards(&self) -> &RewardCalculator {
        &self.rewards
    }

    /// Recover `state` from a game-over.
    ///
    /// Does nothing while lives remain, so calling it again right after a
    /// successful rollback neither grants rewards twice nor moves progress.
    /// Otherwise rolls the tracker back (to the last checkpoint, or to zero
    /// when none was reached), merges the checkpoint reward for `accuracy`
    /// into the inventory and restores full lives.
    ///
    /// # Errors
    ///
    /// - `Progression` if the tracker has no active path
    /// - `Reward` if `accuracy` is outside `[0, 1]`
    pub async fn apply(
        &self,
        tracker: &mut ProgressionTracker,
        state: &mut GameState,
        accuracy: f64,
    ) -> Result<FallbackSummary, SessionError> {
        if !state.is_out_of_lives() {
            return Ok(summarize(tracker, state, PowerUpInventory::empty(), false));
        }

        let checkpoint = tracker.last_completed_checkpoint().cloned();
        let granted = match &checkpoint {
            Some(checkpoint) => {
                let granted = self.rewards.rewards_for(tracker.table(), checkpoint, accuracy)?;
                tracker.reset_to_checkpoint(checkpoint).await?;
                granted
            }
            None => {
                tracker.reset_path().await?;
                PowerUpInventory::empty()
            }
        };

        state.inventory_mut().merge(&granted);
        state.restore_lives();
        state.reset_streak();
        state.set_active(true);

        let summary = summarize(tracker, state, granted, true);
        info!(
            action = ?summary.action,
            checkpoint = ?checkpoint.as_ref().map(|c| c.display_name()),
            lives = summary.restored_lives,
            "fallback applied"
        );
        Ok(summary)
    }
}

fn summarize(
    tracker: &ProgressionTracker,
    state: &GameState,
    granted: PowerUpInventory,
    applied: bool,
) -> FallbackSummary {
    let action = if tracker.last_completed_checkpoint().is_some() {
        FallbackAction::CheckpointRestart
    } else {
        FallbackAction::PathRestart
    };
    FallbackSummary {
        action,
        current_path: tracker.active_path().cloned(),
        completed_checkpoints: tracker.completed_count(),
        restored_lives: state.lives(),
        granted,
        applied,
    }
}
