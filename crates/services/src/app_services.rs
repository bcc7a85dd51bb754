use std::sync::Arc;

use dogdog_core::model::{CheckpointTable, PathId};
use dogdog_core::reward::RewardCalculator;
use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::config::{AppConfig, GameConfig};
use crate::error::{AppServicesError, SessionError};
use crate::game::GameSession;
use crate::progression::ProgressionTracker;
use crate::question_supply::QuestionSupply;
use crate::ticker::Ticker;

/// Composition root: owns the shared collaborators and hands out trackers and
/// sessions wired to them.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    storage: Storage,
    table: Arc<CheckpointTable>,
    rewards: RewardCalculator,
    config: GameConfig,
}

impl AppServices {
    /// Services backed by an in-process store that forgets everything on drop.
    #[must_use]
    pub fn in_memory(config: GameConfig, clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), config, clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, config: GameConfig, clock: Clock) -> Self {
        Self {
            clock,
            storage,
            table: Arc::new(CheckpointTable::standard()),
            rewards: RewardCalculator::new(),
            config,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(app: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&app.db_url).await?;
        info!(db_url = %app.db_url, "sqlite storage ready");
        Ok(Self::from_storage(storage, app.game.clone(), clock))
    }

    /// Read [`AppConfig`] from the environment and open `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` for invalid configuration or storage
    /// initialization failures.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let app = AppConfig::from_env()?;
        Self::new_sqlite(&app, clock).await
    }

    /// Replace the standard checkpoint table.
    #[must_use]
    pub fn with_checkpoints(mut self, table: CheckpointTable) -> Self {
        self.table = Arc::new(table);
        self
    }

    #[must_use]
    pub fn with_rewards(mut self, rewards: RewardCalculator) -> Self {
        self.rewards = rewards;
        self
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub fn checkpoints(&self) -> Arc<CheckpointTable> {
        Arc::clone(&self.table)
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// A tracker with no path selected.
    #[must_use]
    pub fn tracker(&self) -> ProgressionTracker {
        ProgressionTracker::new(
            Arc::clone(&self.table),
            Arc::clone(&self.storage.progress),
            self.clock,
        )
    }

    /// A session that still needs [`GameSession::initialize`].
    #[must_use]
    pub fn session(&self, supply: Arc<dyn QuestionSupply>, ticker: Box<dyn Ticker>) -> GameSession {
        GameSession::new(self.config.clone(), self.tracker(), supply, ticker, self.rewards)
    }

    /// Build a session and start it on `path_id`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the first batch of questions cannot be loaded.
    pub async fn start_session(
        &self,
        path_id: PathId,
        supply: Arc<dyn QuestionSupply>,
        ticker: Box<dyn Ticker>,
    ) -> Result<GameSession, SessionError> {
        let mut session = self.session(supply, ticker);
        session.initialize(path_id).await?;
        Ok(session)
    }
}
