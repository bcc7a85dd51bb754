use thiserror::Error;

use dogdog_core::model::PowerUpKind;
use dogdog_core::reward::RewardError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `QuestionSupply`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupplyError {
    #[error("question source unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `ProgressionTracker`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressionError {
    #[error("no path selected")]
    NoActivePath,
}

/// Errors emitted by `GameSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session has not been initialized")]
    NotInitialized,
    #[error("question supply exhausted: requested {requested}, received {received}")]
    ExhaustedSupply { requested: usize, received: usize },
    #[error("answer index {index} is out of range")]
    InvalidAnswerIndex { index: usize },
    #[error(transparent)]
    Supply(#[from] SupplyError),
    #[error(transparent)]
    Reward(#[from] RewardError),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

/// Why a power-up cannot be used right now.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PowerUpDenied {
    #[error("no {0} left")]
    NoneLeft(PowerUpKind),
    #[error("session is not active")]
    SessionInactive,
    #[error("no question is waiting for an answer")]
    NoQuestionInPlay,
    #[error("already used on this question")]
    AlreadyUsed,
    #[error("question has no hint")]
    NoHint,
    #[error("timer is not running")]
    TimerNotRunning,
    #[error("lives are already full")]
    LivesFull,
}

/// Errors emitted while reading `GameConfig`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("max lives must be > 0")]
    InvalidMaxLives,
    #[error("question time must be > 0 seconds")]
    InvalidQuestionTime,
    #[error("batch size must be > 0")]
    InvalidBatchSize,
    #[error("streak step must be > 0")]
    InvalidStreakStep,
    #[error("max streak multiplier must be >= 1")]
    InvalidStreakMultiplier,
    #[error("invalid value for {var}: {raw}")]
    InvalidEnv { var: &'static str, raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
