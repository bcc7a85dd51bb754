#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod progression;
pub mod question_supply;
pub mod ticker;

pub use dogdog_core::Clock;

pub use app_services::AppServices;
pub use config::{AppConfig, GameConfig};
pub use error::{
    AppServicesError, ConfigError, PowerUpDenied, ProgressionError, SessionError, SupplyError,
};
pub use events::{EventBus, ListenerKey};
pub use game::{
    AnswerFeedback, AnswerOutcome, EndReason, FallbackAction, FallbackHandler, FallbackSummary,
    GameEvent, GameSession, SessionPhase,
};
pub use progression::{ProgressEvent, ProgressionTracker};
pub use question_supply::{DifficultyContext, QuestionBank, QuestionSupply, target_difficulty};
pub use ticker::{ManualTicker, Ticker, TokioTicker};
