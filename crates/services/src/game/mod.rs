mod fallback;
mod power_ups;
mod session;

pub use fallback::{FallbackAction, FallbackHandler, FallbackSummary};
pub use power_ups::FIFTY_FIFTY_HIDES;
pub use session::{AnswerFeedback, AnswerOutcome, EndReason, GameEvent, GameSession, SessionPhase};
