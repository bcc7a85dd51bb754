mod checkpoint;
mod game_state;
mod ids;
mod power_up;
mod progress;
mod question;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointTable};
pub use game_state::GameState;
pub use ids::{CheckpointId, ParseIdError, PathId, QuestionId};
pub use power_up::{PowerUpInventory, PowerUpKind};
pub use progress::{IntegrityIssue, PathProgress};
pub use question::{ANSWER_COUNT, Question, QuestionError};
