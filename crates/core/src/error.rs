use thiserror::Error;

use crate::model::{CheckpointError, ParseIdError, QuestionError};
use crate::reward::RewardError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Reward(#[from] RewardError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
