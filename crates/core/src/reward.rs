use thiserror::Error;

use crate::model::{Checkpoint, CheckpointId, CheckpointTable, PowerUpInventory, PowerUpKind};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RewardError {
    #[error("accuracy must be within [0, 1], got {provided}")]
    InvalidAccuracy { provided: f64 },
    #[error("checkpoint {0} is not part of the checkpoint table")]
    UnknownCheckpoint(CheckpointId),
}

//
// ─── UNLOCK ORDER ──────────────────────────────────────────────────────────────
//

/// Checkpoint order (1-based) from which `extra_time` is granted.
pub const EXTRA_TIME_FROM_ORDER: u32 = 2;
/// Checkpoint order from which `skip` is granted.
pub const SKIP_FROM_ORDER: u32 = 3;
/// Checkpoint order from which `second_chance` is granted.
pub const SECOND_CHANCE_FROM_ORDER: u32 = 4;

/// Accuracy at or above which the bonus bundle is added.
pub const DEFAULT_HIGH_ACCURACY: f64 = 0.8;

//
// ─── CALCULATOR ────────────────────────────────────────────────────────────────
//

/// Maps a completed checkpoint and the player's accuracy to a power-up grant.
///
/// Rules:
/// - every checkpoint grants one `fifty_fifty` and one `hint`
/// - `extra_time`, `skip` and `second_chance` unlock by checkpoint position
///   (2nd, 3rd and 4th) and stay unlocked afterwards
/// - the last checkpoint of the table grants at least one of every kind
/// - high accuracy adds one `fifty_fifty` and one `hint` and guarantees at
///   least one `skip` and one `second_chance`
///
/// For a fixed accuracy the grant never shrinks from one checkpoint to the next.
///
/// # Examples
///
/// ```
/// # use dogdog_core::model::CheckpointTable;
/// # use dogdog_core::reward::RewardCalculator;
/// let table = CheckpointTable::standard();
/// let first = table.first().unwrap();
/// let grant = RewardCalculator::new().rewards_for(&table, first, 1.0)?;
/// assert_eq!(grant.fifty_fifty, 2);
/// assert_eq!(grant.extra_time, 0);
/// # Ok::<(), dogdog_core::reward::RewardError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardCalculator {
    high_accuracy: f64,
}

impl RewardCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            high_accuracy: DEFAULT_HIGH_ACCURACY,
        }
    }

    /// Calculator with a custom bonus threshold.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::InvalidAccuracy` if the threshold is not in `[0, 1]`.
    pub fn try_with_high_accuracy(high_accuracy: f64) -> Result<Self, RewardError> {
        validate_accuracy(high_accuracy)?;
        Ok(Self { high_accuracy })
    }

    #[must_use]
    pub fn high_accuracy(&self) -> f64 {
        self.high_accuracy
    }

    /// Power-ups granted for completing `checkpoint` with `accuracy`.
    ///
    /// # Errors
    ///
    /// - `InvalidAccuracy` if `accuracy` is NaN or outside `[0, 1]`
    /// - `UnknownCheckpoint` if `checkpoint` does not belong to `table`
    pub fn rewards_for(
        &self,
        table: &CheckpointTable,
        checkpoint: &Checkpoint,
        accuracy: f64,
    ) -> Result<PowerUpInventory, RewardError> {
        validate_accuracy(accuracy)?;
        if table.get(checkpoint.id()) != Some(checkpoint) {
            return Err(RewardError::UnknownCheckpoint(checkpoint.id()));
        }

        let order = checkpoint.order();
        let mut grant = PowerUpInventory {
            fifty_fifty: 1,
            hint: 1,
            ..PowerUpInventory::default()
        };
        if order >= EXTRA_TIME_FROM_ORDER {
            grant.extra_time = 1;
        }
        if order >= SKIP_FROM_ORDER {
            grant.skip = 1;
        }
        if order >= SECOND_CHANCE_FROM_ORDER {
            grant.second_chance = 1;
        }

        if table.is_last(checkpoint.id()) {
            for kind in PowerUpKind::ALL {
                grant.ensure_at_least(kind, 1);
            }
        }

        if accuracy >= self.high_accuracy {
            grant.add(PowerUpKind::FiftyFifty, 1);
            grant.add(PowerUpKind::Hint, 1);
            grant.ensure_at_least(PowerUpKind::Skip, 1);
            grant.ensure_at_least(PowerUpKind::SecondChance, 1);
        }

        Ok(grant)
    }
}

impl Default for RewardCalculator {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_accuracy(accuracy: f64) -> Result<(), RewardError> {
    if !accuracy.is_finite() || !(0.0..=1.0).contains(&accuracy) {
        return Err(RewardError::InvalidAccuracy { provided: accuracy });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCURACIES: [f64; 7] = [0.0, 0.3, 0.5, 0.7, 0.79, 0.8, 1.0];

    #[test]
    fn first_checkpoint_grants_baseline() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        let grant = calc.rewards_for(&table, table.first().unwrap(), 0.5).unwrap();
        assert_eq!(
            grant,
            PowerUpInventory {
                fifty_fifty: 1,
                hint: 1,
                ..PowerUpInventory::default()
            }
        );
    }

    #[test]
    fn kinds_unlock_by_position() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        let grants: Vec<_> = table
            .all()
            .iter()
            .map(|c| calc.rewards_for(&table, c, 0.5).unwrap())
            .collect();

        assert_eq!(grants[0].extra_time, 0);
        assert_eq!(grants[1].extra_time, 1);
        assert_eq!(grants[1].skip, 0);
        assert_eq!(grants[2].skip, 1);
        assert_eq!(grants[2].second_chance, 0);
        assert_eq!(grants[3].second_chance, 1);
    }

    #[test]
    fn high_accuracy_adds_bonus_and_guarantees_skip_and_second_chance() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        let grant = calc.rewards_for(&table, table.first().unwrap(), 1.0).unwrap();
        assert_eq!(grant.fifty_fifty, 2);
        assert_eq!(grant.hint, 2);
        assert_eq!(grant.extra_time, 0);
        assert!(grant.skip >= 1);
        assert!(grant.second_chance >= 1);

        let at_threshold = calc.rewards_for(&table, table.first().unwrap(), 0.8).unwrap();
        assert_eq!(at_threshold, grant);
    }

    #[test]
    fn grants_are_monotonic_in_checkpoint_order() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        for accuracy in ACCURACIES {
            let grants: Vec<_> = table
                .all()
                .iter()
                .map(|c| calc.rewards_for(&table, c, accuracy).unwrap())
                .collect();
            for pair in grants.windows(2) {
                for kind in PowerUpKind::ALL {
                    assert!(
                        pair[1].get(kind) >= pair[0].get(kind),
                        "{kind} shrank at accuracy {accuracy}"
                    );
                }
            }
        }
    }

    #[test]
    fn final_checkpoint_grants_every_kind() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        for accuracy in ACCURACIES {
            let grant = calc.rewards_for(&table, table.last().unwrap(), accuracy).unwrap();
            for (kind, amount) in grant.iter() {
                assert!(amount > 0, "{kind} missing at accuracy {accuracy}");
            }
        }
    }

    #[test]
    fn short_table_still_completes_final_grant() {
        let table = CheckpointTable::new([
            (CheckpointId::new(1), "Pup", 5),
            (CheckpointId::new(2), "Dog", 10),
        ])
        .unwrap();
        let grant = RewardCalculator::new()
            .rewards_for(&table, table.last().unwrap(), 0.7)
            .unwrap();
        assert!(grant.iter().all(|(_, amount)| amount > 0));
    }

    #[test]
    fn rejects_invalid_accuracy() {
        let table = CheckpointTable::standard();
        let calc = RewardCalculator::new();
        let first = table.first().unwrap();
        for bad in [f64::NAN, -0.1, 1.01, f64::INFINITY] {
            assert!(matches!(
                calc.rewards_for(&table, first, bad),
                Err(RewardError::InvalidAccuracy { .. })
            ));
        }
        assert!(RewardCalculator::try_with_high_accuracy(1.5).is_err());
    }

    #[test]
    fn rejects_checkpoint_from_another_table() {
        let table = CheckpointTable::standard();
        let other = CheckpointTable::new([(CheckpointId::new(9), "Wolf", 3)]).unwrap();
        let err = RewardCalculator::new()
            .rewards_for(&table, other.first().unwrap(), 0.5)
            .unwrap_err();
        assert_eq!(err, RewardError::UnknownCheckpoint(CheckpointId::new(9)));
    }
}
