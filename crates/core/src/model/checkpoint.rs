use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::CheckpointId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckpointError {
    #[error("checkpoint table cannot be empty")]
    Empty,

    #[error("checkpoint {id} requires zero questions")]
    ZeroRequirement { id: CheckpointId },

    #[error("checkpoint {id} requirement {required} does not exceed the previous {previous}")]
    NotIncreasing {
        id: CheckpointId,
        required: u32,
        previous: u32,
    },

    #[error("duplicate checkpoint id {0}")]
    DuplicateId(CheckpointId),
}

//
// ─── CHECKPOINT ────────────────────────────────────────────────────────────────
//

/// A named milestone on the treasure map.
///
/// `order` is the 1-based position in its table and is assigned by
/// `CheckpointTable::new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    id: CheckpointId,
    display_name: String,
    questions_required: u32,
    order: u32,
}

impl Checkpoint {
    #[must_use]
    pub fn id(&self) -> CheckpointId {
        self.id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn questions_required(&self) -> u32 {
        self.questions_required
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }
}

//
// ─── TABLE ─────────────────────────────────────────────────────────────────────
//

/// Ordered, read-only sequence of checkpoints.
///
/// Requirements are cumulative question counts and strictly increase with
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointTable {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointTable {
    /// Dog-breed tiers of increasing size, every ten questions.
    #[must_use]
    pub fn standard() -> Self {
        let entries = [
            (1, "Chihuahua", 10),
            (2, "Pug", 20),
            (3, "Cocker Spaniel", 30),
            (4, "German Shepherd", 40),
            (5, "Great Dane", 50),
        ];
        Self {
            checkpoints: entries
                .into_iter()
                .zip(1_u32..)
                .map(|((id, name, required), order)| Checkpoint {
                    id: CheckpointId::new(id),
                    display_name: name.to_string(),
                    questions_required: required,
                    order,
                })
                .collect(),
        }
    }

    /// Build a table from `(id, display name, questions required)` entries,
    /// given in map order.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError` if the table is empty, an id repeats, a
    /// requirement is zero, or requirements do not strictly increase.
    pub fn new<I, S>(entries: I) -> Result<Self, CheckpointError>
    where
        I: IntoIterator<Item = (CheckpointId, S, u32)>,
        S: Into<String>,
    {
        let mut checkpoints = Vec::new();
        let mut seen = HashSet::new();
        let mut previous: Option<u32> = None;

        for ((id, name, required), order) in entries.into_iter().zip(1_u32..) {
            if !seen.insert(id) {
                return Err(CheckpointError::DuplicateId(id));
            }
            if required == 0 {
                return Err(CheckpointError::ZeroRequirement { id });
            }
            if let Some(previous) = previous {
                if required <= previous {
                    return Err(CheckpointError::NotIncreasing {
                        id,
                        required,
                        previous,
                    });
                }
            }
            previous = Some(required);
            checkpoints.push(Checkpoint {
                id,
                display_name: name.into(),
                questions_required: required,
                order,
            });
        }

        if checkpoints.is_empty() {
            return Err(CheckpointError::Empty);
        }
        Ok(Self { checkpoints })
    }

    /// All checkpoints in map order.
    #[must_use]
    pub fn all(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: CheckpointId) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.id == id)
    }

    /// First checkpoint in order that is not in `completed`.
    #[must_use]
    pub fn next(&self, completed: &BTreeSet<CheckpointId>) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| !completed.contains(&c.id))
    }

    #[must_use]
    pub fn requirement_for(&self, id: CheckpointId) -> Option<u32> {
        self.get(id).map(Checkpoint::questions_required)
    }

    #[must_use]
    pub fn first(&self) -> Option<&Checkpoint> {
        self.checkpoints.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    #[must_use]
    pub fn is_last(&self, id: CheckpointId) -> bool {
        self.last().is_some_and(|c| c.id == id)
    }

    /// Checkpoint with the largest requirement among `completed`.
    #[must_use]
    pub fn highest_of(&self, completed: &BTreeSet<CheckpointId>) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .rev()
            .find(|c| completed.contains(&c.id))
    }
}

impl Default for CheckpointTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_has_five_increasing_tiers() {
        let table = CheckpointTable::standard();
        let required: Vec<u32> = table.all().iter().map(Checkpoint::questions_required).collect();
        assert_eq!(required, vec![10, 20, 30, 40, 50]);
        let orders: Vec<u32> = table.all().iter().map(Checkpoint::order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert_eq!(table.first().unwrap().display_name(), "Chihuahua");
        assert_eq!(table.last().unwrap().display_name(), "Great Dane");
    }

    #[test]
    fn next_skips_completed() {
        let table = CheckpointTable::standard();
        let mut completed = BTreeSet::new();
        assert_eq!(table.next(&completed).unwrap().id(), CheckpointId::new(1));

        completed.insert(CheckpointId::new(1));
        completed.insert(CheckpointId::new(2));
        assert_eq!(table.next(&completed).unwrap().id(), CheckpointId::new(3));

        for c in table.all() {
            completed.insert(c.id());
        }
        assert!(table.next(&completed).is_none());
    }

    #[test]
    fn requirement_lookup_handles_unknown_id() {
        let table = CheckpointTable::standard();
        assert_eq!(table.requirement_for(CheckpointId::new(4)), Some(40));
        assert_eq!(table.requirement_for(CheckpointId::new(99)), None);
    }

    #[test]
    fn highest_of_picks_largest_requirement() {
        let table = CheckpointTable::standard();
        let completed: BTreeSet<_> = [CheckpointId::new(3), CheckpointId::new(1)].into();
        assert_eq!(table.highest_of(&completed).unwrap().id(), CheckpointId::new(3));
        assert!(table.highest_of(&BTreeSet::new()).is_none());
    }

    #[test]
    fn custom_table_rejects_non_increasing_requirements() {
        let err = CheckpointTable::new([
            (CheckpointId::new(1), "A", 5),
            (CheckpointId::new(2), "B", 5),
        ])
        .unwrap_err();
        assert!(matches!(err, CheckpointError::NotIncreasing { required: 5, .. }));
    }

    #[test]
    fn custom_table_rejects_bad_entries() {
        let empty: [(CheckpointId, &str, u32); 0] = [];
        assert_eq!(CheckpointTable::new(empty).unwrap_err(), CheckpointError::Empty);

        let zero = CheckpointTable::new([(CheckpointId::new(1), "A", 0)]).unwrap_err();
        assert!(matches!(zero, CheckpointError::ZeroRequirement { .. }));

        let dup = CheckpointTable::new([
            (CheckpointId::new(1), "A", 3),
            (CheckpointId::new(1), "B", 6),
        ])
        .unwrap_err();
        assert_eq!(dup, CheckpointError::DuplicateId(CheckpointId::new(1)));
    }
}
