use std::fmt;

use serde::{Deserialize, Serialize};

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Consumable gameplay modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    /// Removes two wrong answers from the current question.
    FiftyFifty,
    /// Reveals the question's hint.
    Hint,
    /// Adds seconds to the running question timer.
    ExtraTime,
    /// Moves on without answering.
    Skip,
    /// Restores one lost life.
    SecondChance,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::FiftyFifty,
        PowerUpKind::Hint,
        PowerUpKind::ExtraTime,
        PowerUpKind::Skip,
        PowerUpKind::SecondChance,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PowerUpKind::FiftyFifty => "fifty_fifty",
            PowerUpKind::Hint => "hint",
            PowerUpKind::ExtraTime => "extra_time",
            PowerUpKind::Skip => "skip",
            PowerUpKind::SecondChance => "second_chance",
        }
    }
}

impl fmt::Display for PowerUpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── INVENTORY ─────────────────────────────────────────────────────────────────
//

/// Power-up counts, one field per kind so no kind can ever be missing.
///
/// Also used as a reward bundle: a grant is merged into the player's
/// inventory with [`PowerUpInventory::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpInventory {
    pub fifty_fifty: u32,
    pub hint: u32,
    pub extra_time: u32,
    pub skip: u32,
    pub second_chance: u32,
}

impl PowerUpInventory {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds an inventory holding `count` of every kind.
    #[must_use]
    pub fn uniform(count: u32) -> Self {
        Self {
            fifty_fifty: count,
            hint: count,
            extra_time: count,
            skip: count,
            second_chance: count,
        }
    }

    #[must_use]
    pub fn get(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::FiftyFifty => self.fifty_fifty,
            PowerUpKind::Hint => self.hint,
            PowerUpKind::ExtraTime => self.extra_time,
            PowerUpKind::Skip => self.skip,
            PowerUpKind::SecondChance => self.second_chance,
        }
    }

    fn slot_mut(&mut self, kind: PowerUpKind) -> &mut u32 {
        match kind {
            PowerUpKind::FiftyFifty => &mut self.fifty_fifty,
            PowerUpKind::Hint => &mut self.hint,
            PowerUpKind::ExtraTime => &mut self.extra_time,
            PowerUpKind::Skip => &mut self.skip,
            PowerUpKind::SecondChance => &mut self.second_chance,
        }
    }

    pub fn add(&mut self, kind: PowerUpKind, amount: u32) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Raises `kind` to at least `minimum`.
    pub fn ensure_at_least(&mut self, kind: PowerUpKind, minimum: u32) {
        let slot = self.slot_mut(kind);
        *slot = (*slot).max(minimum);
    }

    /// Adds every count of `other` into `self`. Never subtracts.
    pub fn merge(&mut self, other: &PowerUpInventory) {
        for kind in PowerUpKind::ALL {
            self.add(kind, other.get(kind));
        }
    }

    #[must_use]
    pub fn has(&self, kind: PowerUpKind) -> bool {
        self.get(kind) > 0
    }

    /// Removes exactly one `kind`. Returns `false` without touching the
    /// inventory when none are left.
    pub fn try_consume(&mut self, kind: PowerUpKind) -> bool {
        let slot = self.slot_mut(kind);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        PowerUpKind::ALL
            .iter()
            .fold(0_u32, |acc, kind| acc.saturating_add(self.get(*kind)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PowerUpKind, u32)> + '_ {
        PowerUpKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_never_goes_negative() {
        let mut inv = PowerUpInventory::empty();
        inv.add(PowerUpKind::Skip, 1);

        assert!(inv.try_consume(PowerUpKind::Skip));
        assert!(!inv.try_consume(PowerUpKind::Skip));
        assert_eq!(inv.get(PowerUpKind::Skip), 0);

        let before = inv;
        for kind in PowerUpKind::ALL {
            assert!(!inv.try_consume(kind));
        }
        assert_eq!(inv, before);
    }

    #[test]
    fn merge_is_additive() {
        let mut inv = PowerUpInventory::uniform(1);
        let grant = PowerUpInventory {
            fifty_fifty: 2,
            hint: 1,
            ..PowerUpInventory::default()
        };
        inv.merge(&grant);

        assert_eq!(inv.fifty_fifty, 3);
        assert_eq!(inv.hint, 2);
        assert_eq!(inv.extra_time, 1);
        assert_eq!(inv.total(), 8);
    }

    #[test]
    fn ensure_at_least_does_not_lower() {
        let mut inv = PowerUpInventory::uniform(3);
        inv.ensure_at_least(PowerUpKind::Hint, 1);
        assert_eq!(inv.hint, 3);
        inv.ensure_at_least(PowerUpKind::Hint, 5);
        assert_eq!(inv.hint, 5);
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let json = serde_json::to_string(&PowerUpKind::SecondChance).unwrap();
        assert_eq!(json, "\"second_chance\"");
        assert_eq!(PowerUpKind::FiftyFifty.to_string(), "fifty_fifty");
    }
}
