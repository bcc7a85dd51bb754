use serde::Serialize;

use crate::model::power_up::PowerUpInventory;

/// Session-scoped game state: lives, score, streak, timer and power-ups.
///
/// Lives stay within `0..=max_lives`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    lives: u32,
    max_lives: u32,
    score: u64,
    streak: u32,
    is_active: bool,
    time_remaining: u32,
    inventory: PowerUpInventory,
}

impl GameState {
    /// Inactive state with full lives and the given starting inventory.
    #[must_use]
    pub fn new(max_lives: u32, inventory: PowerUpInventory) -> Self {
        Self {
            lives: max_lives,
            max_lives,
            score: 0,
            streak: 0,
            is_active: false,
            time_remaining: 0,
            inventory,
        }
    }

    #[must_use]
    pub fn lives(&self) -> u32 {
        self.lives
    }

    #[must_use]
    pub fn max_lives(&self) -> u32 {
        self.max_lives
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn inventory(&self) -> &PowerUpInventory {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut PowerUpInventory {
        &mut self.inventory
    }

    #[must_use]
    pub fn is_out_of_lives(&self) -> bool {
        self.lives == 0
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Removes one life and returns the lives left.
    pub fn lose_life(&mut self) -> u32 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Adds one life if below the maximum.
    pub fn gain_life(&mut self) -> bool {
        if self.lives >= self.max_lives {
            return false;
        }
        self.lives += 1;
        true
    }

    pub fn restore_lives(&mut self) {
        self.lives = self.max_lives;
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(u64::from(points));
    }

    pub fn increment_streak(&mut self) {
        self.streak = self.streak.saturating_add(1);
    }

    pub fn reset_streak(&mut self) {
        self.streak = 0;
    }

    pub fn set_time_remaining(&mut self, secs: u32) {
        self.time_remaining = secs;
    }

    pub fn add_time(&mut self, secs: u32) {
        self.time_remaining = self.time_remaining.saturating_add(secs);
    }

    /// Counts the timer down by one second and returns what is left.
    pub fn tick_down(&mut self) -> u32 {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        self.time_remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lives_are_bounded() {
        let mut state = GameState::new(3, PowerUpInventory::empty());
        assert!(!state.gain_life());
        assert_eq!(state.lose_life(), 2);
        assert!(state.gain_life());
        assert_eq!(state.lives(), 3);

        for _ in 0..5 {
            state.lose_life();
        }
        assert_eq!(state.lives(), 0);
        assert!(state.is_out_of_lives());

        state.restore_lives();
        assert_eq!(state.lives(), 3);
    }

    #[test]
    fn timer_counts_down_to_zero() {
        let mut state = GameState::new(3, PowerUpInventory::empty());
        state.set_time_remaining(2);
        assert_eq!(state.tick_down(), 1);
        assert_eq!(state.tick_down(), 0);
        assert_eq!(state.tick_down(), 0);
        state.add_time(10);
        assert_eq!(state.time_remaining(), 10);
    }
}
