use std::str::FromStr;

use dogdog_core::model::PowerUpInventory;

use crate::error::ConfigError;

/// Gameplay tuning for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    max_lives: u32,
    question_time_secs: u32,
    extra_time_secs: u32,
    base_points: u32,
    batch_size: usize,
    streak_step: u32,
    max_streak_multiplier: u32,
    starting_inventory: PowerUpInventory,
}

impl GameConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if lives, question time, batch size or streak
    /// step is zero, or the multiplier cap is below one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_lives: u32,
        question_time_secs: u32,
        extra_time_secs: u32,
        base_points: u32,
        batch_size: usize,
        streak_step: u32,
        max_streak_multiplier: u32,
        starting_inventory: PowerUpInventory,
    ) -> Result<Self, ConfigError> {
        if max_lives == 0 {
            return Err(ConfigError::InvalidMaxLives);
        }
        if question_time_secs == 0 {
            return Err(ConfigError::InvalidQuestionTime);
        }
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if streak_step == 0 {
            return Err(ConfigError::InvalidStreakStep);
        }
        if max_streak_multiplier == 0 {
            return Err(ConfigError::InvalidStreakMultiplier);
        }
        Ok(Self {
            max_lives,
            question_time_secs,
            extra_time_secs,
            base_points,
            batch_size,
            streak_step,
            max_streak_multiplier,
            starting_inventory,
        })
    }

    /// Defaults overridden by `DOGDOG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` for unparsable values, or the
    /// validation errors of [`GameConfig::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`GameConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`GameConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        Self::new(
            read_var(&lookup, "DOGDOG_MAX_LIVES", d.max_lives)?,
            read_var(&lookup, "DOGDOG_QUESTION_TIME_SECS", d.question_time_secs)?,
            read_var(&lookup, "DOGDOG_EXTRA_TIME_SECS", d.extra_time_secs)?,
            read_var(&lookup, "DOGDOG_BASE_POINTS", d.base_points)?,
            read_var(&lookup, "DOGDOG_BATCH_SIZE", d.batch_size)?,
            read_var(&lookup, "DOGDOG_STREAK_STEP", d.streak_step)?,
            read_var(&lookup, "DOGDOG_MAX_STREAK_MULTIPLIER", d.max_streak_multiplier)?,
            d.starting_inventory,
        )
    }

    #[must_use]
    pub fn with_starting_inventory(mut self, inventory: PowerUpInventory) -> Self {
        self.starting_inventory = inventory;
        self
    }

    #[must_use]
    pub fn max_lives(&self) -> u32 {
        self.max_lives
    }

    #[must_use]
    pub fn question_time_secs(&self) -> u32 {
        self.question_time_secs
    }

    #[must_use]
    pub fn extra_time_secs(&self) -> u32 {
        self.extra_time_secs
    }

    #[must_use]
    pub fn base_points(&self) -> u32 {
        self.base_points
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn starting_inventory(&self) -> PowerUpInventory {
        self.starting_inventory
    }

    /// Score multiplier for a correct answer given the streak before it.
    #[must_use]
    pub fn streak_multiplier(&self, streak: u32) -> u32 {
        (1 + streak / self.streak_step).min(self.max_streak_multiplier)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_lives: 3,
            question_time_secs: 20,
            extra_time_secs: 10,
            base_points: 10,
            batch_size: 10,
            streak_step: 5,
            max_streak_multiplier: 3,
            starting_inventory: PowerUpInventory::empty(),
        }
    }
}

/// Process-level settings for the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub game: GameConfig,
}

impl AppConfig {
    pub const DEFAULT_DB_URL: &'static str = "sqlite://dogdog.sqlite3?mode=rwc";

    /// # Errors
    ///
    /// See [`GameConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// # Errors
    ///
    /// See [`GameConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_url = lookup("DOGDOG_DB_URL")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_DB_URL.to_string());
        Ok(Self {
            db_url,
            game: GameConfig::from_lookup(lookup)?,
        })
    }
}

fn read_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_classic_rules() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.max_lives(), 3);
        assert_eq!(cfg.batch_size(), 10);
        assert_eq!(GameConfig::from_lookup(lookup(&[])).unwrap(), cfg);
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DOGDOG_MAX_LIVES", "5"),
            ("DOGDOG_QUESTION_TIME_SECS", " 30 "),
            ("DOGDOG_DB_URL", "sqlite::memory:"),
        ]))
        .unwrap();
        assert_eq!(cfg.game.max_lives(), 5);
        assert_eq!(cfg.game.question_time_secs(), 30);
        assert_eq!(cfg.db_url, "sqlite::memory:");
    }

    #[test]
    fn invalid_env_values_are_reported() {
        let err = GameConfig::from_lookup(lookup(&[("DOGDOG_BATCH_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "DOGDOG_BATCH_SIZE", .. }));

        let err = GameConfig::from_lookup(lookup(&[("DOGDOG_MAX_LIVES", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxLives);
    }

    #[test]
    fn streak_multiplier_steps_and_caps() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.streak_multiplier(0), 1);
        assert_eq!(cfg.streak_multiplier(4), 1);
        assert_eq!(cfg.streak_multiplier(5), 2);
        assert_eq!(cfg.streak_multiplier(10), 3);
        assert_eq!(cfg.streak_multiplier(100), 3);
    }
}
