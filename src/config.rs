use std::path::Path;

use tracing::warn;

use crate::error::ConfigError;
use crate::search::{Searcher, MAX_BLOCKING_BONUS, MAX_BONUSES, SCORE_SCALE};
use crate::strategy::{DifficultyTier, MoveSource};

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub difficulty: DifficultyConfig,
    pub game: GameConfig,
    pub arena: ArenaConfig,
}

/// Search tuning.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Tie-break bonus, in plies, for taking a cell the opponent needs to win
    pub blocking_bonus: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { blocking_bonus: 0.1 }
    }
}

impl SearchConfig {
    /// The bonus in the searcher's integer score units
    ///
    /// Bonuses just under the limit may round onto it, so the result is
    /// capped at [`MAX_BLOCKING_BONUS`]. Out-of-range values are caught by
    /// [`SearchConfig::searcher`], not here.
    pub fn scaled_bonus(&self) -> i32 {
        // float to int casts saturate, and NaN becomes 0
        ((self.blocking_bonus * SCORE_SCALE as f64).round() as i32).min(MAX_BLOCKING_BONUS)
    }

    /// Builds a searcher with this bonus, failing if the bonus is out of range
    pub fn searcher(&self) -> Result<Searcher, ConfigError> {
        let bonus = self.blocking_bonus;
        if !bonus.is_finite() || bonus < 0.0 || bonus * MAX_BONUSES as f64 >= 1.0 {
            return Err(ConfigError::Validation(format!(
                "search.blocking_bonus must be a number >= 0 and < {}, got {}",
                1.0 / MAX_BONUSES as f64,
                bonus
            )));
        }
        Searcher::new(self.scaled_bonus()).ok_or_else(|| {
            ConfigError::Validation(format!(
                "search.blocking_bonus {} is outside the searcher's range",
                bonus
            ))
        })
    }
}

/// Skill probabilities per tier. `perfect` is always 1 and not configurable.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub trivial: f64,
    pub balanced: f64,
    pub strong: f64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        DifficultyConfig {
            trivial: 0.0,
            balanced: 0.5,
            strong: 0.8,
        }
    }
}

/// Seats and options for an interactive game.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub x: MoveSource,
    pub o: MoveSource,
    pub hints: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            x: MoveSource::Human,
            o: MoveSource::Computer(DifficultyTier::Strong),
            hints: false,
        }
    }
}

/// Defaults for computer-vs-computer runs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub games: usize,
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            games: 1000,
            seed: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // the summed bonus along a line of play must stay under one ply
        self.search.searcher()?;

        let skills = [
            ("difficulty.trivial", self.difficulty.trivial),
            ("difficulty.balanced", self.difficulty.balanced),
            ("difficulty.strong", self.difficulty.strong),
        ];
        for (name, p) in skills.iter() {
            if !(0.0..=1.0).contains(p) {
                return Err(ConfigError::Validation(format!("{} must be in [0, 1]", name)));
            }
        }
        if self.difficulty.trivial > self.difficulty.balanced
            || self.difficulty.balanced > self.difficulty.strong
        {
            return Err(ConfigError::Validation(
                "difficulty probabilities must not decrease from trivial to strong".into(),
            ));
        }

        if self.arena.games == 0 {
            return Err(ConfigError::Validation("arena.games must be > 0".into()));
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }
}
