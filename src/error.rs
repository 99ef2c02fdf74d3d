use std::path::PathBuf;

use crate::bitboard::Player;

/// Errors raised by the board, the search and the turn controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid move, ({row}, {col}) is off the board")]
    OutOfRange { row: usize, col: usize },

    #[error("invalid move, ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },

    #[error("no legal moves, the game is already decided")]
    NoLegalMoves,

    #[error("the game is over, reset to play again")]
    GameOver,

    #[error("it is {0}'s turn and they are not computer controlled")]
    HumanTurn(Player),

    #[error("invalid board layout: {0}")]
    InvalidLayout(String),
}

impl EngineError {
    /// Whether this error is a rejected move that leaves the game untouched.
    pub fn is_invalid_move(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::Occupied { .. })
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
