//! Difficulty tiers for the computer opponent

use std::fmt;
use std::str::FromStr;

use rand::{rngs::StdRng, rngs::ThreadRng, seq::IteratorRandom, Rng, SeedableRng};
use tracing::debug;

use crate::{
    bitboard::{BitBoard, Outcome, Player},
    config::DifficultyConfig,
    error::EngineError,
    search::Searcher,
    Move,
};

/// How strongly the computer plays, weakest first
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    /// always plays a random free cell
    #[serde(alias = "easy")]
    #[value(alias = "easy")]
    Trivial,
    #[serde(alias = "medium")]
    #[value(alias = "medium")]
    Balanced,
    #[serde(alias = "hard")]
    #[value(alias = "hard")]
    Strong,
    /// always searches, cannot be beaten
    #[serde(alias = "impossible")]
    #[value(alias = "impossible")]
    Perfect,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 4] = [
        DifficultyTier::Trivial,
        DifficultyTier::Balanced,
        DifficultyTier::Strong,
        DifficultyTier::Perfect,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DifficultyTier::Trivial => "trivial",
            DifficultyTier::Balanced => "balanced",
            DifficultyTier::Strong => "strong",
            DifficultyTier::Perfect => "perfect",
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as clap::ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| format!("unknown difficulty '{}'", s.trim()))
    }
}

/// Who makes the moves for one side of the board
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MoveSource {
    Human,
    Computer(DifficultyTier),
}

impl MoveSource {
    pub fn is_human(self) -> bool {
        matches!(self, MoveSource::Human)
    }
}

impl fmt::Display for MoveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveSource::Human => write!(f, "human"),
            MoveSource::Computer(tier) => write!(f, "{}", tier),
        }
    }
}

impl FromStr for MoveSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" => Ok(MoveSource::Human),
            other => other
                .parse::<DifficultyTier>()
                .map(MoveSource::Computer)
                .map_err(|_| format!("'{}' is neither 'human' nor a difficulty", other)),
        }
    }
}

impl TryFrom<String> for MoveSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MoveSource> for String {
    fn from(source: MoveSource) -> Self {
        source.to_string()
    }
}

/// Picks a free cell uniformly at random
pub fn random_move<R: Rng + ?Sized>(board: &BitBoard, rng: &mut R) -> Result<Move, EngineError> {
    if board.winner() != Outcome::InProgress {
        return Err(EngineError::NoLegalMoves);
    }
    board
        .legal_moves()
        .choose(rng)
        .ok_or(EngineError::NoLegalMoves)
}

/// Chooses computer moves by mixing full search with random play
///
/// Each tier has a skill probability `p`: a move is searched with chance `p`
/// and random otherwise. `Perfect` always searches and never draws a random
/// number, so its moves depend only on the board.
pub struct DifficultyStrategy<R = ThreadRng> {
    rng: R,
    searcher: Searcher,
    skills: DifficultyConfig,
}

impl DifficultyStrategy<ThreadRng> {
    /// Creates a strategy drawing from the thread-local generator
    pub fn new(searcher: Searcher, skills: DifficultyConfig) -> Self {
        Self::with_rng(rand::thread_rng(), searcher, skills)
    }
}

impl DifficultyStrategy<StdRng> {
    /// Creates a strategy with a reproducible generator
    pub fn seeded(searcher: Searcher, skills: DifficultyConfig, seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), searcher, skills)
    }
}

impl Default for DifficultyStrategy<ThreadRng> {
    fn default() -> Self {
        Self::new(Searcher::default(), DifficultyConfig::default())
    }
}

impl<R: Rng> DifficultyStrategy<R> {
    pub fn with_rng(rng: R, searcher: Searcher, skills: DifficultyConfig) -> Self {
        Self {
            rng,
            searcher,
            skills,
        }
    }

    /// The chance that `tier` searches for its move instead of playing randomly
    pub fn skill_probability(&self, tier: DifficultyTier) -> f64 {
        match tier {
            DifficultyTier::Trivial => self.skills.trivial,
            DifficultyTier::Balanced => self.skills.balanced,
            DifficultyTier::Strong => self.skills.strong,
            DifficultyTier::Perfect => 1.0,
        }
    }

    pub fn choose_move(
        &mut self,
        board: &BitBoard,
        player: Player,
        tier: DifficultyTier,
    ) -> Result<Move, EngineError> {
        if board.winner() != Outcome::InProgress {
            return Err(EngineError::NoLegalMoves);
        }

        let search = match tier {
            DifficultyTier::Perfect => true,
            _ => self.rng.gen::<f64>() < self.skill_probability(tier),
        };

        let cell = if search {
            // the search works on its own copy, never the caller's board
            let mut scratch = *board;
            self.searcher.best_move(&mut scratch, player)?
        } else {
            random_move(board, &mut self.rng)?
        };

        debug!(%player, %tier, search, ?cell, "computer move chosen");
        Ok(cell)
    }
}
