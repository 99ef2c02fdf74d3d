//! A full-depth game tree search for noughts and crosses

use static_assertions::*;
use tracing::debug;

use crate::{
    bitboard::{BitBoard, Outcome, Player},
    error::EngineError,
    Move, CELLS,
};

/// Scores are kept in hundredths of a ply so tie-break bonuses stay integral
pub const SCORE_SCALE: i32 = 100;
/// The base score of a won position, before the distance to the win is taken off
pub const WIN_SCORE: i32 = 20;
/// The default bonus for a move that takes a cell the opponent needs to win (0.1 ply)
pub const DEFAULT_BLOCKING_BONUS: i32 = 10;
/// The most bonuses that can pile up along one line of play: one per own move
pub const MAX_BONUSES: i32 = ((CELLS + 1) / 2) as i32;
/// The largest blocking bonus whose piled-up total stays below one ply
pub const MAX_BLOCKING_BONUS: i32 = (SCORE_SCALE - 1) / MAX_BONUSES;

// window bounds, far outside any reachable score
const UNBOUNDED: i32 = i32::MAX / 2;

// the piled-up bonus must stay below the gap between two distinct base scores
const_assert!(MAX_BONUSES * DEFAULT_BLOCKING_BONUS < SCORE_SCALE);
const_assert!(DEFAULT_BLOCKING_BONUS >= 0);
const_assert!(MAX_BONUSES * MAX_BLOCKING_BONUS < SCORE_SCALE);

/// A root move together with its search score
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScoredMove {
    pub cell: Move,
    pub score: i32,
}

/// The game-theoretic value of a score, with bonuses stripped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// the searching player can force a win within `plies` moves (both sides counted)
    Win { plies: usize },
    /// the opponent can force a win within `plies` moves
    Loss { plies: usize },
    Draw,
}

impl Evaluation {
    pub fn from_score(score: i32) -> Self {
        // bonuses only ever add less than one scale unit, flooring removes them
        let base = score.div_euclid(SCORE_SCALE);
        if base > 0 {
            Evaluation::Win {
                plies: (WIN_SCORE - base) as usize,
            }
        } else if base < 0 {
            Evaluation::Loss {
                plies: (WIN_SCORE + base) as usize,
            }
        } else {
            Evaluation::Draw
        }
    }
}

/// Minimax search with alpha-beta pruning
///
/// # Notes
/// The tree of a 3x3 board is small enough to search to the end from any
/// position, so there is no depth limit, move ordering or transposition table.
///
/// # Position Scoring
/// A won position scores `WIN_SCORE - depth` and a lost one `depth - WIN_SCORE`,
/// where depth counts the plies from the root. This prefers the fastest win and
/// the slowest loss. A draw scores 0. All scores are multiplied by [`SCORE_SCALE`].
///
/// On the searching player's turns, a move into a cell where the opponent would
/// complete a line earns a small bonus. The bonus only separates moves of equal
/// base score; it is never large enough to lift one base score over another.
#[derive(Clone, Debug)]
pub struct Searcher {
    blocking_bonus: i32,
    // the side the scores are relative to, set for each search
    player: Player,

    /// The number of nodes searched by this `Searcher` so far (for diagnostics only)
    pub node_count: usize,
}

impl Searcher {
    /// Creates a new `Searcher` with a blocking bonus in scaled units.
    ///
    /// Returns `None` if the bonus is negative or could pile up to a whole ply,
    /// i.e. outside `0..=MAX_BLOCKING_BONUS`.
    pub fn new(blocking_bonus: i32) -> Option<Self> {
        if !(0..=MAX_BLOCKING_BONUS).contains(&blocking_bonus) {
            return None;
        }
        Some(Self {
            blocking_bonus,
            player: Player::X,
            node_count: 0,
        })
    }

    pub fn blocking_bonus(&self) -> i32 {
        self.blocking_bonus
    }

    fn bonus(&self, board: &BitBoard, (row, col): Move, player: Player) -> i32 {
        if board.completes_line(row, col, player.other()) {
            self.blocking_bonus
        } else {
            0
        }
    }

    fn terminal_score(&self, outcome: Outcome, depth: i32) -> Option<i32> {
        match outcome {
            Outcome::InProgress => None,
            Outcome::Draw => Some(0),
            Outcome::Win(winner) if winner == self.player => Some((WIN_SCORE - depth) * SCORE_SCALE),
            Outcome::Win(_) => Some((depth - WIN_SCORE) * SCORE_SCALE),
        }
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position (see [Position Scoring]) with `to_move` to play
    ///
    /// [Position Scoring]: #position-scoring
    fn minimax(
        &mut self,
        board: &mut BitBoard,
        to_move: Player,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
    ) -> i32 {
        self.node_count += 1;

        if let Some(score) = self.terminal_score(board.winner(), depth) {
            return score;
        }

        let maximizing = to_move == self.player;
        let mut best = if maximizing { -UNBOUNDED } else { UNBOUNDED };

        for cell in board.legal_moves() {
            let bonus = if maximizing {
                self.bonus(board, cell, to_move)
            } else {
                0
            };

            board.play_unchecked(cell, to_move);
            // shift the window by the bonus so the child's bounds stay exact
            let score = self.minimax(
                board,
                to_move.other(),
                depth + 1,
                alpha - bonus,
                beta - bonus,
            ) + bonus;
            board.remove(cell.0, cell.1);

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            // the other side already has a better option elsewhere
            if beta <= alpha {
                break;
            }
        }
        best
    }

    /// Scores every legal move of `player`, in row-major order
    ///
    /// The board is used as scratch space and restored before returning.
    pub fn scored_moves(
        &mut self,
        board: &mut BitBoard,
        player: Player,
    ) -> Result<Vec<ScoredMove>, EngineError> {
        if board.winner() != Outcome::InProgress {
            return Err(EngineError::NoLegalMoves);
        }
        self.player = player;

        let mut moves = Vec::with_capacity(board.legal_moves().len());
        for cell in board.legal_moves() {
            let bonus = self.bonus(board, cell, player);

            board.play_unchecked(cell, player);
            // each root move gets a full window so equal scores are exact, not bounds
            let score = self.minimax(board, player.other(), 1, -UNBOUNDED, UNBOUNDED) + bonus;
            board.remove(cell.0, cell.1);

            moves.push(ScoredMove { cell, score });
        }
        Ok(moves)
    }

    /// Finds the best move for `player`
    ///
    /// Among moves with the same score the first in row-major order is chosen,
    /// so the result depends only on the board.
    pub fn best_move(&mut self, board: &mut BitBoard, player: Player) -> Result<Move, EngineError> {
        self.best_scored_move(board, player).map(|best| best.cell)
    }

    /// Like [`Searcher::best_move`], keeping the score of the chosen move
    pub fn best_scored_move(
        &mut self,
        board: &mut BitBoard,
        player: Player,
    ) -> Result<ScoredMove, EngineError> {
        let nodes_before = self.node_count;
        let moves = self.scored_moves(board, player)?;

        let mut best: Option<ScoredMove> = None;
        for candidate in moves {
            // strictly better only, earlier moves win ties
            if best.map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        let best = best.ok_or(EngineError::NoLegalMoves)?;

        debug!(
            %player,
            cell = ?best.cell,
            score = best.score,
            nodes = self.node_count - nodes_before,
            "search finished"
        );
        Ok(best)
    }

    /// The game-theoretic value of the position for `player`
    pub fn evaluate(&mut self, board: &mut BitBoard, player: Player) -> Result<Evaluation, EngineError> {
        self.best_scored_move(board, player)
            .map(|best| Evaluation::from_score(best.score))
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self {
            blocking_bonus: DEFAULT_BLOCKING_BONUS,
            player: Player::X,
            node_count: 0,
        }
    }
}
