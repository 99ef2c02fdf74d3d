//! Move hints for the player to move
//!
//! A hint pairs the perfect-play move from the search with, optionally, the
//! per-cell probabilities of an external [`MoveOracle`] such as a trained
//! model. The engine only calls the oracle; it never builds or trains one.

use crate::{
    bitboard::{BitBoard, Player},
    error::EngineError,
    search::{Evaluation, Searcher},
    Move, CELLS, SIZE,
};

/// A black-box source of move probabilities
pub trait MoveOracle {
    /// Returns one probability per cell, row-major, for a board encoded by
    /// [`encode_board`]
    fn move_probabilities(&self, state: &[f32; CELLS]) -> [f32; CELLS];

    /// The most likely cell. Occupied cells are never chosen; returns `None`
    /// when the board is full.
    fn select_move(&self, board: &BitBoard, player: Player) -> Option<Move> {
        let probabilities = self.move_probabilities(&encode_board(board, player));
        board.legal_moves().fold(None, |best: Option<(Move, f32)>, cell| {
            let p = probabilities[cell.0 * SIZE + cell.1];
            match best {
                // ties keep the earlier cell
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((cell, p)),
            }
        })
        .map(|(cell, _)| cell)
    }
}

/// Flattens the board from `player`'s side: +1 own cells, -1 opponent cells, 0 empty
pub fn encode_board(board: &BitBoard, player: Player) -> [f32; CELLS] {
    let mut state = [0.0; CELLS];
    let sign = player.value();
    for (cell, value) in state.iter_mut().zip(board.signed_cells().iter()) {
        *cell = (value * sign) as f32;
    }
    state
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hint {
    pub best_move: Move,
    pub evaluation: Evaluation,
    /// present only when an oracle was supplied
    pub probabilities: Option<[f32; CELLS]>,
}

/// Computes the hint for `player` on a copy of `board`
pub fn compute(
    board: &BitBoard,
    player: Player,
    searcher: &mut Searcher,
    oracle: Option<&dyn MoveOracle>,
) -> Result<Hint, EngineError> {
    let mut scratch = *board;
    let best = searcher.best_scored_move(&mut scratch, player)?;

    let probabilities = oracle.map(|oracle| oracle.move_probabilities(&encode_board(board, player)));

    Ok(Hint {
        best_move: best.cell,
        evaluation: Evaluation::from_score(best.score),
        probabilities,
    })
}
