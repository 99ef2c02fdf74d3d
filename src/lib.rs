//! A game engine and unbeatable agent for noughts and crosses (tic-tac-toe)
//!
//! The board is held as a pair of packed bitmasks, and computer moves come
//! from a full-depth minimax search with alpha-beta pruning. Difficulty tiers
//! mix that search with uniformly random play.
//!
//! # Basic Usage
//!
//! ```
//! use tictactoe_ai::{bitboard::{BitBoard, Player}, search::Searcher};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let mut board = BitBoard::from_layout("X.. / .X. / OO.")?;
//! let mut searcher = Searcher::default();
//! let best_move = searcher.best_move(&mut board, Player::O)?;
//!
//! assert_eq!(best_move, (2, 2));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod error;

pub mod bitboard;

pub mod search;

pub mod strategy;

pub mod controller;

pub mod hints;

pub mod config;

pub mod arena;

mod test;

/// The width and height of the game board in cells
pub const SIZE: usize = 3;

/// The number of cells on the board
pub const CELLS: usize = SIZE * SIZE;

/// A board coordinate as `(row, column)`, both zero-indexed
pub type Move = (usize, usize);

// each player's cells must fit in the u16 masks of the bitboard
const_assert!(CELLS <= 16);
