//! Turn order and game outcome for one game session

use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    bitboard::{BitBoard, Outcome, Player, WinningLine},
    error::EngineError,
    strategy::{DifficultyStrategy, MoveSource},
    Move,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameState {
    WaitingForMove(Player),
    /// absorbing until [`TurnController::reset`]
    Terminal(Outcome),
}

/// Drives one game: whose turn it is, who moves for each side, and when it ends
///
/// The controller owns its board. Rejected moves are returned as errors and
/// leave both the board and the state as they were.
#[derive(Clone, Debug)]
pub struct TurnController {
    board: BitBoard,
    state: GameState,
    // indexed by Player::seat
    seats: [MoveSource; 2],
}

impl TurnController {
    pub const FIRST_PLAYER: Player = Player::X;

    /// A game between two human players
    pub fn new() -> Self {
        Self::with_seats(MoveSource::Human, MoveSource::Human)
    }

    pub fn with_seats(x: MoveSource, o: MoveSource) -> Self {
        Self {
            board: BitBoard::new(),
            state: GameState::WaitingForMove(Self::FIRST_PLAYER),
            seats: [x, o],
        }
    }

    pub fn board(&self) -> &BitBoard {
        &self.board
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn active_player(&self) -> Option<Player> {
        match self.state {
            GameState::WaitingForMove(player) => Some(player),
            GameState::Terminal(_) => None,
        }
    }

    pub fn seat(&self, player: Player) -> MoveSource {
        self.seats[player.seat()]
    }

    pub fn set_seat(&mut self, player: Player, source: MoveSource) {
        self.seats[player.seat()] = source;
    }

    /// The move source of the player to move, `None` once the game is over
    pub fn active_source(&self) -> Option<MoveSource> {
        self.active_player().map(|player| self.seat(player))
    }

    pub fn outcome(&self) -> Outcome {
        self.board.winner()
    }

    /// The completed line for the renderer to draw, if the game was won
    pub fn winning_line(&self) -> Option<WinningLine> {
        self.board.winning_line()
    }

    pub fn move_count(&self) -> usize {
        self.board.num_moves()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, GameState::Terminal(_))
    }

    /// Plays a move for the player to move
    pub fn play(&mut self, row: usize, col: usize) -> Result<GameState, EngineError> {
        let player = match self.state {
            GameState::WaitingForMove(player) => player,
            GameState::Terminal(_) => {
                debug!(row, col, "move rejected, game is over");
                return Err(EngineError::GameOver);
            }
        };

        if let Err(err) = self.board.place(row, col, player) {
            warn!(%player, row, col, %err, "move rejected");
            return Err(err);
        }
        debug!(%player, row, col, "move played");

        self.state = match self.board.winner() {
            Outcome::InProgress => GameState::WaitingForMove(player.other()),
            outcome => {
                info!(?outcome, moves = self.board.num_moves(), "game over");
                GameState::Terminal(outcome)
            }
        };
        Ok(self.state)
    }

    /// Plays a move and reports only whether it was accepted
    pub fn try_play(&mut self, row: usize, col: usize) -> bool {
        self.play(row, col).is_ok()
    }

    /// Asks `strategy` for the move of the active computer seat and plays it
    pub fn play_computer<R: Rng>(
        &mut self,
        strategy: &mut DifficultyStrategy<R>,
    ) -> Result<(Move, GameState), EngineError> {
        let player = self.active_player().ok_or(EngineError::GameOver)?;
        let tier = match self.seat(player) {
            MoveSource::Computer(tier) => tier,
            MoveSource::Human => return Err(EngineError::HumanTurn(player)),
        };

        let (row, col) = strategy.choose_move(&self.board, player, tier)?;
        let state = self.play(row, col)?;
        Ok(((row, col), state))
    }

    /// Clears the board and hands the first move back to X
    pub fn reset(&mut self) {
        self.board.reset();
        self.state = GameState::WaitingForMove(Self::FIRST_PLAYER);
        debug!("game reset");
    }
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}
