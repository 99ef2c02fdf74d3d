use std::fmt;

use crate::{error::EngineError, Move, CELLS, SIZE};

mod static_masks {
    use crate::{CELLS, SIZE};

    pub const fn row_mask(row: usize) -> u16 {
        0b111 << (row * SIZE)
    }
    pub const fn column_mask(column: usize) -> u16 {
        0b001_001_001 << column
    }
    pub const fn full_board_mask() -> u16 {
        ((1u32 << CELLS) - 1) as u16
    }
}

/// One of the two sides. `X` always moves first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn other(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Signed cell value used by flat board encodings, `X` is +1 and `O` is -1
    pub fn value(self) -> i8 {
        match self {
            Player::X => 1,
            Player::O => -1,
        }
    }

    pub(crate) fn seat(self) -> usize {
        match self {
            Player::X => 0,
            Player::O => 1,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::X => write!(f, "X"),
            Player::O => write!(f, "O"),
        }
    }
}

/// The state of a game as derived from the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Win(Player),
    Draw,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    Row,
    Column,
    /// top-left to bottom-right
    Diagonal,
    /// top-right to bottom-left
    AntiDiagonal,
}

/// A row, column or diagonal that wins the game when one player owns all of it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WinningLine {
    pub mask: u16,
    pub kind: LineKind,
    pub start: Move,
    pub end: Move,
}

const fn row_line(row: usize) -> WinningLine {
    WinningLine {
        mask: static_masks::row_mask(row),
        kind: LineKind::Row,
        start: (row, 0),
        end: (row, SIZE - 1),
    }
}

const fn column_line(column: usize) -> WinningLine {
    WinningLine {
        mask: static_masks::column_mask(column),
        kind: LineKind::Column,
        start: (0, column),
        end: (SIZE - 1, column),
    }
}

/// All winning lines: rows, then columns, then the two diagonals
pub const WINNING_LINES: [WinningLine; 8] = [
    row_line(0),
    row_line(1),
    row_line(2),
    column_line(0),
    column_line(1),
    column_line(2),
    WinningLine {
        mask: 0b100_010_001,
        kind: LineKind::Diagonal,
        start: (0, 0),
        end: (SIZE - 1, SIZE - 1),
    },
    WinningLine {
        mask: 0b001_010_100,
        kind: LineKind::AntiDiagonal,
        start: (0, SIZE - 1),
        end: (SIZE - 1, 0),
    },
];

/// Packed occupancy of a 3x3 board, bit `row * 3 + col` per player
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitBoard {
    // cells owned by X, never overlapping o_mask
    x_mask: u16,
    // cells owned by O
    o_mask: u16,
}

impl BitBoard {
    pub fn new() -> Self {
        Self {
            x_mask: 0,
            o_mask: 0,
        }
    }

    pub fn from_masks(x_mask: u16, o_mask: u16) -> Result<Self, EngineError> {
        if x_mask & o_mask != 0 {
            return Err(EngineError::InvalidLayout(format!(
                "masks overlap at {:#011b}",
                x_mask & o_mask
            )));
        }
        if (x_mask | o_mask) & !static_masks::full_board_mask() != 0 {
            return Err(EngineError::InvalidLayout(
                "masks set bits outside the board".to_string(),
            ));
        }
        Ok(Self { x_mask, o_mask })
    }

    /// Builds a board from a flat row-major list where 1 is X, -1 is O and 0 is empty
    pub fn from_signed(cells: &[i8; CELLS]) -> Result<Self, EngineError> {
        let mut board = Self::new();
        for (idx, &value) in cells.iter().enumerate() {
            match value {
                1 => board.x_mask |= 1 << idx,
                -1 => board.o_mask |= 1 << idx,
                0 => {}
                other => {
                    return Err(EngineError::InvalidLayout(format!(
                        "cell {} holds {}, expected 1, -1 or 0",
                        idx, other
                    )))
                }
            }
        }
        Ok(board)
    }

    /// Parses a layout such as `"X.. / .X. / OO."`, read row by row.
    /// Whitespace and `/` are ignored, `.`, `-` and `_` are empty cells.
    pub fn from_layout<S: AsRef<str>>(layout: S) -> Result<Self, EngineError> {
        let mut board = Self::new();
        let mut idx = 0;

        for c in layout.as_ref().chars() {
            if c.is_whitespace() || c == '/' {
                continue;
            }
            if idx >= CELLS {
                return Err(EngineError::InvalidLayout(format!(
                    "more than {} cells given",
                    CELLS
                )));
            }
            match c {
                'X' | 'x' => board.x_mask |= 1 << idx,
                'O' | 'o' => board.o_mask |= 1 << idx,
                '.' | '-' | '_' => {}
                _ => {
                    return Err(EngineError::InvalidLayout(format!(
                        "could not parse '{}' as a cell",
                        c
                    )))
                }
            }
            idx += 1;
        }
        if idx != CELLS {
            return Err(EngineError::InvalidLayout(format!(
                "expected {} cells, found {}",
                CELLS, idx
            )));
        }
        Ok(board)
    }

    fn bit(row: usize, col: usize) -> Option<u16> {
        if row < SIZE && col < SIZE {
            Some(1 << (row * SIZE + col))
        } else {
            None
        }
    }

    pub fn mask(&self, player: Player) -> u16 {
        match player {
            Player::X => self.x_mask,
            Player::O => self.o_mask,
        }
    }

    pub fn occupied(&self) -> u16 {
        self.x_mask | self.o_mask
    }

    pub fn num_moves(&self) -> usize {
        self.occupied().count_ones() as usize
    }

    /// The player due to move, assuming X started and the sides alternated
    pub fn side_to_move(&self) -> Player {
        if self.x_mask.count_ones() > self.o_mask.count_ones() {
            Player::O
        } else {
            Player::X
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupied() == static_masks::full_board_mask()
    }

    pub fn is_legal(&self, row: usize, col: usize) -> bool {
        match Self::bit(row, col) {
            Some(bit) => self.occupied() & bit == 0,
            None => false,
        }
    }

    pub fn place(&mut self, row: usize, col: usize, player: Player) -> Result<(), EngineError> {
        let bit = Self::bit(row, col).ok_or(EngineError::OutOfRange { row, col })?;
        if self.occupied() & bit != 0 {
            return Err(EngineError::Occupied { row, col });
        }
        self.set(bit, player);
        Ok(())
    }

    /// Clears the cell for whichever player holds it
    pub fn remove(&mut self, row: usize, col: usize) {
        if let Some(bit) = Self::bit(row, col) {
            self.x_mask &= !bit;
            self.o_mask &= !bit;
        }
    }

    // callers guarantee the cell is free
    pub(crate) fn play_unchecked(&mut self, (row, col): Move, player: Player) {
        debug_assert!(self.is_legal(row, col));
        self.set(1 << (row * SIZE + col), player);
    }

    fn set(&mut self, bit: u16, player: Player) {
        match player {
            Player::X => self.x_mask |= bit,
            Player::O => self.o_mask |= bit,
        }
    }

    pub fn reset(&mut self) {
        self.x_mask = 0;
        self.o_mask = 0;
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Player> {
        let bit = Self::bit(row, col)?;
        if self.x_mask & bit != 0 {
            Some(Player::X)
        } else if self.o_mask & bit != 0 {
            Some(Player::O)
        } else {
            None
        }
    }

    /// A grid view of the board, derived from the masks on every call
    pub fn grid(&self) -> [[Option<Player>; SIZE]; SIZE] {
        let mut grid = [[None; SIZE]; SIZE];
        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = self.cell(row, col);
            }
        }
        grid
    }

    /// A flat row-major view where X is 1, O is -1 and empty cells are 0
    pub fn signed_cells(&self) -> [i8; CELLS] {
        let mut cells = [0; CELLS];
        for (idx, cell) in cells.iter_mut().enumerate() {
            if self.x_mask & (1 << idx) != 0 {
                *cell = Player::X.value();
            } else if self.o_mask & (1 << idx) != 0 {
                *cell = Player::O.value();
            }
        }
        cells
    }

    /// Free cells in row-major order. The iterator holds a snapshot,
    /// so the board may be changed while iterating.
    pub fn legal_moves(&self) -> LegalMoves {
        LegalMoves {
            free: !self.occupied() & static_masks::full_board_mask(),
        }
    }

    pub fn winner(&self) -> Outcome {
        for line in WINNING_LINES.iter() {
            if self.x_mask & line.mask == line.mask {
                return Outcome::Win(Player::X);
            }
            if self.o_mask & line.mask == line.mask {
                return Outcome::Win(Player::O);
            }
        }

        if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }

    /// The first completed line, checked in the same order as `winner`
    pub fn winning_line(&self) -> Option<WinningLine> {
        WINNING_LINES.iter().copied().find(|line| {
            self.x_mask & line.mask == line.mask || self.o_mask & line.mask == line.mask
        })
    }

    /// Whether `player` would complete a line by playing at a free cell
    pub fn completes_line(&self, row: usize, col: usize, player: Player) -> bool {
        let bit = match Self::bit(row, col) {
            Some(bit) if self.occupied() & bit == 0 => bit,
            _ => return false,
        };
        // play the move on a copy of the player's mask
        let pos = self.mask(player) | bit;
        WINNING_LINES
            .iter()
            .any(|line| line.mask & bit != 0 && pos & line.mask == line.mask)
    }
}

impl fmt::Display for BitBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.grid();
        for (row, cells) in grid.iter().enumerate() {
            for cell in cells.iter() {
                match cell {
                    Some(player) => write!(f, "{}", player)?,
                    None => write!(f, ".")?,
                }
            }
            if row + 1 < SIZE {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Iterator over the free cells of a board, see [`BitBoard::legal_moves`]
#[derive(Copy, Clone, Debug)]
pub struct LegalMoves {
    free: u16,
}

impl Iterator for LegalMoves {
    type Item = Move;

    fn next(&mut self) -> Option<Self::Item> {
        if self.free == 0 {
            return None;
        }
        let idx = self.free.trailing_zeros() as usize;
        // drop the lowest set bit
        self.free &= self.free - 1;
        Some((idx / SIZE, idx % SIZE))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.free.count_ones() as usize;
        (len, Some(len))
    }
}

impl ExactSizeIterator for LegalMoves {}
