//! Three-piece tic-tac-toe game logic with a packed board representation.
//!
//! Each player may have at most three pieces on the board. Placing a fourth
//! piece first removes that player's oldest surviving piece.
//!
//! # Board Encoding (32-bit)
//!
//! ```text
//! Bits 0-17:  Board state (9 cells × 2 bits per cell)
//! Bits 18-31: Unused (always zero)
//!
//! Each cell (2 bits): 0 = empty, 1 = X, 2 = O
//!
//! Cell indices (row-major order):
//!   (0,0)=0  (0,1)=1  (0,2)=2
//!   (1,0)=3  (1,1)=4  (1,2)=5
//!   (2,0)=6  (2,1)=7  (2,2)=8
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod advisor;
pub mod game;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use advisor::{choose_move, rank_moves, top_tier, ScoredMove};
pub use game::{Game, MoveReport, Status};
pub use session::{AiTicket, GameSession, Scoreboard, SessionConfig, SessionEvent, Snapshot, Turn, MAX_EVENTS};

/// Maximum number of live pieces per player.
pub const MAX_PIECES: usize = 3;

/// The 8 winning lines: 3 rows, 3 columns, 2 diagonals.
///
/// Order matters: win detection and the advisor both scan in this order and
/// stop at the first match.
pub const WIN_LINES: [[Pos; 3]; 8] = [
    [Pos(0), Pos(1), Pos(2)], // Row 0
    [Pos(3), Pos(4), Pos(5)], // Row 1
    [Pos(6), Pos(7), Pos(8)], // Row 2
    [Pos(0), Pos(3), Pos(6)], // Col 0
    [Pos(1), Pos(4), Pos(7)], // Col 1
    [Pos(2), Pos(5), Pos(8)], // Col 2
    [Pos(0), Pos(4), Pos(8)], // Main diagonal
    [Pos(2), Pos(4), Pos(6)], // Anti-diagonal
];

/// Strategic weight of each cell. Center highest, corners above edges.
pub const POSITION_VALUES: [i32; 9] = [
    3, 2, 3, //
    2, 4, 2, //
    3, 2, 3, //
];

/// Player identifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    X = 1,
    O = 2,
}

impl Player {
    /// Get the opponent player.
    #[inline]
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Convert from cell bits (1 or 2) to Player.
    #[inline]
    pub fn from_bits(bits: u32) -> Option<Player> {
        match bits {
            1 => Some(Player::X),
            2 => Some(Player::O),
            _ => None,
        }
    }

    /// Single-character glyph used by `Display` for boards.
    pub fn glyph(self) -> char {
        match self {
            Player::X => 'X',
            Player::O => 'O',
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Contents of a single cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    X,
    O,
}

impl From<Player> for Cell {
    fn from(player: Player) -> Cell {
        match player {
            Player::X => Cell::X,
            Player::O => Cell::O,
        }
    }
}

/// Position on the 3x3 board (0-8).
///
/// Layout:
/// ```text
///   0 1 2
///   3 4 5
///   6 7 8
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub struct Pos(pub u8);

impl Pos {
    /// Checked constructor; `None` for indices outside 0-8.
    #[inline]
    pub fn new(index: u8) -> Option<Pos> {
        let pos = Pos(index);
        pos.is_valid().then_some(pos)
    }

    /// Checked constructor for indices arriving as a wider integer, such as
    /// a JS number. Never truncates: 260 is rejected, not read as cell 4.
    #[inline]
    pub fn from_index(index: u32) -> Option<Pos> {
        u8::try_from(index).ok().and_then(Pos::new)
    }

    /// Create a position from row and column (0-2 each).
    #[inline]
    pub fn from_row_col(row: u8, col: u8) -> Pos {
        debug_assert!(row < 3 && col < 3);
        Pos(row * 3 + col)
    }

    /// Get the row (0-2).
    #[inline]
    pub fn row(self) -> u8 {
        self.0 / 3
    }

    /// Get the column (0-2).
    #[inline]
    pub fn col(self) -> u8 {
        self.0 % 3
    }

    /// Check if this is a valid position (0-8).
    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 < 9
    }

    /// Index into 9-element tables.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Strategic weight of this cell.
    #[inline]
    pub fn value(self) -> i32 {
        POSITION_VALUES[self.index()]
    }

    /// Iterate over all 9 positions.
    pub fn all() -> impl Iterator<Item = Pos> {
        (0..9).map(Pos)
    }
}

/// Compact board state - fits in a single u32.
///
/// See module documentation for encoding details.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Board(pub u32);

impl Board {
    /// Bits per cell.
    const CELL_BITS: u32 = 2;
    /// Mask for a single cell (0b11).
    const CELL_MASK: u32 = 0b11;

    /// Create a new empty board.
    #[inline]
    pub fn new() -> Board {
        Board(0)
    }

    /// Get the raw 2 bits for a cell.
    #[inline]
    pub fn cell(&self, pos: Pos) -> u32 {
        (self.0 >> (pos.0 as u32 * Self::CELL_BITS)) & Self::CELL_MASK
    }

    /// Get the owner of a cell, if any.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<Player> {
        Player::from_bits(self.cell(pos))
    }

    /// Put a player's piece on a cell, overwriting whatever was there.
    /// Does NOT validate - the rule engine is the only caller that matters.
    #[inline]
    pub fn set(&mut self, pos: Pos, player: Player) {
        let shift = pos.0 as u32 * Self::CELL_BITS;
        self.0 = (self.0 & !(Self::CELL_MASK << shift)) | ((player as u32) << shift);
    }

    /// Empty a cell.
    #[inline]
    pub fn clear(&mut self, pos: Pos) {
        let shift = pos.0 as u32 * Self::CELL_BITS;
        self.0 &= !(Self::CELL_MASK << shift);
    }

    /// Check if a cell is empty.
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.cell(pos) == 0
    }

    /// True when all 9 cells hold a piece.
    pub fn is_full(&self) -> bool {
        Pos::all().all(|pos| !self.is_empty(pos))
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        Pos::all().filter(|&pos| !self.is_empty(pos)).count()
    }

    /// Number of cells held by `player`.
    pub fn count(&self, player: Player) -> usize {
        Pos::all().filter(|&pos| self.get(pos) == Some(player)).count()
    }

    /// Iterate over empty cells in index order.
    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        Pos::all().filter(|&pos| self.is_empty(pos))
    }

    /// Occupancy masks for both players.
    /// Returns (x_mask, o_mask) where bit i is set if that player holds cell i.
    pub fn masks(&self) -> (u16, u16) {
        let mut x_mask = 0u16;
        let mut o_mask = 0u16;
        for pos in Pos::all() {
            match self.get(pos) {
                Some(Player::X) => x_mask |= 1 << pos.0,
                Some(Player::O) => o_mask |= 1 << pos.0,
                None => {}
            }
        }
        (x_mask, o_mask)
    }

    /// Read-only view of every cell, in index order.
    pub fn cells(&self) -> [Cell; 9] {
        let mut cells = [Cell::Empty; 9];
        for pos in Pos::all() {
            if let Some(player) = self.get(pos) {
                cells[pos.index()] = player.into();
            }
        }
        cells
    }

    /// First line (in `WIN_LINES` order) held entirely by one player.
    pub fn winning_line(&self) -> Option<(Player, [Pos; 3])> {
        WIN_LINES.iter().find_map(|&line| {
            let [a, b, c] = line;
            let owner = self.get(a)?;
            (self.get(b) == Some(owner) && self.get(c) == Some(owner)).then_some((owner, line))
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            for col in 0..3 {
                let glyph = self.get(Pos::from_row_col(row, col)).map_or('.', Player::glyph);
                write!(f, "{}", glyph)?;
            }
            if row < 2 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Error returned when a board string is malformed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseBoardError(String);

impl fmt::Display for ParseBoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid board: {}", self.0)
    }
}

impl std::error::Error for ParseBoardError {}

impl FromStr for Board {
    type Err = ParseBoardError;

    /// Parse 9 glyphs (`X`, `O`, `.` or `_`), ignoring whitespace.
    fn from_str(s: &str) -> Result<Board, ParseBoardError> {
        let mut board = Board::new();
        let mut index = 0u8;
        for ch in s.chars().filter(|c| !c.is_whitespace()) {
            if index >= 9 {
                return Err(ParseBoardError("more than 9 cells".to_string()));
            }
            match ch {
                'X' | 'x' => board.set(Pos(index), Player::X),
                'O' | 'o' => board.set(Pos(index), Player::O),
                '.' | '_' => {}
                other => return Err(ParseBoardError(format!("unexpected '{}'", other))),
            }
            index += 1;
        }
        if index != 9 {
            return Err(ParseBoardError(format!("expected 9 cells, got {}", index)));
        }
        Ok(board)
    }
}

/// Per-player FIFO of live piece positions, oldest first.
///
/// Fixed capacity of `MAX_PIECES`; no heap allocation.
#[derive(Clone, Copy, Debug)]
pub struct MoveHistory {
    slots: [Pos; MAX_PIECES],
    len: u8,
}

impl MoveHistory {
    /// Create an empty history.
    #[inline]
    pub const fn new() -> MoveHistory {
        MoveHistory {
            slots: [Pos(0); MAX_PIECES],
            len: 0,
        }
    }

    /// Append the newest piece. Panics if the queue is already full;
    /// callers must age out the oldest piece first.
    #[inline]
    pub fn push(&mut self, pos: Pos) {
        assert!(!self.is_full(), "move history overflow");
        self.slots[self.len as usize] = pos;
        self.len += 1;
    }

    /// Remove and return the oldest piece.
    pub fn pop_oldest(&mut self) -> Option<Pos> {
        if self.len == 0 {
            return None;
        }
        let oldest = self.slots[0];
        self.slots.copy_within(1..self.len as usize, 0);
        self.len -= 1;
        Some(oldest)
    }

    /// The oldest live piece, if any.
    #[inline]
    pub fn oldest(&self) -> Option<Pos> {
        self.iter().next()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == MAX_PIECES
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.iter().any(|p| p == pos)
    }

    /// Iterate over live pieces, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = Pos> + '_ {
        self.slots[..self.len as usize].iter().copied()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl PartialEq for MoveHistory {
    /// Compares live entries only; slots past `len` are stale.
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for MoveHistory {}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_opponent() {
        assert_eq!(Player::X.opponent(), Player::O);
        assert_eq!(Player::O.opponent(), Player::X);
    }

    #[test]
    fn test_pos_new_checks_range() {
        assert_eq!(Pos::new(0), Some(Pos(0)));
        assert_eq!(Pos::new(8), Some(Pos(8)));
        assert_eq!(Pos::new(9), None);
        assert_eq!(Pos::new(255), None);
    }

    #[test]
    fn test_pos_row_col() {
        for i in 0..9 {
            let pos = Pos(i);
            assert_eq!(Pos::from_row_col(pos.row(), pos.col()), pos);
        }
        assert_eq!(Pos::from_row_col(1, 1), Pos(4));
    }

    #[test]
    fn test_center_has_highest_value() {
        let best = Pos::all().max_by_key(|p| p.value()).unwrap();
        assert_eq!(best, Pos(4));
        assert_eq!(Pos(0).value(), 3);
        assert_eq!(Pos(1).value(), 2);
    }

    #[test]
    fn test_board_new() {
        let board = Board::new();
        assert_eq!(board.0, 0);
        for pos in Pos::all() {
            assert!(board.is_empty(pos));
            assert_eq!(board.get(pos), None);
        }
        assert_eq!(board.occupied(), 0);
    }

    #[test]
    fn test_board_set_clear() {
        let mut board = Board::new();
        board.set(Pos(4), Player::X);
        board.set(Pos(8), Player::O);
        assert_eq!(board.get(Pos(4)), Some(Player::X));
        assert_eq!(board.get(Pos(8)), Some(Player::O));
        assert_eq!(board.get(Pos(0)), None);

        // Overwrite
        board.set(Pos(4), Player::O);
        assert_eq!(board.get(Pos(4)), Some(Player::O));

        board.clear(Pos(4));
        assert!(board.is_empty(Pos(4)));
        assert_eq!(board.get(Pos(8)), Some(Player::O));
    }

    #[test]
    fn test_board_counts_and_masks() {
        let board: Board = "XO. .X. ..O".parse().unwrap();
        assert_eq!(board.count(Player::X), 2);
        assert_eq!(board.count(Player::O), 2);
        assert_eq!(board.occupied(), 4);
        assert_eq!(board.masks(), (0b000_010_001, 0b100_000_010));
        assert_eq!(
            board.empty_cells().collect::<Vec<_>>(),
            vec![Pos(2), Pos(3), Pos(5), Pos(6), Pos(7)]
        );
    }

    #[test]
    fn test_board_is_full() {
        let board: Board = "XOX OXO OXO".parse().unwrap();
        assert!(board.is_full());
        assert!(!Board::new().is_full());
    }

    #[test]
    fn test_board_display_parse_roundtrip() {
        let board: Board = "X.O\n.X.\nO..".parse().unwrap();
        assert_eq!(board.to_string(), "X.O\n.X.\nO..");
        assert_eq!(board.to_string().parse::<Board>().unwrap(), board);
    }

    #[test]
    fn test_board_parse_errors() {
        assert!("XO".parse::<Board>().is_err());
        assert!("XOXOXOXOXO".parse::<Board>().is_err());
        assert!("XOX OZO ...".parse::<Board>().is_err());
    }

    #[test]
    fn test_winning_line_each_line() {
        for line in &WIN_LINES {
            let mut board = Board::new();
            for &pos in line {
                board.set(pos, Player::O);
            }
            assert_eq!(board.winning_line(), Some((Player::O, *line)), "line {:?}", line);
        }
    }

    #[test]
    fn test_winning_line_mixed_is_none() {
        let board: Board = "XOX ... ...".parse().unwrap();
        assert_eq!(board.winning_line(), None);
    }

    #[test]
    fn test_winning_line_reports_first_in_order() {
        // Row 0 and column 0 both complete; row comes first
        let board: Board = "XXX X.. X..".parse().unwrap();
        assert_eq!(board.winning_line(), Some((Player::X, [Pos(0), Pos(1), Pos(2)])));
    }

    #[test]
    fn test_pos_from_wide_index() {
        assert_eq!(Pos::from_index(4), Some(Pos(4)));
        assert_eq!(Pos::from_index(8), Some(Pos(8)));
        assert_eq!(Pos::from_index(9), None);
        // Would wrap to 4 and 255 under a truncating cast
        assert_eq!(Pos::from_index(260), None);
        assert_eq!(Pos::from_index(u32::MAX), None);
    }

    #[test]
    fn test_cells_view() {
        let board: Board = "X.. .O. ...".parse().unwrap();
        let cells = board.cells();
        assert_eq!(cells[0], Cell::X);
        assert_eq!(cells[4], Cell::O);
        assert_eq!(cells[8], Cell::Empty);
    }

    #[test]
    fn test_history_fifo() {
        let mut history = MoveHistory::new();
        history.push(Pos(0));
        history.push(Pos(3));
        history.push(Pos(6));
        assert!(history.is_full());
        assert_eq!(history.oldest(), Some(Pos(0)));

        assert_eq!(history.pop_oldest(), Some(Pos(0)));
        history.push(Pos(1));
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![Pos(3), Pos(6), Pos(1)]);
        assert!(history.contains(Pos(6)));
        assert!(!history.contains(Pos(0)));
    }

    #[test]
    fn test_history_eq_ignores_stale_slots() {
        let mut aged = MoveHistory::new();
        aged.push(Pos(0));
        aged.push(Pos(5));
        aged.pop_oldest();

        let mut fresh = MoveHistory::new();
        fresh.push(Pos(5));
        assert_eq!(aged, fresh);
    }

    #[test]
    fn test_history_pop_empty() {
        let mut history = MoveHistory::new();
        assert_eq!(history.pop_oldest(), None);
        assert!(history.is_empty());
    }

    #[test]
    #[should_panic(expected = "move history overflow")]
    fn test_history_overflow_panics() {
        let mut history = MoveHistory::new();
        for i in 0..4 {
            history.push(Pos(i));
        }
    }
}
