//! Rule engine: piece placement, aging, win detection and turn order.
//!
//! [`Game::apply_move`] is the only code path that mutates the board. Human
//! and AI moves both go through it.

use serde::Serialize;
use tracing::{debug, info};

use crate::{Board, MoveHistory, Player, Pos};

/// Result of the game so far.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    InProgress,
    Won { winner: Player, line: [Pos; 3] },
    /// Kept for completeness. With both players capped at three pieces the
    /// board never holds more than six, so this is never produced in play.
    Draw,
}

impl Status {
    /// True for `Won` and `Draw`.
    #[inline]
    pub fn is_over(&self) -> bool {
        !matches!(self, Status::InProgress)
    }

    /// The winner, if the game ended decisively.
    #[inline]
    pub fn winner(&self) -> Option<Player> {
        match self {
            Status::Won { winner, .. } => Some(*winner),
            _ => None,
        }
    }
}

/// What happened when a move was applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct MoveReport {
    /// Who moved.
    pub player: Player,
    /// Where the new piece went.
    pub placed: Pos,
    /// The piece aged out to make room, if the player already had three.
    pub removed: Option<Pos>,
    /// Status after the move.
    pub status: Status,
}

/// Board, per-player move queues, status and side to move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    board: Board,
    histories: [MoveHistory; 2],
    status: Status,
    current: Player,
}

#[inline]
fn slot(player: Player) -> usize {
    match player {
        Player::X => 0,
        Player::O => 1,
    }
}

impl Game {
    /// Empty board, X to move.
    pub fn new() -> Game {
        Game {
            board: Board::new(),
            histories: [MoveHistory::new(); 2],
            status: Status::InProgress,
            current: Player::X,
        }
    }

    /// Read-only snapshot of the board.
    #[inline]
    pub fn board(&self) -> Board {
        self.board
    }

    /// Live pieces of `player`, oldest first.
    #[inline]
    pub fn history(&self, player: Player) -> &MoveHistory {
        &self.histories[slot(player)]
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Side to move. After a decisive game this stays on the winner.
    #[inline]
    pub fn current_player(&self) -> Player {
        self.current
    }

    /// The current player's piece that their next placement will remove.
    ///
    /// Only reported while the game is in progress and the player already
    /// has the maximum number of pieces on the board.
    pub fn next_removal(&self) -> Option<Pos> {
        if self.status.is_over() {
            return None;
        }
        let history = self.history(self.current);
        if history.is_full() {
            history.oldest()
        } else {
            None
        }
    }

    /// Place a piece for `player` at `pos`.
    ///
    /// Returns `None` without touching anything if the game is over or the
    /// cell is occupied. If the player already has three pieces, the oldest
    /// one is removed before the new one is placed; win detection runs on
    /// the resulting board.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is not a valid cell index.
    pub fn apply_move(&mut self, player: Player, pos: Pos) -> Option<MoveReport> {
        assert!(pos.is_valid(), "cell index {} out of range", pos.0);

        if self.status.is_over() || !self.board.is_empty(pos) {
            debug!(%player, cell = pos.0, status = ?self.status, "move ignored");
            return None;
        }

        let history = &mut self.histories[slot(player)];
        let removed = if history.is_full() {
            history.pop_oldest()
        } else {
            None
        };
        if let Some(oldest) = removed {
            self.board.clear(oldest);
        }
        debug_assert!(!history.contains(pos), "cell {} already queued", pos.0);
        self.board.set(pos, player);
        history.push(pos);
        debug_assert_eq!(self.board.count(player), history.len(), "queue/board mismatch for {}", player);

        self.status = self.evaluate();
        if !self.status.is_over() {
            self.current = player.opponent();
        }

        debug!(%player, cell = pos.0, removed = ?removed.map(|p| p.0), "move applied");
        match self.status {
            Status::Won { winner, line } => info!(%winner, ?line, "game won"),
            Status::Draw => info!("game drawn"),
            Status::InProgress => {}
        }

        Some(MoveReport {
            player,
            placed: pos,
            removed,
            status: self.status,
        })
    }

    /// Clear the board and both queues; X to move.
    pub fn reset(&mut self) {
        *self = Game::new();
    }

    fn evaluate(&self) -> Status {
        if let Some((winner, line)) = self.board.winning_line() {
            Status::Won { winner, line }
        } else if self.board.is_full() {
            Status::Draw
        } else {
            Status::InProgress
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
