//! A play session: one game at a time, a running scoreboard, and the
//! optional AI opponent.
//!
//! The AI's move is deferred. When a human move hands the turn to the AI,
//! the session issues an [`AiTicket`] and refuses further input until the
//! caller redeems it with [`GameSession::run_ai_move`] (after whatever
//! "thinking" delay the front end uses). Resetting the game or toggling the
//! AI invalidates any outstanding ticket, so a late timer cannot play on a
//! fresh board.
//!
//! Events are kept for the presentation layer until drained. Only the most
//! recent [`MAX_EVENTS`] are retained, so a front end that never drains
//! them does not grow the session.

use std::collections::VecDeque;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::advisor;
use crate::game::{Game, MoveReport, Status};
use crate::{Cell, Player, Pos};

/// The AI always plays O; the human always plays X.
pub const AI_PLAYER: Player = Player::O;

/// Default artificial delay before the AI moves.
pub const DEFAULT_AI_DELAY: Duration = Duration::from_millis(500);

/// Undrained events retained per session; older ones are dropped first.
pub const MAX_EVENTS: usize = 64;

/// Session settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Start with the AI opponent enabled.
    pub ai_enabled: bool,
    /// How long front ends should wait before redeeming an AI ticket.
    pub ai_delay: Duration,
    /// Seed for the advisor's random tie-breaking.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            ai_enabled: false,
            ai_delay: DEFAULT_AI_DELAY,
            seed: 0,
        }
    }
}

/// Handle for a scheduled AI move. Only the most recently issued ticket is
/// ever honored.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize)]
pub struct AiTicket(pub u32);

/// Decisive wins per player. Survives resets; only a new session clears it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Scoreboard {
    pub x: u32,
    pub o: u32,
}

impl Scoreboard {
    pub fn get(&self, player: Player) -> u32 {
        match player {
            Player::X => self.x,
            Player::O => self.o,
        }
    }

    fn record_win(&mut self, player: Player) {
        match player {
            Player::X => self.x += 1,
            Player::O => self.o += 1,
        }
    }
}

/// Notifications for the presentation layer, in the order they happened.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A piece aged out. Always reported before the `Placed` that caused it.
    Removed { player: Player, pos: Pos },
    Placed { player: Player, pos: Pos },
    /// Emitted exactly once per decisive game.
    Won { winner: Player, line: [Pos; 3] },
    Draw,
    AiScheduled { ticket: AiTicket },
    Reset,
}

/// A human move that was accepted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Turn {
    pub report: MoveReport,
    /// Set when the AI is now due to move.
    pub ai_ticket: Option<AiTicket>,
}

/// Everything a renderer needs after a move.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct Snapshot {
    pub cells: [Cell; 9],
    pub current_player: Player,
    pub status: Status,
    /// The current player's piece that their next move will remove.
    pub next_removal: Option<Pos>,
    pub scores: Scoreboard,
    pub ai_enabled: bool,
    pub ai_thinking: bool,
}

/// Owns the game state for one player (or a pair sharing a screen).
#[derive(Clone, Debug)]
pub struct GameSession {
    game: Game,
    scores: Scoreboard,
    ai_enabled: bool,
    ai_delay: Duration,
    pending: Option<AiTicket>,
    next_ticket: u32,
    rng: SmallRng,
    events: VecDeque<SessionEvent>,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> GameSession {
        GameSession {
            game: Game::new(),
            scores: Scoreboard::default(),
            ai_enabled: config.ai_enabled,
            ai_delay: config.ai_delay,
            pending: None,
            next_ticket: 0,
            rng: SmallRng::seed_from_u64(config.seed),
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    #[inline]
    pub fn game(&self) -> &Game {
        &self.game
    }

    #[inline]
    pub fn scores(&self) -> Scoreboard {
        self.scores
    }

    #[inline]
    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    #[inline]
    pub fn ai_delay(&self) -> Duration {
        self.ai_delay
    }

    /// True while an AI move is scheduled and not yet played.
    #[inline]
    pub fn is_ai_thinking(&self) -> bool {
        self.pending.is_some()
    }

    /// The outstanding AI ticket, if any.
    #[inline]
    pub fn pending_ai(&self) -> Option<AiTicket> {
        self.pending
    }

    /// Handle a click on `pos` by the side to move.
    ///
    /// Ignored (returns `None`) when the game is over, the AI is thinking,
    /// or the cell is occupied.
    ///
    /// # Panics
    ///
    /// Panics if `pos` is not a valid cell index.
    pub fn on_cell_activated(&mut self, pos: Pos) -> Option<Turn> {
        assert!(pos.is_valid(), "cell index {} out of range", pos.0);

        if self.game.status().is_over() || self.is_ai_thinking() || !self.game.board().is_empty(pos) {
            debug!(cell = pos.0, thinking = self.is_ai_thinking(), "activation ignored");
            return None;
        }

        let player = self.game.current_player();
        let report = self.apply(player, pos)?;
        let ai_ticket = self.schedule_ai();
        Some(Turn { report, ai_ticket })
    }

    /// Play the AI's move for `ticket`.
    ///
    /// Returns `None` if the ticket is stale (the game was reset or the AI
    /// toggled since it was issued) or has already been redeemed.
    pub fn run_ai_move(&mut self, ticket: AiTicket) -> Option<MoveReport> {
        if self.pending != Some(ticket) {
            debug!(ticket = ticket.0, pending = ?self.pending.map(|t| t.0), "stale AI ticket");
            return None;
        }
        self.pending = None;

        let board = self.game.board();
        let pos = advisor::choose_move(&board, self.game.history(AI_PLAYER), &mut self.rng)?;
        self.apply(AI_PLAYER, pos)
    }

    /// Start a new game. Scores are kept; any pending AI move is dropped.
    pub fn reset(&mut self) {
        if let Some(ticket) = self.pending.take() {
            debug!(ticket = ticket.0, "pending AI move cancelled");
        }
        self.game.reset();
        self.push_event(SessionEvent::Reset);
    }

    /// Turn the AI opponent on or off. Always starts a new game.
    pub fn set_ai_enabled(&mut self, enabled: bool) {
        info!(enabled, "AI mode changed");
        self.ai_enabled = enabled;
        self.reset();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cells: self.game.board().cells(),
            current_player: self.game.current_player(),
            status: self.game.status(),
            next_removal: self.game.next_removal(),
            scores: self.scores,
            ai_enabled: self.ai_enabled,
            ai_thinking: self.is_ai_thinking(),
        }
    }

    /// Take the retained events recorded since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    fn push_event(&mut self, event: SessionEvent) {
        if self.events.len() == MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn apply(&mut self, player: Player, pos: Pos) -> Option<MoveReport> {
        let report = self.game.apply_move(player, pos)?;

        if let Some(removed) = report.removed {
            self.push_event(SessionEvent::Removed { player, pos: removed });
        }
        self.push_event(SessionEvent::Placed { player, pos });

        match report.status {
            Status::Won { winner, line } => {
                self.scores.record_win(winner);
                self.push_event(SessionEvent::Won { winner, line });
            }
            Status::Draw => self.push_event(SessionEvent::Draw),
            Status::InProgress => {}
        }
        Some(report)
    }

    fn schedule_ai(&mut self) -> Option<AiTicket> {
        if !self.ai_enabled || self.game.status().is_over() || self.game.current_player() != AI_PLAYER {
            return None;
        }
        let ticket = AiTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending = Some(ticket);
        self.push_event(SessionEvent::AiScheduled { ticket });
        debug!(ticket = ticket.0, "AI move scheduled");
        Some(ticket)
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
