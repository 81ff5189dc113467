//! Self-play statistics tracking.

use std::time::Instant;

use threepiece_core::{Player, Pos, WIN_LINES};
use tracing::info;

/// How a single simulated game ended.
#[derive(Clone, Copy, Debug)]
pub struct GameRecord {
    /// Winner and the completed line, or `None` if the ply cap was hit.
    pub winner: Option<(Player, [Pos; 3])>,
    /// Moves applied by both sides.
    pub plies: u64,
    /// Pieces aged out during the game.
    pub removals: u64,
}

/// Statistics collected across simulated games.
#[derive(Debug, Default)]
pub struct SimStats {
    pub games: u64,
    pub x_wins: u64,
    pub o_wins: u64,
    /// Games stopped at the ply cap without a winner
    pub unfinished: u64,
    pub total_plies: u64,
    pub total_removals: u64,
    /// Wins per line, indexed like `WIN_LINES`
    pub lines: [u64; 8],

    /// For rate calculation
    start_time: Option<Instant>,
    last_log_time: Option<Instant>,
    last_log_games: u64,
}

impl SimStats {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            last_log_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Record a finished (or abandoned) game
    pub fn record(&mut self, record: &GameRecord) {
        self.games += 1;
        self.total_plies += record.plies;
        self.total_removals += record.removals;
        match record.winner {
            Some((Player::X, line)) => {
                self.x_wins += 1;
                self.record_line(line);
            }
            Some((Player::O, line)) => {
                self.o_wins += 1;
                self.record_line(line);
            }
            None => self.unfinished += 1,
        }
    }

    fn record_line(&mut self, line: [Pos; 3]) {
        if let Some(idx) = WIN_LINES.iter().position(|&l| l == line) {
            self.lines[idx] += 1;
        }
    }

    /// Win rate of `player` over all recorded games, in percent
    pub fn win_pct(&self, player: Player) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        let wins = match player {
            Player::X => self.x_wins,
            Player::O => self.o_wins,
        };
        100.0 * wins as f64 / self.games as f64
    }

    /// Mean game length in plies
    pub fn avg_plies(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.total_plies as f64 / self.games as f64
        }
    }

    /// Check if we should log progress
    pub fn should_log(&self, interval_secs: u64) -> bool {
        if let Some(last) = self.last_log_time {
            last.elapsed().as_secs() >= interval_secs
        } else {
            true
        }
    }

    /// Log progress and reset log timer
    pub fn log_progress(&mut self) {
        let now = Instant::now();
        let rate = match self.last_log_time {
            Some(last) if last.elapsed().as_secs_f64() > 0.0 => {
                (self.games - self.last_log_games) as f64 / last.elapsed().as_secs_f64()
            }
            _ => 0.0,
        };

        info!(
            games = self.games,
            x_wins = self.x_wins,
            o_wins = self.o_wins,
            unfinished = self.unfinished,
            games_per_sec = rate.round(),
            "progress"
        );

        self.last_log_time = Some(now);
        self.last_log_games = self.games;
    }

    /// Print final summary
    pub fn print_summary(&self) {
        println!("Games played: {}", self.games);
        println!("  - X (random) wins: {} ({:.1}%)", self.x_wins, self.win_pct(Player::X));
        println!("  - O (advisor) wins: {} ({:.1}%)", self.o_wins, self.win_pct(Player::O));
        println!("  - Unfinished: {}", self.unfinished);
        println!("Average length: {:.1} plies", self.avg_plies());
        println!("Pieces aged out: {}", self.total_removals);
        println!("Winning lines:");
        for (line, count) in WIN_LINES.iter().zip(self.lines) {
            println!("  {}-{}-{}: {}", line[0].0, line[1].0, line[2].0, count);
        }

        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                println!("Average rate: {:.0} games/sec", self.games as f64 / elapsed);
            }
        }
    }
}
