//! Three-piece tic-tac-toe self-play
//!
//! Plays the move advisor (O) against a uniformly random X player through
//! the same session API a front end uses, and reports how often each side
//! wins. Ctrl-C stops early and still prints the summary.

mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use threepiece_core::{rank_moves, top_tier, GameSession, Player, Pos, SessionConfig, Status};

use crate::stats::{GameRecord, SimStats};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "sim", about = "Self-play statistics for the three-piece advisor")]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 10_000)]
    games: u64,

    /// Base seed; game i uses seed + i
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Abandon a game after this many plies
    #[arg(long, default_value_t = 200)]
    max_plies: u64,

    /// Seconds between progress lines
    #[arg(long, default_value_t = 5)]
    log_interval: u64,

    /// Print every game's final board and the advisor's ranking at each move
    #[arg(long)]
    verbose: bool,
}

fn play_game(seed: u64, max_plies: u64, verbose: bool) -> GameRecord {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = GameSession::new(SessionConfig {
        ai_enabled: true,
        seed,
        ..SessionConfig::default()
    });
    let mut plies = 0;
    let mut removals = 0;

    while plies < max_plies && !session.game().status().is_over() {
        let empty: Vec<Pos> = session.game().board().empty_cells().collect();
        let Some(&pos) = empty.choose(&mut rng) else {
            break;
        };
        let Some(turn) = session.on_cell_activated(pos) else {
            warn!(cell = pos.0, "random move rejected");
            break;
        };
        plies += 1;
        removals += turn.report.removed.is_some() as u64;

        let Some(ticket) = turn.ai_ticket else {
            continue;
        };
        if verbose {
            let game = session.game();
            let ranked = rank_moves(&game.board(), game.history(Player::O));
            let tier: Vec<String> = top_tier(&ranked)
                .iter()
                .map(|m| format!("{}:{}", m.pos.0, m.score))
                .collect();
            println!("{}\ntop tier: {}\n", game.board(), tier.join(" "));
        }
        if let Some(report) = session.run_ai_move(ticket) {
            plies += 1;
            removals += report.removed.is_some() as u64;
        }
    }

    let winner = match session.game().status() {
        Status::Won { winner, line } => Some((winner, line)),
        _ => None,
    };
    debug!(seed, plies, winner = ?winner.map(|(p, _)| p), "game finished");
    if verbose {
        println!("game {} ({} plies):\n{}\n", seed, plies, session.game().board());
    }
    GameRecord {
        winner,
        plies,
        removals,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    println!("Three-piece Self-Play");
    println!("=====================");
    println!("Games: {}  Seed: {}  Ply cap: {}", args.games, args.seed, args.max_plies);
    println!();

    // Set up SIGINT handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut stats = SimStats::new();
    for i in 0..args.games {
        if !running.load(Ordering::SeqCst) {
            info!(played = stats.games, "interrupted");
            break;
        }
        let record = play_game(args.seed.wrapping_add(i), args.max_plies, args.verbose);
        stats.record(&record);
        if stats.should_log(args.log_interval) {
            stats.log_progress();
        }
    }

    println!();
    stats.print_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_game_is_deterministic() {
        let a = play_game(11, 200, false);
        let b = play_game(11, 200, false);
        assert_eq!(a.plies, b.plies);
        assert_eq!(a.winner, b.winner);
    }

    #[test]
    fn test_play_game_respects_ply_cap() {
        for seed in 0..50 {
            // Two pieces each cannot complete a line
            let record = play_game(seed, 4, false);
            assert_eq!(record.plies, 4);
            assert_eq!(record.winner, None);
            assert_eq!(record.removals, 0);
        }
    }

    #[test]
    fn test_play_game_ends_with_winner_or_cap() {
        for seed in 0..50 {
            let record = play_game(seed, 200, false);
            assert!(record.winner.is_some() || record.plies >= 200);
        }
    }
}
