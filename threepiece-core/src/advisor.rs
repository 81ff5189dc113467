//! Greedy move advisor for the O player.
//!
//! Priority order:
//! 1. Complete a line of two O's (first line in `WIN_LINES` order).
//! 2. Block a line of two X's.
//! 3. Score every empty cell, keep the top tier (moves within 70% of the best
//!    score, best first) and pick uniformly among at most three of them.
//!
//! The advisor only reads the board and O's move queue. It never looks ahead
//! and is not guaranteed to play optimally.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::{Board, MoveHistory, Player, Pos, MAX_PIECES, WIN_LINES};

/// Weight per own piece already in a line through the candidate cell.
const OWN_PIECE_WEIGHT: i32 = 6;
/// Bonus for a line through the candidate that holds exactly one X.
const CONTEST_BONUS: i32 = 4;
/// Penalty when the piece about to age out sits on a high-value cell.
const AGING_PENALTY: i32 = 4;
/// Minimum cell value that triggers `AGING_PENALTY`.
const AGING_VALUE_FLOOR: i32 = 3;
/// Board term: O has two in a line and X none.
const OPEN_THREAT_BONUS: i32 = 10;
/// Board term: X has two in a line and O none.
const OPPOSING_THREAT_PENALTY: i32 = 8;
/// Moves scoring at least this fraction of the best score join the top tier.
const TIER_RATIO: f64 = 0.7;
/// Maximum number of top-tier moves the random pick chooses from.
const TIER_PICK: usize = 3;

/// A candidate cell and its heuristic score.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct ScoredMove {
    pub pos: Pos,
    pub score: i32,
}

/// Bitmask of the three cells in a line.
#[inline]
fn line_mask(line: &[Pos; 3]) -> u16 {
    line.iter().fold(0, |mask, pos| mask | (1 << pos.0))
}

/// Counts of (O pieces, X pieces) among the masked cells.
#[inline]
fn counts(masks: (u16, u16), cells: u16) -> (u32, u32) {
    let (x_mask, o_mask) = masks;
    ((o_mask & cells).count_ones(), (x_mask & cells).count_ones())
}

/// The empty cell of the first line holding two of `player`'s pieces and one
/// empty cell.
fn completing_cell(board: &Board, player: Player) -> Option<Pos> {
    WIN_LINES.iter().find_map(|line| {
        let owned = line.iter().filter(|&&pos| board.get(pos) == Some(player)).count();
        let mut empty = line.iter().copied().filter(|&pos| board.is_empty(pos));
        match (owned, empty.next(), empty.next()) {
            (2, Some(pos), None) => Some(pos),
            _ => None,
        }
    })
}

/// Static evaluation of the board from O's point of view.
///
/// Identical for every candidate in a single call: it shifts all scores
/// together and never reorders them.
pub fn evaluate_board(board: &Board) -> i32 {
    let masks = board.masks();
    let mut score = 0;

    for line in &WIN_LINES {
        let (own, opp) = counts(masks, line_mask(line));
        if own == 2 && opp == 0 {
            score += OPEN_THREAT_BONUS;
        }
        if opp == 2 && own == 0 {
            score -= OPPOSING_THREAT_PENALTY;
        }
    }

    for pos in Pos::all() {
        match board.get(pos) {
            Some(Player::O) => score += pos.value(),
            Some(Player::X) => score -= pos.value(),
            None => {}
        }
    }
    score
}

/// Heuristic score of placing O at `pos`, excluding the board term.
pub fn score_cell(board: &Board, history_o: &MoveHistory, pos: Pos) -> i32 {
    let masks = board.masks();
    let mut score = pos.value() * 2;

    for line in WIN_LINES.iter().filter(|line| line.contains(&pos)) {
        let others = line_mask(line) & !(1 << pos.0);
        let (own, opp) = counts(masks, others);
        score += own as i32 * OWN_PIECE_WEIGHT;
        if opp == 1 {
            score += CONTEST_BONUS;
        }
    }

    if history_o.len() >= MAX_PIECES - 1 {
        if let Some(oldest) = history_o.oldest() {
            if oldest.value() >= AGING_VALUE_FLOOR {
                score -= AGING_PENALTY;
            }
        }
    }
    score
}

/// Score every empty cell and sort best first.
///
/// The sort is stable, so equal scores keep cell-index order.
pub fn rank_moves(board: &Board, history_o: &MoveHistory) -> Vec<ScoredMove> {
    let global = evaluate_board(board);
    let mut ranked: Vec<ScoredMove> = board
        .empty_cells()
        .map(|pos| ScoredMove {
            pos,
            score: score_cell(board, history_o, pos) + global,
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// Leading run of `ranked` scoring at least 70% of the best score.
///
/// The best move is always included. The comparison is the plain
/// `score >= best * 0.7`, so with a negative best score nothing after it
/// qualifies.
pub fn top_tier(ranked: &[ScoredMove]) -> &[ScoredMove] {
    let Some(best) = ranked.first() else {
        return &[];
    };
    let threshold = best.score as f64 * TIER_RATIO;
    let len = 1 + ranked[1..]
        .iter()
        .take_while(|m| m.score as f64 >= threshold)
        .count();
    &ranked[..len]
}

/// Pick a cell for O.
///
/// Returns `None` only when the board has no empty cell.
pub fn choose_move<R: Rng>(board: &Board, history_o: &MoveHistory, rng: &mut R) -> Option<Pos> {
    if let Some(pos) = completing_cell(board, Player::O) {
        debug!(cell = pos.0, "advisor: winning move");
        return Some(pos);
    }
    if let Some(pos) = completing_cell(board, Player::X) {
        debug!(cell = pos.0, "advisor: blocking move");
        return Some(pos);
    }

    let ranked = rank_moves(board, history_o);
    let tier = top_tier(&ranked);
    if tier.is_empty() {
        return None;
    }
    let pick = rng.random_range(0..tier.len().min(TIER_PICK));
    debug!(cell = tier[pick].pos.0, score = tier[pick].score, tier = tier.len(), "advisor: scored move");
    Some(tier[pick].pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn board(s: &str) -> Board {
        s.parse().unwrap()
    }

    fn history(cells: &[u8]) -> MoveHistory {
        let mut history = MoveHistory::new();
        for &cell in cells {
            history.push(Pos(cell));
        }
        history
    }

    fn scores(ranked: &[ScoredMove]) -> Vec<(u8, i32)> {
        ranked.iter().map(|m| (m.pos.0, m.score)).collect()
    }

    #[test]
    fn test_immediate_win() {
        let b = board("OO. ... ...");
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(choose_move(&b, &history(&[0, 1]), &mut rng), Some(Pos(2)));
        }
    }

    #[test]
    fn test_immediate_block() {
        let b = board("XX. ... ...");
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..20 {
            assert_eq!(choose_move(&b, &MoveHistory::new(), &mut rng), Some(Pos(2)));
        }
    }

    #[test]
    fn test_win_beats_block() {
        // X threatens 2 on row 0, which comes first; O can still win at 5
        let b = board("XX. OO. ...");
        assert_eq!(completing_cell(&b, Player::X), Some(Pos(2)));
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(choose_move(&b, &history(&[3, 4]), &mut rng), Some(Pos(5)));
        }
    }

    #[test]
    fn test_first_line_in_order_wins() {
        // O can complete row 0 at 2 or column 0 at 6; row 0 comes first
        let b = board("OO. O.. ...");
        let mut rng = SmallRng::seed_from_u64(4);
        assert_eq!(choose_move(&b, &history(&[0, 1, 3]), &mut rng), Some(Pos(2)));
    }

    #[test]
    fn test_empty_board_ranks_center_first() {
        let ranked = rank_moves(&Board::new(), &MoveHistory::new());
        assert_eq!(ranked[0], ScoredMove { pos: Pos(4), score: 8 });
        assert_eq!(
            scores(&ranked[1..5]),
            vec![(0, 6), (2, 6), (6, 6), (8, 6)]
        );
        assert_eq!(
            scores(&ranked[5..]),
            vec![(1, 4), (3, 4), (5, 4), (7, 4)]
        );

        // Corners reach 70% of the center's score, edges do not
        let tier = top_tier(&ranked);
        assert_eq!(tier.len(), 5);

        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..50 {
            let pos = choose_move(&Board::new(), &MoveHistory::new(), &mut rng).unwrap();
            assert!([Pos(4), Pos(0), Pos(2)].contains(&pos), "unexpected {:?}", pos);
        }
    }

    #[test]
    fn test_scores_with_x_in_center() {
        let b = board("... .X. ...");
        assert_eq!(evaluate_board(&b), -4);
        let ranked = rank_moves(&b, &MoveHistory::new());
        // Corners: 6 base + 4 contesting the diagonal - 4 board term
        // Edges:   4 base + 4 contesting the middle line - 4 board term
        assert_eq!(
            scores(&ranked),
            vec![(0, 6), (2, 6), (6, 6), (8, 6), (1, 4), (3, 4), (5, 4), (7, 4)]
        );
        assert_eq!(top_tier(&ranked).len(), 4);
    }

    #[test]
    fn test_own_pieces_add_weight() {
        // O at 0: cell 1 and 3 gain 6 from row/column, 4 gains 6 from diagonal
        let b = board("O.. ... ...");
        let h = history(&[0]);
        assert_eq!(score_cell(&b, &h, Pos(1)), 4 + 6);
        assert_eq!(score_cell(&b, &h, Pos(4)), 8 + 6);
        assert_eq!(score_cell(&b, &h, Pos(5)), 4);
    }

    #[test]
    fn test_aging_penalty() {
        let b = board("O.. ..O ...");
        let corner_oldest = history(&[0, 5]);
        let edge_oldest = history(&[5, 0]);
        let single = history(&[0]);
        for pos in b.empty_cells() {
            let base = score_cell(&b, &edge_oldest, pos);
            assert_eq!(score_cell(&b, &corner_oldest, pos), base - 4);
            assert_eq!(score_cell(&b, &single, pos), base);
        }
    }

    #[test]
    fn test_evaluate_board_threat_terms() {
        // O has two on row 0 with no X: +10, plus 3 + 2 position value
        assert_eq!(evaluate_board(&board("OO. ... ...")), 10 + 5);
        // X has two on column 2 with no O: -8, minus 3 + 2
        assert_eq!(evaluate_board(&board("..X ..X ...")), -8 - 5);
        // Mixed line counts for neither side
        assert_eq!(evaluate_board(&board("OX. ... ...")), 3 - 2);
    }

    #[test]
    fn test_top_tier_stops_at_first_miss() {
        let ranked = [
            ScoredMove { pos: Pos(0), score: 10 },
            ScoredMove { pos: Pos(1), score: 7 },
            ScoredMove { pos: Pos(2), score: 6 },
            ScoredMove { pos: Pos(3), score: 6 },
        ];
        assert_eq!(top_tier(&ranked).len(), 2);
    }

    #[test]
    fn test_top_tier_zero_best_takes_all_non_negative() {
        let ranked = [
            ScoredMove { pos: Pos(0), score: 0 },
            ScoredMove { pos: Pos(1), score: 0 },
            ScoredMove { pos: Pos(2), score: -1 },
        ];
        assert_eq!(top_tier(&ranked).len(), 2);
    }

    #[test]
    fn test_top_tier_negative_best_keeps_only_best() {
        // -10 * 0.7 = -7; even a tie with the best falls below that
        let ranked = [
            ScoredMove { pos: Pos(0), score: -10 },
            ScoredMove { pos: Pos(1), score: -10 },
        ];
        assert_eq!(top_tier(&ranked), &ranked[..1]);
        assert!(top_tier(&[]).is_empty());
    }

    #[test]
    fn test_full_board_has_no_move() {
        let b = board("XOX XOO OXX");
        let mut rng = SmallRng::seed_from_u64(6);
        assert_eq!(choose_move(&b, &MoveHistory::new(), &mut rng), None);
    }
}
