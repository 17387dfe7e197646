//! Depth-bounded minimax over the tile-capture game.
//!
//! The full tree is explored to the depth bound on every call, with no
//! pruning and no caching. Depth is kept small by the difficulty table and
//! the board-size clamps in [`search_depth`].

use std::fmt;
use std::str::FromStr;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Move, Side, Topology};
use crate::error::{GameError, GameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Nominal search depth before any board-size clamp.
    pub fn depth(self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 3,
            Difficulty::Hard => 4,
        }
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(GameError::InvalidDifficulty { token: s.to_string() }),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = GameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let token = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(token)
    }
}

/// Depth actually searched on a board of side `size`.
pub fn search_depth(difficulty: Difficulty, size: usize) -> u32 {
    let mut depth = difficulty.depth();
    if size >= 6 {
        depth = depth.min(3);
    }
    if size >= 7 {
        depth = depth.min(2);
    }
    depth
}

/// Static evaluation: positive favours the AI.
pub fn evaluate(board: &Board) -> i32 {
    let score = board.score();
    score.ai as i32 - score.human as i32
}

/// Returns the backed-up value of `board` and the number of nodes visited.
///
/// The maximizing side places AI tiles, the minimizing side human tiles.
pub fn minimax(board: &Board, depth: u32, maximizing: bool, topology: Topology) -> GameResult<(i32, u64)> {
    let moves = board.legal_moves();
    if depth == 0 || moves.is_empty() {
        return Ok((evaluate(board), 1));
    }

    let side = if maximizing { Side::Ai } else { Side::Human };
    let mut best = if maximizing { i32::MIN } else { i32::MAX };
    let mut nodes = 1;
    for m in moves {
        let child = board.make_move(m.row, m.col, side, topology)?;
        let (value, child_nodes) = minimax(&child, depth - 1, !maximizing, topology)?;
        nodes += child_nodes;
        best = if maximizing { best.max(value) } else { best.min(value) };
    }
    Ok((best, nodes))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// `None` when the board is already full
    pub best_move: Option<Move>,
    /// Value of `best_move`, or the static evaluation of a full board
    pub score: i32,
    /// Depth searched below the root after clamping
    pub depth: u32,
    pub nodes: u64,
}

pub struct Engine {
    topology: Topology,
}

impl Engine {
    pub fn new(topology: Topology) -> Self {
        Self { topology }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Search every AI move and keep the highest value.
    ///
    /// Root moves are searched in parallel, but results are reduced in
    /// row-major order with a strict comparison, so a tie always goes to
    /// the first move in scan order.
    pub fn best_move(&self, board: &Board, difficulty: Difficulty) -> GameResult<SearchResult> {
        let depth = search_depth(difficulty, board.size());
        let candidates = board.legal_moves();
        if candidates.is_empty() {
            debug!("No move available on a full {}x{} board", board.size(), board.size());
            return Ok(SearchResult { best_move: None, score: evaluate(board), depth, nodes: 0 });
        }

        let topology = self.topology;
        let results: Vec<(Move, i32, u64)> = candidates
            .par_iter()
            .map(|&m| -> GameResult<(Move, i32, u64)> {
                let child = board.make_move(m.row, m.col, Side::Ai, topology)?;
                let (value, nodes) = minimax(&child, depth, false, topology)?;
                Ok((m, value, nodes))
            })
            .collect::<GameResult<Vec<_>>>()?;

        let mut best: Option<(Move, i32)> = None;
        let mut nodes = 0;
        for (m, value, child_nodes) in results {
            nodes += child_nodes;
            if best.map_or(true, |(_, best_value)| value > best_value) {
                best = Some((m, value));
            }
        }

        let (best_move, score) = match best {
            Some((m, value)) => (Some(m), value),
            None => (None, evaluate(board)),
        };
        debug!(
            "Searched {} nodes at depth {} ({}, diagonals {}): best {:?} scoring {}",
            nodes, depth, difficulty, topology.includes_diagonals(), best_move, score
        );
        Ok(SearchResult { best_move, score, depth, nodes })
    }
}

/// Pick the AI reply for `board`, taking the difficulty as its wire token.
///
/// `Ok(None)` means the board is full.
pub fn select_best_move(board: &Board, difficulty: &str, topology: Topology) -> GameResult<Option<Move>> {
    let difficulty = difficulty.parse::<Difficulty>()?;
    let result = Engine::new(topology).best_move(board, difficulty)?;
    Ok(result.best_move)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;

    fn parse(rows: &[&str]) -> Board {
        let cells: Vec<Vec<Cell>> = rows.iter()
            .map(|row| row.chars().map(|c| match c {
                'H' => Some(Side::Human),
                'A' => Some(Side::Ai),
                _ => None,
            }).collect())
            .collect();
        Board::from_rows(cells).unwrap()
    }

    #[test]
    fn test_difficulty_tokens() {
        assert_eq!("easy".parse::<Difficulty>(), Ok(Difficulty::Easy));
        assert_eq!("medium".parse::<Difficulty>(), Ok(Difficulty::Medium));
        assert_eq!("hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert_eq!(
            "Hard".parse::<Difficulty>(),
            Err(GameError::InvalidDifficulty { token: "Hard".to_string() })
        );
        assert_eq!(Difficulty::Medium.to_string(), "medium");
    }

    #[test]
    fn test_search_depth_clamps() {
        assert_eq!(search_depth(Difficulty::Easy, 3), 1);
        assert_eq!(search_depth(Difficulty::Easy, 7), 1);
        assert_eq!(search_depth(Difficulty::Medium, 5), 3);
        assert_eq!(search_depth(Difficulty::Hard, 5), 4);
        assert_eq!(search_depth(Difficulty::Hard, 6), 3);
        assert_eq!(search_depth(Difficulty::Medium, 6), 3);
        assert_eq!(search_depth(Difficulty::Hard, 7), 2);
        assert_eq!(search_depth(Difficulty::Medium, 9), 2);
    }

    #[test]
    fn test_evaluate() {
        assert_eq!(evaluate(&parse(&["HA.", "AA.", "..."])), 2);
        assert_eq!(evaluate(&parse(&["HH", "H."])), -3);
    }

    #[test]
    fn test_minimax_leaf_is_static_eval() {
        let board = parse(&["HA.", "...", "..."]);
        assert_eq!(minimax(&board, 0, true, Topology::Orthogonal), Ok((0, 1)));
        let full = parse(&["HA", "AA"]);
        assert_eq!(minimax(&full, 3, false, Topology::Orthogonal), Ok((2, 1)));
    }

    #[test]
    fn test_minimax_counts_nodes() {
        // root + 3 replies
        let board = parse(&["A.", ".."]);
        let (value, nodes) = minimax(&board, 1, false, Topology::Orthogonal).unwrap();
        assert_eq!(nodes, 4);
        // every human reply lands next to the AI tile except the diagonal one
        assert_eq!(value, -2);
    }

    #[test]
    fn test_full_board_has_no_move() {
        let board = parse(&["HA", "AH"]);
        for difficulty in ["easy", "medium", "hard"] {
            assert_eq!(select_best_move(&board, difficulty, Topology::Orthogonal), Ok(None));
        }
    }

    #[test]
    fn test_unknown_difficulty_fails() {
        let board = Board::new(3).unwrap();
        assert_eq!(
            select_best_move(&board, "impossible", Topology::Orthogonal),
            Err(GameError::InvalidDifficulty { token: "impossible".to_string() })
        );
    }

    #[test]
    fn test_single_square_board() {
        let board = Board::new(1).unwrap();
        let result = Engine::new(Topology::Orthogonal).best_move(&board, Difficulty::Hard).unwrap();
        assert_eq!(result.best_move, Some(Move::new(0, 0)));
        assert_eq!(result.score, 1);
        assert_eq!(result.nodes, 1);
    }

    #[test]
    fn test_ties_go_to_first_square() {
        let board = Board::new(3).unwrap();
        let result = Engine::new(Topology::Orthogonal).best_move(&board, Difficulty::Easy).unwrap();
        assert_eq!(result.best_move, Some(Move::new(0, 0)));
        assert_eq!(result.score, -2);
    }

    #[test]
    fn test_easy_prefers_capture() {
        let board = parse(&["..H", "AH.", "HAH"]);
        let result = Engine::new(Topology::Orthogonal).best_move(&board, Difficulty::Easy).unwrap();
        assert_eq!(result.best_move, Some(Move::new(1, 2)));
        assert_eq!(result.score, 0);

        let result = Engine::new(Topology::Diagonal).best_move(&board, Difficulty::Easy).unwrap();
        assert_eq!(result.best_move, Some(Move::new(1, 2)));
        assert_eq!(result.score, -4);
    }

    #[test]
    fn test_deeper_search_changes_choice() {
        let board = parse(&["..H", "AH.", "HAH"]);
        let result = Engine::new(Topology::Orthogonal).best_move(&board, Difficulty::Medium).unwrap();
        assert_eq!(result.depth, 3);
        assert_eq!(result.best_move, Some(Move::new(0, 0)));
        assert_eq!(result.score, 3);
    }

    #[test]
    fn test_search_is_deterministic() {
        let board = parse(&["H...", "....", "....", "...A"]);
        let engine = Engine::new(Topology::Diagonal);
        let first = engine.best_move(&board, Difficulty::Medium).unwrap();
        let second = engine.best_move(&board, Difficulty::Medium).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.best_move, Some(Move::new(0, 1)));
        assert_eq!(first.score, -2);
    }

    #[test]
    fn test_large_board_depth_is_clamped() {
        let mut board = Board::new(7).unwrap();
        // leave three squares open to keep the tree small
        for m in board.legal_moves().into_iter().skip(3) {
            let side = if (m.row + m.col) % 2 == 0 { Side::Human } else { Side::Ai };
            board = board.make_move(m.row, m.col, side, Topology::Orthogonal).unwrap();
        }
        let result = Engine::new(Topology::Orthogonal).best_move(&board, Difficulty::Hard).unwrap();
        assert_eq!(result.depth, 2);
        assert!(result.best_move.is_some());
    }
}
