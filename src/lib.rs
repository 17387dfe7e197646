//! Tile-capture game engine: board transitions, minimax move selection and
//! the per-connection game session served by the `tile-conquest-engine` binary.

pub mod board;
pub mod engine;
pub mod error;
pub mod session;

pub use board::{Board, Cell, Move, Outcome, Score, Side, Topology};
pub use engine::{select_best_move, Difficulty, Engine, SearchResult};
pub use error::{GameError, GameResult};
