//! Error types shared by the board, the search and the session layer.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// A full board is not an error: move selection reports it as `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Board dimension out of range, or a grid that is not square
    #[error("Invalid board size: {size}")]
    InvalidSize { size: usize },

    /// Move on an out-of-bounds or occupied cell
    #[error("Illegal move at ({row}, {col})")]
    IllegalMove { row: usize, col: usize },

    /// Unrecognised difficulty token
    #[error("Invalid difficulty: {token:?} (expected easy, medium or hard)")]
    InvalidDifficulty { token: String },

    /// Malformed or out-of-order client message
    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type GameResult<T> = Result<T, GameError>;

impl From<GameError> for std::io::Error {
    fn from(e: GameError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    }
}
