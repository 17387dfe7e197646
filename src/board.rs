use std::fmt;

use bitvec::prelude::*;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

// one bit per square, row-major: index = row * size + col
pub type BitBoard = BitVec<u8, Lsb0>;

const ORTHOGONAL: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(isize, isize); 8] = [
    (-1, 0), (1, 0), (0, -1), (0, 1),
    (-1, -1), (-1, 1), (1, -1), (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Human,
    Ai,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Human => Side::Ai,
            Side::Ai => Side::Human,
        }
    }
}

/// Contents of one square: `None` when empty.
pub type Cell = Option<Side>;

/// Neighbour set used when a placed tile captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Orthogonal,
    Diagonal,
}

impl Topology {
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Topology::Orthogonal => &ORTHOGONAL,
            Topology::Diagonal => &DIAGONAL,
        }
    }

    pub fn includes_diagonals(self) -> bool {
        self == Topology::Diagonal
    }
}

impl From<bool> for Topology {
    fn from(include_diagonals: bool) -> Self {
        if include_diagonals { Topology::Diagonal } else { Topology::Orthogonal }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "r")]
    pub row: usize,
    #[serde(rename = "c")]
    pub col: usize,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub human: usize,
    pub ai: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "human")]
    HumanWins,
    #[serde(rename = "ai")]
    AiWins,
    #[serde(rename = "draw")]
    Draw,
}

/// Square grid of tiles. Never mutated once handed out: every move
/// returns a fresh board.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Board {
    size: usize,
    human_squares: BitBoard,
    ai_squares: BitBoard,
}

impl Board {
    pub fn new(size: usize) -> GameResult<Self> {
        let squares = match size.checked_mul(size) {
            Some(squares) if size >= 1 => squares,
            _ => return Err(GameError::InvalidSize { size }),
        };
        Ok(Self {
            size,
            human_squares: bitvec![u8, Lsb0; 0; squares],
            ai_squares: bitvec![u8, Lsb0; 0; squares],
        })
    }

    /// Build a board from rows of cells. Rejects empty and non-square grids.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> GameResult<Self> {
        let mut board = Self::new(rows.len())?;
        for (row, cells) in rows.into_iter().enumerate() {
            if cells.len() != board.size {
                return Err(GameError::InvalidSize { size: board.size });
            }
            for (col, cell) in cells.into_iter().enumerate() {
                let idx = row * board.size + col;
                match cell {
                    Some(Side::Human) => board.human_squares.set(idx, true),
                    Some(Side::Ai) => board.ai_squares.set(idx, true),
                    None => {}
                }
            }
        }
        Ok(board)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.size && col < self.size { Some(row * self.size + col) } else { None }
    }

    fn neighbor(&self, row: usize, col: usize, (dr, dc): (isize, isize)) -> Option<usize> {
        self.index(row.checked_add_signed(dr)?, col.checked_add_signed(dc)?)
    }

    fn cell_at(&self, idx: usize) -> Cell {
        if self.human_squares[idx] {
            Some(Side::Human)
        } else if self.ai_squares[idx] {
            Some(Side::Ai)
        } else {
            None
        }
    }

    /// Cell at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.index(row, col).map(|idx| self.cell_at(idx))
    }

    pub fn rows(&self) -> Vec<Vec<Cell>> {
        (0..self.size)
            .map(|row| (0..self.size).map(|col| self.cell_at(row * self.size + col)).collect())
            .collect()
    }

    fn occupied_squares(&self) -> BitBoard {
        self.human_squares.iter().by_vals()
            .zip(self.ai_squares.iter().by_vals())
            .map(|(human, ai)| human || ai)
            .collect()
    }

    fn get_player_squares(&mut self, side: Side) -> (&mut BitBoard, &mut BitBoard) {
        match side {
            Side::Human => (&mut self.human_squares, &mut self.ai_squares),
            Side::Ai => (&mut self.ai_squares, &mut self.human_squares),
        }
    }

    pub fn is_legal_move(&self, row: usize, col: usize) -> bool {
        matches!(self.get(row, col), Some(None))
    }

    /// Empty squares in row-major order.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.occupied_squares()
            .iter_zeros()
            .map(|idx| Move::new(idx / self.size, idx % self.size))
            .collect()
    }

    /// Place a tile for `side` and flip every adjacent opposing tile.
    ///
    /// Only direct neighbours of the placed tile are examined; tiles flipped
    /// by this move never flip anything themselves.
    pub fn make_move(&self, row: usize, col: usize, side: Side, topology: Topology) -> GameResult<Self> {
        let idx = match self.index(row, col) {
            Some(idx) if self.cell_at(idx).is_none() => idx,
            _ => return Err(GameError::IllegalMove { row, col }),
        };
        let captures: Vec<usize> = topology.offsets().iter()
            .filter_map(|&offset| self.neighbor(row, col, offset))
            .filter(|&n| self.cell_at(n) == Some(side.opponent()))
            .collect();

        let mut board = self.clone();
        let (my_squares, opp_squares) = board.get_player_squares(side);
        my_squares.set(idx, true);
        for n in captures {
            opp_squares.set(n, false);
            my_squares.set(n, true);
        }
        Ok(board)
    }

    pub fn score(&self) -> Score {
        Score {
            human: self.human_squares.count_ones(),
            ai: self.ai_squares.count_ones(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.occupied_squares().all()
    }

    /// Result of a finished game, `None` while squares remain empty.
    pub fn outcome(&self) -> Option<Outcome> {
        if !self.is_terminal() {
            return None;
        }
        let Score { human, ai } = self.score();
        Some(if human > ai {
            Outcome::HumanWins
        } else if ai > human {
            Outcome::AiWins
        } else {
            Outcome::Draw
        })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for cell in row {
                let c = match cell {
                    Some(Side::Human) => 'H',
                    Some(Side::Ai) => 'A',
                    None => '.',
                };
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Board {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        let mut s = serializer.serialize_seq(Some(self.size))?;
        for row in self.rows() {
            s.serialize_element(&row)?;
        }
        s.end()
    }
}

struct BoardVisitor;
impl<'de> Visitor<'de> for BoardVisitor {
    type Value = Board;
    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a square JSON array of rows of null, \"human\" or \"ai\"")
    }
    fn visit_seq<A>(self, mut seq: A) -> Result<Board, A::Error> where A: SeqAccess<'de> {
        let mut rows = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(row) = seq.next_element::<Vec<Cell>>()? {
            rows.push(row);
        }
        Board::from_rows(rows).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        deserializer.deserialize_seq(BoardVisitor)
    }
}
