//! One client's game and the JSON message protocol spoken over the socket.
//!
//! Client messages: `start`, `move`, `best_move`, `apply`.
//! Server replies: `board`, `score`, `move`, `end`, `error`.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::board::{Board, Move, Outcome, Side, Topology};
use crate::engine::{select_best_move, Difficulty, Engine};
use crate::error::{GameError, GameResult};

// board sizes a client may start a game with
pub const MIN_BOARD_SIZE: usize = 3;
pub const MAX_BOARD_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub board_size: usize,
    pub difficulty: Difficulty,
    pub first_player: Side,
    pub include_diagonals: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_size: 5,
            difficulty: Difficulty::Medium,
            first_player: Side::Human,
            include_diagonals: false,
        }
    }
}

impl Settings {
    pub fn topology(&self) -> Topology {
        Topology::from(self.include_diagonals)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    board: Board,
    difficulty: String,
    #[serde(default)]
    include_diagonals: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplyRequest {
    board: Board,
    r: usize,
    c: usize,
    side: Side,
    #[serde(default)]
    include_diagonals: bool,
}

/// Board lineage of a single connection.
#[derive(Debug, Default)]
pub struct Game {
    settings: Settings,
    board: Option<Board>,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `None` until the first `start`.
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.board.as_ref().and_then(Board::outcome)
    }

    /// Reset to an empty board. Returns the AI's opening move when it plays first.
    ///
    /// Only sizes in `MIN_BOARD_SIZE..=MAX_BOARD_SIZE` are accepted; the
    /// search is unpruned and would not finish on larger boards.
    pub fn start(&mut self, settings: Settings) -> GameResult<Option<Move>> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&settings.board_size) {
            return Err(GameError::InvalidSize { size: settings.board_size });
        }
        self.board = Some(Board::new(settings.board_size)?);
        self.settings = settings;
        info!(
            "New {}x{} game: {} difficulty, {:?} first, diagonals {}",
            settings.board_size, settings.board_size, settings.difficulty,
            settings.first_player, settings.include_diagonals
        );
        match settings.first_player {
            Side::Ai => self.make_engine_move(),
            Side::Human => Ok(None),
        }
    }

    /// Apply a human move and the AI's reply, if the board still has room.
    pub fn play(&mut self, m: Move) -> GameResult<Option<Move>> {
        let board = self.board.as_ref()
            .ok_or_else(|| GameError::Protocol("Game has not started yet".to_string()))?;
        if board.is_terminal() {
            return Err(GameError::Protocol("Game is already over".to_string()));
        }
        let board = board.make_move(m.row, m.col, Side::Human, self.settings.topology())?;
        debug!("Human played {:?}:\n{}", m, board);
        let terminal = board.is_terminal();
        self.board = Some(board);
        if terminal { Ok(None) } else { self.make_engine_move() }
    }

    fn make_engine_move(&mut self) -> GameResult<Option<Move>> {
        let board = self.board.as_ref()
            .ok_or_else(|| GameError::Protocol("Game has not started yet".to_string()))?;
        let engine = Engine::new(self.settings.topology());
        let result = engine.best_move(board, self.settings.difficulty)?;
        if let Some(m) = result.best_move {
            let board = board.make_move(m.row, m.col, Side::Ai, engine.topology())?;
            debug!("AI played {:?} after {} nodes:\n{}", m, result.nodes, board);
            self.board = Some(board);
        }
        Ok(result.best_move)
    }

    fn state(&self, last_move: Option<Move>) -> GameResult<Value> {
        let board = self.board.as_ref()
            .ok_or_else(|| GameError::Protocol("Game has not started yet".to_string()))?;
        let mut response = json!({
            "board": board,
            "score": board.score(),
            "move": last_move,
        });
        if let Some(outcome) = board.outcome() {
            response["end"] = json!(outcome);
        }
        Ok(response)
    }
}

fn parse_field<T: for<'de> Deserialize<'de>>(data: &Value, key: &str) -> GameResult<T> {
    serde_json::from_value(data[key].clone())
        .map_err(|e| GameError::Protocol(format!("Invalid field {}: {}", key, e)))
}

pub fn handle_message(game: &mut Game, data: Value) -> GameResult<Value> {
    let map = data.as_object()
        .ok_or_else(|| GameError::Protocol("Expected a dict".to_string()))?;

    if map.contains_key("start") {
        let settings: Settings = parse_field(&data, "start")?;
        let opening = game.start(settings)?;
        game.state(opening)
    } else if map.contains_key("move") {
        let m: Move = parse_field(&data, "move")?;
        let reply = game.play(m)?;
        game.state(reply)
    } else if map.contains_key("best_move") {
        let request: MoveRequest = parse_field(&data, "best_move")?;
        let m = select_best_move(&request.board, &request.difficulty, Topology::from(request.include_diagonals))?;
        Ok(json!({ "move": m }))
    } else if map.contains_key("apply") {
        let request: ApplyRequest = parse_field(&data, "apply")?;
        let board = request.board.make_move(request.r, request.c, request.side, Topology::from(request.include_diagonals))?;
        Ok(json!({ "board": board, "score": board.score() }))
    } else {
        Err(GameError::Protocol(format!("Invalid message: {}", data)))
    }
}
