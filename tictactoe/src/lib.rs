//! Tic-tac-toe engine with bounded minimax search.
//! Boards are small `Copy` values owned by the caller between turns. The
//! [`Engine`] borrows a board to pick its reply and searches on copies, so the
//! only change a caller ever sees is the move it asked the engine to make.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

mod scoreboard;

pub use scoreboard::{Rates, Scoreboard};

const SIZE: usize = 3;
const CELLS: usize = SIZE * SIZE;

/// Plies searched when no lookahead is configured.
pub const DEFAULT_DEPTH: u8 = 4;
/// A 3x3 game never lasts longer than this many plies.
pub const MAX_DEPTH: u8 = CELLS as u8;

/// Winning lines as 9-bit patterns, bit index `row * 3 + col`.
const WIN_PATTERNS: [u16; 8] = [
    0b111_000_000, 0b000_111_000, 0b000_000_111, // rows
    0b100_100_100, 0b010_010_010, 0b001_001_001, // columns
    0b100_010_001, 0b001_010_100, // diagonals
];

/// The same eight lines as coordinates, in the order the evaluator scans them.
const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    X,
    O,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    X,
    O,
}

impl Marker {
    pub fn opponent(self) -> Marker {
        match self {
            Marker::X => Marker::O,
            Marker::O => Marker::X,
        }
    }

    pub fn cell(self) -> Cell {
        match self {
            Marker::X => Cell::X,
            Marker::O => Cell::O,
        }
    }
}

impl FromStr for Marker {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" | "X" => Ok(Marker::X),
            "o" | "O" => Ok(Marker::O),
            other => Err(GameError::ParseMarker(other.to_string())),
        }
    }
}

/// Result of a finished game, seen from the human player's side.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
    Tie,
}

impl Outcome {
    /// Verb for result banners ("YOU WON").
    pub fn past_tense(self) -> &'static str {
        match self {
            Outcome::Win => "WON",
            Outcome::Lose => "LOST",
            Outcome::Tie => "TIED",
        }
    }
}

impl FromStr for Outcome {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(Outcome::Win),
            "lose" => Ok(Outcome::Lose),
            "tie" => Ok(Outcome::Tie),
            _ => Err(GameError::ParseOutcome(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid board string at position {position}: {reason}")]
    ParseBoard { position: usize, reason: String },
    #[error("invalid marker {0:?} (expected x or o)")]
    ParseMarker(String),
    #[error("invalid outcome {0:?} (expected win, lose or tie)")]
    ParseOutcome(String),
    #[error("cell ({row}, {col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },
    #[error("cell ({row}, {col}) is already occupied")]
    Occupied { row: usize, col: usize },
    #[error("game is already over")]
    GameOver,
    #[error("depth {0} is out of range (1-9)")]
    DepthOutOfRange(u8),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

impl Move {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row)?.get(col).copied()
    }

    /// Occupied cells of `marker` packed as bit `row * 3 + col`.
    pub fn bits(&self, marker: Marker) -> u16 {
        let target = marker.cell();
        self.cells
            .iter()
            .flatten()
            .enumerate()
            .filter(|&(_, &cell)| cell == target)
            .fold(0, |bits, (idx, _)| bits | (1 << idx))
    }

    pub fn has_won(&self, marker: Marker) -> bool {
        let bits = self.bits(marker);
        WIN_PATTERNS
            .iter()
            .any(|&pattern| bits & pattern == pattern)
    }

    /// Empty cells in row-major order, or nothing once either side has a line.
    pub fn possible_moves(&self) -> Vec<Move> {
        if self.has_won(Marker::X) || self.has_won(Marker::O) {
            return Vec::new();
        }
        (0..SIZE)
            .flat_map(|row| (0..SIZE).map(move |col| Move::new(row, col)))
            .filter(|mv| self.cells[mv.row][mv.col] == Cell::Empty)
            .collect()
    }

    /// True for full boards and for boards where a line is already complete.
    pub fn is_game_over(&self) -> bool {
        self.possible_moves().is_empty()
    }

    pub fn apply_move(&mut self, mv: Move, marker: Marker) -> Result<(), GameError> {
        let Move { row, col } = mv;
        match self.get(row, col) {
            None => Err(GameError::OutOfBounds { row, col }),
            Some(Cell::Empty) => {
                self.place(mv, marker);
                Ok(())
            }
            Some(_) => Err(GameError::Occupied { row, col }),
        }
    }

    fn place(&mut self, mv: Move, marker: Marker) {
        self.cells[mv.row][mv.col] = marker.cell();
    }

    /// Multi-line `[X][ ][O]` view for logs.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in &self.cells {
            for cell in row {
                out.push_str(match cell {
                    Cell::Empty => "[ ]",
                    Cell::X => "[X]",
                    Cell::O => "[O]",
                });
            }
            out.push('\n');
        }
        out
    }
}

impl FromStr for Board {
    type Err = GameError;

    /// Nine cells row-major: `X`, `O`, and `.`, `-`, `_` or a space for empty.
    /// Row separators (`/`, newlines, tabs) are skipped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut board = Board::empty();
        let mut filled = 0;
        for (position, ch) in s.char_indices() {
            let cell = match ch {
                'X' | 'x' => Cell::X,
                'O' | 'o' => Cell::O,
                '.' | '-' | '_' | ' ' => Cell::Empty,
                '/' | '\n' | '\r' | '\t' => continue,
                other => {
                    return Err(GameError::ParseBoard {
                        position,
                        reason: format!("unexpected character {other:?}"),
                    })
                }
            };
            if filled == CELLS {
                return Err(GameError::ParseBoard {
                    position,
                    reason: format!("more than {CELLS} cells"),
                });
            }
            board.cells[filled / SIZE][filled % SIZE] = cell;
            filled += 1;
        }
        if filled < CELLS {
            return Err(GameError::ParseBoard {
                position: s.len(),
                reason: format!("expected {CELLS} cells, found {filled}"),
            });
        }
        Ok(board)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, row) in self.cells.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            for cell in row {
                f.write_str(match cell {
                    Cell::Empty => ".",
                    Cell::X => "X",
                    Cell::O => "O",
                })?;
            }
        }
        Ok(())
    }
}

/// What happened when the engine was handed the board after a human move.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Turn {
    pub reply: Option<Move>,
    pub outcome: Option<Outcome>,
}

/// Computer player. Holds the marker assignment for one game and its lookahead.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Engine {
    marker: Marker,
    opponent: Marker,
    depth: u8,
}

impl Engine {
    pub fn new(marker: Marker) -> Self {
        Self {
            marker,
            opponent: marker.opponent(),
            depth: DEFAULT_DEPTH,
        }
    }

    /// Engine for a game where the human plays `human`.
    pub fn against(human: Marker) -> Self {
        Self::new(human.opponent())
    }

    pub fn with_depth(mut self, depth: u8) -> Result<Self, GameError> {
        if !(1..=MAX_DEPTH).contains(&depth) {
            return Err(GameError::DepthOutOfRange(depth));
        }
        self.depth = depth;
        Ok(self)
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }

    pub fn opponent(&self) -> Marker {
        self.opponent
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Classifies a board for the human. An engine line wins over a human line
    /// when both are present. Boards without a line report `Tie`.
    pub fn outcome(&self, board: &Board) -> Outcome {
        let mut outcome = Outcome::Tie;
        if board.has_won(self.opponent) {
            outcome = Outcome::Win;
        }
        if board.has_won(self.marker) {
            outcome = Outcome::Lose;
        }
        outcome
    }

    /// Static evaluation, positive when the board favours the engine.
    pub fn score(&self, board: &Board) -> i32 {
        LINES
            .iter()
            .map(|&line| self.score_line(line.map(|(row, col)| board.cells[row][col])))
            .sum()
    }

    /// Scores one line: the first mark seen sets +/-1, each further mark of the
    /// same side multiplies by 10, and a mark of the other side kills the line.
    pub fn score_line(&self, cells: [Cell; 3]) -> i32 {
        let mut score = 0;
        for cell in cells {
            let sign = self.sign(cell);
            if sign == 0 {
                continue;
            }
            if score == 0 {
                score = sign;
            } else if score.signum() == sign {
                score *= 10;
            } else {
                return 0;
            }
        }
        score
    }

    fn sign(&self, cell: Cell) -> i32 {
        if cell == self.marker.cell() {
            1
        } else if cell == self.opponent.cell() {
            -1
        } else {
            0
        }
    }

    /// Picks the engine's next move without touching `board`.
    pub fn choose_move(&self, board: &Board) -> Result<Move, GameError> {
        let moves = board.possible_moves();
        if moves.is_empty() {
            return Err(GameError::GameOver);
        }

        if let Some(mv) = self.winning_move(board, &moves) {
            debug!(row = mv.row, col = mv.col, "taking immediate win");
            return Ok(mv);
        }

        let mut best: Option<(i32, Move)> = None;
        for mv in moves {
            let mut child = *board;
            child.place(mv, self.marker);
            let score = self.minimax(&child, self.depth - 1, self.opponent);
            // Strict improvement only: earlier moves keep ties.
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, mv));
            }
        }

        let (score, mv) = best.ok_or(GameError::GameOver)?;
        debug!(row = mv.row, col = mv.col, score, depth = self.depth, "search chose move");
        Ok(mv)
    }

    fn winning_move(&self, board: &Board, moves: &[Move]) -> Option<Move> {
        moves.iter().copied().find(|&mv| {
            let mut child = *board;
            child.place(mv, self.marker);
            child.has_won(self.marker)
        })
    }

    fn minimax(&self, board: &Board, depth: u8, to_move: Marker) -> i32 {
        let moves = board.possible_moves();
        if depth == 0 || moves.is_empty() {
            return self.score(board);
        }

        let maximizing = to_move == self.marker;
        let scores = moves.into_iter().map(|mv| {
            let mut child = *board;
            child.place(mv, to_move);
            self.minimax(&child, depth - 1, to_move.opponent())
        });
        if maximizing {
            scores.fold(i32::MIN, i32::max)
        } else {
            scores.fold(i32::MAX, i32::min)
        }
    }

    /// Chooses a move and plays it on `board`.
    pub fn make_move(&self, board: &mut Board) -> Result<Move, GameError> {
        let mv = self.choose_move(board)?;
        board.apply_move(mv, self.marker)?;
        Ok(mv)
    }

    /// Replies to the human's last move. Nothing is played on a finished board;
    /// the outcome is attached whenever the game is over afterwards.
    pub fn respond(&self, board: &mut Board) -> Result<Turn, GameError> {
        let reply = if board.is_game_over() {
            None
        } else {
            Some(self.make_move(board)?)
        };
        let outcome = if board.is_game_over() {
            Some(self.outcome(board))
        } else {
            None
        };
        Ok(Turn { reply, outcome })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub board: String,
    pub human: Marker,
    pub level: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    pub reply: Option<Move>,
    pub board: String,
    pub outcome: Option<Outcome>,
}

/// Parses the board, lets the engine answer the human and reports the result.
pub fn best_move(request: MoveRequest) -> Result<MoveResponse, GameError> {
    let engine = Engine::against(request.human).with_depth(request.level)?;
    let mut board: Board = request.board.parse()?;
    let turn = engine.respond(&mut board)?;
    if let Some(outcome) = turn.outcome {
        debug!(outcome = outcome.past_tense(), "game over\n{}", board.render());
    }
    Ok(MoveResponse {
        reply: turn.reply,
        board: board.to_string(),
        outcome: turn.outcome,
    })
}
