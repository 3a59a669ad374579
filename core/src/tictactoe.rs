//! Tic-tac-toe against a perfect minimax opponent. The human plays `X`,
//! the engine plays `O`; with both sides searching the full tree the
//! engine never loses.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{GameError, Result};

pub const CELL_COUNT: usize = 9;

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub const fn opponent(self) -> Mark {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

pub type Cells = [Option<Mark>; CELL_COUNT];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicTacToeState {
    Active,
    Won(Mark),
    Draw,
}

impl TicTacToeState {
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Outcome of placing a mark.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The cell was occupied; nothing changed.
    Rejected,
    Placed,
    Won(Mark),
    Draw,
}

fn winner(cells: &Cells) -> Option<Mark> {
    LINES.iter().find_map(|&[a, b, c]| {
        cells[a].filter(|&mark| cells[b] == Some(mark) && cells[c] == Some(mark))
    })
}

fn is_full(cells: &Cells) -> bool {
    cells.iter().all(Option::is_some)
}

/// Minimax over the remaining tree, memoized on (position, side to move).
/// Scores are from `O`'s point of view and biased by depth so the engine
/// prefers quick wins and slow losses.
fn minimax(
    cells: &mut Cells,
    depth: i8,
    maximizing: bool,
    memo: &mut HashMap<(Cells, bool), i8>,
) -> i8 {
    if let Some(mark) = winner(cells) {
        return match mark {
            Mark::O => 10 - depth,
            Mark::X => depth - 10,
        };
    }
    if is_full(cells) {
        return 0;
    }
    if let Some(&score) = memo.get(&(*cells, maximizing)) {
        return score;
    }

    let mark = if maximizing { Mark::O } else { Mark::X };
    let mut best = if maximizing { i8::MIN } else { i8::MAX };
    for index in 0..CELL_COUNT {
        if cells[index].is_some() {
            continue;
        }
        cells[index] = Some(mark);
        let score = minimax(cells, depth + 1, !maximizing, memo);
        cells[index] = None;
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }

    memo.insert((*cells, maximizing), best);
    best
}

/// The engine's best reply for `O` in the given position, if any cell is
/// still free.
pub fn best_move(cells: &Cells) -> Option<usize> {
    let mut scratch = *cells;
    let mut memo = HashMap::new();
    let mut best: Option<(usize, i8)> = None;

    for index in 0..CELL_COUNT {
        if scratch[index].is_some() {
            continue;
        }
        scratch[index] = Some(Mark::O);
        let score = minimax(&mut scratch, 1, false, &mut memo);
        scratch[index] = None;
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TicTacToeGame {
    cells: Cells,
    turn: Mark,
    state: TicTacToeState,
}

impl Default for TicTacToeGame {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToeGame {
    pub fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
            turn: Mark::X,
            state: TicTacToeState::Active,
        }
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn turn(&self) -> Mark {
        self.turn
    }

    pub fn state(&self) -> TicTacToeState {
        self.state
    }

    /// Places the current player's mark at `index` (row-major, 0..9).
    pub fn play(&mut self, index: usize) -> Result<PlayOutcome> {
        if index >= CELL_COUNT {
            return Err(GameError::InvalidCoords);
        }
        if self.state.is_finished() {
            return Err(GameError::AlreadyEnded);
        }
        if self.cells[index].is_some() {
            return Ok(PlayOutcome::Rejected);
        }

        self.cells[index] = Some(self.turn);
        if let Some(mark) = winner(&self.cells) {
            self.state = TicTacToeState::Won(mark);
            return Ok(PlayOutcome::Won(mark));
        }
        if is_full(&self.cells) {
            self.state = TicTacToeState::Draw;
            return Ok(PlayOutcome::Draw);
        }
        self.turn = self.turn.opponent();
        Ok(PlayOutcome::Placed)
    }

    /// Lets the engine play its best move. Only valid when it is `O`'s
    /// turn in an unfinished game.
    pub fn engine_move(&mut self) -> Result<PlayOutcome> {
        if self.state.is_finished() {
            return Err(GameError::AlreadyEnded);
        }
        if self.turn != Mark::O {
            return Ok(PlayOutcome::Rejected);
        }
        match best_move(&self.cells) {
            Some(index) => {
                log::trace!("engine plays cell {index}");
                self.play(index)
            }
            None => Ok(PlayOutcome::Rejected),
        }
    }
}
