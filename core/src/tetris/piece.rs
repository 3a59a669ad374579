use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use super::BOARD_WIDTH;

/// The seven tetromino kinds. Locked board cells are tagged with the kind
/// of the piece that produced them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tetromino {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl Tetromino {
    pub const ALL: [Tetromino; 7] = [
        Tetromino::I,
        Tetromino::O,
        Tetromino::T,
        Tetromino::S,
        Tetromino::Z,
        Tetromino::J,
        Tetromino::L,
    ];

    const fn cells(self) -> &'static [&'static [bool]] {
        const X: bool = true;
        const O: bool = false;
        match self {
            Tetromino::I => &[&[X, X, X, X]],
            Tetromino::O => &[&[X, X], &[X, X]],
            Tetromino::T => &[&[O, X, O], &[X, X, X]],
            Tetromino::S => &[&[O, X, X], &[X, X, O]],
            Tetromino::Z => &[&[X, X, O], &[O, X, X]],
            Tetromino::J => &[&[X, O, O], &[X, X, X]],
            Tetromino::L => &[&[O, O, X], &[X, X, X]],
        }
    }

    /// The spawn orientation as a (rows, cols) bit matrix.
    pub fn base_shape(self) -> Shape {
        let cells = self.cells();
        let rows = cells.len();
        let cols = cells[0].len();
        Array2::from_shape_fn((rows, cols), |(row, col)| cells[row][col])
    }
}

/// A piece's occupancy matrix, indexed `(row, col)`.
pub type Shape = Array2<bool>;

/// Rotates a shape 90 degrees clockwise.
pub fn rotate_cw(shape: &Shape) -> Shape {
    let (rows, cols) = shape.dim();
    Array2::from_shape_fn((cols, rows), |(row, col)| shape[(rows - 1 - col, row)])
}

/// The falling piece: its kind, current orientation, and board offset.
/// `y` may be negative while the piece still pokes above the visible board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivePiece {
    pub kind: Tetromino,
    pub shape: Shape,
    pub x: i16,
    pub y: i16,
}

impl ActivePiece {
    pub fn spawn(kind: Tetromino) -> Self {
        Self {
            kind,
            shape: kind.base_shape(),
            x: (BOARD_WIDTH / 2) as i16 - 1,
            y: 0,
        }
    }

    pub fn random(rng: &mut SmallRng) -> Self {
        let kind = Tetromino::ALL[rng.random_range(0..Tetromino::ALL.len())];
        Self::spawn(kind)
    }

    /// Board coordinates of every filled cell at the given offset.
    pub fn occupied_at<'a>(
        shape: &'a Shape,
        x: i16,
        y: i16,
    ) -> impl Iterator<Item = (i16, i16)> + 'a {
        shape
            .indexed_iter()
            .filter(|&(_, &filled)| filled)
            .map(move |((row, col), _)| (x + col as i16, y + row as i16))
    }
}
