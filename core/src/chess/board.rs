use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{GameError, Result};

use super::{Color, Piece, PieceKind};

pub const BOARD_SIZE: u8 = 8;

/// A board coordinate. Row 0 is black's home rank, row 7 white's.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub const fn in_bounds(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// Applies a (row, col) delta, returning a value only while it stays on
    /// the board.
    pub fn offset(self, dr: i8, dc: i8) -> Option<Square> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        let square = Square::new(row, col);
        square.in_bounds().then_some(square)
    }
}

/// The 8x8 piece grid. Owned exclusively by one game at a time; legality
/// simulation works on a scratch clone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    squares: Array2<Option<Piece>>,
}

impl Board {
    pub fn empty() -> Self {
        Self {
            squares: Array2::default((BOARD_SIZE as usize, BOARD_SIZE as usize)),
        }
    }

    /// The standard chess starting position.
    pub fn standard() -> Self {
        use PieceKind::*;

        let mut board = Self::empty();
        const BACK_RANK: [PieceKind; 8] = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        for (col, &kind) in BACK_RANK.iter().enumerate() {
            let col = col as u8;
            board.set(Square::new(0, col), Some(Piece::new(kind, Color::Black)));
            board.set(Square::new(1, col), Some(Piece::new(Pawn, Color::Black)));
            board.set(Square::new(6, col), Some(Piece::new(Pawn, Color::White)));
            board.set(Square::new(7, col), Some(Piece::new(kind, Color::White)));
        }

        board
    }

    pub fn validate(&self, square: Square) -> Result<Square> {
        if square.in_bounds() {
            Ok(square)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[(square.row as usize, square.col as usize)]
    }

    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[(square.row as usize, square.col as usize)] = piece;
    }

    pub fn take(&mut self, square: Square) -> Option<Piece> {
        let piece = self.get(square);
        self.set(square, None);
        piece
    }

    pub fn squares() -> impl Iterator<Item = Square> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Square::new(row, col)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Self::squares().filter_map(move |square| {
            self.get(square)
                .filter(|piece| piece.color == color)
                .map(|piece| (square, piece))
        })
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        Self::squares().find(|&square| {
            self.get(square)
                .is_some_and(|piece| piece.kind == PieceKind::King && piece.color == color)
        })
    }
}
