//! Two-player chess with full legality checking: pinned pieces cannot
//! expose their king, castling transit squares must be safe, en passant is
//! only open for one ply, and promotion suspends the turn until a piece is
//! chosen.

mod board;
mod moves;
mod piece;

pub use board::*;
pub use moves::*;
pub use piece::*;

use serde::{Deserialize, Serialize};

use crate::{GameError, Result};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[default]
    Active,
    Check,
    Checkmate,
    Stalemate,
}

impl GameStatus {
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate)
    }
}

/// Result of [`ChessGame::apply_move`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MoveOutcome {
    /// The move is not legal in the current position; nothing changed.
    Rejected,
    /// The move was played and recorded.
    Played(Move),
    /// A pawn reached the last rank; [`ChessGame::promote`] must be called
    /// before play continues.
    PromotionPending(Square),
}

/// A pawn move held open until the replacement piece is chosen.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
struct PendingPromotion {
    from: Square,
    to: Square,
    captured: Option<Piece>,
    flags: MoveFlags,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChessGame {
    board: Board,
    turn: Color,
    status: GameStatus,
    history: Vec<Move>,
    /// Destination of the most recent two-square pawn push, if the last
    /// move was one. This is exactly the en-passant victim square.
    last_double_step: Option<Square>,
    pending_promotion: Option<PendingPromotion>,
}

impl Default for ChessGame {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessGame {
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            turn: Color::White,
            status: GameStatus::Active,
            history: Vec::new(),
            last_double_step: None,
            pending_promotion: None,
        }
    }

    /// Starts a game from an arbitrary position. The status is evaluated
    /// immediately, so a position with no legal moves starts already over.
    pub fn from_board(board: Board, turn: Color) -> Self {
        let mut game = Self {
            board,
            turn,
            status: GameStatus::Active,
            history: Vec::new(),
            last_double_step: None,
            pending_promotion: None,
        };
        game.status = game.evaluate_status(turn);
        game
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn promotion_pending(&self) -> Option<Square> {
        self.pending_promotion.map(|pending| pending.to)
    }

    /// Every legal destination for the piece at `from`: its movement
    /// pattern minus anything that would leave the mover's own king in
    /// check. Empty when the square is empty or holds the opponent.
    pub fn legal_moves(&self, from: Square) -> MoveList {
        let Some(piece) = self.board.get(from) else {
            return MoveList::new();
        };
        if piece.color != self.turn {
            return MoveList::new();
        }
        self.legal_moves_for(&self.board, from, piece.color)
    }

    /// Attempts to move the piece at `from` to `to`.
    ///
    /// Moving in a finished game or while a promotion is outstanding is an
    /// error; a merely illegal move is reported as
    /// [`MoveOutcome::Rejected`] with the position untouched.
    pub fn apply_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome> {
        self.board.validate(from)?;
        self.board.validate(to)?;
        if self.status.is_over() {
            return Err(GameError::AlreadyEnded);
        }
        if self.pending_promotion.is_some() {
            return Err(GameError::PromotionPending);
        }

        let Some(piece) = self.board.get(from) else {
            return Ok(MoveOutcome::Rejected);
        };
        if piece.color != self.turn || !self.legal_moves(from).contains(&to) {
            return Ok(MoveOutcome::Rejected);
        }

        let mut flags = MoveFlags::empty();
        let mut captured = self.board.get(to);

        if piece.kind == PieceKind::King && to.col.abs_diff(from.col) == 2 {
            flags |= MoveFlags::CASTLING;
            self.relocate_castling_rook(from.row, to.col);
        }

        // en passant: a pawn landing on an empty square in another column
        // captures the pawn it passed
        if piece.kind == PieceKind::Pawn && captured.is_none() && from.col != to.col {
            flags |= MoveFlags::EN_PASSANT;
            captured = self.board.take(Square::new(from.row, to.col));
        }

        let mut moved = piece;
        moved.has_moved = true;
        self.board.take(from);
        self.board.set(to, Some(moved));

        if piece.kind == PieceKind::Pawn && to.row == piece.color.promotion_row() {
            flags |= MoveFlags::PROMOTION;
            self.pending_promotion = Some(PendingPromotion {
                from,
                to,
                captured,
                flags,
            });
            log::debug!("promotion pending at {to:?}");
            return Ok(MoveOutcome::PromotionPending(to));
        }

        self.last_double_step = (piece.kind == PieceKind::Pawn
            && to.row.abs_diff(from.row) == 2)
            .then_some(to);

        let played = self.finish_move(Move {
            from,
            to,
            captured,
            flags,
        });
        Ok(MoveOutcome::Played(played))
    }

    /// Resolves an outstanding promotion and completes the suspended move.
    pub fn promote(&mut self, kind: PromotionKind) -> Result<Move> {
        let pending = self
            .pending_promotion
            .take()
            .ok_or(GameError::NoPromotionPending)?;

        let mut promoted = Piece::new(kind.into(), self.turn);
        promoted.has_moved = true;
        self.board.set(pending.to, Some(promoted));
        self.last_double_step = None;

        Ok(self.finish_move(Move {
            from: pending.from,
            to: pending.to,
            captured: pending.captured,
            flags: pending.flags,
        }))
    }

    fn finish_move(&mut self, played: Move) -> Move {
        self.history.push(played);
        self.turn = self.turn.opponent();
        self.status = self.evaluate_status(self.turn);
        log::debug!(
            "{:?} to move, status {:?} after {:?}",
            self.turn,
            self.status,
            played
        );
        played
    }

    /// Moves the rook past the king after a castling king move to `to_col`.
    fn relocate_castling_rook(&mut self, row: u8, to_col: u8) {
        let (rook_from, rook_to) = if to_col == 6 {
            (Square::new(row, 7), Square::new(row, 5))
        } else {
            (Square::new(row, 0), Square::new(row, 3))
        };
        if let Some(mut rook) = self.board.take(rook_from) {
            rook.has_moved = true;
            self.board.set(rook_to, Some(rook));
        }
    }

    fn legal_moves_for(&self, board: &Board, from: Square, color: Color) -> MoveList {
        pseudo_moves(board, from, self.last_double_step)
            .into_iter()
            .filter(|&to| !self.leaves_king_in_check(board, from, to, color))
            .collect()
    }

    /// Plays `from -> to` on a scratch board and reports whether `color`'s
    /// king ends up attacked.
    fn leaves_king_in_check(&self, board: &Board, from: Square, to: Square, color: Color) -> bool {
        let mut scratch = board.clone();
        let piece = scratch.take(from);
        if self.last_double_step == Some(Square::new(from.row, to.col))
            && piece.is_some_and(|piece| piece.kind == PieceKind::Pawn)
            && scratch.get(to).is_none()
            && from.col != to.col
        {
            scratch.take(Square::new(from.row, to.col));
        }
        scratch.set(to, piece);
        is_in_check(&scratch, color)
    }

    /// Check, checkmate, or stalemate for the side now to move.
    fn evaluate_status(&self, color: Color) -> GameStatus {
        let in_check = is_in_check(&self.board, color);
        let any_move = self
            .board
            .pieces_of(color)
            .any(|(from, _)| !self.legal_moves_for(&self.board, from, color).is_empty());

        match (in_check, any_move) {
            (false, true) => GameStatus::Active,
            (true, true) => GameStatus::Check,
            (true, false) => GameStatus::Checkmate,
            (false, false) => GameStatus::Stalemate,
        }
    }
}
