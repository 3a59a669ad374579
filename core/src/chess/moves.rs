use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Board, Color, Piece, PieceKind, Square};

bitflags! {
    /// Annotations on a recorded move.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MoveFlags: u8 {
        const PROMOTION = 1;
        const CASTLING = 1 << 1;
        const EN_PASSANT = 1 << 2;
    }
}

/// A completed move as recorded in the game history. The captured piece, if
/// any, is kept for score display and replay.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub captured: Option<Piece>,
    pub flags: MoveFlags,
}

/// Destination squares of one piece. A queen in an open center tops out at
/// 27 targets.
pub type MoveList = SmallVec<[Square; 28]>;

const ROOK_DIRS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];
const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Movement-pattern destinations for the piece at `from`, ignoring whether
/// the mover's own king ends up in check. Castling eligibility and the
/// en-passant window (via `last_double_step`) are included.
pub(crate) fn pseudo_moves(
    board: &Board,
    from: Square,
    last_double_step: Option<Square>,
) -> MoveList {
    let mut moves = MoveList::new();
    let Some(piece) = board.get(from) else {
        return moves;
    };

    match piece.kind {
        PieceKind::Pawn => pawn_moves(board, from, piece, last_double_step, &mut moves),
        PieceKind::Rook => ray_moves(board, from, piece.color, &ROOK_DIRS, &mut moves),
        PieceKind::Bishop => ray_moves(board, from, piece.color, &BISHOP_DIRS, &mut moves),
        PieceKind::Queen => {
            ray_moves(board, from, piece.color, &ROOK_DIRS, &mut moves);
            ray_moves(board, from, piece.color, &BISHOP_DIRS, &mut moves);
        }
        PieceKind::Knight => leap_moves(board, from, piece.color, &KNIGHT_OFFSETS, &mut moves),
        PieceKind::King => {
            leap_moves(board, from, piece.color, &KING_OFFSETS, &mut moves);
            castling_moves(board, from, piece, &mut moves);
        }
    }

    moves
}

/// Squares the piece at `from` covers, for attack tests. Unlike
/// [`pseudo_moves`] a pawn covers its capture diagonals whether or not they
/// are occupied, and quiet pawn pushes, castling, and en passant are
/// excluded since none of them can ever take a defended square.
pub(crate) fn attack_squares(board: &Board, from: Square) -> MoveList {
    let mut moves = MoveList::new();
    let Some(piece) = board.get(from) else {
        return moves;
    };

    match piece.kind {
        PieceKind::Pawn => {
            for dc in [-1, 1] {
                if let Some(target) = from.offset(piece.color.forward(), dc) {
                    moves.push(target);
                }
            }
        }
        PieceKind::Rook => ray_moves(board, from, piece.color, &ROOK_DIRS, &mut moves),
        PieceKind::Bishop => ray_moves(board, from, piece.color, &BISHOP_DIRS, &mut moves),
        PieceKind::Queen => {
            ray_moves(board, from, piece.color, &ROOK_DIRS, &mut moves);
            ray_moves(board, from, piece.color, &BISHOP_DIRS, &mut moves);
        }
        PieceKind::Knight => leap_moves(board, from, piece.color, &KNIGHT_OFFSETS, &mut moves),
        PieceKind::King => leap_moves(board, from, piece.color, &KING_OFFSETS, &mut moves),
    }

    moves
}

/// Whether any piece of `by` covers `target`. Deliberately built on
/// pseudo-legal coverage so the attacked/in-check questions never recurse
/// into legality filtering.
pub(crate) fn is_square_attacked(board: &Board, target: Square, by: Color) -> bool {
    board
        .pieces_of(by)
        .any(|(square, _)| attack_squares(board, square).contains(&target))
}

pub(crate) fn is_in_check(board: &Board, color: Color) -> bool {
    board
        .find_king(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opponent()))
}

fn pawn_moves(
    board: &Board,
    from: Square,
    piece: Piece,
    last_double_step: Option<Square>,
    moves: &mut MoveList,
) {
    let dir = piece.color.forward();

    // single and double push
    if let Some(ahead) = from.offset(dir, 0) {
        if board.get(ahead).is_none() {
            moves.push(ahead);
            if from.row == piece.color.pawn_start_row() {
                if let Some(two_ahead) = from.offset(2 * dir, 0) {
                    if board.get(two_ahead).is_none() {
                        moves.push(two_ahead);
                    }
                }
            }
        }
    }

    // diagonal captures, including the en-passant window
    for dc in [-1, 1] {
        let Some(target) = from.offset(dir, dc) else {
            continue;
        };
        match board.get(target) {
            Some(other) if other.color != piece.color => moves.push(target),
            Some(_) => {}
            None => {
                let Some(victim_square) = from.offset(0, dc) else {
                    continue;
                };
                if last_double_step == Some(victim_square)
                    && board.get(victim_square).is_some_and(|victim| {
                        victim.kind == PieceKind::Pawn && victim.color != piece.color
                    })
                {
                    moves.push(target);
                }
            }
        }
    }
}

fn ray_moves(
    board: &Board,
    from: Square,
    color: Color,
    dirs: &[(i8, i8)],
    moves: &mut MoveList,
) {
    for &(dr, dc) in dirs {
        let mut current = from;
        while let Some(next) = current.offset(dr, dc) {
            match board.get(next) {
                None => {
                    moves.push(next);
                    current = next;
                }
                Some(other) => {
                    if other.color != color {
                        moves.push(next);
                    }
                    break;
                }
            }
        }
    }
}

fn leap_moves(
    board: &Board,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    moves: &mut MoveList,
) {
    for &(dr, dc) in offsets {
        let Some(target) = from.offset(dr, dc) else {
            continue;
        };
        if board.get(target).is_none_or(|other| other.color != color) {
            moves.push(target);
        }
    }
}

/// King-side and queen-side castling: neither the king nor the relevant
/// rook has moved, the squares between are empty, the king is not in check,
/// and the squares the king transits are not covered by the opponent.
fn castling_moves(board: &Board, from: Square, piece: Piece, moves: &mut MoveList) {
    if piece.has_moved || is_in_check(board, piece.color) {
        return;
    }
    let row = from.row;
    let enemy = piece.color.opponent();

    let unmoved_rook_at = |col: u8| {
        board.get(Square::new(row, col)).is_some_and(|rook| {
            rook.kind == PieceKind::Rook && rook.color == piece.color && !rook.has_moved
        })
    };
    let empty = |col: u8| board.get(Square::new(row, col)).is_none();
    let safe = |col: u8| !is_square_attacked(board, Square::new(row, col), enemy);

    // king side
    if unmoved_rook_at(7) && empty(5) && empty(6) && safe(5) && safe(6) {
        moves.push(Square::new(row, 6));
    }

    // queen side
    if unmoved_rook_at(0) && empty(1) && empty(2) && empty(3) && safe(2) && safe(3) {
        moves.push(Square::new(row, 2));
    }
}
