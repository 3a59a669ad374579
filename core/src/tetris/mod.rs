//! Tetris engine: active-piece lifecycle, collision detection, locking,
//! and line clearing.
//!
//! A single predicate, [`TetrisGame::is_valid_position`], backs movement,
//! rotation, and gravity. A rejected downward shift is a landing event and
//! locks the piece; every other rejected action is a plain no-op.

use core::mem;
use core::time::Duration;
use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

pub use piece::*;

mod piece;

use crate::{GameError, Result};

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// Points for clearing 0..=4 lines at once, multiplied by the level.
const LINE_POINTS: [u32; 5] = [0, 40, 100, 300, 1200];

/// Horizontal offsets tried, in order, when a rotation is blocked.
const WALL_KICKS: [i16; 4] = [1, -1, 2, -2];

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TetrisState {
    Running,
    Paused,
    Over,
}

impl TetrisState {
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Over)
    }
}

/// What happened to a locked piece: lines removed, points awarded (already
/// multiplied by the level in effect when the lines cleared), and whether
/// the replacement piece could not spawn.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LockSummary {
    pub lines_cleared: u8,
    pub points: u32,
    pub game_over: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShiftOutcome {
    Moved,
    Rejected,
    Locked(LockSummary),
}

impl ShiftOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// Serializable part of a game: the locked grid and the counters. The
/// falling pieces are not part of the snapshot; resuming spawns fresh ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TetrisSnapshot {
    pub board: Array2<Option<Tetromino>>,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

#[derive(Clone, Debug)]
pub struct TetrisGame {
    board: Array2<Option<Tetromino>>,
    active: ActivePiece,
    next: ActivePiece,
    score: u32,
    level: u32,
    lines: u32,
    state: TetrisState,
    rng: SmallRng,
}

impl TetrisGame {
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let active = ActivePiece::random(&mut rng);
        let next = ActivePiece::random(&mut rng);
        Self {
            board: Array2::default((BOARD_HEIGHT, BOARD_WIDTH)),
            active,
            next,
            score: 0,
            level: 1,
            lines: 0,
            state: TetrisState::Running,
            rng,
        }
    }

    /// Resumes a previously saved game with fresh falling pieces.
    pub fn from_snapshot(snapshot: TetrisSnapshot, seed: u64) -> Result<Self> {
        if snapshot.board.dim() != (BOARD_HEIGHT, BOARD_WIDTH) {
            return Err(GameError::InvalidBoardShape);
        }
        let mut game = Self::new(seed);
        game.board = snapshot.board;
        game.score = snapshot.score;
        game.level = snapshot.level.max(1);
        game.lines = snapshot.lines;
        Ok(game)
    }

    pub fn snapshot(&self) -> TetrisSnapshot {
        TetrisSnapshot {
            board: self.board.clone(),
            score: self.score,
            level: self.level,
            lines: self.lines,
        }
    }

    pub fn state(&self) -> TetrisState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn active(&self) -> &ActivePiece {
        &self.active
    }

    pub fn next_kind(&self) -> Tetromino {
        self.next.kind
    }

    pub fn cell_at(&self, x: usize, y: usize) -> Option<Tetromino> {
        self.board[(y, x)]
    }

    /// The gravity tick interval for the current level. Timing policy only;
    /// the caller owns the timer.
    pub fn gravity_interval(&self) -> Duration {
        let millis = 800u64
            .saturating_sub((self.level as u64 - 1) * 70)
            .max(100);
        Duration::from_millis(millis)
    }

    /// Checks that every filled cell of `shape` placed at `(x, y)` is inside
    /// the horizontal bounds, above the floor, and over empty board cells.
    /// Cells above the visible board (negative y) are allowed.
    pub fn is_valid_position(&self, shape: &Shape, x: i16, y: i16) -> bool {
        ActivePiece::occupied_at(shape, x, y).all(|(bx, by)| {
            if bx < 0 || bx >= BOARD_WIDTH as i16 || by >= BOARD_HEIGHT as i16 {
                return false;
            }
            by < 0 || self.board[(by as usize, bx as usize)].is_none()
        })
    }

    /// Translates the active piece. A rejected downward shift means the
    /// piece has landed and locks it in place.
    pub fn shift(&mut self, dx: i16, dy: i16) -> Result<ShiftOutcome> {
        self.check_running()?;
        if matches!(self.state, TetrisState::Paused) {
            return Ok(ShiftOutcome::Rejected);
        }

        let new_x = self.active.x + dx;
        let new_y = self.active.y + dy;

        if self.is_valid_position(&self.active.shape, new_x, new_y) {
            self.active.x = new_x;
            self.active.y = new_y;
            Ok(ShiftOutcome::Moved)
        } else if dy > 0 {
            Ok(ShiftOutcome::Locked(self.lock_active()))
        } else {
            Ok(ShiftOutcome::Rejected)
        }
    }

    /// One gravity step.
    pub fn tick(&mut self) -> Result<ShiftOutcome> {
        self.shift(0, 1)
    }

    /// Rotates the active piece 90 degrees clockwise, trying the fixed wall
    /// kick offsets when the turned shape does not fit in place.
    pub fn rotate(&mut self) -> Result<ShiftOutcome> {
        self.check_running()?;
        if matches!(self.state, TetrisState::Paused) {
            return Ok(ShiftOutcome::Rejected);
        }

        let rotated = rotate_cw(&self.active.shape);

        if self.is_valid_position(&rotated, self.active.x, self.active.y) {
            self.active.shape = rotated;
            return Ok(ShiftOutcome::Moved);
        }

        for kick in WALL_KICKS {
            if self.is_valid_position(&rotated, self.active.x + kick, self.active.y) {
                self.active.shape = rotated;
                self.active.x += kick;
                return Ok(ShiftOutcome::Moved);
            }
        }

        Ok(ShiftOutcome::Rejected)
    }

    /// Drops the active piece to its resting position and locks immediately.
    pub fn hard_drop(&mut self) -> Result<ShiftOutcome> {
        self.check_running()?;
        if matches!(self.state, TetrisState::Paused) {
            return Ok(ShiftOutcome::Rejected);
        }

        self.active.y = self.drop_y();
        Ok(ShiftOutcome::Locked(self.lock_active()))
    }

    /// The y the active piece would rest at if dropped now. Also used by
    /// renderers for the landing preview.
    pub fn drop_y(&self) -> i16 {
        let mut y = self.active.y;
        while self.is_valid_position(&self.active.shape, self.active.x, y + 1) {
            y += 1;
        }
        y
    }

    /// Stops gravity and input from reaching the mutator; the in-flight
    /// piece is preserved verbatim.
    pub fn pause(&mut self) {
        if matches!(self.state, TetrisState::Running) {
            self.state = TetrisState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if matches!(self.state, TetrisState::Paused) {
            self.state = TetrisState::Running;
        }
    }

    fn check_running(&self) -> Result<()> {
        if self.state.is_over() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }

    /// Writes the active piece into the grid, clears full rows, updates the
    /// counters, and promotes the queued piece.
    fn lock_active(&mut self) -> LockSummary {
        let piece = &self.active;
        for (bx, by) in ActivePiece::occupied_at(&piece.shape, piece.x, piece.y) {
            if by >= 0 {
                self.board[(by as usize, bx as usize)] = Some(piece.kind);
            }
        }

        let lines_cleared = self.clear_full_rows();
        let points = LINE_POINTS[lines_cleared as usize] * self.level;
        self.score += points;
        self.lines += lines_cleared as u32;
        self.level = self.lines / 10 + 1;
        if lines_cleared > 0 {
            log::debug!(
                "Cleared {} lines, score {}, level {}",
                lines_cleared,
                self.score,
                self.level
            );
        }

        let promoted = mem::replace(&mut self.next, ActivePiece::random(&mut self.rng));
        let game_over =
            !self.is_valid_position(&promoted.shape, promoted.x, promoted.y);
        self.active = promoted;

        if game_over {
            self.state = TetrisState::Over;
            log::debug!("Spawn position blocked, game over at score {}", self.score);
        }

        LockSummary {
            lines_cleared,
            points,
            game_over,
        }
    }

    /// Removes every full row, shifting the rows above it down and leaving
    /// an empty row at the top. Returns how many rows were removed.
    fn clear_full_rows(&mut self) -> u8 {
        let mut cleared = 0u8;
        let mut y = BOARD_HEIGHT;
        while y > 0 {
            y -= 1;
            let full = (0..BOARD_WIDTH).all(|x| self.board[(y, x)].is_some());
            if !full {
                continue;
            }

            for yy in (1..=y).rev() {
                for x in 0..BOARD_WIDTH {
                    self.board[(yy, x)] = self.board[(yy - 1, x)];
                }
            }
            for x in 0..BOARD_WIDTH {
                self.board[(0, x)] = None;
            }
            cleared += 1;
            // the shifted-down row lands at the same y, recheck it
            y += 1;
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> TetrisGame {
        TetrisGame::new(1)
    }

    fn set_active(game: &mut TetrisGame, kind: Tetromino, x: i16, y: i16) {
        let mut piece = ActivePiece::spawn(kind);
        piece.x = x;
        piece.y = y;
        game.active = piece;
    }

    fn fill_row(game: &mut TetrisGame, y: usize, skip: &[usize]) {
        for x in 0..BOARD_WIDTH {
            if !skip.contains(&x) {
                game.board[(y, x)] = Some(Tetromino::O);
            }
        }
    }

    fn assert_active_inside_bounds(game: &TetrisGame) {
        let piece = game.active();
        for (bx, by) in ActivePiece::occupied_at(&piece.shape, piece.x, piece.y) {
            assert!((0..BOARD_WIDTH as i16).contains(&bx));
            assert!(by < BOARD_HEIGHT as i16);
            if by >= 0 {
                assert!(game.cell_at(bx as usize, by as usize).is_none());
            }
        }
    }

    #[test]
    fn completing_a_row_clears_it_and_scores() {
        let mut g = game();
        fill_row(&mut g, 19, &[3, 4, 5, 6]);
        g.board[(18, 0)] = Some(Tetromino::T);
        set_active(&mut g, Tetromino::I, 3, 0);

        let outcome = g.hard_drop().unwrap();

        let ShiftOutcome::Locked(summary) = outcome else {
            panic!("hard drop must lock");
        };
        assert_eq!(summary.lines_cleared, 1);
        assert_eq!(summary.points, 40);
        assert!(!summary.game_over);
        assert_eq!(g.score(), 40);
        assert_eq!(g.lines(), 1);
        // the marker above the cleared row shifted down
        assert_eq!(g.cell_at(0, 19), Some(Tetromino::T));
        assert!((0..BOARD_WIDTH).all(|x| g.cell_at(x, 0).is_none()));
        assert!((1..BOARD_WIDTH).all(|x| g.cell_at(x, 19).is_none()));
    }

    #[test]
    fn double_clear_uses_the_score_table() {
        let mut g = game();
        fill_row(&mut g, 19, &[4, 5]);
        fill_row(&mut g, 18, &[4, 5]);
        set_active(&mut g, Tetromino::O, 4, 0);

        let ShiftOutcome::Locked(summary) = g.hard_drop().unwrap() else {
            panic!("hard drop must lock");
        };

        assert_eq!(summary.lines_cleared, 2);
        assert_eq!(summary.points, 100);
        assert_eq!(g.score(), 100);
        assert_eq!(g.lines(), 2);
    }

    #[test]
    fn points_scale_with_the_level_in_effect() {
        let mut g = game();
        g.level = 3;
        fill_row(&mut g, 19, &[4, 5, 6, 7]);
        set_active(&mut g, Tetromino::I, 4, 0);

        let ShiftOutcome::Locked(summary) = g.hard_drop().unwrap() else {
            panic!("hard drop must lock");
        };
        assert_eq!(summary.points, 120);
    }

    #[test]
    fn level_advances_every_ten_lines() {
        let mut g = game();
        g.lines = 9;
        fill_row(&mut g, 19, &[4, 5, 6, 7]);
        set_active(&mut g, Tetromino::I, 4, 0);

        g.hard_drop().unwrap();

        assert_eq!(g.lines(), 10);
        assert_eq!(g.level(), 2);
    }

    #[test]
    fn rejected_downward_shift_locks_the_piece() {
        let mut g = game();
        set_active(&mut g, Tetromino::O, 0, 18);

        let outcome = g.shift(0, 1).unwrap();

        assert!(matches!(outcome, ShiftOutcome::Locked(_)));
        assert_eq!(g.cell_at(0, 18), Some(Tetromino::O));
        assert_eq!(g.cell_at(1, 19), Some(Tetromino::O));
    }

    #[test]
    fn sideways_shift_into_a_wall_is_a_plain_rejection() {
        let mut g = game();
        set_active(&mut g, Tetromino::O, 0, 5);

        assert_eq!(g.shift(-1, 0).unwrap(), ShiftOutcome::Rejected);
        assert_eq!(g.active().x, 0);
        assert_eq!(g.active().y, 5);
    }

    #[test]
    fn rotation_against_the_wall_kicks_inward() {
        let mut g = game();
        // vertical I near the right wall; the turned shape needs a
        // two-cell kick to fit
        set_active(&mut g, Tetromino::I, 8, 5);
        g.active.shape = rotate_cw(&g.active.shape);
        assert_eq!(g.active.shape.dim(), (4, 1));

        let outcome = g.rotate().unwrap();

        assert_eq!(outcome, ShiftOutcome::Moved);
        assert_eq!(g.active().shape.dim(), (1, 4));
        assert_eq!(g.active().x, 6);
        assert_active_inside_bounds(&g);
    }

    #[test]
    fn blocked_rotation_is_abandoned_without_state_change() {
        let mut g = game();
        set_active(&mut g, Tetromino::I, 5, 16);
        g.active.shape = rotate_cw(&g.active.shape);
        // wall the whole row the turned piece would occupy, except the
        // column the piece already stands in
        fill_row(&mut g, 16, &[5]);

        let outcome = g.rotate().unwrap();

        assert_eq!(outcome, ShiftOutcome::Rejected);
        assert_eq!(g.active().shape.dim(), (4, 1));
        assert_eq!(g.active().x, 5);
    }

    #[test]
    fn moves_never_leave_the_piece_overlapping_or_outside() {
        let mut g = game();
        fill_row(&mut g, 19, &[0]);
        set_active(&mut g, Tetromino::T, 4, 0);

        for _ in 0..30 {
            g.shift(-1, 0).unwrap();
            g.rotate().unwrap();
            if matches!(g.shift(0, 1).unwrap(), ShiftOutcome::Locked(_)) {
                break;
            }
            assert_active_inside_bounds(&g);
        }
    }

    #[test]
    fn hard_drop_rests_on_the_stack() {
        let mut g = game();
        fill_row(&mut g, 19, &[0]);
        set_active(&mut g, Tetromino::O, 4, 0);

        g.hard_drop().unwrap();

        assert_eq!(g.cell_at(4, 18), Some(Tetromino::O));
        assert_eq!(g.cell_at(5, 17), Some(Tetromino::O));
    }

    #[test]
    fn blocked_spawn_ends_the_game() {
        let mut g = game();
        // wall across the spawn rows, leaving room for the current piece
        for y in 0..3 {
            fill_row(&mut g, y, &[0, 1]);
        }
        set_active(&mut g, Tetromino::O, 0, 17);

        let ShiftOutcome::Locked(summary) = g.hard_drop().unwrap() else {
            panic!("hard drop must lock");
        };

        assert!(summary.game_over);
        assert!(g.state().is_over());
        assert_eq!(g.shift(0, 1), Err(GameError::AlreadyEnded));
        assert_eq!(g.rotate(), Err(GameError::AlreadyEnded));
    }

    #[test]
    fn pause_preserves_the_piece_and_rejects_input() {
        let mut g = game();
        set_active(&mut g, Tetromino::T, 4, 5);
        g.pause();

        assert_eq!(g.shift(0, 1).unwrap(), ShiftOutcome::Rejected);
        assert_eq!(g.rotate().unwrap(), ShiftOutcome::Rejected);
        assert_eq!(g.hard_drop().unwrap(), ShiftOutcome::Rejected);
        assert_eq!(g.active().x, 4);
        assert_eq!(g.active().y, 5);

        g.resume();
        assert_eq!(g.shift(0, 1).unwrap(), ShiftOutcome::Moved);
    }

    #[test]
    fn gravity_speeds_up_with_level_down_to_the_floor() {
        let mut g = game();
        assert_eq!(g.gravity_interval(), Duration::from_millis(800));
        g.level = 5;
        assert_eq!(g.gravity_interval(), Duration::from_millis(520));
        g.level = 11;
        assert_eq!(g.gravity_interval(), Duration::from_millis(100));
        g.level = 40;
        assert_eq!(g.gravity_interval(), Duration::from_millis(100));
    }

    #[test]
    fn snapshot_round_trips_board_and_counters() {
        let mut g = game();
        fill_row(&mut g, 19, &[2]);
        g.score = 460;
        g.level = 2;
        g.lines = 12;

        let snapshot = g.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: TetrisSnapshot = serde_json::from_str(&json).unwrap();
        let resumed = TetrisGame::from_snapshot(restored, 9).unwrap();

        assert_eq!(resumed.snapshot(), snapshot);
        assert_eq!(resumed.score(), 460);
        assert_eq!(resumed.level(), 2);
        assert_eq!(resumed.lines(), 12);
    }

    #[test]
    fn snapshot_with_wrong_dimensions_is_rejected() {
        let snapshot = TetrisSnapshot {
            board: Array2::default((5, 5)),
            score: 0,
            level: 1,
            lines: 0,
        };
        assert_eq!(
            TetrisGame::from_snapshot(snapshot, 0).unwrap_err(),
            GameError::InvalidBoardShape
        );
    }
}
