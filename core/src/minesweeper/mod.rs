//! Minesweeper engine: deferred mine placement, cascading reveal, and
//! win/loss detection.
//!
//! Mines are not placed until the first reveal, which lets the generator
//! keep the clicked cell and its whole 3x3 neighborhood clear. Neighbor
//! counts are computed once at placement time and cached for the rest of
//! the game.

use chrono::prelude::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::ops::BitOr;

pub use generator::*;
pub use tile::*;

mod generator;
mod tile;

use crate::{CellCount, Coord, Coord2, GameError, Result, ToNdIndex, mult, neighbors};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub size: Coord2,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(size: Coord2, mines: CellCount) -> Self {
        Self { size, mines }
    }

    pub fn new((size_x, size_y): Coord2, mines: CellCount) -> Self {
        let size_x = size_x.clamp(1, Coord::MAX);
        let size_y = size_y.clamp(1, Coord::MAX);
        let mines = mines.clamp(1, mult(size_x, size_y));
        Self::new_unchecked((size_x, size_y), mines)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }
}

/// The three classic board sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    pub const fn config(self) -> GameConfig {
        match self {
            Self::Beginner => GameConfig::new_unchecked((9, 9), 10),
            Self::Intermediate => GameConfig::new_unchecked((16, 16), 40),
            Self::Expert => GameConfig::new_unchecked((22, 22), 99),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MinesweeperState {
    Ready,
    Active,
    Won,
    Lost,
}

impl MinesweeperState {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for MinesweeperState {
    fn default() -> Self {
        Self::Ready
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FlagOutcome {
    NoChange,
    Changed,
    /// Toggling this flag completed an exact-correspondence flag win.
    Won,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Used to merge outcomes when several cells open at once.
impl BitOr for RevealOutcome {
    type Output = RevealOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use RevealOutcome::*;
        match (self, rhs) {
            (HitMine, _) | (_, HitMine) => HitMine,
            (Won, _) | (_, Won) => Won,
            (Revealed, _) | (_, Revealed) => Revealed,
            (NoChange, NoChange) => NoChange,
        }
    }
}

/// Represents a game from start to finish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinesweeperGame {
    config: GameConfig,
    seed: u64,
    layout: Option<MineLayout>,
    counts: Option<Array2<u8>>,
    board: Array2<Tile>,
    revealed_count: CellCount,
    flag_count: CellCount,
    state: MinesweeperState,
    triggered_mine: Option<Coord2>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

impl MinesweeperGame {
    /// Starts a game with no mines placed yet; placement happens on the
    /// first reveal, away from the clicked cell.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            layout: None,
            counts: None,
            board: Array2::default(config.size.to_nd_index()),
            revealed_count: 0,
            flag_count: 0,
            state: Default::default(),
            triggered_mine: None,
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_difficulty(difficulty: Difficulty, seed: u64) -> Self {
        Self::new(difficulty.config(), seed)
    }

    /// Starts a game over a fixed layout, skipping deferred placement.
    pub fn with_layout(layout: MineLayout) -> Self {
        let config = GameConfig::new_unchecked(layout.size(), layout.mine_count());
        let counts = layout.neighbor_counts();
        let mut game = Self::new(config, 0);
        game.layout = Some(layout);
        game.counts = Some(counts);
        game
    }

    pub fn state(&self) -> MinesweeperState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn size(&self) -> Coord2 {
        self.config.size
    }

    pub fn total_mines(&self) -> CellCount {
        self.config.mines
    }

    /// How many mines have not been flagged yet.
    pub fn mines_left(&self) -> isize {
        (self.config.mines as isize) - (self.flag_count as isize)
    }

    pub fn tile_at(&self, coords: Coord2) -> Tile {
        self.board[coords.to_nd_index()]
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    /// Whether a mine sits at `coords`. Always false before the first reveal.
    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.layout
            .as_ref()
            .is_some_and(|layout| layout.contains_mine(coords))
    }

    /// How many seconds have passed since the game started, 0 if it hasn't.
    pub fn elapsed_secs(&self) -> u32 {
        if let Some(started_at) = self.started_at {
            (self.ended_at.unwrap_or_else(Utc::now) - started_at)
                .num_seconds()
                .max(0) as u32
        } else {
            0
        }
    }

    fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let (size_x, size_y) = self.config.size;
        if coords.0 < size_x && coords.1 < size_y {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(GameError::AlreadyEnded)
        } else {
            Ok(())
        }
    }

    /// Reveal a hidden cell. Revealed and flagged cells are left untouched.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.validate_coords(coords)?;
        self.check_not_finished()?;

        if !matches!(self.board[coords.to_nd_index()], Tile::Hidden) {
            return Ok(RevealOutcome::NoChange);
        }

        self.ensure_layout(coords);

        if self.has_mine_at(coords) {
            self.triggered_mine = Some(coords);
            self.end_game(false);
            return Ok(RevealOutcome::HitMine);
        }

        self.open_cell(coords);
        self.flood_fill(coords);

        if self.revealed_count == self.safe_cell_count() {
            self.end_game(true);
            Ok(RevealOutcome::Won)
        } else {
            self.mark_started();
            Ok(RevealOutcome::Revealed)
        }
    }

    /// Flag or unflag a hidden cell. A no-op on revealed cells, before the
    /// first reveal, and when the flag cap is already reached.
    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<FlagOutcome> {
        let coords = self.validate_coords(coords)?;
        self.check_not_finished()?;

        if self.state.is_ready() {
            return Ok(FlagOutcome::NoChange);
        }

        Ok(match self.board[coords.to_nd_index()] {
            Tile::Hidden => {
                if self.flag_count >= self.config.mines {
                    FlagOutcome::NoChange
                } else {
                    self.board[coords.to_nd_index()] = Tile::Flagged;
                    self.flag_count += 1;
                    if self.all_mines_exactly_flagged() {
                        self.end_game(true);
                        FlagOutcome::Won
                    } else {
                        FlagOutcome::Changed
                    }
                }
            }
            Tile::Flagged => {
                self.board[coords.to_nd_index()] = Tile::Hidden;
                self.flag_count -= 1;
                FlagOutcome::Changed
            }
            _ => FlagOutcome::NoChange,
        })
    }

    /// Places mines on the first reveal, keeping `start` and its neighbors
    /// clear, and caches the neighbor counts.
    fn ensure_layout(&mut self, start: Coord2) {
        if self.layout.is_some() {
            return;
        }
        let layout = RandomMineGenerator::new(self.seed, start).generate(self.config);
        self.counts = Some(layout.neighbor_counts());
        self.layout = Some(layout);
    }

    fn neighbor_count(&self, coords: Coord2) -> u8 {
        self.counts
            .as_ref()
            .map(|counts| counts[coords.to_nd_index()])
            .unwrap_or(0)
    }

    fn safe_cell_count(&self) -> CellCount {
        self.layout
            .as_ref()
            .map(MineLayout::safe_cell_count)
            .unwrap_or_else(|| self.config.total_cells())
    }

    fn open_cell(&mut self, coords: Coord2) {
        if matches!(self.board[coords.to_nd_index()], Tile::Flagged) {
            self.flag_count -= 1;
        }
        let count = self.neighbor_count(coords);
        self.board[coords.to_nd_index()] = Tile::Revealed(count);
        self.revealed_count += 1;
        log::debug!("Opened cell at {:?}, mine count: {}", coords, count);
    }

    /// Breadth-first expansion across the zero-count region around `start`,
    /// also opening the non-zero border. Flags inside the region are
    /// cleared; mines are never entered.
    fn flood_fill(&mut self, start: Coord2) {
        if self.neighbor_count(start) != 0 {
            return;
        }

        let size = self.config.size;
        let mut visited = HashSet::from([start]);
        let mut to_visit: VecDeque<_> = neighbors(start, size).collect();
        log::trace!(
            "Starting flood fill from {:?}, initial neighbors: {:?}",
            start,
            to_visit
        );

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            if matches!(self.board[visit_coords.to_nd_index()], Tile::Revealed(_))
                || self.has_mine_at(visit_coords)
            {
                continue;
            }

            self.open_cell(visit_coords);

            if self.neighbor_count(visit_coords) == 0 {
                to_visit.extend(
                    neighbors(visit_coords, size).filter(|pos| !visited.contains(pos)),
                );
            }
        }
    }

    /// Exact correspondence: the flag count matches the mine count and every
    /// flag actually sits on a mine.
    fn all_mines_exactly_flagged(&self) -> bool {
        let Some(layout) = &self.layout else {
            return false;
        };
        if self.flag_count != layout.mine_count() {
            return false;
        }
        let (size_x, size_y) = self.config.size;
        for x in 0..size_x {
            for y in 0..size_y {
                if matches!(self.board[(x, y).to_nd_index()], Tile::Flagged)
                    && !layout.contains_mine((x, y))
                {
                    return false;
                }
            }
        }
        true
    }

    fn mark_started(&mut self) {
        if self.state.is_ready() {
            let now = Utc::now();
            log::debug!("started at {}", now);
            self.started_at.replace(now);
            self.state = MinesweeperState::Active;
        }
    }

    fn end_game(&mut self, won: bool) {
        if self.state.is_finished() {
            return;
        }

        if self.started_at.is_none() {
            self.started_at.replace(Utc::now());
        }
        self.ended_at.replace(Utc::now());
        self.state = if won {
            MinesweeperState::Won
        } else {
            MinesweeperState::Lost
        };
        log::debug!("ended at {}, won: {}", self.ended_at.unwrap(), won);
        self.resolve_mines(won);
    }

    /// On a win, flags every remaining mine for display consistency; on a
    /// loss, uncovers all mines and marks misplaced flags.
    fn resolve_mines(&mut self, won: bool) {
        let (size_x, size_y) = self.config.size;
        for x in 0..size_x {
            for y in 0..size_y {
                let coords = (x, y);
                let tile = self.board[coords.to_nd_index()];
                let mine = self.has_mine_at(coords);
                if mine {
                    if tile == Tile::Hidden {
                        self.board[coords.to_nd_index()] = if won {
                            self.flag_count += 1;
                            Tile::Flagged
                        } else if self.triggered_mine == Some(coords) {
                            Tile::Exploded
                        } else {
                            Tile::Mine
                        };
                    }
                } else if !won && tile == Tile::Flagged {
                    self.board[coords.to_nd_index()] = Tile::WrongFlag;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: Coord2, mines: &[Coord2]) -> MineLayout {
        MineLayout::from_mine_coords(size, mines).unwrap()
    }

    #[test]
    fn first_reveal_is_never_a_mine_or_adjacent_to_one() {
        for seed in 0..10 {
            for &start in &[(0u8, 0u8), (4, 4), (8, 0), (8, 8)] {
                let mut game = MinesweeperGame::with_difficulty(Difficulty::Beginner, seed);
                let outcome = game.reveal(start).unwrap();
                assert_ne!(outcome, RevealOutcome::HitMine);
                assert!(!game.has_mine_at(start));
                for pos in neighbors(start, game.size()) {
                    assert!(!game.has_mine_at(pos));
                }
            }
        }
    }

    #[test]
    fn reveal_hits_mine_and_marks_it_exploded() {
        let mut game = MinesweeperGame::with_layout(layout((2, 2), &[(0, 0)]));

        let outcome = game.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert_eq!(game.state(), MinesweeperState::Lost);
        assert_eq!(game.triggered_mine(), Some((0, 0)));
        assert_eq!(game.tile_at((0, 0)), Tile::Exploded);
    }

    #[test]
    fn loss_uncovers_all_mines_and_marks_wrong_flags() {
        let mut game = MinesweeperGame::with_layout(layout((3, 3), &[(0, 0), (2, 2)]));

        game.reveal((1, 1)).unwrap();
        game.toggle_flag((2, 0)).unwrap();
        let outcome = game.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::HitMine);
        assert_eq!(game.tile_at((0, 0)), Tile::Exploded);
        assert_eq!(game.tile_at((2, 2)), Tile::Mine);
        assert_eq!(game.tile_at((2, 0)), Tile::WrongFlag);
    }

    #[test]
    fn flood_fill_opens_zero_region_and_its_border_only() {
        // A mine wall at x=2 splits the board; the fill must stop at the
        // numbered border and never cross it.
        let mut game =
            MinesweeperGame::with_layout(layout((5, 1), &[(2, 0)]));

        let outcome = game.reveal((0, 0)).unwrap();

        assert_eq!(outcome, RevealOutcome::Revealed);
        assert_eq!(game.tile_at((0, 0)), Tile::Revealed(0));
        assert_eq!(game.tile_at((1, 0)), Tile::Revealed(1));
        assert_eq!(game.tile_at((3, 0)), Tile::Hidden);
        assert_eq!(game.tile_at((4, 0)), Tile::Hidden);
    }

    #[test]
    fn flood_fill_clears_flags_inside_the_region() {
        let mut game = MinesweeperGame::with_layout(layout((3, 3), &[(2, 2)]));

        assert_eq!(game.reveal((1, 1)).unwrap(), RevealOutcome::Revealed);
        assert_eq!(game.toggle_flag((0, 0)).unwrap(), FlagOutcome::Changed);

        // (0, 1) has no adjacent mines, so its fill sweeps the corner flag.
        let outcome = game.reveal((0, 1)).unwrap();

        assert_eq!(outcome, RevealOutcome::Won);
        assert_eq!(game.tile_at((0, 0)), Tile::Revealed(0));
        assert_eq!(game.state(), MinesweeperState::Won);
        // The win auto-flags the remaining mine.
        assert_eq!(game.tile_at((2, 2)), Tile::Flagged);
        assert_eq!(game.mines_left(), 0);
    }

    #[test]
    fn revealing_all_safe_cells_wins() {
        let mut game = MinesweeperGame::with_layout(layout((2, 1), &[(0, 0)]));

        assert_eq!(game.reveal((1, 0)).unwrap(), RevealOutcome::Won);
        assert_eq!(game.state(), MinesweeperState::Won);
        assert_eq!(game.tile_at((0, 0)), Tile::Flagged);
    }

    #[test]
    fn flag_win_requires_exact_correspondence() {
        let mut game = MinesweeperGame::with_layout(layout((2, 2), &[(0, 0)]));

        assert_eq!(game.reveal((1, 0)).unwrap(), RevealOutcome::Revealed);

        // A flag on a safe cell reaches the cap without winning.
        assert_eq!(game.toggle_flag((1, 1)).unwrap(), FlagOutcome::Changed);
        assert_eq!(game.state(), MinesweeperState::Active);

        assert_eq!(game.toggle_flag((1, 1)).unwrap(), FlagOutcome::Changed);
        assert_eq!(game.toggle_flag((0, 0)).unwrap(), FlagOutcome::Won);
        assert_eq!(game.state(), MinesweeperState::Won);
    }

    #[test]
    fn flag_count_is_capped_at_the_mine_count() {
        let mut game = MinesweeperGame::with_layout(layout((2, 2), &[(0, 0)]));

        game.reveal((1, 0)).unwrap();
        assert_eq!(game.toggle_flag((1, 1)).unwrap(), FlagOutcome::Changed);
        assert_eq!(game.toggle_flag((0, 1)).unwrap(), FlagOutcome::NoChange);
        assert_eq!(game.mines_left(), 0);
    }

    #[test]
    fn flagging_before_the_first_reveal_is_ignored() {
        let mut game = MinesweeperGame::with_difficulty(Difficulty::Beginner, 3);
        assert_eq!(game.toggle_flag((0, 0)).unwrap(), FlagOutcome::NoChange);
        assert_eq!(game.tile_at((0, 0)), Tile::Hidden);
    }

    #[test]
    fn interactions_on_revealed_or_flagged_cells_are_ignored() {
        let mut game = MinesweeperGame::with_layout(layout((3, 1), &[(2, 0)]));

        game.reveal((1, 0)).unwrap();
        assert_eq!(game.reveal((1, 0)).unwrap(), RevealOutcome::NoChange);
        assert_eq!(game.toggle_flag((1, 0)).unwrap(), FlagOutcome::NoChange);

        game.toggle_flag((0, 0)).unwrap();
        assert_eq!(game.reveal((0, 0)).unwrap(), RevealOutcome::NoChange);
    }

    #[test]
    fn finished_game_rejects_further_moves() {
        let mut game = MinesweeperGame::with_layout(layout((2, 1), &[(0, 0)]));
        game.reveal((1, 0)).unwrap();
        assert_eq!(game.reveal((0, 0)), Err(GameError::AlreadyEnded));
        assert_eq!(game.toggle_flag((1, 0)), Err(GameError::AlreadyEnded));
    }

    #[test]
    fn out_of_bounds_coordinates_are_an_error() {
        let mut game = MinesweeperGame::with_difficulty(Difficulty::Beginner, 0);
        assert_eq!(game.reveal((9, 0)), Err(GameError::InvalidCoords));
        assert_eq!(game.toggle_flag((0, 9)), Err(GameError::InvalidCoords));
    }

    #[test]
    fn same_seed_and_first_click_yield_the_same_layout() {
        let mut a = MinesweeperGame::with_difficulty(Difficulty::Beginner, 11);
        let mut b = MinesweeperGame::with_difficulty(Difficulty::Beginner, 11);
        a.reveal((4, 4)).unwrap();
        b.reveal((4, 4)).unwrap();
        for x in 0..9 {
            for y in 0..9 {
                assert_eq!(a.has_mine_at((x, y)), b.has_mine_at((x, y)));
            }
        }
    }
}
