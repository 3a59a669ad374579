use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{CellCount, Coord2, GameError, Result, ToNdIndex, neighbors};

use super::GameConfig;

/// A fixed assignment of mines to cells. Built either by a generator on the
/// first reveal or directly from coordinates in tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    mines: Array2<bool>,
    count: CellCount,
}

impl MineLayout {
    pub fn from_mine_mask(mines: Array2<bool>) -> Self {
        let count = mines
            .iter()
            .filter(|&&is_mine| is_mine)
            .count()
            .try_into()
            .unwrap();
        Self { mines, count }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mines: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(GameError::InvalidCoords);
            }
            mines[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mines))
    }

    pub fn size(&self) -> Coord2 {
        let dim = self.mines.dim();
        (dim.0.try_into().unwrap(), dim.1.try_into().unwrap())
    }

    pub fn total_cells(&self) -> CellCount {
        self.mines.len().try_into().unwrap()
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.count
    }

    pub fn mine_count(&self) -> CellCount {
        self.count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self.mines[coords.to_nd_index()]
    }

    /// Counts every cell's adjacent mines in one pass. Done exactly once,
    /// right after placement; the result never changes afterwards.
    pub fn neighbor_counts(&self) -> Array2<u8> {
        let size = self.size();
        Array2::from_shape_fn(size.to_nd_index(), |(x, y)| {
            let coords = (x as u8, y as u8);
            neighbors(coords, size)
                .filter(|&pos| self.contains_mine(pos))
                .count() as u8
        })
    }
}

/// Uniform random placement that keeps the 3x3 neighborhood of the first
/// click free of mines, so the first reveal is never a mine and always
/// opens with a zero count.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RandomMineGenerator {
    seed: u64,
    exclude: Coord2,
}

impl RandomMineGenerator {
    pub fn new(seed: u64, exclude: Coord2) -> Self {
        Self { seed, exclude }
    }

    pub fn generate(self, config: GameConfig) -> MineLayout {
        let (size_x, size_y) = config.size;
        let mut mines: Array2<bool> = Array2::default(config.size.to_nd_index());

        let excluded_cells =
            1 + neighbors(self.exclude, config.size).count() as CellCount;
        let available = config.total_cells().saturating_sub(excluded_cells);
        let target = if config.mines > available {
            log::warn!(
                "Cannot keep the start area clear, requested {} mines but only {} cells are free",
                config.mines,
                available
            );
            available
        } else {
            config.mines
        };

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut placed: CellCount = 0;
        while placed < target {
            let x = rng.random_range(0..size_x);
            let y = rng.random_range(0..size_y);

            let near_start = x.abs_diff(self.exclude.0) <= 1 && y.abs_diff(self.exclude.1) <= 1;
            if near_start || mines[(x, y).to_nd_index()] {
                continue;
            }

            mines[(x, y).to_nd_index()] = true;
            placed += 1;
        }

        log::debug!("Placed {} mines on a {}x{} board", placed, size_x, size_y);
        MineLayout::from_mine_mask(mines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_layout_has_requested_mine_count() {
        let config = GameConfig::new((9, 9), 10);
        let layout = RandomMineGenerator::new(7, (4, 4)).generate(config);
        assert_eq!(layout.mine_count(), 10);
        assert_eq!(layout.size(), (9, 9));
    }

    #[test]
    fn start_neighborhood_is_always_clear() {
        for seed in 0..20 {
            for &start in &[(0u8, 0u8), (8, 8), (4, 4), (0, 8)] {
                let config = GameConfig::new((9, 9), 10);
                let layout = RandomMineGenerator::new(seed, start).generate(config);
                assert!(!layout.contains_mine(start));
                for pos in neighbors(start, (9, 9)) {
                    assert!(!layout.contains_mine(pos), "mine at {:?} next to start {:?}", pos, start);
                }
            }
        }
    }

    #[test]
    fn mine_count_clamps_when_board_cannot_fit_exclusion() {
        let config = GameConfig::new_unchecked((3, 3), 9);
        let layout = RandomMineGenerator::new(1, (1, 1)).generate(config);
        assert_eq!(layout.mine_count(), 0);
    }

    #[test]
    fn neighbor_counts_match_adjacency() {
        let layout = MineLayout::from_mine_coords((3, 3), &[(0, 0), (2, 2)]).unwrap();
        let counts = layout.neighbor_counts();
        assert_eq!(counts[[1, 1]], 2);
        assert_eq!(counts[[0, 1]], 1);
        assert_eq!(counts[[2, 0]], 0);
    }

    #[test]
    fn same_seed_and_start_is_deterministic() {
        let config = GameConfig::new((16, 16), 40);
        let a = RandomMineGenerator::new(42, (8, 8)).generate(config);
        let b = RandomMineGenerator::new(42, (8, 8)).generate(config);
        assert_eq!(a, b);
    }
}
