use serde::{Deserialize, Serialize};

/// Player-visible state of a single board cell.
///
/// `Mine`, `Exploded`, and `WrongFlag` only appear once the game has ended;
/// during play a cell is `Hidden`, `Flagged`, or `Revealed`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Tile {
    Hidden,
    Flagged,
    Revealed(u8),
    /// An unflagged mine shown after a loss.
    Mine,
    /// The mine the player stepped on.
    Exploded,
    /// A flag that turned out to sit on a safe cell, shown after a loss.
    WrongFlag,
}

impl Tile {
    pub const fn is_unrevealed(self) -> bool {
        matches!(self, Self::Hidden | Self::Flagged)
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::Hidden
    }
}
