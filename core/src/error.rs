use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
    #[error("A promotion choice is outstanding, resolve it first")]
    PromotionPending,
    #[error("No promotion choice is outstanding")]
    NoPromotionPending,
}

pub type Result<T> = core::result::Result<T, GameError>;
