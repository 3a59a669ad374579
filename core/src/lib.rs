//! Rules engines for the GameKonnekt portfolio of classic board games.
//!
//! Every engine follows the same shape: an owned board snapshot, a move
//! generator that says which actions are legal, a mutator that applies one
//! action to completion, and a status evaluator that reclassifies the game
//! after each mutation. Rendering, input translation, and persistence live
//! outside this crate; the engines only consume already-validated action
//! requests and expose their state for projection.

pub use error::*;
pub use grid::*;

pub mod chess;
pub mod minesweeper;
pub mod tetris;
pub mod tictactoe;

mod error;
mod grid;
