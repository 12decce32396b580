//! Errors raised by the group tracker and board engine.
//!
//! Every variant is fatal for the game record being processed. Callers drop
//! the board and move on to the next record.

use super::point::{Player, Point};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("cannot place a stone on occupied point {0}")]
    Occupied(Point),

    #[error("coordinate ({x}, {y}) is off the board")]
    OutOfBounds { x: i32, y: i32 },

    #[error("no group is tracked at {0}")]
    Untracked(Point),

    #[error("a group is already tracked at {0}")]
    AlreadyTracked(Point),

    #[error("cannot merge a {a:?} group with a {b:?} group")]
    OwnerMismatch { a: Player, b: Player },

    #[error("merged group lists {0} as both a stone and a liberty")]
    NotDisjoint(Point),

    #[error("raw grid must be {expected} bytes, got {got}")]
    InvalidGridLength { expected: usize, got: usize },

    #[error("feature buffer must be {expected} bytes, got {got}")]
    InvalidTensorLength { expected: usize, got: usize },

    #[error("invalid raw cell value {value} at index {index}")]
    InvalidCell { index: usize, value: u8 },

    #[error("invalid player tag {0}")]
    InvalidPlayer(i32),
}
