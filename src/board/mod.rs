//! Board representation and the incremental group/capture engine.
//!
//! Contains points and players, the union-find group tracker, and the board
//! state that applies moves on top of it.

pub mod error;
pub mod groups;
pub mod point;
pub mod state;

pub use error::BoardError;
pub use groups::{Group, GroupTracker, Removed};
pub use point::{Move, Player, Point, ALL_PLAYERS, BOARD_AREA, BOARD_SIZE};
pub use state::BoardState;
