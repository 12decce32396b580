//! Game record formats.
//!
//! Parsing and serialization of SGF records into the move lists replayed by
//! the board engine.

pub mod sgf;

pub use sgf::{encode_sgf, parse_sgf, GameRecord, SgfError};
