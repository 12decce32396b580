//! Feature encoding for move-prediction training.
//!
//! Converts a `BoardState` plus recent move history into the
//! [22, 19, 19] binary plane tensor consumed by the policy network.

pub mod encoding;

pub use encoding::{extract_from_grid, FeatureExtractor, PLANE_COUNT, TENSOR_LEN};
