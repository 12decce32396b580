//! goplanes: Go board tracking and feature-plane extraction.
//!
//! Exposes the board engine, feature encoder, SGF reader, sample pipeline,
//! and C boundary for use by integration tests and the converter binary.

pub mod board;
pub mod ffi;
pub mod nn;
pub mod protocol;
pub mod samples;
