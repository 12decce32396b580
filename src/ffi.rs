//! C ABI for foreign callers.
//!
//! `goplanes_extract_features` hands out a heap buffer owned by Rust; the
//! caller must release it with `goplanes_free_features` and the same length.

use std::ptr;
use std::slice;

use tracing::warn;

use crate::board::{BoardError, Player, BOARD_AREA};
use crate::nn::encoding::extract_from_grid;

fn extract(raw: &[u8], perspective: i32) -> Result<Box<[u8]>, BoardError> {
    let player = u8::try_from(perspective)
        .ok()
        .and_then(Player::from_byte)
        .ok_or(BoardError::InvalidPlayer(perspective))?;
    Ok(extract_from_grid(raw, player)?.into_boxed_slice())
}

/// Encodes a raw `BOARD_AREA` grid (0 empty, 1 black, 2 white, raster order)
/// from `perspective_player`'s point of view.
///
/// Returns null and leaves `output_length` untouched on invalid input.
///
/// # Safety
///
/// `raw_board` must point to `BOARD_AREA` readable bytes and
/// `output_length` must be a valid, writable `i32`.
#[no_mangle]
pub unsafe extern "C" fn goplanes_extract_features(
    raw_board: *const u8,
    output_length: *mut i32,
    perspective_player: i32,
) -> *mut u8 {
    if raw_board.is_null() || output_length.is_null() {
        warn!("null pointer passed to goplanes_extract_features");
        return ptr::null_mut();
    }
    let raw = slice::from_raw_parts(raw_board, BOARD_AREA);
    match extract(raw, perspective_player) {
        Ok(features) => {
            let Ok(len) = i32::try_from(features.len()) else {
                return ptr::null_mut();
            };
            *output_length = len;
            Box::into_raw(features) as *mut u8
        }
        Err(e) => {
            warn!(error = %e, "feature extraction failed");
            ptr::null_mut()
        }
    }
}

/// Releases a buffer returned by `goplanes_extract_features`.
///
/// # Safety
///
/// `features` must come from `goplanes_extract_features` with the `length`
/// it reported, and must not be freed twice. Null is ignored.
#[no_mangle]
pub unsafe extern "C" fn goplanes_free_features(features: *mut u8, length: i32) {
    if features.is_null() || length < 0 {
        return;
    }
    let slice = ptr::slice_from_raw_parts_mut(features, length as usize);
    drop(Box::from_raw(slice));
}
