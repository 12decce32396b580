//! Board state -> binary feature planes for move-prediction training.
//!
//! Produces a `[PLANE_COUNT, 19, 19]` u8 tensor (one byte per cell, 0 or 1),
//! flattened plane-major with `x + y * 19` inside each plane. The plane order
//! is the wire format shared with whatever consumes the samples:
//!
//!   [0]      ones (constant)
//!   [1]      empty point
//!   [2]      perspective player's stone
//!   [3]      opponent's stone
//!   [4:12]   move played k plies ago, k = 0..7
//!   [12:16]  liberties of the stone's group: 1, 2, 3, 4+
//!   [16:19]  perspective player would capture 1, 2, 3+ stones here
//!   [19:22]  opponent would capture 1, 2, 3+ stones here

use std::collections::VecDeque;

use crate::board::{BoardError, BoardState, Player, Point, BOARD_AREA};

/// Number of past plies encoded as history planes.
pub const HISTORY_DEPTH: usize = 8;

/// Liberty counts at or above this share the last liberty plane.
pub const MAX_LIBERTY_BUCKET: usize = 4;

/// Capture sizes at or above this share the last capture plane.
pub const MAX_CAPTURE_BUCKET: usize = 3;

/// Feature plane offsets.
pub const PLANE_ONES: usize = 0;
pub const PLANE_EMPTY: usize = 1;
pub const PLANE_OWN_STONES: usize = 2;
pub const PLANE_OPPONENT_STONES: usize = 3;
pub const PLANE_HISTORY: usize = 4;
pub const PLANE_LIBERTIES: usize = PLANE_HISTORY + HISTORY_DEPTH;
pub const PLANE_OWN_CAPTURES: usize = PLANE_LIBERTIES + MAX_LIBERTY_BUCKET;
pub const PLANE_OPPONENT_CAPTURES: usize = PLANE_OWN_CAPTURES + MAX_CAPTURE_BUCKET;

/// Total number of planes.
pub const PLANE_COUNT: usize = PLANE_OPPONENT_CAPTURES + MAX_CAPTURE_BUCKET;

/// Byte length of one encoded tensor.
pub const TENSOR_LEN: usize = PLANE_COUNT * BOARD_AREA;

#[inline]
fn feature_index(plane: usize, point: Point) -> usize {
    plane * BOARD_AREA + point.index()
}

/// Human-readable plane names in tensor order.
pub fn plane_names() -> Vec<String> {
    let mut names = vec![
        "ones".to_string(),
        "empty".to_string(),
        "own_stones".to_string(),
        "opponent_stones".to_string(),
    ];
    names.extend((0..HISTORY_DEPTH).map(|k| format!("history_{}", k)));
    names.extend((1..=MAX_LIBERTY_BUCKET).map(|n| bucket_name("liberties", n, MAX_LIBERTY_BUCKET)));
    names.extend((1..=MAX_CAPTURE_BUCKET).map(|n| bucket_name("own_captures", n, MAX_CAPTURE_BUCKET)));
    names.extend(
        (1..=MAX_CAPTURE_BUCKET).map(|n| bucket_name("opponent_captures", n, MAX_CAPTURE_BUCKET)),
    );
    names
}

fn bucket_name(prefix: &str, n: usize, max: usize) -> String {
    if n == max {
        format!("{}_{}_plus", prefix, n)
    } else {
        format!("{}_{}", prefix, n)
    }
}

/// Stateful encoder holding the recent move history of one game.
///
/// History entries are most-recent-first; `None` marks a pass or a ply
/// before the game started, and still occupies its slot.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    history: VecDeque<Option<Point>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        FeatureExtractor {
            history: std::iter::repeat(None).take(HISTORY_DEPTH).collect(),
        }
    }

    /// Records one applied ply (`None` for a pass).
    pub fn record_move(&mut self, point: Option<Point>) {
        self.history.push_front(point);
        self.history.truncate(HISTORY_DEPTH);
    }

    /// History slots, most recent first.
    pub fn history(&self) -> impl Iterator<Item = Option<Point>> + '_ {
        self.history.iter().copied()
    }

    /// Encodes `board` from `perspective`'s point of view into a new tensor.
    pub fn extract(&self, board: &BoardState, perspective: Player) -> Vec<u8> {
        let mut tensor = vec![0u8; TENSOR_LEN];
        self.encode_into(&mut tensor, board, perspective);
        tensor
    }

    /// Encodes into a caller-supplied buffer of `TENSOR_LEN` bytes.
    pub fn fill_features(
        &self,
        tensor: &mut [u8],
        board: &BoardState,
        perspective: Player,
    ) -> Result<(), BoardError> {
        if tensor.len() != TENSOR_LEN {
            return Err(BoardError::InvalidTensorLength {
                expected: TENSOR_LEN,
                got: tensor.len(),
            });
        }
        tensor.fill(0);
        self.encode_into(tensor, board, perspective);
        Ok(())
    }

    /// `tensor` must be exactly `TENSOR_LEN` bytes and zeroed.
    fn encode_into(&self, tensor: &mut [u8], board: &BoardState, perspective: Player) {

        for (k, entry) in self.history.iter().enumerate() {
            if let Some(point) = entry {
                tensor[feature_index(PLANE_HISTORY + k, *point)] = 1;
            }
        }

        for point in Point::all() {
            tensor[feature_index(PLANE_ONES, point)] = 1;

            match board.cell(point) {
                None => {
                    tensor[feature_index(PLANE_EMPTY, point)] = 1;
                    set_capture_feature(tensor, board, point, perspective, PLANE_OWN_CAPTURES);
                    set_capture_feature(
                        tensor,
                        board,
                        point,
                        perspective.opponent(),
                        PLANE_OPPONENT_CAPTURES,
                    );
                }
                Some(owner) => {
                    let stone_plane = if owner == perspective {
                        PLANE_OWN_STONES
                    } else {
                        PLANE_OPPONENT_STONES
                    };
                    tensor[feature_index(stone_plane, point)] = 1;

                    let liberties = board.liberty_count(point).min(MAX_LIBERTY_BUCKET);
                    if liberties > 0 {
                        tensor[feature_index(PLANE_LIBERTIES + liberties - 1, point)] = 1;
                    }
                }
            }
        }
    }
}

/// Number of stones `player` would capture by playing at the empty `point`.
///
/// Counts each adjacent enemy group in atari once, even when it touches
/// `point` from several sides.
pub fn capture_size(board: &BoardState, point: Point, player: Player) -> usize {
    let mut seen: [Option<Point>; 4] = [None; 4];
    let mut total = 0;
    for (i, n) in point.neighbors().enumerate() {
        if board.cell(n) != Some(player.opponent()) || board.liberty_count(n) != 1 {
            continue;
        }
        let root = board.group_root(n);
        if seen[..i].contains(&root) {
            continue;
        }
        seen[i] = root;
        total += board.group_size(n);
    }
    total
}

fn set_capture_feature(
    tensor: &mut [u8],
    board: &BoardState,
    point: Point,
    player: Player,
    first_plane: usize,
) {
    let captured = capture_size(board, point, player).min(MAX_CAPTURE_BUCKET);
    if captured > 0 {
        tensor[feature_index(first_plane + captured - 1, point)] = 1;
    }
}

/// Rebuilds a board from a raw grid and encodes it with an empty history.
pub fn extract_from_grid(raw: &[u8], perspective: Player) -> Result<Vec<u8>, BoardError> {
    let board = BoardState::from_grid(raw)?;
    Ok(FeatureExtractor::new().extract(&board, perspective))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point {
        Point::new(x, y).unwrap()
    }

    fn plane_at(tensor: &[u8], plane: usize, point: Point) -> u8 {
        tensor[feature_index(plane, point)]
    }

    fn plane_sum(tensor: &[u8], plane: usize) -> usize {
        tensor[plane * BOARD_AREA..(plane + 1) * BOARD_AREA]
            .iter()
            .map(|&v| v as usize)
            .sum()
    }

    #[test]
    fn layout_constants() {
        assert_eq!(PLANE_COUNT, 22);
        assert_eq!(TENSOR_LEN, 22 * 361);
        assert_eq!(plane_names().len(), PLANE_COUNT);
        assert_eq!(plane_names()[PLANE_LIBERTIES + 3], "liberties_4_plus");
        assert_eq!(plane_names()[PLANE_OPPONENT_CAPTURES], "opponent_captures_1");
    }

    #[test]
    fn empty_board_planes() {
        let tensor = FeatureExtractor::new().extract(&BoardState::new(), Player::Black);
        assert_eq!(tensor.len(), TENSOR_LEN);
        assert!(tensor.iter().all(|&v| v == 0 || v == 1));
        assert_eq!(plane_sum(&tensor, PLANE_ONES), BOARD_AREA);
        assert_eq!(plane_sum(&tensor, PLANE_EMPTY), BOARD_AREA);
        for plane in PLANE_OWN_STONES..PLANE_COUNT {
            assert_eq!(plane_sum(&tensor, plane), 0, "plane {} should be empty", plane);
        }
    }

    #[test]
    fn stones_are_relative_to_perspective() {
        let mut board = BoardState::new();
        board.place_stone(Player::Black, pt(3, 3)).unwrap();
        board.place_stone(Player::White, pt(15, 15)).unwrap();
        let ex = FeatureExtractor::new();

        let as_black = ex.extract(&board, Player::Black);
        assert_eq!(plane_at(&as_black, PLANE_OWN_STONES, pt(3, 3)), 1);
        assert_eq!(plane_at(&as_black, PLANE_OPPONENT_STONES, pt(15, 15)), 1);
        assert_eq!(plane_at(&as_black, PLANE_EMPTY, pt(3, 3)), 0);

        let as_white = ex.extract(&board, Player::White);
        assert_eq!(plane_at(&as_white, PLANE_OWN_STONES, pt(15, 15)), 1);
        assert_eq!(plane_at(&as_white, PLANE_OPPONENT_STONES, pt(3, 3)), 1);
    }

    #[test]
    fn liberty_planes_bucket_and_clip() {
        let mut board = BoardState::new();
        board.place_stone(Player::Black, pt(0, 0)).unwrap(); // 2 liberties
        board.place_stone(Player::White, pt(9, 9)).unwrap(); // 4 liberties
        board.place_stone(Player::White, pt(10, 9)).unwrap(); // group of 6 liberties
        board.place_stone(Player::Black, pt(18, 0)).unwrap();
        board.place_stone(Player::White, pt(17, 0)).unwrap(); // black corner: 1 liberty
        let tensor = FeatureExtractor::new().extract(&board, Player::Black);

        assert_eq!(plane_at(&tensor, PLANE_LIBERTIES + 1, pt(0, 0)), 1);
        assert_eq!(plane_at(&tensor, PLANE_LIBERTIES + 3, pt(9, 9)), 1);
        assert_eq!(plane_at(&tensor, PLANE_LIBERTIES + 3, pt(10, 9)), 1);
        assert_eq!(plane_at(&tensor, PLANE_LIBERTIES, pt(18, 0)), 1);
        // Exactly one liberty plane per stone, none on empty points.
        let total: usize = (0..MAX_LIBERTY_BUCKET)
            .map(|b| plane_sum(&tensor, PLANE_LIBERTIES + b))
            .sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn history_slots_follow_plies() {
        let mut ex = FeatureExtractor::new();
        ex.record_move(None);
        ex.record_move(Some(pt(0, 0)));
        ex.record_move(Some(pt(1, 0)));

        let history: Vec<Option<Point>> = ex.history().collect();
        assert_eq!(history.len(), HISTORY_DEPTH);
        assert_eq!(history[0], Some(pt(1, 0)));
        assert_eq!(history[1], Some(pt(0, 0)));
        assert_eq!(history[2], None);

        let tensor = ex.extract(&BoardState::new(), Player::Black);
        assert_eq!(plane_at(&tensor, PLANE_HISTORY, pt(1, 0)), 1);
        assert_eq!(plane_at(&tensor, PLANE_HISTORY + 1, pt(0, 0)), 1);
        assert_eq!(plane_sum(&tensor, PLANE_HISTORY + 2), 0);
    }

    #[test]
    fn history_evicts_oldest() {
        let mut ex = FeatureExtractor::new();
        for x in 0..(HISTORY_DEPTH as i32 + 2) {
            ex.record_move(Some(pt(x, 0)));
        }
        let history: Vec<Option<Point>> = ex.history().collect();
        assert_eq!(history.len(), HISTORY_DEPTH);
        assert_eq!(history[0], Some(pt(HISTORY_DEPTH as i32 + 1, 0)));
        assert_eq!(history[HISTORY_DEPTH - 1], Some(pt(2, 0)));
    }

    #[test]
    fn single_capture_marks_own_plane() {
        let mut board = BoardState::new();
        board.place_stone(Player::White, pt(0, 0)).unwrap();
        board.place_stone(Player::Black, pt(1, 0)).unwrap();
        let tensor = FeatureExtractor::new().extract(&board, Player::Black);

        // Black captures one stone at (0, 1).
        assert_eq!(plane_at(&tensor, PLANE_OWN_CAPTURES, pt(0, 1)), 1);
        assert_eq!(plane_sum(&tensor, PLANE_OWN_CAPTURES), 1);
        // White's view of the same board puts it on the opponent planes.
        let tensor = FeatureExtractor::new().extract(&board, Player::White);
        assert_eq!(plane_at(&tensor, PLANE_OPPONENT_CAPTURES, pt(0, 1)), 1);
        assert_eq!(plane_sum(&tensor, PLANE_OWN_CAPTURES), 0);
    }

    #[test]
    fn two_groups_in_atari_sum_and_clip() {
        let mut board = BoardState::new();
        // White pair (0,0)-(1,0) whose only liberty is (2,0).
        board.place_stone(Player::White, pt(0, 0)).unwrap();
        board.place_stone(Player::White, pt(1, 0)).unwrap();
        board.place_stone(Player::Black, pt(0, 1)).unwrap();
        board.place_stone(Player::Black, pt(1, 1)).unwrap();
        // White trio (3,0)-(5,0) whose only liberty is also (2,0).
        for x in 3..6 {
            board.place_stone(Player::White, pt(x, 0)).unwrap();
            board.place_stone(Player::Black, pt(x, 1)).unwrap();
        }
        board.place_stone(Player::Black, pt(6, 0)).unwrap();
        assert_eq!(board.liberty_count(pt(0, 0)), 1);
        assert_eq!(board.liberty_count(pt(4, 0)), 1);

        assert_eq!(capture_size(&board, pt(2, 0), Player::Black), 5);
        let tensor = FeatureExtractor::new().extract(&board, Player::Black);
        let bucket = 5usize.min(MAX_CAPTURE_BUCKET);
        assert_eq!(plane_at(&tensor, PLANE_OWN_CAPTURES + bucket - 1, pt(2, 0)), 1);
        assert_eq!(plane_at(&tensor, PLANE_OWN_CAPTURES, pt(2, 0)), 0);
    }

    #[test]
    fn group_touching_twice_counts_once() {
        let mut board = BoardState::new();
        // White L-shape around the empty corner point (0,0): (1,0), (1,1), (0,1).
        board.place_stone(Player::White, pt(1, 0)).unwrap();
        board.place_stone(Player::White, pt(1, 1)).unwrap();
        board.place_stone(Player::White, pt(0, 1)).unwrap();
        board.place_stone(Player::Black, pt(2, 0)).unwrap();
        board.place_stone(Player::Black, pt(2, 1)).unwrap();
        board.place_stone(Player::Black, pt(1, 2)).unwrap();
        board.place_stone(Player::Black, pt(0, 2)).unwrap();
        assert_eq!(board.liberty_count(pt(1, 1)), 1);
        assert_eq!(capture_size(&board, pt(0, 0), Player::Black), 3);
    }

    #[test]
    fn occupied_points_have_no_capture_features() {
        let mut board = BoardState::new();
        board.place_stone(Player::White, pt(0, 0)).unwrap();
        board.place_stone(Player::Black, pt(1, 0)).unwrap();
        let tensor = FeatureExtractor::new().extract(&board, Player::Black);
        for plane in PLANE_OWN_CAPTURES..PLANE_COUNT {
            assert_eq!(plane_at(&tensor, plane, pt(0, 0)), 0);
            assert_eq!(plane_at(&tensor, plane, pt(1, 0)), 0);
        }
    }

    #[test]
    fn extract_from_grid_matches_incremental_board() {
        let mut board = BoardState::new();
        board.place_stone(Player::Black, pt(3, 3)).unwrap();
        board.place_stone(Player::White, pt(3, 4)).unwrap();
        let expected = FeatureExtractor::new().extract(&board, Player::White);
        let from_grid = extract_from_grid(&board.to_grid(), Player::White).unwrap();
        assert_eq!(from_grid, expected);
    }

    #[test]
    fn extract_from_grid_rejects_short_grid() {
        assert!(extract_from_grid(&[0u8; 5], Player::Black).is_err());
    }

    #[test]
    fn fill_features_rejects_wrong_buffer_length() {
        let board = BoardState::new();
        let extractor = FeatureExtractor::new();
        let mut short = vec![0u8; 10];
        assert_eq!(
            extractor.fill_features(&mut short, &board, Player::Black),
            Err(BoardError::InvalidTensorLength {
                expected: TENSOR_LEN,
                got: 10
            })
        );

        let mut reused = vec![7u8; TENSOR_LEN];
        extractor.fill_features(&mut reused, &board, Player::Black).unwrap();
        assert_eq!(reused, extractor.extract(&board, Player::Black));
    }
}
