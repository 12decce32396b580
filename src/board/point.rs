//! Players, points, and grid geometry for the 19x19 board.
//!
//! A `Point` is always in bounds once constructed, so everything downstream
//! can index the flat grid without re-checking.

use std::fmt;

use super::error::BoardError;

/// Side length of the board.
pub const BOARD_SIZE: usize = 19;

/// Number of intersections on the board.
pub const BOARD_AREA: usize = BOARD_SIZE * BOARD_SIZE;

/// One of the two players. Discriminants match the raw grid encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Player {
    Black = 1,
    White = 2,
}

/// Both players, black first.
pub const ALL_PLAYERS: [Player; 2] = [Player::Black, Player::White];

impl Player {
    /// Returns the other player.
    pub const fn opponent(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Returns the raw cell byte for this player's stones.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Parses a raw cell byte (1 or 2).
    pub fn from_byte(b: u8) -> Option<Player> {
        match b {
            1 => Some(Player::Black),
            2 => Some(Player::White),
            _ => None,
        }
    }

    /// Returns the single-letter SGF property name ('B' or 'W').
    pub const fn sgf_char(self) -> char {
        match self {
            Player::Black => 'B',
            Player::White => 'W',
        }
    }
}

/// An on-board intersection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    x: u8,
    y: u8,
}

impl Point {
    /// Creates a point, failing if either coordinate is off the board.
    pub fn new(x: i32, y: i32) -> Result<Point, BoardError> {
        if (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y) {
            Ok(Point {
                x: x as u8,
                y: y as u8,
            })
        } else {
            Err(BoardError::OutOfBounds { x, y })
        }
    }

    /// Creates a point from a flat grid index (`x + y * BOARD_SIZE`).
    pub fn from_index(index: usize) -> Result<Point, BoardError> {
        if index >= BOARD_AREA {
            return Err(BoardError::OutOfBounds {
                x: (index % BOARD_SIZE) as i32,
                y: (index / BOARD_SIZE) as i32,
            });
        }
        Ok(Point {
            x: (index % BOARD_SIZE) as u8,
            y: (index / BOARD_SIZE) as u8,
        })
    }

    #[inline]
    pub const fn x(self) -> usize {
        self.x as usize
    }

    #[inline]
    pub const fn y(self) -> usize {
        self.y as usize
    }

    /// Flat row-major index into a `BOARD_AREA` grid.
    #[inline]
    pub const fn index(self) -> usize {
        self.x as usize + self.y as usize * BOARD_SIZE
    }

    /// Iterates over the up-to-4 orthogonal neighbors that are on the board,
    /// in left, right, above, below order.
    pub fn neighbors(self) -> impl Iterator<Item = Point> {
        let (x, y) = (self.x as i32, self.y as i32);
        [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
            .into_iter()
            .filter_map(|(nx, ny)| Point::new(nx, ny).ok())
    }

    /// Iterates over every point on the board in raster order.
    pub fn all() -> impl Iterator<Item = Point> {
        (0..BOARD_AREA).map(|i| Point {
            x: (i % BOARD_SIZE) as u8,
            y: (i / BOARD_SIZE) as u8,
        })
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.x, self.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.x, self.y)
    }
}

/// A single move from a game record. `point == None` is a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub player: Player,
    pub point: Option<Point>,
}

impl Move {
    pub fn play(player: Player, point: Point) -> Self {
        Move {
            player,
            point: Some(point),
        }
    }

    pub fn pass(player: Player) -> Self {
        Move {
            player,
            point: None,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.point.is_none()
    }
}
