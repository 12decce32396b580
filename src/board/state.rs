//! Board state engine.
//!
//! Applies one move at a time on top of the group tracker: place the stone,
//! merge with friendly neighbors, take the point away from enemy neighbors,
//! then clear every group left without liberties.

use std::fmt;

use super::error::BoardError;
use super::groups::{Group, GroupTracker};
use super::point::{Player, Point, BOARD_AREA, BOARD_SIZE};

/// A 19x19 Go position.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    groups: GroupTracker,
}

impl BoardState {
    /// Creates an empty board.
    pub fn new() -> Self {
        BoardState {
            groups: GroupTracker::new(),
        }
    }

    /// Rebuilds a board from a raw row-major grid (0 empty, 1 black, 2 white).
    ///
    /// Stones are placed in raster order through `place_stone`, so a grid that
    /// contains groups without liberties comes back with those groups removed.
    pub fn from_grid(raw: &[u8]) -> Result<Self, BoardError> {
        if raw.len() != BOARD_AREA {
            return Err(BoardError::InvalidGridLength {
                expected: BOARD_AREA,
                got: raw.len(),
            });
        }
        let mut board = BoardState::new();
        for (index, &value) in raw.iter().enumerate() {
            if value == 0 {
                continue;
            }
            let player = Player::from_byte(value).ok_or(BoardError::InvalidCell { index, value })?;
            board.place_stone(player, Point::from_index(index)?)?;
        }
        Ok(board)
    }

    /// The stone at `point`, if any.
    #[inline]
    pub fn cell(&self, point: Point) -> Option<Player> {
        self.groups.cell(point)
    }

    /// Places a stone for `player` and resolves captures.
    ///
    /// Returns the number of opponent stones captured. Groups of the mover
    /// left without liberties are removed as well.
    pub fn place_stone(&mut self, player: Player, point: Point) -> Result<usize, BoardError> {
        if self.cell(point).is_some() {
            return Err(BoardError::Occupied(point));
        }
        self.groups.create_singleton(point, player)?;

        for n in point.neighbors() {
            match self.groups.cell(n) {
                None => self.groups.add_liberty(point, n)?,
                Some(owner) => {
                    self.groups.remove_liberty(n, point)?;
                    if owner == player {
                        self.groups.union(point, n)?;
                    }
                }
            }
        }

        let captured = self.remove_dead_groups(player.opponent())?;
        self.remove_dead_groups(player)?;
        Ok(captured)
    }

    /// Removes every liberty-less group of `owner`, returning the stone count.
    fn remove_dead_groups(&mut self, owner: Player) -> Result<usize, BoardError> {
        let mut removed_stones = 0;
        for root in self.groups.dead_groups(owner) {
            let removed = self.groups.remove(root, Point::neighbors)?;
            removed_stones += removed.group.size();
            for (neighbor_root, vacated) in removed.reclaimed {
                self.groups.add_liberty(neighbor_root, vacated)?;
            }
        }
        Ok(removed_stones)
    }

    /// Liberties of the group at `point`; 0 for an empty point.
    pub fn liberty_count(&self, point: Point) -> usize {
        self.groups.liberty_count(point).unwrap_or(0)
    }

    /// Stones in the group at `point`; 0 for an empty point.
    pub fn group_size(&self, point: Point) -> usize {
        self.groups.group_size(point).unwrap_or(0)
    }

    /// The group containing `point`, if occupied.
    pub fn group(&self, point: Point) -> Option<&Group> {
        self.groups.group(point).ok()
    }

    /// Representative point of the group at `point`, if occupied.
    pub fn group_root(&self, point: Point) -> Option<Point> {
        self.groups.find_root(point).ok()
    }

    /// Iterates over `(root, group)` for every group on the board.
    pub fn groups(&self) -> impl Iterator<Item = (Point, &Group)> {
        self.groups.groups()
    }

    /// Number of stones `player` has on the board.
    pub fn stone_count(&self, player: Player) -> usize {
        Point::all().filter(|&p| self.cell(p) == Some(player)).count()
    }

    /// Raw row-major grid (0 empty, 1 black, 2 white).
    pub fn to_grid(&self) -> [u8; BOARD_AREA] {
        let mut grid = [0u8; BOARD_AREA];
        for p in Point::all() {
            grid[p.index()] = self.cell(p).map_or(0, Player::as_byte);
        }
        grid
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                let p = Point::from_index(x + y * BOARD_SIZE).map_err(|_| fmt::Error)?;
                let c = match self.cell(p) {
                    None => '.',
                    Some(Player::Black) => '#',
                    Some(Player::White) => 'o',
                };
                write!(f, "{} ", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
