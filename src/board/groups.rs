//! Union-find over board points with value-carrying merges.
//!
//! Each tracked point owns a node in a fixed arena keyed by its flat index.
//! Parent links are arena indices. The stone and liberty sets of a group
//! live on its root node only and are folded together on every union, so
//! liberty and size queries never rescan the board.

use std::cell::Cell;
use std::collections::{BTreeSet, HashSet};

use super::error::BoardError;
use super::point::{Player, Point, BOARD_AREA};

/// A maximal connected set of same-owner stones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    owner: Player,
    stones: HashSet<Point>,
    liberties: HashSet<Point>,
}

impl Group {
    fn singleton(owner: Player, point: Point) -> Self {
        Group {
            owner,
            stones: HashSet::from([point]),
            liberties: HashSet::new(),
        }
    }

    pub fn owner(&self) -> Player {
        self.owner
    }

    pub fn stones(&self) -> &HashSet<Point> {
        &self.stones
    }

    pub fn liberties(&self) -> &HashSet<Point> {
        &self.liberties
    }

    pub fn size(&self) -> usize {
        self.stones.len()
    }

    pub fn liberty_count(&self) -> usize {
        self.liberties.len()
    }

    /// Folds `other` into `self`, always extending the larger set.
    fn absorb(&mut self, mut other: Group) -> Result<(), BoardError> {
        if self.owner != other.owner {
            return Err(BoardError::OwnerMismatch {
                a: self.owner,
                b: other.owner,
            });
        }
        if other.stones.len() > self.stones.len() {
            std::mem::swap(&mut self.stones, &mut other.stones);
        }
        if other.liberties.len() > self.liberties.len() {
            std::mem::swap(&mut self.liberties, &mut other.liberties);
        }
        self.stones.extend(other.stones);
        self.liberties.extend(other.liberties);

        if let Some(&p) = self.liberties.iter().find(|p| self.stones.contains(p)) {
            return Err(BoardError::NotDisjoint(p));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Node {
    point: Point,
    parent: Cell<u16>,
    rank: u8,
    tracked: bool,
    /// Present on root nodes only.
    group: Option<Group>,
}

impl Node {
    fn vacant(point: Point) -> Self {
        Node {
            point,
            parent: Cell::new(point.index() as u16),
            rank: 0,
            tracked: false,
            group: None,
        }
    }
}

/// A group removed from the board, plus the liberties it hands back.
#[derive(Debug, Clone)]
pub struct Removed {
    pub group: Group,
    /// `(surviving group root, vacated point)` for every removed stone
    /// adjacent to a surviving group.
    pub reclaimed: Vec<(Point, Point)>,
}

/// Occupancy grid plus the partition of stones into groups.
#[derive(Debug, Clone)]
pub struct GroupTracker {
    cells: [Option<Player>; BOARD_AREA],
    nodes: Vec<Node>,
    roots: BTreeSet<Point>,
}

impl Default for GroupTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTracker {
    pub fn new() -> Self {
        GroupTracker {
            cells: [None; BOARD_AREA],
            nodes: Point::all().map(Node::vacant).collect(),
            roots: BTreeSet::new(),
        }
    }

    /// The stone at `point`, if any.
    #[inline]
    pub fn cell(&self, point: Point) -> Option<Player> {
        self.cells[point.index()]
    }

    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        self.nodes[point.index()].tracked
    }

    /// Places a one-stone group at `point`.
    pub fn create_singleton(&mut self, point: Point, owner: Player) -> Result<(), BoardError> {
        if self.contains(point) {
            return Err(BoardError::AlreadyTracked(point));
        }
        self.cells[point.index()] = Some(owner);
        self.nodes[point.index()] = Node {
            tracked: true,
            group: Some(Group::singleton(owner, point)),
            ..Node::vacant(point)
        };
        self.roots.insert(point);
        Ok(())
    }

    /// Returns the representative point of the group containing `point`,
    /// compressing the path behind it.
    pub fn find_root(&self, point: Point) -> Result<Point, BoardError> {
        if !self.contains(point) {
            return Err(BoardError::Untracked(point));
        }
        let mut root = point.index();
        loop {
            let parent = self.nodes[root].parent.get() as usize;
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut current = point.index();
        while current != root {
            let node = &self.nodes[current];
            current = node.parent.get() as usize;
            node.parent.set(root as u16);
        }
        Ok(self.nodes[root].point)
    }

    /// The group containing `point`.
    pub fn group(&self, point: Point) -> Result<&Group, BoardError> {
        let root = self.find_root(point)?;
        self.nodes[root.index()]
            .group
            .as_ref()
            .ok_or(BoardError::Untracked(point))
    }

    fn group_mut(&mut self, point: Point) -> Result<&mut Group, BoardError> {
        let root = self.find_root(point)?;
        self.nodes[root.index()]
            .group
            .as_mut()
            .ok_or(BoardError::Untracked(point))
    }

    pub fn liberty_count(&self, point: Point) -> Result<usize, BoardError> {
        self.group(point).map(Group::liberty_count)
    }

    pub fn group_size(&self, point: Point) -> Result<usize, BoardError> {
        self.group(point).map(Group::size)
    }

    pub fn add_liberty(&mut self, point: Point, liberty: Point) -> Result<(), BoardError> {
        self.group_mut(point)?.liberties.insert(liberty);
        Ok(())
    }

    pub fn remove_liberty(&mut self, point: Point, liberty: Point) -> Result<(), BoardError> {
        self.group_mut(point)?.liberties.remove(&liberty);
        Ok(())
    }

    /// Merges the groups containing `a` and `b` by rank and returns the
    /// surviving root.
    pub fn union(&mut self, a: Point, b: Point) -> Result<Point, BoardError> {
        let ra = self.find_root(a)?;
        let rb = self.find_root(b)?;
        if ra == rb {
            return Ok(ra);
        }
        let (owner_a, owner_b) = (self.group(ra)?.owner, self.group(rb)?.owner);
        if owner_a != owner_b {
            return Err(BoardError::OwnerMismatch {
                a: owner_a,
                b: owner_b,
            });
        }

        let (winner, loser) = if self.nodes[ra.index()].rank < self.nodes[rb.index()].rank {
            (rb, ra)
        } else {
            (ra, rb)
        };
        if self.nodes[winner.index()].rank == self.nodes[loser.index()].rank {
            self.nodes[winner.index()].rank += 1;
        }
        self.nodes[loser.index()].parent.set(winner.index() as u16);
        self.roots.remove(&loser);

        let absorbed = self.nodes[loser.index()]
            .group
            .take()
            .ok_or(BoardError::Untracked(loser))?;
        self.nodes[winner.index()]
            .group
            .as_mut()
            .ok_or(BoardError::Untracked(winner))?
            .absorb(absorbed)?;
        Ok(winner)
    }

    /// Drops the whole group containing `point`, emptying its cells.
    ///
    /// `neighbors` supplies board adjacency; every tracked neighbor of a
    /// removed stone is reported in `Removed::reclaimed` so the caller can
    /// hand the vacated point back to it as a liberty.
    pub fn remove<F, I>(&mut self, point: Point, neighbors: F) -> Result<Removed, BoardError>
    where
        F: Fn(Point) -> I,
        I: IntoIterator<Item = Point>,
    {
        let root = self.find_root(point)?;
        let group = self.nodes[root.index()]
            .group
            .take()
            .ok_or(BoardError::Untracked(point))?;
        self.roots.remove(&root);

        for &stone in &group.stones {
            self.cells[stone.index()] = None;
            self.nodes[stone.index()] = Node::vacant(stone);
        }

        let mut reclaimed = Vec::new();
        for &stone in &group.stones {
            for n in neighbors(stone) {
                if self.contains(n) {
                    reclaimed.push((self.find_root(n)?, stone));
                }
            }
        }
        Ok(Removed { group, reclaimed })
    }

    /// Roots of every group owned by `owner` with no liberties left.
    pub fn dead_groups(&self, owner: Player) -> Vec<Point> {
        self.groups()
            .filter(|(_, g)| g.owner == owner && g.liberties.is_empty())
            .map(|(root, _)| root)
            .collect()
    }

    /// Iterates over `(root, group)` for every live group.
    pub fn groups(&self) -> impl Iterator<Item = (Point, &Group)> {
        self.roots.iter().filter_map(move |&root| {
            self.nodes[root.index()]
                .group
                .as_ref()
                .map(|g| (root, g))
        })
    }

    pub fn group_count(&self) -> usize {
        self.roots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: i32, y: i32) -> Point {
        Point::new(x, y).unwrap()
    }

    #[test]
    fn singleton_is_its_own_root() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(3, 3), Player::Black).unwrap();
        assert_eq!(t.find_root(pt(3, 3)).unwrap(), pt(3, 3));
        assert_eq!(t.group_size(pt(3, 3)).unwrap(), 1);
        assert_eq!(t.liberty_count(pt(3, 3)).unwrap(), 0);
        assert_eq!(t.cell(pt(3, 3)), Some(Player::Black));
        assert_eq!(t.group_count(), 1);
    }

    #[test]
    fn create_twice_fails() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(0, 0), Player::Black).unwrap();
        assert_eq!(
            t.create_singleton(pt(0, 0), Player::White),
            Err(BoardError::AlreadyTracked(pt(0, 0)))
        );
    }

    #[test]
    fn untracked_queries_fail() {
        let t = GroupTracker::new();
        assert_eq!(t.find_root(pt(5, 5)), Err(BoardError::Untracked(pt(5, 5))));
        assert!(t.liberty_count(pt(5, 5)).is_err());
        assert!(t.group_size(pt(5, 5)).is_err());
    }

    #[test]
    fn union_folds_stones_and_liberties() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(1, 1), Player::White).unwrap();
        t.create_singleton(pt(2, 1), Player::White).unwrap();
        t.add_liberty(pt(1, 1), pt(0, 1)).unwrap();
        t.add_liberty(pt(2, 1), pt(3, 1)).unwrap();
        t.add_liberty(pt(2, 1), pt(2, 0)).unwrap();

        let root = t.union(pt(1, 1), pt(2, 1)).unwrap();
        assert_eq!(t.find_root(pt(1, 1)).unwrap(), root);
        assert_eq!(t.find_root(pt(2, 1)).unwrap(), root);
        assert_eq!(t.group_size(pt(1, 1)).unwrap(), 2);
        assert_eq!(t.liberty_count(pt(2, 1)).unwrap(), 3);
        assert_eq!(t.group_count(), 1);
    }

    #[test]
    fn union_of_same_group_is_noop() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(1, 1), Player::White).unwrap();
        t.create_singleton(pt(2, 1), Player::White).unwrap();
        let r1 = t.union(pt(1, 1), pt(2, 1)).unwrap();
        let r2 = t.union(pt(2, 1), pt(1, 1)).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(t.group_size(pt(1, 1)).unwrap(), 2);
    }

    #[test]
    fn union_across_owners_fails() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(1, 1), Player::Black).unwrap();
        t.create_singleton(pt(2, 1), Player::White).unwrap();
        assert_eq!(
            t.union(pt(1, 1), pt(2, 1)),
            Err(BoardError::OwnerMismatch {
                a: Player::Black,
                b: Player::White
            })
        );
    }

    #[test]
    fn union_detects_stone_listed_as_liberty() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(1, 1), Player::Black).unwrap();
        t.create_singleton(pt(2, 1), Player::Black).unwrap();
        // Stale bookkeeping: (2, 1) still claimed as a liberty of (1, 1).
        t.add_liberty(pt(1, 1), pt(2, 1)).unwrap();
        assert_eq!(
            t.union(pt(1, 1), pt(2, 1)),
            Err(BoardError::NotDisjoint(pt(2, 1)))
        );
    }

    #[test]
    fn long_chain_shares_one_root() {
        let mut t = GroupTracker::new();
        for x in 0..19 {
            t.create_singleton(pt(x, 4), Player::Black).unwrap();
            if x > 0 {
                t.union(pt(x - 1, 4), pt(x, 4)).unwrap();
            }
        }
        let root = t.find_root(pt(0, 4)).unwrap();
        for x in 0..19 {
            assert_eq!(t.find_root(pt(x, 4)).unwrap(), root);
        }
        assert_eq!(t.group_size(pt(18, 4)).unwrap(), 19);
    }

    #[test]
    fn remove_clears_cells_and_reports_neighbors() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(0, 0), Player::White).unwrap();
        t.create_singleton(pt(1, 0), Player::Black).unwrap();
        t.create_singleton(pt(0, 1), Player::Black).unwrap();

        let removed = t.remove(pt(0, 0), Point::neighbors).unwrap();
        assert_eq!(removed.group.owner(), Player::White);
        assert_eq!(removed.group.size(), 1);
        assert_eq!(t.cell(pt(0, 0)), None);
        assert!(!t.contains(pt(0, 0)));
        assert_eq!(t.group_count(), 2);

        let mut reclaimed = removed.reclaimed.clone();
        reclaimed.sort();
        assert_eq!(reclaimed, vec![(pt(0, 1), pt(0, 0)), (pt(1, 0), pt(0, 0))]);
    }

    #[test]
    fn removed_point_can_be_reused() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(4, 4), Player::White).unwrap();
        t.remove(pt(4, 4), Point::neighbors).unwrap();
        t.create_singleton(pt(4, 4), Player::Black).unwrap();
        assert_eq!(t.group(pt(4, 4)).unwrap().owner(), Player::Black);
    }

    #[test]
    fn dead_groups_filters_by_owner() {
        let mut t = GroupTracker::new();
        t.create_singleton(pt(0, 0), Player::White).unwrap();
        t.create_singleton(pt(5, 5), Player::Black).unwrap();
        t.add_liberty(pt(5, 5), pt(5, 6)).unwrap();
        t.create_singleton(pt(9, 9), Player::Black).unwrap();
        assert_eq!(t.dead_groups(Player::White), vec![pt(0, 0)]);
        assert_eq!(t.dead_groups(Player::Black), vec![pt(9, 9)]);
    }
}
