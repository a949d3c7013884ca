//! Read-only access to grid contents.
//!
//! The pattern engine is written against [`GridView`] rather than a concrete
//! grid type, so it can evaluate an owned snapshot, or the live index while
//! a transaction holds the write lock, without caring which.

use crate::entity::Entity;
use crate::position::{Direction, Position};

/// A read-only view of which entity occupies which cell.
pub trait GridView {
    /// The entity at `position`, if any. Out-of-bounds cells are empty.
    fn entity_at(&self, position: Position) -> Option<&Entity>;

    /// Whether `position` lies inside the grid.
    fn contains(&self, position: Position) -> bool;

    /// The occupied cardinal neighbours of `position`, in
    /// [`Direction::all`] order. Four point lookups, no scans.
    fn adjacent(&self, position: Position) -> Vec<&Entity> {
        Direction::all()
            .into_iter()
            .filter_map(|dir| position.step(dir))
            .filter_map(|neighbour| self.entity_at(neighbour))
            .collect()
    }
}
