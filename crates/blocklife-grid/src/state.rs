//! The thread-safe grid.
//!
//! # Locking
//!
//! One [`RwLock`] guards both indices. Reads take the shared lock, every
//! mutation takes the exclusive lock exactly once, so `place`, `remove` and
//! `move_entity` are atomic with respect to each other. No lock is held
//! across I/O or observer callbacks: callers only ever see copies.
//!
//! A poisoned lock is recovered rather than propagated. Mutations run inside
//! a [`GridTransaction`], whose drop handler rolls back an interrupted
//! mutation, so the data behind a poisoned lock is still consistent.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use blocklife_types::{Category, Entity, EntityId, GridView, Position};
use tracing::debug;

use crate::dimensions::GridDimensions;
use crate::error::{GridError, IntegrityViolation};
use crate::index::GridIndex;
use crate::snapshot::GridSnapshot;
use crate::transaction::GridTransaction;

/// Authoritative, dual-indexed grid of entities.
#[derive(Debug)]
pub struct GridState {
    index: RwLock<GridIndex>,
}

impl GridState {
    /// Create an empty grid, validating the requested size.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        Ok(Self::with_dimensions(GridDimensions::new(width, height)?))
    }

    /// Create an empty grid of already-validated size.
    pub fn with_dimensions(dimensions: GridDimensions) -> Self {
        Self {
            index: RwLock::new(GridIndex::new(dimensions)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, GridIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GridIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Place a new entity on an empty cell and return its identity.
    pub fn place(&self, position: Position, category: Category) -> Result<EntityId, GridError> {
        self.transact(|tx| tx.place(position, category))
            .map(|entity| entity.id())
    }

    /// Remove the entity at `position`.
    pub fn remove(&self, position: Position) -> Result<Entity, GridError> {
        self.transact(|tx| tx.remove(position))
    }

    /// Move the entity at `from` to the empty cell `to`.
    ///
    /// On any error both cells are left exactly as they were.
    pub fn move_entity(&self, from: Position, to: Position) -> Result<Entity, GridError> {
        self.transact(|tx| tx.move_entity(from, to))
    }

    /// Run a compound mutation under one exclusive lock.
    ///
    /// If `f` returns `Err` every mutation it made is undone before the lock
    /// is released, and the error is passed through.
    pub fn transact<T, E>(
        &self,
        f: impl FnOnce(&mut GridTransaction<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.write();
        let mut tx = GridTransaction::new(&mut guard);
        let result = f(&mut tx);
        if result.is_ok() {
            let mutations = tx.mutation_count();
            tx.commit();
            if mutations > 0 {
                debug!(mutations, "grid transaction committed");
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The entity at `position`.
    pub fn get_by_position(&self, position: Position) -> Option<Entity> {
        self.read().get_by_position(position).copied()
    }

    /// The entity with identity `id`.
    pub fn get_by_id(&self, id: EntityId) -> Option<Entity> {
        self.read().get_by_id(id).copied()
    }

    /// Occupied cardinal neighbours of `position`, in North, East, South,
    /// West order.
    pub fn get_adjacent(&self, position: Position) -> Vec<Entity> {
        self.read().adjacent(position).into_iter().copied().collect()
    }

    /// Run a read-only closure against the grid under the shared lock.
    pub fn with_view<R>(&self, f: impl FnOnce(&GridIndex) -> R) -> R {
        f(&self.read())
    }

    /// An owned copy of the current contents.
    pub fn snapshot(&self) -> GridSnapshot {
        self.read().snapshot()
    }

    /// Check the dual-index invariants.
    pub fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        self.read().verify()
    }

    /// All entities, sorted by position.
    pub fn entities(&self) -> Vec<Entity> {
        self.read().entities()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the grid is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The grid bounds.
    pub fn dimensions(&self) -> GridDimensions {
        self.read().dimensions()
    }

    /// Whether `position` is a cell of this grid.
    pub fn contains(&self, position: Position) -> bool {
        self.dimensions().contains(position)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wood() -> Category {
        Category::new(1, 1)
    }

    fn grid() -> GridState {
        GridState::new(10, 10).unwrap()
    }

    #[test]
    fn place_then_lookup_both_ways() {
        let grid = grid();
        let id = grid.place(Position::new(2, 3), wood()).unwrap();

        let by_pos = grid.get_by_position(Position::new(2, 3)).unwrap();
        let by_id = grid.get_by_id(id).unwrap();
        assert_eq!(by_pos, by_id);
        assert_eq!(by_pos.id(), id);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn place_rejects_occupied_and_out_of_bounds() {
        let grid = grid();
        let first = grid.place(Position::new(0, 0), wood()).unwrap();

        assert_eq!(
            grid.place(Position::new(0, 0), wood()),
            Err(GridError::PositionOccupied {
                position: Position::new(0, 0),
                occupant: first
            })
        );
        assert!(matches!(
            grid.place(Position::new(10, 0), wood()),
            Err(GridError::OutOfBounds { .. })
        ));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn remove_returns_entity_and_clears_both_indices() {
        let grid = grid();
        let id = grid.place(Position::new(4, 4), wood()).unwrap();

        let removed = grid.remove(Position::new(4, 4)).unwrap();
        assert_eq!(removed.id(), id);
        assert!(grid.get_by_id(id).is_none());
        assert!(grid.get_by_position(Position::new(4, 4)).is_none());
        assert_eq!(
            grid.remove(Position::new(4, 4)),
            Err(GridError::PositionEmpty {
                position: Position::new(4, 4)
            })
        );
    }

    #[test]
    fn move_keeps_identity() {
        let grid = grid();
        let id = grid.place(Position::new(1, 1), wood()).unwrap();

        let moved = grid
            .move_entity(Position::new(1, 1), Position::new(1, 2))
            .unwrap();

        assert_eq!(moved.id(), id);
        assert_eq!(moved.position(), Position::new(1, 2));
        assert!(grid.get_by_position(Position::new(1, 1)).is_none());
        assert_eq!(grid.get_by_id(id).unwrap().position(), Position::new(1, 2));
        assert!(grid.verify_integrity().is_empty());
    }

    #[test]
    fn move_onto_occupied_leaves_both_unchanged() {
        let grid = grid();
        grid.place(Position::new(0, 0), wood()).unwrap();
        grid.place(Position::new(0, 1), Category::new(2, 1)).unwrap();
        let source_before = grid.get_by_position(Position::new(0, 0)).unwrap();
        let dest_before = grid.get_by_position(Position::new(0, 1)).unwrap();

        let err = grid
            .move_entity(Position::new(0, 0), Position::new(0, 1))
            .unwrap_err();

        assert_eq!(
            err,
            GridError::PositionOccupied {
                position: Position::new(0, 1),
                occupant: dest_before.id()
            }
        );
        assert_eq!(grid.get_by_position(Position::new(0, 0)), Some(source_before));
        assert_eq!(grid.get_by_position(Position::new(0, 1)), Some(dest_before));
        assert_eq!(grid.get_by_id(source_before.id()), Some(source_before));
        assert_eq!(grid.get_by_id(dest_before.id()), Some(dest_before));
    }

    #[test]
    fn move_from_empty_or_out_of_bounds_fails() {
        let grid = grid();
        assert!(matches!(
            grid.move_entity(Position::new(0, 0), Position::new(0, 1)),
            Err(GridError::PositionEmpty { .. })
        ));
        grid.place(Position::new(0, 0), wood()).unwrap();
        assert!(matches!(
            grid.move_entity(Position::new(0, 0), Position::new(-1, 0)),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(grid.get_by_position(Position::new(0, 0)).is_some());
    }

    #[test]
    fn adjacency_is_ordered_north_east_south_west() {
        let grid = grid();
        let center = Position::new(5, 5);
        let west = grid.place(Position::new(4, 5), wood()).unwrap();
        let north = grid.place(Position::new(5, 4), wood()).unwrap();
        let south = grid.place(Position::new(5, 6), wood()).unwrap();
        grid.place(Position::new(6, 6), wood()).unwrap();

        let ids: Vec<EntityId> = grid.get_adjacent(center).iter().map(Entity::id).collect();
        assert_eq!(ids, vec![north, south, west]);
    }

    #[test]
    fn adjacency_at_corner_skips_outside_cells() {
        let grid = grid();
        grid.place(Position::new(1, 0), wood()).unwrap();
        grid.place(Position::new(0, 1), wood()).unwrap();
        assert_eq!(grid.get_adjacent(Position::new(0, 0)).len(), 2);
    }

    #[test]
    fn failed_transaction_restores_grid() {
        let grid = grid();
        let keep = grid.place(Position::new(0, 0), wood()).unwrap();
        let before = grid.snapshot();

        let result = grid.transact(|tx| -> Result<(), GridError> {
            tx.remove(Position::new(0, 0))?;
            tx.place(Position::new(3, 3), wood())?;
            tx.move_entity(Position::new(3, 3), Position::new(3, 4))?;
            // Fails: the cell is empty.
            tx.remove(Position::new(9, 9))?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(grid.snapshot(), before);
        assert_eq!(grid.get_by_id(keep).unwrap().position(), Position::new(0, 0));
        assert!(grid.verify_integrity().is_empty());
    }

    #[test]
    fn committed_transaction_applies_everything() {
        let grid = grid();
        grid.transact(|tx| -> Result<(), GridError> {
            tx.place(Position::new(0, 0), wood())?;
            tx.place(Position::new(1, 0), wood())?;
            tx.move_entity(Position::new(1, 0), Position::new(2, 0))?;
            Ok(())
        })
        .unwrap();

        assert_eq!(grid.len(), 2);
        assert!(grid.get_by_position(Position::new(2, 0)).is_some());
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_transaction_is_rolled_back() {
        let grid = grid();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = grid.transact(|tx| -> Result<(), GridError> {
                tx.place(Position::new(7, 7), wood())?;
                panic!("interrupted");
            });
        }));

        assert!(outcome.is_err());
        assert!(grid.is_empty());
        assert!(grid.verify_integrity().is_empty());
    }
}
