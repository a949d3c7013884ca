//! Compound grid mutations that commit or roll back as one unit.
//!
//! Every successful mutation made through a [`GridTransaction`] records an
//! [`UndoRecord`]. If the transaction is not committed (the closure passed to
//! [`GridState::transact`](crate::GridState::transact) returned `Err`, or
//! panicked) the journal is replayed in reverse and the index ends up
//! exactly as it was when the transaction began.

use blocklife_types::{Category, Entity, EntityId, GridView, Position};
use tracing::debug;

use crate::dimensions::GridDimensions;
use crate::error::GridError;
use crate::index::GridIndex;

/// How to reverse one applied mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UndoRecord {
    Placed(Entity),
    Removed(Entity),
    Moved { before: Entity, after: Entity },
}

/// Exclusive access to the grid for the duration of one compound mutation.
#[derive(Debug)]
pub struct GridTransaction<'a> {
    index: &'a mut GridIndex,
    journal: Vec<UndoRecord>,
    committed: bool,
}

impl<'a> GridTransaction<'a> {
    pub(crate) const fn new(index: &'a mut GridIndex) -> Self {
        Self {
            index,
            journal: Vec::new(),
            committed: false,
        }
    }

    /// Place a new entity. The returned value carries its fresh identity.
    pub fn place(&mut self, position: Position, category: Category) -> Result<Entity, GridError> {
        let entity = self.index.place(position, category)?;
        self.journal.push(UndoRecord::Placed(entity));
        Ok(entity)
    }

    /// Remove and return the entity at `position`.
    pub fn remove(&mut self, position: Position) -> Result<Entity, GridError> {
        let entity = self.index.remove(position)?;
        self.journal.push(UndoRecord::Removed(entity));
        Ok(entity)
    }

    /// Move the entity at `from` to the empty cell `to`, returning it at its
    /// new position.
    pub fn move_entity(&mut self, from: Position, to: Position) -> Result<Entity, GridError> {
        let (before, after) = self.index.move_entity(from, to)?;
        self.journal.push(UndoRecord::Moved { before, after });
        Ok(after)
    }

    /// The entity at `position`.
    pub fn get_by_position(&self, position: Position) -> Option<Entity> {
        self.index.get_by_position(position).copied()
    }

    /// The entity with identity `id`.
    pub fn get_by_id(&self, id: EntityId) -> Option<Entity> {
        self.index.get_by_id(id).copied()
    }

    /// The grid bounds.
    pub const fn dimensions(&self) -> GridDimensions {
        self.index.dimensions()
    }

    /// Number of mutations applied so far.
    pub fn mutation_count(&self) -> usize {
        self.journal.len()
    }

    pub(crate) const fn commit(&mut self) {
        self.committed = true;
    }

    fn rollback(&mut self) -> usize {
        let undone = self.journal.len();
        while let Some(record) = self.journal.pop() {
            match record {
                UndoRecord::Placed(entity) => self.index.delete_unchecked(&entity),
                UndoRecord::Removed(entity) => self.index.insert_unchecked(entity),
                UndoRecord::Moved { before, after } => {
                    self.index.delete_unchecked(&after);
                    self.index.insert_unchecked(before);
                }
            }
        }
        undone
    }
}

impl GridView for GridTransaction<'_> {
    fn entity_at(&self, position: Position) -> Option<&Entity> {
        self.index.get_by_position(position)
    }

    fn contains(&self, position: Position) -> bool {
        self.index.dimensions().contains(position)
    }
}

impl Drop for GridTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && !self.journal.is_empty() {
            let undone = self.rollback();
            debug!(undone, "grid transaction rolled back");
        }
    }
}
