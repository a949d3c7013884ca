//! The dual index: position to identity, identity to entity.
//!
//! [`GridIndex`] is not synchronized on its own. [`GridState`](crate::GridState)
//! owns it behind a lock and hands out `&GridIndex` for reads and a
//! [`GridTransaction`](crate::GridTransaction) for writes.

use std::collections::HashMap;

use blocklife_types::{Category, Entity, EntityId, GridView, Position};

use crate::dimensions::GridDimensions;
use crate::error::{GridError, IntegrityViolation};
use crate::snapshot::GridSnapshot;

/// Both indices over the grid's entities.
#[derive(Debug, Clone)]
pub struct GridIndex {
    dimensions: GridDimensions,
    by_position: HashMap<Position, EntityId>,
    by_id: HashMap<EntityId, Entity>,
}

impl GridIndex {
    /// An empty index for a grid of the given size.
    pub fn new(dimensions: GridDimensions) -> Self {
        Self {
            dimensions,
            by_position: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// The grid bounds.
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Number of entities on the grid.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the grid holds no entities.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// The entity at `position`.
    pub fn get_by_position(&self, position: Position) -> Option<&Entity> {
        let id = self.by_position.get(&position)?;
        self.by_id.get(id)
    }

    /// The entity with identity `id`.
    pub fn get_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id)
    }

    /// All entities, sorted by position.
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.by_id.values().copied().collect();
        entities.sort_by_key(Entity::position);
        entities
    }

    /// An owned copy of the current contents.
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::new(self.dimensions, self.by_id.values().copied())
    }

    /// Check the dual-index invariants, returning every violation found.
    ///
    /// An empty result means: every indexed position maps to an entity whose
    /// stored position equals the key, every entity is reachable from its
    /// position, and no entity lies outside the grid. Position uniqueness
    /// follows from the position index being a map.
    pub fn verify(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        for (&position, &entity_id) in &self.by_position {
            match self.by_id.get(&entity_id) {
                None => violations.push(IntegrityViolation::DanglingPosition {
                    position,
                    entity_id,
                }),
                Some(entity) if entity.position() != position => {
                    violations.push(IntegrityViolation::PositionMismatch {
                        indexed_at: position,
                        entity_id,
                        stored: entity.position(),
                    });
                }
                Some(_) => {}
            }
        }

        for (&entity_id, entity) in &self.by_id {
            let position = entity.position();
            if self.by_position.get(&position) != Some(&entity_id) {
                violations.push(IntegrityViolation::UnindexedEntity {
                    entity_id,
                    position,
                });
            }
            if !self.dimensions.contains(position) {
                violations.push(IntegrityViolation::OutOfBounds {
                    entity_id,
                    position,
                });
            }
        }

        violations
    }

    // -----------------------------------------------------------------------
    // Checked mutations
    // -----------------------------------------------------------------------

    pub(crate) fn place(
        &mut self,
        position: Position,
        category: Category,
    ) -> Result<Entity, GridError> {
        self.dimensions.check(position)?;
        if let Some(&occupant) = self.by_position.get(&position) {
            return Err(GridError::PositionOccupied { position, occupant });
        }
        // The identity is minted here, under the write lock, exactly once.
        let entity = Entity::spawn(position, category);
        self.insert_unchecked(entity);
        Ok(entity)
    }

    pub(crate) fn remove(&mut self, position: Position) -> Result<Entity, GridError> {
        self.dimensions.check(position)?;
        let Some(&entity_id) = self.by_position.get(&position) else {
            return Err(GridError::PositionEmpty { position });
        };
        let Some(entity) = self.by_id.remove(&entity_id) else {
            return Err(GridError::IndexMismatch {
                position,
                entity_id,
            });
        };
        self.by_position.remove(&position);
        Ok(entity)
    }

    /// Move the entity at `from` to the empty cell `to`.
    ///
    /// Returns `(before, after)` values of the moved entity.
    pub(crate) fn move_entity(
        &mut self,
        from: Position,
        to: Position,
    ) -> Result<(Entity, Entity), GridError> {
        self.dimensions.check(from)?;
        self.dimensions.check(to)?;
        let Some(&entity_id) = self.by_position.get(&from) else {
            return Err(GridError::PositionEmpty { position: from });
        };
        if let Some(&occupant) = self.by_position.get(&to) {
            return Err(GridError::PositionOccupied {
                position: to,
                occupant,
            });
        }

        self.by_position.remove(&from);
        self.by_position.insert(to, entity_id);

        let Some(slot) = self.by_id.get_mut(&entity_id) else {
            // Restore the position index before reporting.
            self.by_position.remove(&to);
            self.by_position.insert(from, entity_id);
            return Err(GridError::IndexMismatch {
                position: from,
                entity_id,
            });
        };
        let before = *slot;
        let after = before.relocated(to);
        *slot = after;
        Ok((before, after))
    }

    // -----------------------------------------------------------------------
    // Unchecked primitives (used by undo replay)
    // -----------------------------------------------------------------------

    pub(crate) fn insert_unchecked(&mut self, entity: Entity) {
        self.by_position.insert(entity.position(), entity.id());
        self.by_id.insert(entity.id(), entity);
    }

    pub(crate) fn delete_unchecked(&mut self, entity: &Entity) {
        self.by_position.remove(&entity.position());
        self.by_id.remove(&entity.id());
    }

    #[cfg(test)]
    pub(crate) fn corrupt_drop_id(&mut self, entity_id: EntityId) {
        self.by_id.remove(&entity_id);
    }
}

impl GridView for GridIndex {
    fn entity_at(&self, position: Position) -> Option<&Entity> {
        self.get_by_position(position)
    }

    fn contains(&self, position: Position) -> bool {
        self.dimensions.contains(position)
    }
}
