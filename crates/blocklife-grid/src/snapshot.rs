//! Owned, point-in-time copies of grid contents.

use std::collections::HashMap;

use blocklife_types::{Entity, GridView, Position};

use crate::dimensions::GridDimensions;

/// A read-only copy of the grid, detached from the live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    dimensions: GridDimensions,
    cells: HashMap<Position, Entity>,
}

impl GridSnapshot {
    /// Build a snapshot from a set of entities.
    pub fn new(dimensions: GridDimensions, entities: impl IntoIterator<Item = Entity>) -> Self {
        let cells = entities
            .into_iter()
            .map(|entity| (entity.position(), entity))
            .collect();
        Self { dimensions, cells }
    }

    /// The grid bounds at the time of the snapshot.
    pub const fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    /// Number of entities captured.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the snapshot holds no entities.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All captured entities, sorted by position.
    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.cells.values().copied().collect();
        entities.sort_by_key(Entity::position);
        entities
    }
}

impl GridView for GridSnapshot {
    fn entity_at(&self, position: Position) -> Option<&Entity> {
        self.cells.get(&position)
    }

    fn contains(&self, position: Position) -> bool {
        self.dimensions.contains(position)
    }
}
