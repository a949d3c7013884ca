//! The engine's output: a merge that could be applied.

use blocklife_types::{Category, Entity, Position};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A merge the engine found, not yet applied to any grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTransformation {
    /// Name of the matched pattern definition.
    pub pattern: String,
    /// The shared category of every consumed entity.
    pub category: Category,
    /// Entities to consume, sorted by position.
    pub consumed: Vec<Entity>,
    /// Category of the entity to produce.
    pub produced_category: Category,
    /// Cell of the entity to produce. Always one of the consumed cells.
    pub produced_position: Position,
    /// Reward for applying this transformation.
    pub reward: Decimal,
    /// The position evaluation started from.
    pub trigger: Position,
}

impl ProposedTransformation {
    /// Number of consumed entities.
    pub fn group_size(&self) -> usize {
        self.consumed.len()
    }

    /// Positions of the consumed entities, sorted.
    pub fn consumed_positions(&self) -> Vec<Position> {
        self.consumed.iter().map(Entity::position).collect()
    }

    /// The lowest consumed position, used by the tie-break.
    pub fn lowest_position(&self) -> Option<Position> {
        self.consumed.first().map(Entity::position)
    }
}
