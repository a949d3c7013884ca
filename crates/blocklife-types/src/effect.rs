//! Effect records: immutable facts about committed grid changes.
//!
//! An [`Effect`] is created only after the grid has been updated (or inside
//! the same atomic unit as the update). It is never a request. The
//! [`QueuedEffect`] envelope adds the identity and enqueue time used by the
//! effect queue and by duplicate detection in the runner.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entity::{Category, Entity};
use crate::ids::{EffectId, EntityId};
use crate::position::Position;

/// An entity destroyed by a merge, as it was just before consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumedEntity {
    /// Identity of the consumed entity.
    pub entity_id: EntityId,
    /// Cell it occupied.
    pub position: Position,
}

impl From<&Entity> for ConsumedEntity {
    fn from(entity: &Entity) -> Self {
        Self {
            entity_id: entity.id(),
            position: entity.position(),
        }
    }
}

/// A committed grid change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// A new entity was placed on an empty cell.
    Placed {
        /// Identity of the new entity.
        entity_id: EntityId,
        /// Cell it now occupies.
        position: Position,
        /// Its category.
        category: Category,
        /// When the placement committed.
        at: DateTime<Utc>,
    },
    /// An entity was removed from the grid.
    Removed {
        /// Identity of the removed entity.
        entity_id: EntityId,
        /// Cell it occupied.
        position: Position,
        /// Its category.
        category: Category,
        /// When the removal committed.
        at: DateTime<Utc>,
    },
    /// An entity moved to an empty cell, keeping its identity.
    Moved {
        /// Identity of the moved entity.
        entity_id: EntityId,
        /// Its category.
        category: Category,
        /// Cell it left.
        from: Position,
        /// Cell it now occupies.
        to: Position,
        /// When the move committed.
        at: DateTime<Utc>,
    },
    /// A group of same-category entities was consumed and replaced by one
    /// promoted entity.
    Merged {
        /// Entities destroyed by the merge, ordered by position.
        consumed: Vec<ConsumedEntity>,
        /// Identity of the produced entity.
        produced_id: EntityId,
        /// Cell the produced entity occupies.
        produced_position: Position,
        /// Category of the produced entity.
        produced_category: Category,
        /// Reward granted for the merge.
        reward: Decimal,
        /// Zero for a merge triggered directly by a command, incremented
        /// for every chain-reaction step after it.
        chain_depth: u32,
        /// When the merge committed.
        at: DateTime<Utc>,
    },
}

/// Reasons an [`Effect`] is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectValidationError {
    /// A move whose source and destination are the same cell.
    #[error("move from {position} to itself")]
    MoveInPlace {
        /// The repeated position.
        position: Position,
    },

    /// A merge that consumes nothing.
    #[error("merge consumes no entities")]
    EmptyMerge,

    /// The same entity appears twice among consumed entities.
    #[error("entity {entity_id} consumed twice")]
    DuplicateConsumedId {
        /// The repeated identity.
        entity_id: EntityId,
    },

    /// Two consumed entities claim the same cell.
    #[error("position {position} consumed twice")]
    DuplicateConsumedPosition {
        /// The repeated position.
        position: Position,
    },

    /// The produced entity is also listed as consumed.
    #[error("produced entity {entity_id} is also consumed")]
    ProducedAlsoConsumed {
        /// The conflicting identity.
        entity_id: EntityId,
    },
}

impl Effect {
    /// The entity the effect is about: the placed, removed or moved entity,
    /// or the produced entity of a merge.
    pub const fn subject(&self) -> EntityId {
        match self {
            Self::Placed { entity_id, .. }
            | Self::Removed { entity_id, .. }
            | Self::Moved { entity_id, .. } => *entity_id,
            Self::Merged { produced_id, .. } => *produced_id,
        }
    }

    /// When the underlying change committed.
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Placed { at, .. }
            | Self::Removed { at, .. }
            | Self::Moved { at, .. }
            | Self::Merged { at, .. } => *at,
        }
    }

    /// Check the record is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns the first [`EffectValidationError`] found.
    pub fn validate(&self) -> Result<(), EffectValidationError> {
        match self {
            Self::Placed { .. } | Self::Removed { .. } => Ok(()),
            Self::Moved { from, to, .. } => {
                if from == to {
                    return Err(EffectValidationError::MoveInPlace { position: *from });
                }
                Ok(())
            }
            Self::Merged {
                consumed,
                produced_id,
                ..
            } => {
                if consumed.is_empty() {
                    return Err(EffectValidationError::EmptyMerge);
                }
                let mut ids = BTreeSet::new();
                let mut positions = BTreeSet::new();
                for entry in consumed {
                    if entry.entity_id == *produced_id {
                        return Err(EffectValidationError::ProducedAlsoConsumed {
                            entity_id: entry.entity_id,
                        });
                    }
                    if !ids.insert(entry.entity_id) {
                        return Err(EffectValidationError::DuplicateConsumedId {
                            entity_id: entry.entity_id,
                        });
                    }
                    if !positions.insert(entry.position) {
                        return Err(EffectValidationError::DuplicateConsumedPosition {
                            position: entry.position,
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

/// An [`Effect`] with the identity it carries through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEffect {
    /// Unique identity of this effect; the duplicate-publication key.
    pub id: EffectId,
    /// The recorded change.
    pub effect: Effect,
    /// When the effect entered the queue.
    pub enqueued_at: DateTime<Utc>,
}

impl QueuedEffect {
    /// Wrap an effect with a fresh identity.
    pub fn new(effect: Effect) -> Self {
        Self {
            id: EffectId::new(),
            effect,
            enqueued_at: Utc::now(),
        }
    }
}
