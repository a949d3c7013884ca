//! Error types for the `blocklife-grid` crate.

use blocklife_types::{EntityId, Position};

/// Errors returned by grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// The position lies outside the configured grid.
    #[error("position {position} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// The rejected position.
        position: Position,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// The target cell already holds an entity.
    #[error("position {position} is occupied by {occupant}")]
    PositionOccupied {
        /// The occupied cell.
        position: Position,
        /// The entity already there.
        occupant: EntityId,
    },

    /// The cell holds no entity.
    #[error("position {position} is empty")]
    PositionEmpty {
        /// The empty cell.
        position: Position,
    },

    /// Requested grid dimensions are zero or above the ceiling.
    #[error("invalid grid dimensions {width}x{height} (each side must be 1..={max})")]
    InvalidDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// The maximum allowed per side.
        max: u32,
    },

    /// The position index referenced an entity the id index does not hold.
    /// The operation was rolled back.
    #[error("index mismatch at {position}: entity {entity_id} missing from id index")]
    IndexMismatch {
        /// Position whose index entry was inconsistent.
        position: Position,
        /// The dangling identity.
        entity_id: EntityId,
    },
}

/// One broken invariant found by an integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// The position index points at an id the id index does not contain.
    DanglingPosition {
        /// The indexed cell.
        position: Position,
        /// The missing identity.
        entity_id: EntityId,
    },
    /// An entity's stored position differs from the key it is indexed under.
    PositionMismatch {
        /// The key in the position index.
        indexed_at: Position,
        /// The entity.
        entity_id: EntityId,
        /// The position stored on the entity.
        stored: Position,
    },
    /// An entity reachable by id is not reachable by its position.
    UnindexedEntity {
        /// The entity.
        entity_id: EntityId,
        /// Its stored position.
        position: Position,
    },
    /// An entity sits outside the grid bounds.
    OutOfBounds {
        /// The entity.
        entity_id: EntityId,
        /// Its stored position.
        position: Position,
    },
}
