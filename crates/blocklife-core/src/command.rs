//! Commands submitted by external collaborators.

use blocklife_types::{Category, EffectId, Entity, Position};
use serde::{Deserialize, Serialize};

use crate::chain::ChainOutcome;

/// A request to change the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Place a new block on an empty cell.
    Place {
        /// Target cell.
        position: Position,
        /// Category of the new block.
        category: Category,
    },
    /// Remove the block on a cell.
    Remove {
        /// Target cell.
        position: Position,
    },
    /// Move a block to an empty cell.
    Move {
        /// Source cell.
        from: Position,
        /// Destination cell.
        to: Position,
    },
}

impl Command {
    /// Where pattern evaluation starts after this command, if anywhere.
    ///
    /// Removals never create a group, so they trigger nothing.
    pub const fn trigger(&self) -> Option<Position> {
        match self {
            Self::Place { position, .. } => Some(*position),
            Self::Move { to, .. } => Some(*to),
            Self::Remove { .. } => None,
        }
    }

    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Place { .. } => "place",
            Self::Remove { .. } => "remove",
            Self::Move { .. } => "move",
        }
    }
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// The entity the command acted on: the placed block, the removed block,
    /// or the moved block at its new position.
    pub entity: Entity,
    /// Ids of every effect enqueued, in queue order. The command's own effect
    /// comes first, followed by one per chain step.
    pub effect_ids: Vec<EffectId>,
    /// The chain reaction the command set off.
    pub chain: ChainOutcome,
}
