//! Block categories and the immutable [`Entity`] value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::position::Position;

/// The family a block belongs to (wood, stone, ...). Opaque to the core;
/// meaning is assigned by injected configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockKind(pub u32);

impl core::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "kind-{}", self.0)
    }
}

/// The classifier that decides merge eligibility: two blocks can only be
/// grouped together when their categories are equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Category {
    /// Block family.
    pub kind: BlockKind,
    /// Tier within the family, starting at 1.
    pub tier: u8,
}

impl Category {
    /// Create a category from a raw kind and tier.
    pub const fn new(kind: u32, tier: u8) -> Self {
        Self {
            kind: BlockKind(kind),
            tier,
        }
    }

    /// The same family promoted by `steps` tiers, or `None` on overflow.
    pub const fn promoted(self, steps: u8) -> Option<Self> {
        let Some(tier) = self.tier.checked_add(steps) else {
            return None;
        };
        Some(Self {
            kind: self.kind,
            tier,
        })
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/t{}", self.kind, self.tier)
    }
}

/// One occupant of a grid cell.
///
/// Entities are values: the grid hands out copies and never exposes a
/// mutable reference. A move produces a new value through
/// [`Entity::relocated`] that keeps the same [`EntityId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    position: Position,
    category: Category,
    created_at: DateTime<Utc>,
}

impl Entity {
    /// Mint a new entity with a fresh identity.
    pub fn spawn(position: Position, category: Category) -> Self {
        Self {
            id: EntityId::new(),
            position,
            category,
            created_at: Utc::now(),
        }
    }

    /// The stable identity of this entity.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// The cell this entity occupies.
    pub const fn position(&self) -> Position {
        self.position
    }

    /// The merge classifier of this entity.
    pub const fn category(&self) -> Category {
        self.category
    }

    /// When the entity was created.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The same entity at a new position.
    #[must_use]
    pub const fn relocated(&self, position: Position) -> Self {
        Self {
            id: self.id,
            position,
            category: self.category,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocated_keeps_identity_and_category() {
        let entity = Entity::spawn(Position::new(1, 1), Category::new(3, 1));
        let moved = entity.relocated(Position::new(2, 1));

        assert_eq!(moved.id(), entity.id());
        assert_eq!(moved.category(), entity.category());
        assert_eq!(moved.created_at(), entity.created_at());
        assert_eq!(moved.position(), Position::new(2, 1));
    }

    #[test]
    fn spawn_mints_distinct_ids() {
        let a = Entity::spawn(Position::new(0, 0), Category::new(1, 1));
        let b = Entity::spawn(Position::new(0, 0), Category::new(1, 1));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn promoted_increments_tier() {
        let category = Category::new(7, 2);
        assert_eq!(category.promoted(1), Some(Category::new(7, 3)));
        assert_eq!(Category::new(7, u8::MAX).promoted(1), None);
    }

    #[test]
    fn categories_differ_by_tier() {
        assert_ne!(Category::new(1, 1), Category::new(1, 2));
        assert_ne!(Category::new(1, 1), Category::new(2, 1));
    }
}
