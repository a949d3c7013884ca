//! Shared type definitions for the BlockLife simulation core.
//!
//! This crate is the single source of truth for the values that flow between
//! the grid, the pattern engine, the effect queue, and external observers.
//! Everything here is plain data: no locks, no I/O.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entity and effect identifiers
//! - [`position`] -- Grid coordinates and cardinal directions
//! - [`entity`] -- Block categories and the immutable [`Entity`] value
//! - [`effect`] -- [`Effect`] records describing committed state changes
//! - [`notification`] -- The externally observable [`Notification`]
//! - [`view`] -- The read-only [`GridView`] abstraction over grid contents

pub mod effect;
pub mod entity;
pub mod ids;
pub mod notification;
pub mod position;
pub mod view;

// Re-export all public types at crate root for convenience.
pub use effect::{ConsumedEntity, Effect, EffectValidationError, QueuedEffect};
pub use entity::{BlockKind, Category, Entity};
pub use ids::{EffectId, EntityId};
pub use notification::{Notification, NotificationType};
pub use position::{Direction, Position};
pub use view::GridView;
