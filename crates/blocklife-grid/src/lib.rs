//! Authoritative grid state for the BlockLife simulation.
//!
//! The grid keeps two indices over the same set of entities: one keyed by
//! [`Position`](blocklife_types::Position), one keyed by
//! [`EntityId`](blocklife_types::EntityId). Both live behind a single
//! [`RwLock`](std::sync::RwLock) so every public operation sees them in
//! agreement.
//!
//! # Modules
//!
//! - [`dimensions`] -- Validated grid bounds with a hard size ceiling
//! - [`error`] -- [`GridError`] and integrity violations
//! - [`index`] -- The dual index itself and its integrity check
//! - [`transaction`] -- Compound mutations with an undo journal
//! - [`snapshot`] -- Owned, read-only copies of grid contents
//! - [`state`] -- [`GridState`], the thread-safe public entry point

pub mod dimensions;
pub mod error;
pub mod index;
pub mod snapshot;
pub mod state;
pub mod transaction;

pub use dimensions::{GridDimensions, MAX_GRID_DIMENSION};
pub use error::{GridError, IntegrityViolation};
pub use index::GridIndex;
pub use snapshot::GridSnapshot;
pub use state::GridState;
pub use transaction::GridTransaction;
