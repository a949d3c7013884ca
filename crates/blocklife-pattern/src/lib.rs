//! Pattern evaluation for the BlockLife simulation.
//!
//! Everything in this crate is pure: [`PatternEngine::evaluate`] reads a
//! [`GridView`](blocklife_types::GridView) and returns proposals. Applying a
//! proposal, and re-evaluating at the produced position, is the job of the
//! chain driver in `blocklife-core`.
//!
//! # Modules
//!
//! - [`config`] -- Injected pattern definitions, shapes and reward tables
//! - [`engine`] -- [`PatternEngine`] and the deterministic tie-break
//! - [`error`] -- [`PatternError`]
//! - [`matcher`] -- Shape matching against a grid view
//! - [`transformation`] -- [`ProposedTransformation`], the engine's output

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod transformation;

pub use config::{Anchor, PatternConfig, PatternDefinition, PatternShape, RewardTable};
pub use engine::PatternEngine;
pub use error::PatternError;
pub use matcher::ensure_homogeneous;
pub use transformation::ProposedTransformation;
