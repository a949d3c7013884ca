//! Error types for the `blocklife-pattern` crate.

use blocklife_types::{Category, Position};

/// Errors raised while configuring or evaluating patterns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// A candidate group contains more than one category.
    #[error("mixed categories at {position}: expected {expected}, found {found}")]
    CategoryMismatch {
        /// The offending member.
        position: Position,
        /// Category of the group's trigger.
        expected: Category,
        /// Category of the offending member.
        found: Category,
    },

    /// A group member's cell is empty.
    #[error("group member at {position} is missing")]
    MissingMember {
        /// The empty cell.
        position: Position,
    },

    /// A chain reaction reached its depth cap and was stopped.
    #[error("chain reaction stopped at depth {depth} (max {max_depth})")]
    ChainDepthExceeded {
        /// Depth the chain would have reached.
        depth: u32,
        /// The configured cap.
        max_depth: u32,
    },

    /// A pattern definition or the pattern configuration is unusable.
    #[error("invalid pattern definition '{name}': {reason}")]
    InvalidDefinition {
        /// Name of the definition, or `config` for top-level settings.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}
