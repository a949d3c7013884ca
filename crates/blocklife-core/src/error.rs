//! Error types for the `blocklife-core` crate.
//!
//! Configuration errors live with the loader in [`crate::config`].

use blocklife_grid::GridError;
use blocklife_pattern::PatternError;
use blocklife_types::EffectValidationError;

/// Errors from the effect queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// The effect failed validation and was not enqueued.
    #[error("invalid effect: {reason}")]
    InvalidEffect {
        /// Why the effect was rejected.
        reason: EffectValidationError,
    },
}

/// Errors an observer reports back to the bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    /// The observer could not handle the notification.
    #[error("observer rejected notification: {reason}")]
    Rejected {
        /// Free-form explanation.
        reason: String,
    },
}

impl ObserverError {
    /// Shorthand for [`ObserverError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors from the simulation runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RunnerError {
    /// Another drain is running, possibly further up this thread's stack.
    #[error("a drain is already in progress")]
    DrainInProgress,
}

/// Errors returned to command submitters.
///
/// A command that fails with any of these left the grid untouched and
/// enqueued nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The grid rejected the command.
    #[error("grid error: {source}")]
    Grid {
        /// The underlying grid error.
        #[from]
        source: GridError,
    },

    /// Pattern evaluation failed.
    #[error("pattern error: {source}")]
    Pattern {
        /// The underlying pattern error.
        #[from]
        source: PatternError,
    },

    /// The resulting effects could not be enqueued.
    #[error("queue error: {source}")]
    Queue {
        /// The underlying queue error.
        #[from]
        source: QueueError,
    },
}
