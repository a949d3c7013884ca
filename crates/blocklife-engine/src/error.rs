//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and shutdown so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: blocklife_core::ConfigError,
    },

    /// The simulation could not be built from configuration.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: blocklife_core::SimulationError,
    },

    /// The grid indexes disagreed at shutdown.
    #[error("grid integrity check failed with {violations} violation(s)")]
    Integrity {
        /// Number of violations found.
        violations: usize,
    },
}
