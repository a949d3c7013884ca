//! Configuration loading and typed config structures for BlockLife.
//!
//! The canonical configuration lives in `blocklife-config.yaml` at the
//! project root. Every section is optional; missing sections and fields fall
//! back to the defaults below.

use std::path::Path;

use blocklife_grid::{GridDimensions, GridError};
use blocklife_pattern::PatternConfig;
use blocklife_types::{Category, Position};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `blocklife-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Grid size.
    #[serde(default)]
    pub grid: GridConfig,

    /// Pattern definitions and chain limits.
    #[serde(default)]
    pub patterns: PatternConfig,

    /// Effect runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Scheduler loop settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Blocks the host places at startup.
    #[serde(default)]
    pub seed: Vec<SeedBlock>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Grid size configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_grid_side")]
    pub width: u32,

    /// Number of rows.
    #[serde(default = "default_grid_side")]
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_side(),
            height: default_grid_side(),
        }
    }
}

impl GridConfig {
    /// Validate the configured size.
    pub const fn dimensions(self) -> Result<GridDimensions, GridError> {
        GridDimensions::new(self.width, self.height)
    }
}

/// Effect runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    /// How many recently published effect ids are remembered for
    /// duplicate detection.
    #[serde(default = "default_dedupe_window")]
    pub dedupe_window: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dedupe_window: default_dedupe_window(),
        }
    }
}

/// Scheduler loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Milliseconds between drains.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Stop after this many drain cycles (0 = unlimited).
    #[serde(default)]
    pub max_cycles: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_cycles: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// One block placed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SeedBlock {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Block family.
    pub kind: u32,
    /// Tier.
    #[serde(default = "default_seed_tier")]
    pub tier: u8,
}

impl SeedBlock {
    /// Where the block goes.
    pub const fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// The block's category.
    pub const fn category(&self) -> Category {
        Category::new(self.kind, self.tier)
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_grid_side() -> u32 {
    10
}

const fn default_dedupe_window() -> usize {
    1024
}

const fn default_interval_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_seed_tier() -> u8 {
    1
}
