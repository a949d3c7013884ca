//! Simulation pipeline for BlockLife.
//!
//! Commands enter through [`Simulation::submit`]. Each one is validated,
//! applied to the grid, resolved through any chain reaction, and recorded as
//! [`Effect`](blocklife_types::Effect)s on the [`EffectQueue`], all inside a
//! single grid transaction. The [`SimulationRunner`] is the only holder of
//! the [`Publisher`]: it drains the queue and publishes exactly one
//! [`Notification`](blocklife_types::Notification) per effect to the
//! [`NotificationBus`].
//!
//! # Lock order
//!
//! Grid, then queue. The runner holds its drain lock and the queue lock, but
//! never the grid lock, so observers may submit commands from a callback.
//!
//! # Modules
//!
//! - [`bus`] -- Subscriber registry, RAII subscriptions, guarded delivery
//! - [`chain`] -- Chain-reaction driver with depth cap and visited set
//! - [`command`] -- External commands and their outcomes
//! - [`config`] -- YAML configuration for the whole simulation
//! - [`error`] -- Error types for every stage of the pipeline
//! - [`queue`] -- Multi-producer, single-consumer effect queue
//! - [`runner`] -- Drains effects and publishes notifications
//! - [`scheduler`] -- Async loop that calls the runner at a cadence
//! - [`simulation`] -- The command facade

pub mod bus;
pub mod chain;
pub mod command;
pub mod config;
pub mod error;
pub mod queue;
pub mod runner;
pub mod scheduler;
pub mod simulation;

pub use bus::{DeliveryReport, NotificationBus, Observer, Publisher, Subscription, SubscriptionId};
pub use chain::ChainOutcome;
pub use command::{Command, CommandOutcome};
pub use config::{ConfigError, SimulationConfig};
pub use error::{ObserverError, QueueError, RunnerError, SimulationError};
pub use queue::{EffectQueue, EffectReceiver, EffectSender};
pub use runner::{RunnerStats, SimulationRunner};
pub use scheduler::{SchedulerControl, SchedulerEndReason, SchedulerSummary, run_scheduler};
pub use simulation::Simulation;
