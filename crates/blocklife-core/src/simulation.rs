//! The command facade.
//!
//! [`Simulation`] owns the grid and the pattern engine, and holds only the
//! producer side of the effect queue. It cannot publish notifications.

use blocklife_grid::{GridDimensions, GridError, GridSnapshot, GridState, IntegrityViolation};
use blocklife_pattern::PatternEngine;
use blocklife_types::{Effect, Entity, EntityId, GridView, Position};
use tracing::{debug, info};

use crate::bus::NotificationBus;
use crate::chain::{self, ChainOutcome};
use crate::command::{Command, CommandOutcome};
use crate::config::SimulationConfig;
use crate::error::SimulationError;
use crate::queue::{EffectQueue, EffectSender};
use crate::runner::SimulationRunner;

/// Validates and applies commands, recording each as queued effects.
#[derive(Debug)]
pub struct Simulation {
    grid: GridState,
    engine: PatternEngine,
    effects: EffectSender,
}

impl Simulation {
    /// Assemble a simulation from its parts.
    pub const fn new(grid: GridState, engine: PatternEngine, effects: EffectSender) -> Self {
        Self {
            grid,
            engine,
            effects,
        }
    }

    /// Build the whole pipeline from configuration.
    ///
    /// Returns the command facade, the runner that publishes its effects,
    /// and the bus observers subscribe to.
    pub fn from_config(
        config: &SimulationConfig,
    ) -> Result<(Self, SimulationRunner, NotificationBus), SimulationError> {
        let dimensions = config.grid.dimensions()?;
        let engine = PatternEngine::new(config.patterns.clone())?;
        let (sender, receiver) = EffectQueue::new();
        let (bus, publisher) = NotificationBus::new();
        let runner = SimulationRunner::new(receiver, publisher, &config.runner);

        info!(
            width = dimensions.width(),
            height = dimensions.height(),
            patterns = engine.config().definitions.len(),
            max_chain_depth = engine.max_chain_depth(),
            "Simulation initialized"
        );

        let simulation = Self::new(GridState::with_dimensions(dimensions), engine, sender);
        Ok((simulation, runner, bus))
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Check a command against the current grid without changing anything.
    pub fn validate(&self, command: &Command) -> Result<(), SimulationError> {
        self.grid
            .with_view(|index| check(index, index.dimensions(), command))?;
        Ok(())
    }

    /// Apply a command and every chain reaction it triggers.
    ///
    /// Validation, mutation, chain resolution and enqueueing happen under a
    /// single grid transaction. On error the grid is restored and nothing is
    /// enqueued.
    pub fn submit(&self, command: Command) -> Result<CommandOutcome, SimulationError> {
        let result = self.grid.transact(|tx| -> Result<CommandOutcome, SimulationError> {
            check(&*tx, tx.dimensions(), &command)?;

            let (entity, effect) = match command {
                Command::Place { position, category } => {
                    let entity = tx.place(position, category)?;
                    (entity, placed_effect(&entity))
                }
                Command::Remove { position } => {
                    let entity = tx.remove(position)?;
                    let effect = Effect::Removed {
                        entity_id: entity.id(),
                        position,
                        category: entity.category(),
                        at: chrono::Utc::now(),
                    };
                    (entity, effect)
                }
                Command::Move { from, to } => {
                    let entity = tx.move_entity(from, to)?;
                    let effect = Effect::Moved {
                        entity_id: entity.id(),
                        category: entity.category(),
                        from,
                        to,
                        at: chrono::Utc::now(),
                    };
                    (entity, effect)
                }
            };

            let chain = match command.trigger() {
                Some(trigger) => chain::resolve(tx, &self.engine, trigger)?,
                None => ChainOutcome::default(),
            };

            let mut effects = Vec::with_capacity(chain.effects.len().saturating_add(1));
            effects.push(effect);
            effects.extend(chain.effects.iter().cloned());
            let effect_ids = self.effects.enqueue_batch(effects)?;

            Ok(CommandOutcome {
                entity,
                effect_ids,
                chain,
            })
        });

        match &result {
            Ok(outcome) => debug!(
                command = command.name(),
                entity = %outcome.entity.id(),
                effects = outcome.effect_ids.len(),
                merges = outcome.chain.merges(),
                "command committed"
            ),
            Err(error) => debug!(command = command.name(), %error, "command rejected"),
        }
        result
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// The entity at `position`.
    pub fn get_by_position(&self, position: Position) -> Option<Entity> {
        self.grid.get_by_position(position)
    }

    /// The entity with identity `id`.
    pub fn get_by_id(&self, id: EntityId) -> Option<Entity> {
        self.grid.get_by_id(id)
    }

    /// Occupied neighbours of `position`, North, East, South, West.
    pub fn get_adjacent(&self, position: Position) -> Vec<Entity> {
        self.grid.get_adjacent(position)
    }

    /// An owned copy of the grid.
    pub fn snapshot(&self) -> GridSnapshot {
        self.grid.snapshot()
    }

    /// Grid bounds.
    pub fn dimensions(&self) -> GridDimensions {
        self.grid.dimensions()
    }

    /// Number of blocks on the grid.
    pub fn entity_count(&self) -> usize {
        self.grid.len()
    }

    /// Check the grid's dual-index invariants.
    pub fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        self.grid.verify_integrity()
    }

    /// Whether effects are waiting for the runner.
    pub fn has_pending_effects(&self) -> bool {
        self.effects.has_pending()
    }

    /// The pattern engine in use.
    pub const fn engine(&self) -> &PatternEngine {
        &self.engine
    }
}

/// Pre-flight checks shared by [`Simulation::validate`] and
/// [`Simulation::submit`].
fn check<V: GridView + ?Sized>(
    view: &V,
    dimensions: GridDimensions,
    command: &Command,
) -> Result<(), GridError> {
    let occupied = |position: Position| -> Result<(), GridError> {
        dimensions.check(position)?;
        if view.entity_at(position).is_none() {
            return Err(GridError::PositionEmpty { position });
        }
        Ok(())
    };
    let vacant = |position: Position| -> Result<(), GridError> {
        dimensions.check(position)?;
        if let Some(occupant) = view.entity_at(position) {
            return Err(GridError::PositionOccupied {
                position,
                occupant: occupant.id(),
            });
        }
        Ok(())
    };

    match *command {
        Command::Place { position, .. } => vacant(position),
        Command::Remove { position } => occupied(position),
        Command::Move { from, to } => {
            dimensions.check(from)?;
            dimensions.check(to)?;
            occupied(from)?;
            vacant(to)
        }
    }
}

fn placed_effect(entity: &Entity) -> Effect {
    Effect::Placed {
        entity_id: entity.id(),
        position: entity.position(),
        category: entity.category(),
        at: entity.created_at(),
    }
}
