//! Chain-reaction driver.
//!
//! After a command changes the grid, the pattern engine is run at the
//! affected position. Every transformation it proposes is applied, and the
//! engine is run again at the produced position, until nothing matches.
//!
//! Termination is guaranteed twice over. A `(position, category)` pair is
//! evaluated at most once per chain, and no step deeper than
//! `max_chain_depth` is applied. Hitting the depth cap is reported in
//! [`ChainOutcome::halted`] and logged; it is not a command failure.
//!
//! The driver works on the caller's [`GridTransaction`], so every step
//! commits (or rolls back) together with the command that triggered it.

use std::collections::{BTreeSet, VecDeque};

use blocklife_grid::GridTransaction;
use blocklife_pattern::{PatternEngine, PatternError, ProposedTransformation, ensure_homogeneous};
use blocklife_types::{Category, ConsumedEntity, Effect, Position};
use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use crate::error::SimulationError;

/// Result of resolving one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOutcome {
    /// One `Merged` effect per applied transformation, in application order.
    pub effects: Vec<Effect>,
    /// Sum of the rewards of every applied transformation.
    pub total_reward: Decimal,
    /// Deepest step applied (0 when only the triggering merge ran).
    pub deepest: u32,
    /// Why the chain stopped early, if it did.
    pub halted: Option<PatternError>,
}

impl ChainOutcome {
    /// Number of transformations applied.
    pub fn merges(&self) -> usize {
        self.effects.len()
    }
}

/// Resolve every transformation reachable from `trigger`.
pub fn resolve(
    tx: &mut GridTransaction<'_>,
    engine: &PatternEngine,
    trigger: Position,
) -> Result<ChainOutcome, SimulationError> {
    let max_depth = engine.max_chain_depth();
    let mut outcome = ChainOutcome::default();
    let mut frontier = VecDeque::from([(trigger, 0_u32)]);
    let mut visited: BTreeSet<(Position, Category)> = BTreeSet::new();

    while let Some((position, depth)) = frontier.pop_front() {
        let Some(entity) = tx.get_by_position(position) else {
            continue;
        };
        if !visited.insert((position, entity.category())) {
            trace!(%position, category = %entity.category(), "already evaluated in this chain");
            continue;
        }

        let proposals = engine.evaluate(&*tx, position)?;
        if proposals.is_empty() {
            continue;
        }
        if depth > max_depth {
            warn!(%trigger, depth, max_depth, "chain depth cap reached");
            outcome.halted = Some(PatternError::ChainDepthExceeded { depth, max_depth });
            break;
        }

        for proposal in proposals {
            let Some(effect) = apply(tx, &proposal, depth)? else {
                continue;
            };
            outcome.total_reward = outcome.total_reward.saturating_add(proposal.reward);
            outcome.deepest = outcome.deepest.max(depth);
            outcome.effects.push(effect);
            frontier.push_back((proposal.produced_position, depth.saturating_add(1)));
        }
    }

    if !outcome.effects.is_empty() {
        debug!(
            %trigger,
            merges = outcome.merges(),
            deepest = outcome.deepest,
            halted = outcome.halted.is_some(),
            "chain resolved"
        );
    }
    Ok(outcome)
}

/// Apply one transformation to the live grid.
///
/// Returns `None` when the grid no longer matches the proposal.
fn apply(
    tx: &mut GridTransaction<'_>,
    proposal: &ProposedTransformation,
    depth: u32,
) -> Result<Option<Effect>, SimulationError> {
    let still_present = proposal
        .consumed
        .iter()
        .all(|entity| tx.get_by_position(entity.position()).map(|e| e.id()) == Some(entity.id()));
    if !still_present {
        debug!(pattern = %proposal.pattern, "stale transformation skipped");
        return Ok(None);
    }
    let positions = proposal.consumed_positions();
    ensure_homogeneous(&*tx, &positions, proposal.category)?;

    let mut consumed = Vec::with_capacity(positions.len());
    for position in positions {
        let removed = tx.remove(position)?;
        consumed.push(ConsumedEntity::from(&removed));
    }
    let produced = tx.place(proposal.produced_position, proposal.produced_category)?;

    trace!(
        pattern = %proposal.pattern,
        produced = %produced.id(),
        category = %produced.category(),
        depth,
        "transformation applied"
    );

    Ok(Some(Effect::Merged {
        consumed,
        produced_id: produced.id(),
        produced_position: produced.position(),
        produced_category: produced.category(),
        reward: proposal.reward,
        chain_depth: depth,
        at: produced.created_at(),
    }))
}
