//! The pattern engine.
//!
//! # Tie-break
//!
//! All candidate groups found at a trigger, across every definition, are
//! ordered by:
//!
//! 1. group size, largest first;
//! 2. lowest member position, ascending (`x`, then `y`);
//! 3. definition order in the configuration.
//!
//! Candidates are then taken greedily in that order; a candidate sharing any
//! cell with an already-taken one is dropped. The result never depends on
//! hash map iteration order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use blocklife_types::{Category, GridView, Position};
use tracing::{debug, trace};

use crate::config::{Anchor, PatternConfig, PatternDefinition, PatternShape};
use crate::error::PatternError;
use crate::matcher::{ensure_homogeneous, match_shape};
use crate::transformation::ProposedTransformation;

/// One group found by a matcher, before selection.
struct Candidate<'a> {
    definition: &'a PatternDefinition,
    order: usize,
    members: Vec<Position>,
    produced_category: Category,
}

impl Candidate<'_> {
    fn priority(&self, other: &Self) -> Ordering {
        other
            .members
            .len()
            .cmp(&self.members.len())
            .then_with(|| self.members.first().cmp(&other.members.first()))
            .then_with(|| self.order.cmp(&other.order))
    }
}

/// Evaluates pattern definitions against grid views. Holds no grid state.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    config: PatternConfig,
}

impl PatternEngine {
    /// Build an engine from a validated configuration.
    pub fn new(config: PatternConfig) -> Result<Self, PatternError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub const fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Maximum chain-reaction depth.
    pub const fn max_chain_depth(&self) -> u32 {
        self.config.max_chain_depth
    }

    /// Find the transformations triggered at `trigger`.
    ///
    /// Returns an empty list when the trigger cell is empty or nothing
    /// matches. Selected transformations never share a cell.
    pub fn evaluate<V: GridView + ?Sized>(
        &self,
        view: &V,
        trigger: Position,
    ) -> Result<Vec<ProposedTransformation>, PatternError> {
        let Some(trigger_entity) = view.entity_at(trigger) else {
            return Ok(Vec::new());
        };
        let category = trigger_entity.category();

        let mut candidates = self.collect_candidates(view, trigger, category);
        candidates.sort_by(Candidate::priority);

        let mut claimed = BTreeSet::new();
        let mut proposals = Vec::new();
        for candidate in candidates {
            if candidate.members.iter().any(|p| claimed.contains(p)) {
                trace!(pattern = %candidate.definition.name, "overlapping candidate dropped");
                continue;
            }
            let consumed = ensure_homogeneous(view, &candidate.members, category)?;
            claimed.extend(candidate.members.iter().copied());

            let definition = candidate.definition;
            let produced_position = match definition.anchor {
                Anchor::Trigger if candidate.members.contains(&trigger) => trigger,
                Anchor::Trigger | Anchor::LowestPosition => {
                    candidate.members.first().copied().unwrap_or(trigger)
                }
            };
            let reward = definition.reward.reward(
                category.tier,
                consumed.len(),
                definition.min_group_size,
            );

            proposals.push(ProposedTransformation {
                pattern: definition.name.clone(),
                category,
                consumed,
                produced_category: candidate.produced_category,
                produced_position,
                reward,
                trigger,
            });
        }

        if !proposals.is_empty() {
            debug!(
                %trigger,
                %category,
                proposals = proposals.len(),
                "pattern match"
            );
        }
        Ok(proposals)
    }

    fn collect_candidates<'a, V: GridView + ?Sized>(
        &'a self,
        view: &V,
        trigger: Position,
        category: Category,
    ) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = Vec::new();

        for (order, definition) in self.config.definitions.iter().enumerate() {
            let Some(produced_category) = category
                .promoted(definition.tier_step)
                .filter(|produced| produced.tier <= self.config.max_tier)
            else {
                trace!(pattern = %definition.name, %category, "tier cap reached");
                continue;
            };

            let threshold = match definition.shape {
                PatternShape::Line { length } => length.max(definition.min_group_size),
                PatternShape::Cluster | PatternShape::Template { .. } => {
                    definition.min_group_size
                }
            };

            for members in match_shape(view, &definition.shape, trigger, category) {
                if members.len() < threshold {
                    continue;
                }
                let duplicate = candidates
                    .iter()
                    .any(|c| c.order == order && c.members == members);
                if !duplicate {
                    candidates.push(Candidate {
                        definition,
                        order,
                        members,
                        produced_category,
                    });
                }
            }
        }

        candidates
    }
}
