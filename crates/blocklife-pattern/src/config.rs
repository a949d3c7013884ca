//! Injected pattern configuration.
//!
//! Pattern shapes, group sizes and reward tables are data, not code. They
//! are deserialized from the `patterns` section of `blocklife-config.yaml`
//! and checked once by [`PatternConfig::validate`] before an engine is built.

use std::collections::{BTreeMap, BTreeSet};

use blocklife_types::Position;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PatternError;

/// The geometric rule a group must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternShape {
    /// All same-category entities 4-connected to the trigger.
    Cluster,
    /// A straight horizontal or vertical run through the trigger.
    Line {
        /// Minimum run length.
        length: usize,
    },
    /// A fixed set of cells, given as offsets from an origin. Every
    /// placement of the template that covers the trigger is tried.
    Template {
        /// Relative offsets of the template cells.
        cells: Vec<Position>,
    },
}

/// Where the produced entity is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// At the trigger position.
    #[default]
    Trigger,
    /// At the lowest member position (`x`, then `y`).
    LowestPosition,
}

/// Reward scaling for one pattern.
///
/// `reward = base * tier_multiplier(tier) + per_extra_block * (size - min_group_size)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTable {
    /// Reward for a minimum-size group.
    #[serde(default = "default_base_reward")]
    pub base: Decimal,

    /// Bonus for every member beyond the minimum group size.
    #[serde(default = "default_per_extra_block")]
    pub per_extra_block: Decimal,

    /// Multiplier applied to `base`, keyed by the consumed tier. Tiers not
    /// listed use a multiplier of one.
    #[serde(default)]
    pub tier_multipliers: BTreeMap<u8, Decimal>,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            base: default_base_reward(),
            per_extra_block: default_per_extra_block(),
            tier_multipliers: BTreeMap::new(),
        }
    }
}

impl RewardTable {
    /// The multiplier for a tier.
    pub fn tier_multiplier(&self, tier: u8) -> Decimal {
        self.tier_multipliers
            .get(&tier)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Reward for consuming `group_size` entities of `tier`.
    ///
    /// Saturates instead of overflowing.
    pub fn reward(&self, tier: u8, group_size: usize, min_group_size: usize) -> Decimal {
        let extra = u64::try_from(group_size.saturating_sub(min_group_size)).unwrap_or(u64::MAX);
        let scaled = self.base.saturating_mul(self.tier_multiplier(tier));
        let bonus = self.per_extra_block.saturating_mul(Decimal::from(extra));
        scaled.saturating_add(bonus)
    }
}

/// One named pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Unique name, reported in transformations and effects.
    pub name: String,

    /// Geometric rule.
    #[serde(default = "default_shape")]
    pub shape: PatternShape,

    /// Smallest group that matches.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,

    /// Tiers added to the consumed category to form the produced one.
    #[serde(default = "default_tier_step")]
    pub tier_step: u8,

    /// Placement of the produced entity.
    #[serde(default)]
    pub anchor: Anchor,

    /// Reward scaling.
    #[serde(default)]
    pub reward: RewardTable,
}

impl PatternDefinition {
    /// The default merge rule: three or more connected equal blocks merge
    /// into one block a tier higher.
    pub fn merge_three() -> Self {
        Self {
            name: "merge-three".to_owned(),
            shape: PatternShape::Cluster,
            min_group_size: default_min_group_size(),
            tier_step: default_tier_step(),
            anchor: Anchor::Trigger,
            reward: RewardTable::default(),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> PatternError {
        PatternError::InvalidDefinition {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn validate(&self) -> Result<(), PatternError> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if self.min_group_size == 0 {
            return Err(self.invalid("min_group_size must be at least 1"));
        }
        match &self.shape {
            PatternShape::Cluster => {}
            PatternShape::Line { length } => {
                if *length == 0 {
                    return Err(self.invalid("line length must be at least 1"));
                }
            }
            PatternShape::Template { cells } => {
                if cells.is_empty() {
                    return Err(self.invalid("template has no cells"));
                }
                let distinct: BTreeSet<&Position> = cells.iter().collect();
                if distinct.len() != cells.len() {
                    return Err(self.invalid("template cells must be distinct"));
                }
                if cells.len() < self.min_group_size {
                    return Err(self.invalid(format!(
                        "template has {} cells but min_group_size is {}",
                        cells.len(),
                        self.min_group_size
                    )));
                }
            }
        }
        if self.reward.base.is_sign_negative() || self.reward.per_extra_block.is_sign_negative() {
            return Err(self.invalid("rewards must not be negative"));
        }
        Ok(())
    }
}

/// The complete set of pattern rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Definitions in priority order; earlier entries win exact ties.
    #[serde(default = "default_definitions")]
    pub definitions: Vec<PatternDefinition>,

    /// Highest tier a transformation may produce.
    #[serde(default = "default_max_tier")]
    pub max_tier: u8,

    /// Maximum number of chain-reaction steps after the triggering one.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            definitions: default_definitions(),
            max_tier: default_max_tier(),
            max_chain_depth: default_max_chain_depth(),
        }
    }
}

impl PatternConfig {
    /// Check every definition and the top-level limits.
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.max_tier == 0 {
            return Err(config_error("max_tier must be at least 1"));
        }
        if self.max_chain_depth == 0 {
            return Err(config_error("max_chain_depth must be at least 1"));
        }
        let mut names = BTreeSet::new();
        for definition in &self.definitions {
            definition.validate()?;
            if !names.insert(definition.name.as_str()) {
                return Err(definition.invalid("duplicate pattern name"));
            }
        }
        Ok(())
    }
}

fn config_error(reason: &str) -> PatternError {
    PatternError::InvalidDefinition {
        name: "config".to_owned(),
        reason: reason.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_base_reward() -> Decimal {
    Decimal::TEN
}

fn default_per_extra_block() -> Decimal {
    Decimal::from(5)
}

const fn default_shape() -> PatternShape {
    PatternShape::Cluster
}

const fn default_min_group_size() -> usize {
    3
}

const fn default_tier_step() -> u8 {
    1
}

fn default_definitions() -> Vec<PatternDefinition> {
    vec![PatternDefinition::merge_three()]
}

const fn default_max_tier() -> u8 {
    9
}

const fn default_max_chain_depth() -> u32 {
    16
}
