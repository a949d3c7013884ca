//! The externally observable counterpart of an [`Effect`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::effect::{Effect, QueuedEffect};
use crate::ids::EffectId;

/// Discriminant tag for notifications, used for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// A block was placed.
    BlockPlaced,
    /// A block was removed.
    BlockRemoved,
    /// A block moved.
    BlockMoved,
    /// A group of blocks merged.
    BlocksMerged,
}

impl NotificationType {
    /// The notification type published for an effect.
    pub const fn of(effect: &Effect) -> Self {
        match effect {
            Effect::Placed { .. } => Self::BlockPlaced,
            Effect::Removed { .. } => Self::BlockRemoved,
            Effect::Moved { .. } => Self::BlockMoved,
            Effect::Merged { .. } => Self::BlocksMerged,
        }
    }
}

/// A domain event delivered to observers, exactly one per processed effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Publication order, starting at 1.
    pub sequence: u64,
    /// The effect this notification reports.
    pub effect_id: EffectId,
    /// Discriminant of the payload.
    pub notification_type: NotificationType,
    /// A copy of the committed change.
    pub effect: Effect,
    /// When the notification was published.
    pub published_at: DateTime<Utc>,
}

impl Notification {
    /// Build the notification for a queued effect.
    pub fn from_effect(sequence: u64, queued: &QueuedEffect) -> Self {
        Self {
            sequence,
            effect_id: queued.id,
            notification_type: NotificationType::of(&queued.effect),
            effect: queued.effect.clone(),
            published_at: Utc::now(),
        }
    }
}
