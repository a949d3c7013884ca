//! Observer that writes every notification to the log and keeps totals.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use blocklife_core::{Observer, ObserverError};
use blocklife_types::{Effect, Notification};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Running totals shared between the observer and the host.
#[derive(Debug, Default)]
pub struct Tally {
    placed: AtomicU64,
    removed: AtomicU64,
    moved: AtomicU64,
    merged: AtomicU64,
    reward: Mutex<Decimal>,
}

impl Tally {
    /// Total reward across all merges seen so far.
    pub fn reward(&self) -> Decimal {
        *self
            .reward
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Log the totals.
    pub fn log(&self) {
        info!(
            placed = self.placed.load(Ordering::Relaxed),
            removed = self.removed.load(Ordering::Relaxed),
            moved = self.moved.load(Ordering::Relaxed),
            merged = self.merged.load(Ordering::Relaxed),
            reward = %self.reward(),
            "Notification totals"
        );
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Logs notifications and feeds a shared [`Tally`].
pub struct LogObserver {
    tally: Arc<Tally>,
}

impl LogObserver {
    /// Create an observer feeding `tally`.
    pub const fn new(tally: Arc<Tally>) -> Self {
        Self { tally }
    }
}

impl Observer for LogObserver {
    fn on_notification(&mut self, notification: &Notification) -> Result<(), ObserverError> {
        let sequence = notification.sequence;
        match &notification.effect {
            Effect::Placed {
                entity_id,
                position,
                category,
                ..
            } => {
                Tally::bump(&self.tally.placed);
                debug!(sequence, %entity_id, %position, %category, "block placed");
            }
            Effect::Removed {
                entity_id,
                position,
                category,
                ..
            } => {
                Tally::bump(&self.tally.removed);
                debug!(sequence, %entity_id, %position, %category, "block removed");
            }
            Effect::Moved {
                entity_id, from, to, ..
            } => {
                Tally::bump(&self.tally.moved);
                debug!(sequence, %entity_id, %from, %to, "block moved");
            }
            Effect::Merged {
                consumed,
                produced_position,
                produced_category,
                reward,
                chain_depth,
                ..
            } => {
                Tally::bump(&self.tally.merged);
                let mut total = self
                    .tally
                    .reward
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                *total = total.saturating_add(*reward);
                info!(
                    sequence,
                    consumed = consumed.len(),
                    position = %produced_position,
                    category = %produced_category,
                    %reward,
                    chain_depth,
                    "blocks merged"
                );
            }
        }
        Ok(())
    }
}
