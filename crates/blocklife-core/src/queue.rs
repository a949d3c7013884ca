//! Multi-producer, single-consumer effect queue.
//!
//! The queue is split into two capabilities. [`EffectSender`] can only add
//! effects and is handed to command handlers; [`EffectReceiver`] can only
//! drain and is owned by the runner. The mutex behind both is private to
//! this module and is never held while anything else is locked or called.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blocklife_types::{Effect, EffectId, QueuedEffect};
use tracing::trace;

use crate::error::QueueError;

/// Shared storage for a queue.
#[derive(Debug, Default)]
pub struct EffectQueue {
    effects: Mutex<VecDeque<QueuedEffect>>,
}

impl EffectQueue {
    /// Create a queue and return its two capabilities.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EffectSender, EffectReceiver) {
        let shared = Arc::new(Self::default());
        (
            EffectSender {
                queue: Arc::clone(&shared),
            },
            EffectReceiver { queue: shared },
        )
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedEffect>> {
        // A VecDeque is never left half-updated by a panic in push or take.
        self.effects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer side of the queue. Cheap to clone and share across threads.
#[derive(Debug, Clone)]
pub struct EffectSender {
    queue: Arc<EffectQueue>,
}

impl EffectSender {
    /// Validate and append one effect, returning its identity.
    pub fn enqueue(&self, effect: Effect) -> Result<EffectId, QueueError> {
        effect
            .validate()
            .map_err(|reason| QueueError::InvalidEffect { reason })?;
        let queued = QueuedEffect::new(effect);
        let id = queued.id;
        self.queue.lock().push_back(queued);
        trace!(effect_id = %id, "effect enqueued");
        Ok(id)
    }

    /// Validate every effect, then append them contiguously.
    ///
    /// Either the whole batch is enqueued, in order, with no other effect
    /// between its members, or nothing is.
    pub fn enqueue_batch(&self, effects: Vec<Effect>) -> Result<Vec<EffectId>, QueueError> {
        for effect in &effects {
            effect
                .validate()
                .map_err(|reason| QueueError::InvalidEffect { reason })?;
        }
        let batch: Vec<QueuedEffect> = effects.into_iter().map(QueuedEffect::new).collect();
        let ids: Vec<EffectId> = batch.iter().map(|queued| queued.id).collect();
        self.queue.lock().extend(batch);
        trace!(count = ids.len(), "effect batch enqueued");
        Ok(ids)
    }

    /// Whether any effect is waiting.
    pub fn has_pending(&self) -> bool {
        !self.queue.lock().is_empty()
    }

    /// Number of waiting effects.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Append an already-identified effect, bypassing id assignment.
    #[cfg(test)]
    pub(crate) fn enqueue_queued(&self, queued: QueuedEffect) {
        self.queue.lock().push_back(queued);
    }
}

/// Consumer side of the queue. Not cloneable: there is one logical consumer.
#[derive(Debug)]
pub struct EffectReceiver {
    queue: Arc<EffectQueue>,
}

impl EffectReceiver {
    /// Atomically take every queued effect, in FIFO order.
    ///
    /// Effects enqueued after this call returns are left for the next drain.
    pub fn drain_all(&mut self) -> Vec<QueuedEffect> {
        let taken = std::mem::take(&mut *self.queue.lock());
        taken.into()
    }

    /// Whether any effect is waiting.
    pub fn has_pending(&self) -> bool {
        !self.queue.lock().is_empty()
    }

    /// Number of waiting effects.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }
}
