//! The single authority for publishing notifications.
//!
//! [`SimulationRunner::process_pending`] drains the effect queue and
//! publishes exactly one [`Notification`] per effect, in FIFO order. It is
//! the only code path that owns a [`Publisher`]; command handlers can reach
//! the queue but never the bus.
//!
//! Only one drain runs at a time. A second caller, on another thread or
//! re-entering from an observer callback, gets
//! [`RunnerError::DrainInProgress`] instead of interleaving its own drain.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};

use blocklife_types::{EffectId, Notification};
use tracing::{debug, warn};

use crate::bus::Publisher;
use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::queue::EffectReceiver;

/// Cumulative runner counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Completed drains, including empty ones.
    pub drains: u64,
    /// Effects published.
    pub published: u64,
    /// Effects skipped because their id was already published.
    pub duplicates_skipped: u64,
    /// Successful observer callbacks.
    pub deliveries: u64,
    /// Observer callbacks that failed or panicked.
    pub delivery_failures: u64,
}

/// Bounded memory of recently published effect ids.
#[derive(Debug)]
struct RecentEffects {
    order: VecDeque<EffectId>,
    seen: HashSet<EffectId>,
    capacity: usize,
}

impl RecentEffects {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record `id`. Returns `false` if it is already remembered.
    fn insert(&mut self, id: EffectId) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }
}

/// Everything only the active drain may touch.
#[derive(Debug)]
struct DrainState {
    receiver: EffectReceiver,
    recent: RecentEffects,
}

/// Drains effects and publishes their notifications.
#[derive(Debug)]
pub struct SimulationRunner {
    drain: Mutex<DrainState>,
    publisher: Publisher,
    next_sequence: AtomicU64,
    stats: Mutex<RunnerStats>,
}

impl SimulationRunner {
    /// Create a runner owning the queue's consumer side and the bus's
    /// publisher.
    pub fn new(receiver: EffectReceiver, publisher: Publisher, config: &RunnerConfig) -> Self {
        Self {
            drain: Mutex::new(DrainState {
                receiver,
                recent: RecentEffects::new(config.dedupe_window),
            }),
            publisher,
            next_sequence: AtomicU64::new(1),
            stats: Mutex::new(RunnerStats::default()),
        }
    }

    /// Publish one notification for every queued effect, in FIFO order.
    ///
    /// Returns the number of effects published. Calling it with an empty
    /// queue is a no-op that returns zero. Observer failures are logged and
    /// counted but never stop the drain.
    pub fn process_pending(&self) -> Result<usize, RunnerError> {
        let mut drain = match self.drain.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(RunnerError::DrainInProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let batch = drain.receiver.drain_all();
        let mut round = RunnerStats {
            drains: 1,
            ..RunnerStats::default()
        };

        for queued in batch {
            if !drain.recent.insert(queued.id) {
                warn!(
                    effect_id = %queued.id,
                    subject = %queued.effect.subject(),
                    occurred_at = %queued.effect.occurred_at(),
                    "duplicate effect skipped"
                );
                round.duplicates_skipped = round.duplicates_skipped.saturating_add(1);
                continue;
            }

            let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
            let notification = Notification::from_effect(sequence, &queued);
            let report = self.publisher.publish(&notification);

            round.published = round.published.saturating_add(1);
            round.deliveries = round.deliveries.saturating_add(widen(report.delivered));
            round.delivery_failures = round
                .delivery_failures
                .saturating_add(widen(report.failed));
        }
        drop(drain);

        if round.published > 0 || round.duplicates_skipped > 0 {
            debug!(
                published = round.published,
                duplicates = round.duplicates_skipped,
                failures = round.delivery_failures,
                "effects processed"
            );
        }
        self.accumulate(&round);

        Ok(usize::try_from(round.published).unwrap_or(usize::MAX))
    }

    fn accumulate(&self, round: &RunnerStats) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.drains = stats.drains.saturating_add(round.drains);
        stats.published = stats.published.saturating_add(round.published);
        stats.duplicates_skipped = stats
            .duplicates_skipped
            .saturating_add(round.duplicates_skipped);
        stats.deliveries = stats.deliveries.saturating_add(round.deliveries);
        stats.delivery_failures = stats
            .delivery_failures
            .saturating_add(round.delivery_failures);
    }

    /// Counters accumulated since creation.
    pub fn stats(&self) -> RunnerStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sequence number of the last published notification (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.next_sequence
            .load(Ordering::Relaxed)
            .saturating_sub(1)
    }

    /// Number of live bus subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.publisher.subscriber_count()
    }
}

fn widen(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use blocklife_types::{Category, Effect, EntityId, Position, QueuedEffect};
    use chrono::Utc;

    use super::*;
    use crate::bus::NotificationBus;
    use crate::error::ObserverError;
    use crate::queue::{EffectQueue, EffectSender};

    fn placed(x: i32) -> Effect {
        Effect::Placed {
            entity_id: EntityId::new(),
            position: Position::new(x, 0),
            category: Category::new(1, 1),
            at: Utc::now(),
        }
    }

    fn setup(window: usize) -> (EffectSender, SimulationRunner, NotificationBus) {
        let (sender, receiver) = EffectQueue::new();
        let (bus, publisher) = NotificationBus::new();
        let runner = SimulationRunner::new(
            receiver,
            publisher,
            &RunnerConfig {
                dedupe_window: window,
            },
        );
        (sender, runner, bus)
    }

    #[test]
    fn empty_drain_is_noop() {
        let (_sender, runner, _bus) = setup(16);
        assert_eq!(runner.process_pending().unwrap(), 0);
        assert_eq!(runner.process_pending().unwrap(), 0);
        assert_eq!(runner.last_sequence(), 0);
        assert_eq!(runner.stats().drains, 2);
    }

    #[test]
    fn second_drain_processes_nothing() {
        let (sender, runner, _bus) = setup(16);
        sender.enqueue(placed(0)).unwrap();
        sender.enqueue(placed(1)).unwrap();

        assert_eq!(runner.process_pending().unwrap(), 2);
        assert_eq!(runner.process_pending().unwrap(), 0);
        assert_eq!(runner.last_sequence(), 2);
    }

    #[test]
    fn sequences_follow_fifo_order() {
        let (sender, runner, bus) = setup(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe(move |n: &Notification| -> Result<(), ObserverError> {
            sink.lock().unwrap().push((n.sequence, n.effect_id));
            Ok(())
        });

        let ids: Vec<EffectId> = (0..4).map(|x| sender.enqueue(placed(x)).unwrap()).collect();
        runner.process_pending().unwrap();

        let seen = seen.lock().unwrap().clone();
        let expected: Vec<(u64, EffectId)> = (1..=4).zip(ids).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn duplicate_effect_id_is_published_once() {
        let (sender, runner, bus) = setup(16);
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let _sub = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let queued = QueuedEffect::new(placed(0));
        sender.enqueue_queued(queued.clone());
        sender.enqueue_queued(queued.clone());
        runner.process_pending().unwrap();
        sender.enqueue_queued(queued);
        runner.process_pending().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(runner.stats().duplicates_skipped, 2);
        assert_eq!(runner.stats().published, 1);
    }

    #[test]
    fn dedupe_window_is_bounded() {
        let mut recent = RecentEffects::new(2);
        let a = EffectId::new();
        let b = EffectId::new();
        let c = EffectId::new();

        assert!(recent.insert(a));
        assert!(recent.insert(b));
        assert!(!recent.insert(a));
        assert!(recent.insert(c));
        // `a` fell out of the window.
        assert!(recent.insert(a));
        assert_eq!(recent.order.len(), 2);
        assert_eq!(recent.seen.len(), 2);
    }

    #[test]
    fn reentrant_drain_is_refused() {
        let (sender, runner, bus) = setup(16);
        let runner = Arc::new(runner);
        let nested = Arc::new(Mutex::new(Vec::new()));

        let inner_runner = Arc::downgrade(&runner);
        let sink = Arc::clone(&nested);
        let _sub = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
            if let Some(runner) = inner_runner.upgrade() {
                sink.lock().unwrap().push(runner.process_pending());
            }
            Ok(())
        });

        sender.enqueue(placed(0)).unwrap();
        assert_eq!(runner.process_pending().unwrap(), 1);
        assert_eq!(
            *nested.lock().unwrap(),
            vec![Err(RunnerError::DrainInProgress)]
        );
    }

    #[test]
    fn delivery_failures_are_counted_not_fatal() {
        let (sender, runner, bus) = setup(16);
        let _bad = bus.subscribe(|_: &Notification| -> Result<(), ObserverError> {
            Err(ObserverError::rejected("unavailable"))
        });

        sender.enqueue(placed(0)).unwrap();
        sender.enqueue(placed(1)).unwrap();

        assert_eq!(runner.process_pending().unwrap(), 2);
        let stats = runner.stats();
        assert_eq!(stats.delivery_failures, 2);
        assert_eq!(stats.deliveries, 0);
    }
}
