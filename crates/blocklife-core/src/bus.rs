//! Publish/subscribe delivery of notifications.
//!
//! [`NotificationBus`] is the subscription side and may be cloned freely.
//! [`Publisher`] is the delivery side; exactly one exists per bus and it is
//! owned by the [`SimulationRunner`](crate::SimulationRunner).
//!
//! Subscriptions are RAII handles. Dropping a [`Subscription`] removes the
//! subscriber and drops its observer, so a subscriber cannot outlive its
//! owner. The handle only holds a weak reference back to the bus.
//!
//! # Delivery
//!
//! Publishing takes a snapshot of the subscriber list and calls each
//! observer with no bus-wide lock held, so observers may subscribe,
//! unsubscribe, or submit commands from inside a callback. An observer that
//! returns an error or panics is logged and counted; the remaining observers
//! still receive the notification.

use std::collections::BTreeSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use blocklife_types::{Notification, NotificationType};
use tracing::{debug, warn};

use crate::error::ObserverError;

// ---------------------------------------------------------------------------
// Observer
// ---------------------------------------------------------------------------

/// Receives notifications from the bus.
pub trait Observer: Send {
    /// Handle one notification.
    fn on_notification(&mut self, notification: &Notification) -> Result<(), ObserverError>;
}

impl<F> Observer for F
where
    F: FnMut(&Notification) -> Result<(), ObserverError> + Send,
{
    fn on_notification(&mut self, notification: &Notification) -> Result<(), ObserverError> {
        self(notification)
    }
}

/// Identifies one subscription on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of publishing one notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Observers that handled the notification.
    pub delivered: usize,
    /// Observers that returned an error or panicked.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct SubscriberSlot {
    id: SubscriptionId,
    filter: Option<BTreeSet<NotificationType>>,
    active: AtomicBool,
    observer: Mutex<Box<dyn Observer>>,
}

impl SubscriberSlot {
    fn accepts(&self, notification_type: NotificationType) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|types| types.contains(&notification_type))
    }
}

struct BusShared {
    subscribers: RwLock<Vec<Arc<SubscriberSlot>>>,
    next_id: AtomicU64,
}

impl BusShared {
    fn add(
        &self,
        filter: Option<BTreeSet<NotificationType>>,
        observer: Box<dyn Observer>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let slot = Arc::new(SubscriberSlot {
            id,
            filter,
            active: AtomicBool::new(true),
            observer: Mutex::new(observer),
        });
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(slot);
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    fn remove(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(index) = subscribers.iter().position(|slot| slot.id == id) else {
                return false;
            };
            subscribers.remove(index)
        };
        // A publish already holding a snapshot checks this flag before
        // every callback.
        removed.active.store(false, Ordering::Release);
        debug!(subscription = %id, "unsubscribed");
        true
    }

    fn snapshot(&self) -> Vec<Arc<SubscriberSlot>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ---------------------------------------------------------------------------
// Public handles
// ---------------------------------------------------------------------------

/// Subscription side of the bus.
#[derive(Clone)]
pub struct NotificationBus {
    shared: Arc<BusShared>,
}

impl core::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.shared.len())
            .finish()
    }
}

impl NotificationBus {
    /// Create a bus and its single publisher.
    pub fn new() -> (Self, Publisher) {
        let shared = Arc::new(BusShared {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Publisher { shared },
        )
    }

    /// Subscribe to every notification.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> Subscription {
        self.attach(None, Box::new(observer))
    }

    /// Subscribe to notifications of the given types only.
    pub fn subscribe_filtered(
        &self,
        types: impl IntoIterator<Item = NotificationType>,
        observer: impl Observer + 'static,
    ) -> Subscription {
        self.attach(Some(types.into_iter().collect()), Box::new(observer))
    }

    fn attach(
        &self,
        filter: Option<BTreeSet<NotificationType>>,
        observer: Box<dyn Observer>,
    ) -> Subscription {
        let id = self.shared.add(filter, observer);
        debug!(subscription = %id, "subscribed");
        Subscription {
            id,
            bus: Arc::downgrade(&self.shared),
        }
    }

    /// End a subscription explicitly. Returns whether it was still active
    /// on this bus.
    ///
    /// A handle issued by another bus is left untouched and `false` is
    /// returned. Dropping the handle unsubscribes it from its own bus.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        if !subscription.belongs_to(&self.shared) {
            warn!(subscription = %subscription.id, "unsubscribe on a foreign bus ignored");
            return false;
        }
        subscription.detach()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.len()
    }
}

/// RAII handle for one subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<BusShared>,
}

impl Subscription {
    /// This subscription's identifier.
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the subscriber is still registered.
    pub fn is_active(&self) -> bool {
        self.bus.upgrade().is_some_and(|shared| {
            shared
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .any(|slot| slot.id == self.id)
        })
    }

    fn belongs_to(&self, shared: &Arc<BusShared>) -> bool {
        core::ptr::eq(self.bus.as_ptr(), Arc::as_ptr(shared))
    }

    fn detach(&self) -> bool {
        self.bus.upgrade().is_some_and(|shared| shared.remove(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Delivery side of the bus. Not cloneable.
pub struct Publisher {
    shared: Arc<BusShared>,
}

impl core::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Publisher")
            .field("subscribers", &self.shared.len())
            .finish()
    }
}

impl Publisher {
    /// Deliver one notification to every matching, still-active subscriber.
    pub fn publish(&self, notification: &Notification) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for slot in self.shared.snapshot() {
            if !slot.accepts(notification.notification_type) {
                continue;
            }
            let mut observer = slot.observer.lock().unwrap_or_else(PoisonError::into_inner);
            if !slot.active.load(Ordering::Acquire) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                observer.on_notification(notification)
            }));
            match outcome {
                Ok(Ok(())) => report.delivered = report.delivered.saturating_add(1),
                Ok(Err(error)) => {
                    warn!(
                        subscription = %slot.id,
                        sequence = notification.sequence,
                        %error,
                        "observer failed"
                    );
                    report.failed = report.failed.saturating_add(1);
                }
                Err(_) => {
                    warn!(
                        subscription = %slot.id,
                        sequence = notification.sequence,
                        "observer panicked"
                    );
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }

        report
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.shared.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use blocklife_types::{Category, Effect, EntityId, Position, QueuedEffect};
    use chrono::Utc;

    use super::*;

    fn notification(sequence: u64, effect: Effect) -> Notification {
        Notification::from_effect(sequence, &QueuedEffect::new(effect))
    }

    fn placed() -> Effect {
        Effect::Placed {
            entity_id: EntityId::new(),
            position: Position::new(0, 0),
            category: Category::new(1, 1),
            at: Utc::now(),
        }
    }

    fn removed() -> Effect {
        Effect::Removed {
            entity_id: EntityId::new(),
            position: Position::new(0, 0),
            category: Category::new(1, 1),
            at: Utc::now(),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<u64>>>, impl Observer + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |n: &Notification| -> Result<(), ObserverError> {
            sink.lock().unwrap().push(n.sequence);
            Ok(())
        };
        (seen, observer)
    }

    #[test]
    fn delivers_to_every_subscriber() {
        let (bus, publisher) = NotificationBus::new();
        let (a_seen, a) = recorder();
        let (b_seen, b) = recorder();
        let _a = bus.subscribe(a);
        let _b = bus.subscribe(b);

        let report = publisher.publish(&notification(1, placed()));

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        assert_eq!(*a_seen.lock().unwrap(), vec![1]);
        assert_eq!(*b_seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let (bus, publisher) = NotificationBus::new();
        let (seen, observer) = recorder();
        let subscription = bus.subscribe(observer);

        publisher.publish(&notification(1, placed()));
        drop(subscription);
        publisher.publish(&notification(2, placed()));

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn explicit_unsubscribe_reports_state() {
        let (bus, _publisher) = NotificationBus::new();
        let (_seen, observer) = recorder();
        let subscription = bus.subscribe(observer);
        assert!(subscription.is_active());
        assert!(bus.unsubscribe(&subscription));
        assert!(!subscription.is_active());
        assert!(!bus.unsubscribe(&subscription));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_ignores_handle_from_another_bus() {
        let (bus, publisher) = NotificationBus::new();
        let (other, _other_publisher) = NotificationBus::new();
        let (seen, observer) = recorder();
        let subscription = bus.subscribe(observer);

        assert!(!other.unsubscribe(&subscription));

        assert!(subscription.is_active());
        assert_eq!(bus.subscriber_count(), 1);
        publisher.publish(&notification(1, placed()));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn filter_limits_types() {
        let (bus, publisher) = NotificationBus::new();
        let (seen, observer) = recorder();
        let _sub = bus.subscribe_filtered([NotificationType::BlockRemoved], observer);

        publisher.publish(&notification(1, placed()));
        publisher.publish(&notification(2, removed()));

        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn failing_observer_does_not_block_others() {
        let (bus, publisher) = NotificationBus::new();
        let _bad = bus.subscribe(|_: &Notification| -> Result<(), ObserverError> {
            Err(ObserverError::rejected("nope"))
        });
        let (seen, observer) = recorder();
        let _good = bus.subscribe(observer);

        let report = publisher.publish(&notification(1, placed()));

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_observer_is_contained() {
        let (bus, publisher) = NotificationBus::new();
        let _bad = bus.subscribe(|_: &Notification| -> Result<(), ObserverError> {
            panic!("observer bug")
        });
        let (seen, observer) = recorder();
        let _good = bus.subscribe(observer);

        let first = publisher.publish(&notification(1, placed()));
        let second = publisher.publish(&notification(2, placed()));

        assert_eq!(first.failed, 1);
        assert_eq!(second.failed, 1);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn observer_is_released_after_unsubscribe() {
        let (bus, publisher) = NotificationBus::new();
        let token = Arc::new(());

        for _ in 0..100 {
            let held = Arc::clone(&token);
            let subscription = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
                let _ = &held;
                Ok(())
            });
            publisher.publish(&notification(1, placed()));
            drop(subscription);
        }

        assert_eq!(Arc::strong_count(&token), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_from_inside_callback() {
        let (bus, publisher) = NotificationBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicU64::new(0));

        let own = Arc::clone(&slot);
        let counter = Arc::clone(&calls);
        let subscription = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
            counter.fetch_add(1, Ordering::SeqCst);
            // Dropping our own handle unsubscribes without waiting.
            let _ = own.lock().unwrap().take();
            Ok(())
        });
        *slot.lock().unwrap() = Some(subscription);

        publisher.publish(&notification(1, placed()));
        publisher.publish(&notification(2, placed()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let (bus, publisher) = NotificationBus::new();
        let (_seen, observer) = recorder();
        let subscription = bus.subscribe(observer);
        drop(bus);
        drop(publisher);
        assert!(!subscription.is_active());
        drop(subscription);
    }
}
