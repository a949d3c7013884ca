//! Delivery guarantees of the runner and bus under concurrent load.

#![allow(clippy::unwrap_used, clippy::panic, clippy::arithmetic_side_effects)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use blocklife_core::{
    Command, EffectQueue, NotificationBus, ObserverError, RunnerError, Simulation,
    SimulationConfig, SimulationRunner,
};
use blocklife_core::config::RunnerConfig;
use blocklife_pattern::PatternConfig;
use blocklife_types::{Category, Effect, EffectId, EntityId, Notification, Position};
use chrono::Utc;

fn placed(producer: i32, i: i32) -> Effect {
    Effect::Placed {
        entity_id: EntityId::new(),
        position: Position::new(producer, i),
        category: Category::new(1, 1),
        at: Utc::now(),
    }
}

/// A config with no patterns, so every command yields exactly one effect.
fn inert_config() -> SimulationConfig {
    SimulationConfig {
        patterns: PatternConfig {
            definitions: Vec::new(),
            ..PatternConfig::default()
        },
        ..SimulationConfig::default()
    }
}

#[test]
fn concurrent_enqueue_is_delivered_exactly_once_in_fifo_order() {
    const PRODUCERS: i32 = 8;
    const PER_PRODUCER: i32 = 200;

    let (sender, receiver) = EffectQueue::new();
    let (bus, publisher) = NotificationBus::new();
    let runner = SimulationRunner::new(receiver, publisher, &RunnerConfig::default());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = bus.subscribe(move |n: &Notification| -> Result<(), ObserverError> {
        sink.lock().unwrap().push(n.clone());
        Ok(())
    });

    let barrier = Barrier::new(usize::try_from(PRODUCERS).unwrap().saturating_add(1));
    let enqueued: Vec<Vec<EffectId>> = thread::scope(|s| {
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let sender = sender.clone();
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    (0..PER_PRODUCER)
                        .map(|i| sender.enqueue(placed(producer, i)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        // Drain concurrently with the producers.
        let runner = &runner;
        let barrier = &barrier;
        let drainer = s.spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                let _ = runner.process_pending();
                thread::yield_now();
            }
        });

        let ids = producers.into_iter().map(|h| h.join().unwrap()).collect();
        drainer.join().unwrap();
        ids
    });
    runner.process_pending().unwrap();

    let seen = seen.lock().unwrap();
    let total = usize::try_from(PRODUCERS * PER_PRODUCER).unwrap();
    assert_eq!(seen.len(), total);

    // Exactly once.
    let unique: HashSet<EffectId> = seen.iter().map(|n| n.effect_id).collect();
    assert_eq!(unique.len(), total);
    let all: HashSet<EffectId> = enqueued.iter().flatten().copied().collect();
    assert_eq!(unique, all);

    // Sequences are gapless and increasing.
    for (index, notification) in seen.iter().enumerate() {
        assert_eq!(notification.sequence, u64::try_from(index).unwrap() + 1);
    }

    // Each producer's effects arrive in the order it enqueued them.
    for ids in &enqueued {
        let order: Vec<EffectId> = seen
            .iter()
            .map(|n| n.effect_id)
            .filter(|id| ids.contains(id))
            .collect();
        assert_eq!(&order, ids);
    }
}

#[test]
fn parallel_drains_never_duplicate() {
    let (sim, runner, bus) = Simulation::from_config(&inert_config()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let _sub = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    for x in 0..10 {
        for y in 0..10 {
            sim.submit(Command::Place {
                position: Position::new(x, y),
                category: Category::new(1, 1),
            })
            .unwrap();
        }
    }

    let processed = AtomicUsize::new(0);
    let refused = AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..10 {
                    match runner.process_pending() {
                        Ok(n) => {
                            processed.fetch_add(n, Ordering::SeqCst);
                        }
                        Err(RunnerError::DrainInProgress) => {
                            refused.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            });
        }
    });

    assert_eq!(processed.load(Ordering::SeqCst), 100);
    assert_eq!(count.load(Ordering::SeqCst), 100);
    assert_eq!(runner.stats().published, 100);
}

#[test]
fn panicking_observer_does_not_stop_processing() {
    let (sim, runner, bus) = Simulation::from_config(&inert_config()).unwrap();
    let _bad = bus.subscribe(|n: &Notification| -> Result<(), ObserverError> {
        if n.sequence == 2 {
            panic!("observer bug");
        }
        Ok(())
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _good = bus.subscribe(move |n: &Notification| -> Result<(), ObserverError> {
        sink.lock().unwrap().push(n.sequence);
        Ok(())
    });

    for x in 0..4 {
        sim.submit(Command::Place {
            position: Position::new(x, 0),
            category: Category::new(1, 1),
        })
        .unwrap();
    }

    assert_eq!(runner.process_pending().unwrap(), 4);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(runner.stats().delivery_failures, 1);
    // Grid state is untouched by the delivery failure.
    assert_eq!(sim.entity_count(), 4);
}

#[test]
fn unsubscribed_observer_gets_nothing_and_is_released() {
    let (sim, runner, bus) = Simulation::from_config(&inert_config()).unwrap();
    let token = Arc::new(());

    for round in 0..50 {
        let held = Arc::clone(&token);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = bus.subscribe(move |_: &Notification| -> Result<(), ObserverError> {
            let _ = &held;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        sim.submit(Command::Place {
            position: Position::new(round % 10, round / 10),
            category: Category::new(1, 1),
        })
        .unwrap();
        runner.process_pending().unwrap();
        assert!(bus.unsubscribe(&subscription));

        sim.submit(Command::Remove {
            position: Position::new(round % 10, round / 10),
        })
        .unwrap();
        runner.process_pending().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    assert_eq!(bus.subscriber_count(), 0);
    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn observer_may_submit_commands_from_a_callback() {
    let (sim, runner, bus) = Simulation::from_config(&inert_config()).unwrap();
    let sim = Arc::new(sim);

    let weak = Arc::downgrade(&sim);
    let _echo = bus.subscribe(move |n: &Notification| -> Result<(), ObserverError> {
        if let (Some(sim), Effect::Placed { position, .. }) = (weak.upgrade(), &n.effect) {
            if position.y == 0 {
                let below = Position::new(position.x, 1);
                sim.submit(Command::Place {
                    position: below,
                    category: Category::new(2, 1),
                })
                .map_err(|e| ObserverError::rejected(e.to_string()))?;
            }
        }
        Ok(())
    });

    sim.submit(Command::Place {
        position: Position::new(0, 0),
        category: Category::new(1, 1),
    })
    .unwrap();

    assert_eq!(runner.process_pending().unwrap(), 1);
    // The echo's effect waits for the next drain.
    assert!(sim.has_pending_effects());
    assert_eq!(runner.process_pending().unwrap(), 1);
    assert_eq!(sim.entity_count(), 2);
}
