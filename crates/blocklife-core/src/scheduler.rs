//! Async loop that drives the runner.
//!
//! The core does not decide when notifications go out; a host calls
//! [`SimulationRunner::process_pending`] at its own cadence.
//! [`run_scheduler`] is the stock host loop: drain, sleep, repeat, under the
//! control of a shared [`SchedulerControl`].
//!
//! All control fields are atomics so a host can pause, resume, retune, or
//! stop the loop from any task without locking.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::RunnerError;
use crate::runner::SimulationRunner;

/// Why the scheduler loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEndReason {
    /// The configured `max_cycles` was reached.
    MaxCyclesReached,
    /// A stop was requested.
    StopRequested,
}

/// Totals for one scheduler run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Why the loop ended.
    pub end_reason: SchedulerEndReason,
    /// Drain cycles executed, including the final drain on stop.
    pub cycles: u64,
    /// Effects published across all cycles.
    pub effects_processed: u64,
    /// Cycles skipped because another drain was running.
    pub busy_cycles: u64,
}

/// Shared control state for the scheduler loop.
#[derive(Debug)]
pub struct SchedulerControl {
    /// Whether the loop is paused.
    paused: AtomicBool,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Wakes the loop on resume, stop, or interval change.
    wake: Notify,

    /// Milliseconds between drains (runtime-adjustable).
    interval_ms: AtomicU64,

    /// Maximum number of cycles (0 = unlimited).
    max_cycles: u64,
}

impl SchedulerControl {
    /// Create control state from configuration.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            wake: Notify::new(),
            interval_ms: AtomicU64::new(config.interval_ms),
            max_cycles: config.max_cycles,
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Whether the loop is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the loop after its current cycle.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the loop and wake it.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_one();
    }

    /// Wait while paused. Returns early if a stop is requested.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() && !self.is_stop_requested() {
            self.wake.notified().await;
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop after a final drain.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Cadence
    // -----------------------------------------------------------------------

    /// Current interval between drains.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Acquire)
    }

    /// Change the interval, returning the previous one.
    pub fn set_interval_ms(&self, ms: u64) -> u64 {
        let previous = self.interval_ms.swap(ms, Ordering::AcqRel);
        self.wake.notify_one();
        previous
    }

    /// Configured cycle limit (0 = unlimited).
    pub const fn max_cycles(&self) -> u64 {
        self.max_cycles
    }

    /// Whether `cycles` has reached the limit.
    pub const fn cycle_limit_reached(&self, cycles: u64) -> bool {
        self.max_cycles > 0 && cycles >= self.max_cycles
    }

    async fn sleep(&self) {
        let interval_ms = self.interval_ms();
        if interval_ms == 0 {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
            () = self.wake.notified() => {}
        }
    }
}

/// Drive `runner` until the cycle limit or a stop request.
///
/// On stop, one last drain runs so effects committed before the request are
/// still delivered.
pub async fn run_scheduler(
    runner: &SimulationRunner,
    control: &SchedulerControl,
) -> SchedulerSummary {
    let mut cycles: u64 = 0;
    let mut effects_processed: u64 = 0;
    let mut busy_cycles: u64 = 0;

    info!(
        interval_ms = control.interval_ms(),
        max_cycles = control.max_cycles(),
        "Scheduler starting"
    );

    let end_reason = loop {
        // --- Check pause ---
        if control.is_paused() {
            info!("Scheduler paused, waiting for resume...");
            control.wait_if_paused().await;
            info!("Scheduler resumed");
        }

        let stopping = control.is_stop_requested();

        // --- Drain ---
        match runner.process_pending() {
            Ok(count) => {
                effects_processed =
                    effects_processed.saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
            }
            Err(RunnerError::DrainInProgress) => {
                debug!("drain already running, skipping cycle");
                busy_cycles = busy_cycles.saturating_add(1);
            }
        }
        cycles = cycles.saturating_add(1);

        // --- Check stop (the drain above was the final one) ---
        if stopping {
            break SchedulerEndReason::StopRequested;
        }

        // --- Check cycle limit ---
        if control.cycle_limit_reached(cycles) {
            break SchedulerEndReason::MaxCyclesReached;
        }

        control.sleep().await;
    };

    let summary = SchedulerSummary {
        end_reason,
        cycles,
        effects_processed,
        busy_cycles,
    };
    info!(
        reason = ?summary.end_reason,
        cycles = summary.cycles,
        effects_processed = summary.effects_processed,
        busy_cycles = summary.busy_cycles,
        "Scheduler stopped"
    );
    summary
}
