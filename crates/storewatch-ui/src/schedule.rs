//! Repeating timers for page controllers.
//!
//! # Design
//! - Controllers depend on the [`Scheduler`] trait, never on tokio directly, so
//!   tests can drive ticks with [`ManualScheduler`].
//! - A [`TimerHandle`] owns its timer: cancelling or dropping it stops the
//!   timer, so a controller cannot leak one past its own lifetime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use storewatch_telemetry::Metrics;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

/// Work run on every tick.
pub type TimerTask = Arc<dyn Fn() + Send + Sync>;

/// Shortest period accepted; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Source of repeating timers.
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first after one full period.
    fn every(&self, period: Duration, task: TimerTask) -> TimerHandle;
}

/// Ownership of one scheduled timer.
pub struct TimerHandle {
    id: u64,
    period: Duration,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    /// Wrap a timer whose teardown is `cancel`.
    pub fn new(id: u64, period: Duration, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            period,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Scheduler-assigned id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer. Later ticks never run.
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            debug!(timer = self.id, "timer cancelled");
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("period", &self.period)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Scheduler backed by tokio intervals on the current runtime.
#[derive(Clone, Default)]
pub struct TokioScheduler {
    next_id: Arc<AtomicU64>,
    metrics: Option<Metrics>,
}

impl TokioScheduler {
    /// Scheduler without metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler that reports live timers on the `active_timers` gauge.
    #[must_use]
    pub fn with_metrics(metrics: Metrics) -> Self {
        Self {
            next_id: Arc::default(),
            metrics: Some(metrics),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, task: TimerTask) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                debug!(timer = id, "timer fired");
                task();
            }
        });
        if let Some(metrics) = &self.metrics {
            metrics.timer_started();
        }
        debug!(timer = id, period_ms = period.as_millis(), "timer scheduled");
        let metrics = self.metrics.clone();
        TimerHandle::new(id, period, move || {
            join.abort();
            if let Some(metrics) = metrics {
                metrics.timer_stopped();
            }
        })
    }
}

#[derive(Default)]
struct ManualState {
    next_id: u64,
    registered: u64,
    timers: BTreeMap<u64, (Duration, TimerTask)>,
}

/// Scheduler whose timers only fire when told to.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    /// Scheduler with no timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every active timer once, in registration order. Returns how many ran.
    pub fn fire(&self) -> usize {
        let tasks: Vec<TimerTask> = self
            .lock()
            .timers
            .values()
            .map(|(_, task)| Arc::clone(task))
            .collect();
        for task in &tasks {
            task();
        }
        tasks.len()
    }

    /// Timers registered and not yet cancelled.
    #[must_use]
    pub fn active_timers(&self) -> usize {
        self.lock().timers.len()
    }

    /// Periods of the active timers in registration order.
    #[must_use]
    pub fn periods(&self) -> Vec<Duration> {
        self.lock()
            .timers
            .values()
            .map(|(period, _)| *period)
            .collect()
    }

    /// Timers ever registered, cancelled or not.
    #[must_use]
    pub fn registered_total(&self) -> u64 {
        self.lock().registered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: TimerTask) -> TimerHandle {
        let id = {
            let mut state = self.lock();
            state.next_id += 1;
            state.registered += 1;
            let id = state.next_id;
            state.timers.insert(id, (period, task));
            id
        };
        let state = Arc::clone(&self.state);
        TimerHandle::new(id, period, move || {
            state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .timers
                .remove(&id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::AtomicUsize;

    fn counting_task() -> (Arc<AtomicUsize>, TimerTask) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let task: TimerTask = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (count, task)
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_first_fires_after_one_period() {
        let scheduler = TokioScheduler::new();
        let (count, task) = counting_task();
        let handle = scheduler.every(Duration::from_secs(10), task);

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() -> Result<()> {
        let metrics = Metrics::new()?;
        let scheduler = TokioScheduler::with_metrics(metrics.clone());
        let (count, task) = counting_task();
        let handle = scheduler.every(Duration::from_secs(1), task);
        assert_eq!(metrics.snapshot().active_timers, 1);

        drop(handle);
        assert_eq!(metrics.snapshot().active_timers, 0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn manual_scheduler_fires_only_active_timers() {
        let scheduler = ManualScheduler::new();
        let (first_count, first) = counting_task();
        let (second_count, second) = counting_task();
        let first_handle = scheduler.every(Duration::from_secs(10), first);
        let _second_handle = scheduler.every(Duration::from_secs(5), second);
        assert_eq!(
            scheduler.periods(),
            vec![Duration::from_secs(10), Duration::from_secs(5)]
        );

        assert_eq!(scheduler.fire(), 2);
        first_handle.cancel();
        assert_eq!(scheduler.fire(), 1);
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.active_timers(), 1);
        assert_eq!(scheduler.registered_total(), 2);
    }
}
