//! Tick sources.
//!
//! The state machine only needs to switch ticking on and off; who delivers
//! the ticks is up to the host. [`SessionClock`] ticks on a tokio interval;
//! [`ManualTicker`] leaves tick delivery to the caller.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

use super::lock;
use crate::error::{CoreError, Result};

pub trait Ticker: Send {
    /// Begin ticking. Idempotent.
    fn start(&self);
    /// Halt ticking. Idempotent.
    fn stop(&self);
    fn is_running(&self) -> bool;
}

/// Ticker for hosts that feed `tick()` themselves.
///
/// Clones share the running flag.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    running: Arc<AtomicBool>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ticker for ManualTicker {
    fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// One delivered tick of a [`SessionClock`].
///
/// A tick goes stale when the clock is stopped after it fired, even if the
/// clock has been started again since.
#[derive(Debug, Clone)]
pub struct Tick {
    clock: Weak<ClockInner>,
    generation: u64,
}

impl Tick {
    pub fn is_current(&self) -> bool {
        self.clock
            .upgrade()
            .is_some_and(|inner| inner.generation.load(Ordering::SeqCst) == self.generation)
    }
}

type TickCallback = Arc<dyn Fn(Tick) + Send + Sync>;

struct ClockInner {
    period: Duration,
    runtime: Handle,
    /// Bumped on every stop.
    generation: AtomicU64,
    on_tick: Mutex<Option<TickCallback>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ClockInner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
    }
}

/// One tick per period on a fixed cadence while started.
///
/// Ticks are scheduled against the instant `start` was called, not against
/// the end of the previous callback, so slow callbacks do not accumulate
/// skew. Stopping discards the schedule; the next `start` begins a fresh one
/// and never replays ticks missed while stopped. A callback that may block
/// behind a concurrent `stop` should check [`Tick::is_current`] once it holds
/// whatever lock `stop` is called under.
#[derive(Clone)]
pub struct SessionClock {
    inner: Arc<ClockInner>,
}

impl SessionClock {
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] when called outside a tokio runtime.
    pub fn new(period: Duration) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        Ok(Self::with_handle(period, handle))
    }

    pub fn with_handle(period: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                period,
                runtime,
                generation: AtomicU64::new(0),
                on_tick: Mutex::new(None),
                task: Mutex::new(None),
            }),
        }
    }

    /// Register the single tick callback, replacing any previous one.
    pub fn on_tick<F>(&self, callback: F)
    where
        F: Fn(Tick) + Send + Sync + 'static,
    {
        *lock(&self.inner.on_tick) = Some(Arc::new(callback));
    }
}

impl Ticker for SessionClock {
    fn start(&self) {
        let mut task = lock(&self.inner.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let period = self.inner.period;
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let weak: Weak<ClockInner> = Arc::downgrade(&self.inner);
        *task = Some(self.inner.runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            // Late ticks are delivered back-to-back so counted seconds stay
            // aligned with the cadence.
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.generation.load(Ordering::SeqCst) != generation {
                    break;
                }
                let callback = lock(&inner.on_tick).clone();
                drop(inner);
                trace!(generation, "session clock tick");
                if let Some(callback) = callback {
                    callback(Tick {
                        clock: weak.clone(),
                        generation,
                    });
                }
            }
        }));
    }

    fn stop(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = lock(&self.inner.task).take() {
            handle.abort();
        }
    }

    fn is_running(&self) -> bool {
        lock(&self.inner.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_clock() -> (SessionClock, Arc<AtomicUsize>) {
        let clock = SessionClock::new(Duration::from_secs(1)).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        clock.on_tick(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (clock, count)
    }

    #[test]
    fn new_outside_runtime_fails() {
        assert!(matches!(
            SessionClock::new(Duration::from_secs(1)),
            Err(CoreError::Runtime(_))
        ));
    }

    #[test]
    fn manual_ticker_is_idempotent() {
        let ticker = ManualTicker::new();
        let observer = ticker.clone();
        ticker.start();
        ticker.start();
        assert!(observer.is_running());
        ticker.stop();
        ticker.stop();
        assert!(!observer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second() {
        let (clock, count) = counting_clock();
        clock.start();
        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let (clock, count) = counting_clock();
        clock.start();
        clock.start();
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_ticks_while_stopped_and_no_catch_up() {
        let (clock, count) = counting_clock();
        clock.start();
        time::sleep(Duration::from_millis(2500)).await;
        clock.stop();
        clock.stop();
        assert!(!clock.is_running());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        clock.start();
        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_goes_stale_across_stop_and_restart() {
        let clock = SessionClock::new(Duration::from_secs(1)).unwrap();
        let last = Arc::new(Mutex::new(None));
        let slot = last.clone();
        clock.on_tick(move |tick| {
            *slot.lock().unwrap() = Some(tick);
        });

        clock.start();
        time::sleep(Duration::from_millis(1500)).await;
        let fired = last.lock().unwrap().take().unwrap();
        assert!(fired.is_current());

        // Pause then resume: the tick that fired before the pause must not
        // count against the fresh schedule.
        clock.stop();
        clock.start();
        assert!(!fired.is_current());

        time::sleep(Duration::from_millis(1500)).await;
        let fresh = last.lock().unwrap().take().unwrap();
        assert!(fresh.is_current());
        assert!(!fired.is_current());
    }
}
