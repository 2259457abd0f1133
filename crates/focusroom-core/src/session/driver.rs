//! Real-time host: a state machine ticked by a [`SessionClock`].
//!
//! Commands and ticks are serialized through one mutex, so the machine never
//! sees concurrent mutation no matter which thread issues a command.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;

use super::blocking::AppBlocker;
use super::clock::SessionClock;
use super::config::SessionConfig;
use super::dispatch::Dispatcher;
use super::lock;
use super::machine::{Collaborators, SessionSnapshot, SessionStateMachine};
use super::recorder::FocusRecordSink;
use super::runtime::SessionState;
use crate::error::Result;
use crate::events::Event;

/// Sessions count whole seconds, so the real-time cadence is fixed.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct SessionDriver {
    machine: Arc<Mutex<SessionStateMachine>>,
    dispatcher: Dispatcher,
}

impl SessionDriver {
    /// Wire a machine to a one-second tokio clock and a serial side-effect
    /// worker.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or no tokio runtime is running.
    pub fn spawn(
        config: SessionConfig,
        blocker: Arc<dyn AppBlocker>,
        recorder: Arc<dyn FocusRecordSink>,
    ) -> Result<Self> {
        let clock = SessionClock::new(TICK_PERIOD)?;
        let dispatcher = Dispatcher::spawn_serial()?;
        let collaborators = Collaborators::new(blocker, recorder)
            .with_ticker(clock.clone())
            .with_dispatcher(dispatcher.clone());
        let machine = Arc::new(Mutex::new(SessionStateMachine::new(config, collaborators)?));

        let weak = Arc::downgrade(&machine);
        clock.on_tick(move |tick| {
            if let Some(machine) = weak.upgrade() {
                let mut machine = lock(&machine);
                // A stop issued while this tick waited on the lock wins.
                if tick.is_current() {
                    machine.tick();
                }
            }
        });

        Ok(Self {
            machine,
            dispatcher,
        })
    }

    /// Exclusive access for anything not covered by the shortcuts below.
    pub fn lock(&self) -> MutexGuard<'_, SessionStateMachine> {
        lock(&self.machine)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.lock().subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Wait for queued blocking and recording calls to finish.
    pub async fn settle(&self) {
        self.dispatcher.settle().await;
    }

    pub fn start(&self) -> SessionState {
        self.lock().start()
    }

    pub fn pause(&self) -> SessionState {
        self.lock().pause()
    }

    pub fn resume(&self) -> SessionState {
        self.lock().resume()
    }

    pub fn adjust_time(&self, delta_seconds: i64) -> SessionState {
        self.lock().adjust_time(delta_seconds)
    }

    pub fn end(&self, completed: bool) -> SessionState {
        self.lock().end(completed)
    }

    pub fn start_break(&self) -> SessionState {
        self.lock().start_break()
    }

    pub fn skip_break(&self) -> SessionState {
        self.lock().skip_break()
    }

    pub fn start_next_session(&self) -> SessionState {
        self.lock().start_next_session()
    }

    pub fn reset(&self) -> SessionState {
        self.lock().reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlockingError;
    use crate::session::config::SessionMode;
    use crate::session::runtime::Phase;
    use tokio::time;

    struct Noop;

    impl AppBlocker for Noop {
        fn is_authorized(&self) -> bool {
            false
        }
        fn has_apps_selected(&self) -> bool {
            false
        }
        fn start_session(&self, _: &str, _: u64, _: bool) -> Result<(), BlockingError> {
            Ok(())
        }
        fn end_session(&self, _: bool) {}
    }

    impl FocusRecordSink for Noop {
        fn record_focus_session(&self, _: &str, _: u32, _: bool) {}
    }

    #[tokio::test(start_paused = true)]
    async fn clock_drives_countdown_to_completion() {
        let driver = SessionDriver::spawn(
            SessionConfig::new(SessionMode::Custom, 5, 0),
            Arc::new(Noop),
            Arc::new(Noop),
        )
        .unwrap();

        driver.start();
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(driver.snapshot().remaining_seconds, 3);

        driver.pause();
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(driver.snapshot().remaining_seconds, 3);

        driver.resume();
        time::sleep(Duration::from_millis(3500)).await;
        let snapshot = driver.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.phase, Phase::Focus);
        assert_eq!(snapshot.sessions_completed, 1);
        assert!(!driver.lock().is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn one_tick_per_wall_clock_second() {
        let driver = SessionDriver::spawn(
            SessionConfig::new(SessionMode::Custom, 60, 0),
            Arc::new(Noop),
            Arc::new(Noop),
        )
        .unwrap();

        driver.start();
        time::sleep(Duration::from_millis(10_100)).await;
        assert_eq!(driver.snapshot().remaining_seconds, 50);
    }
}
