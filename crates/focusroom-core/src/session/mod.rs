//! The Focus Session Engine.

mod blocking;
mod clock;
mod config;
mod dispatch;
mod driver;
mod machine;
mod policy;
mod recorder;
mod runtime;
mod time;

pub use blocking::{AppBlocker, BlockingCoordinator, BlockingStatus};
pub use clock::{ManualTicker, SessionClock, Tick, Ticker};
pub use config::{SessionConfig, SessionMode};
pub use dispatch::Dispatcher;
pub use driver::{SessionDriver, TICK_PERIOD};
pub use machine::{Collaborators, SessionSnapshot, SessionStateMachine, EVENT_CAPACITY};
pub use policy::{Command, CompletionDecision, CompletionPolicy};
pub use recorder::{FocusRecordSink, SessionRecord, SessionRecorder};
pub use runtime::{Phase, SessionRuntime, SessionState};
pub use time::{ManualClock, SystemClock, WallClock};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering the data from a poisoned mutex.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
