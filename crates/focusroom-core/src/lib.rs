//! # Focusroom Core Library
//!
//! The Focus Session Engine behind Focusroom: the component that owns a
//! session's clock, moves it through idle, running, paused, break, completed
//! and canceled, and keeps two side-effecting collaborators (app blocking and
//! focus recording) in step with those transitions exactly once each.
//!
//! ## Architecture
//!
//! - **Session state machine**: sole owner of session time; commands are
//!   total functions and invalid ones are ignored
//! - **Session clock**: one tick per second on a fixed cadence, only while running
//! - **Blocking coordinator**: best-effort app blocking around focus phases
//! - **Completion policy**: break offer and linked-task prompt after focus
//! - **Session recorder**: exactly one record per finished focus phase
//! - **Storage**: TOML configuration with per-mode defaults
//!
//! ## Key Components
//!
//! - [`SessionStateMachine`]: core state machine, driven by explicit ticks
//! - [`SessionDriver`]: the machine ticked in real time by a [`SessionClock`]
//! - [`Event`]: the single notification channel payload
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod session;
pub mod storage;

pub use error::{BlockingError, ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use session::{
    AppBlocker, BlockingStatus, Collaborators, Command, FocusRecordSink, ManualClock,
    ManualTicker, Phase, SessionClock, SessionConfig, SessionDriver, SessionMode, SessionRecord,
    SessionSnapshot, SessionState, SessionStateMachine,
};
pub use storage::Config;
