//! Exactly-once recording of finished focus phases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::config::SessionMode;
use super::dispatch::Dispatcher;
use super::runtime::{Phase, SessionRuntime, SessionState};

/// The pattern-learning / gamification service.
pub trait FocusRecordSink: Send + Sync {
    fn record_focus_session(&self, mode: &str, duration_minutes: u32, completed: bool);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub runtime_id: Uuid,
    pub mode: SessionMode,
    /// Running time between start and the terminal transition, pauses excluded.
    pub actual_elapsed_seconds: u64,
    pub completed: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whole minutes, rounded down.
    pub fn duration_minutes(&self) -> u32 {
        u32::try_from(self.actual_elapsed_seconds / 60).unwrap_or(u32::MAX)
    }
}

pub struct SessionRecorder {
    sink: Arc<dyn FocusRecordSink>,
    dispatcher: Dispatcher,
    last_recorded: Option<Uuid>,
}

impl SessionRecorder {
    pub fn new(sink: Arc<dyn FocusRecordSink>, dispatcher: Dispatcher) -> Self {
        Self {
            sink,
            dispatcher,
            last_recorded: None,
        }
    }

    /// Emit the record for a terminal focus runtime.
    ///
    /// Returns `None` without touching the sink when the runtime is not a
    /// finished focus phase or has already been recorded.
    pub fn record(&mut self, runtime: &SessionRuntime) -> Option<SessionRecord> {
        let ended_at = runtime.ended_at()?;
        if runtime.phase() != Phase::Focus || !runtime.state().is_terminal() {
            return None;
        }
        if self.last_recorded == Some(runtime.id()) {
            debug!(runtime = %runtime.id(), "focus session already recorded");
            return None;
        }
        self.last_recorded = Some(runtime.id());

        let record = SessionRecord {
            runtime_id: runtime.id(),
            mode: runtime.mode(),
            actual_elapsed_seconds: runtime.elapsed_seconds(ended_at),
            completed: runtime.state() == SessionState::Completed,
            started_at: runtime.started_at(),
            ended_at,
        };
        info!(
            mode = %record.mode,
            elapsed_secs = record.actual_elapsed_seconds,
            completed = record.completed,
            "recording focus session"
        );

        let sink = self.sink.clone();
        let mode = record.mode.as_str();
        let minutes = record.duration_minutes();
        let completed = record.completed;
        self.dispatcher
            .dispatch(move || sink.record_focus_session(mode, minutes, completed));

        Some(record)
    }
}
