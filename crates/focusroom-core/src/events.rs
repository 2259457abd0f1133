use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{BlockingStatus, Phase, SessionMode, SessionRecord, SessionSnapshot};

/// Every state change in the engine produces an Event.
/// The UI renders from them; nothing in the engine reacts to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        phase: Phase,
        mode: SessionMode,
        total_seconds: u64,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        phase: Phase,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        phase: Phase,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    Ticked {
        phase: Phase,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    TimeAdjusted {
        phase: Phase,
        delta_seconds: i64,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    /// A phase ran out, or a focus phase was finished by hand.
    PhaseCompleted {
        phase: Phase,
        sessions_completed: u32,
        at: DateTime<Utc>,
    },
    SessionCanceled {
        phase: Phase,
        remaining_seconds: i64,
        at: DateTime<Utc>,
    },
    SessionRecorded {
        record: SessionRecord,
        at: DateTime<Utc>,
    },
    /// The user may start a break or go straight to the next session.
    BreakOffered {
        break_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Ask whether the linked task was completed.
    TaskCompletionPrompt {
        task_id: String,
        at: DateTime<Utc>,
    },
    LinkedTaskResolved {
        task_id: String,
        completed: bool,
        at: DateTime<Utc>,
    },
    BlockingStatusChanged {
        status: BlockingStatus,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
}
