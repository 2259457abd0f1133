use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::SessionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Completed,
    Canceled,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Running | SessionState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Focus,
    Break,
}

/// Mutable state of one focus or break phase.
///
/// Owned by the state machine and replaced wholesale at every phase
/// boundary; a completed or canceled runtime is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRuntime {
    id: Uuid,
    mode: SessionMode,
    state: SessionState,
    phase: Phase,
    total_seconds: u64,
    /// Count-down: seconds left, floored at 0. Count-up: seconds elapsed.
    remaining_seconds: i64,
    sessions_completed_this_run: u32,
    started_at: Option<DateTime<Utc>>,
    last_resumed_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    /// Running time from already closed windows.
    active_ms: i64,
}

impl SessionRuntime {
    pub(crate) fn idle(mode: SessionMode, sessions_completed_this_run: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            state: SessionState::Idle,
            phase: Phase::Focus,
            total_seconds: 0,
            remaining_seconds: 0,
            sessions_completed_this_run,
            started_at: None,
            last_resumed_at: None,
            ended_at: None,
            active_ms: 0,
        }
    }

    pub(crate) fn begin(
        mode: SessionMode,
        phase: Phase,
        total_seconds: u64,
        sessions_completed_this_run: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut runtime = Self {
            phase,
            total_seconds,
            state: SessionState::Running,
            started_at: Some(now),
            last_resumed_at: Some(now),
            ..Self::idle(mode, sessions_completed_this_run)
        };
        runtime.remaining_seconds = runtime.initial_remaining();
        runtime
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_seconds
    }

    pub fn sessions_completed_this_run(&self) -> u32 {
        self.sessions_completed_this_run
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Flow focus phases count up; everything else counts down.
    pub fn counts_up(&self) -> bool {
        self.phase == Phase::Focus && self.mode.counts_up()
    }

    /// 0.0 .. 1.0 progress within the phase; always 0 for count-up phases.
    pub fn progress(&self) -> f64 {
        if self.counts_up() || self.total_seconds == 0 {
            return 0.0;
        }
        let done = self.total_seconds as f64 - self.remaining_seconds as f64;
        (done / self.total_seconds as f64).clamp(0.0, 1.0)
    }

    /// Running time between start and `now`, excluding paused intervals.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        let open = self
            .last_resumed_at
            .map(|resumed| (now - resumed).num_milliseconds().max(0))
            .unwrap_or(0);
        let total_ms = self.active_ms.saturating_add(open);
        ((total_ms + 500) / 1000).max(0) as u64
    }

    // ── Mutators (state machine only) ────────────────────────────────

    fn initial_remaining(&self) -> i64 {
        if self.counts_up() {
            0
        } else {
            self.total_seconds.min(i64::MAX as u64) as i64
        }
    }

    /// Advance one second. Returns `true` when a count-down phase hits zero.
    pub(crate) fn tick(&mut self) -> bool {
        if self.counts_up() {
            self.remaining_seconds = self.remaining_seconds.saturating_add(1);
            false
        } else {
            self.remaining_seconds = (self.remaining_seconds - 1).max(0);
            self.remaining_seconds == 0
        }
    }

    /// Count-down phases clamp to `[0, total]`; count-up phases are unclamped.
    pub(crate) fn adjust(&mut self, delta_seconds: i64) {
        let adjusted = self.remaining_seconds.saturating_add(delta_seconds);
        self.remaining_seconds = if self.counts_up() {
            adjusted
        } else {
            adjusted.clamp(0, self.initial_remaining())
        };
    }

    pub(crate) fn pause(&mut self, now: DateTime<Utc>) {
        self.close_window(now);
        self.state = SessionState::Paused;
    }

    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        self.state = SessionState::Running;
        self.last_resumed_at = Some(now);
    }

    pub(crate) fn finish(&mut self, state: SessionState, now: DateTime<Utc>) {
        debug_assert!(state.is_terminal());
        self.close_window(now);
        self.state = state;
        self.ended_at = Some(now);
    }

    pub(crate) fn record_completion(&mut self) {
        self.sessions_completed_this_run += 1;
    }

    fn close_window(&mut self, now: DateTime<Utc>) {
        if let Some(resumed) = self.last_resumed_at.take() {
            let window = (now - resumed).num_milliseconds().max(0);
            self.active_ms = self.active_ms.saturating_add(window);
        }
    }
}
