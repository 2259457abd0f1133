//! Focus session state machine.
//!
//! The machine is the only owner of [`SessionRuntime`] and the only code that
//! changes session time. It has no internal thread: a [`Ticker`] decides when
//! `tick()` is called, and every command is a total function that returns the
//! resulting state. Commands that make no sense in the current state are
//! ignored.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running(focus) <-> Paused
//! Running(focus) -> Completed -> Running(break) -> Running(focus) ...
//!                            \-> Running(focus)
//! Running/Paused -> Canceled -> (reset) Idle
//! ```
//!
//! Side effects of a transition run in a fixed order: stop the ticker,
//! blocking hook, recorder hook, completion policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use uuid::Uuid;

use super::blocking::{AppBlocker, BlockingCoordinator, BlockingStatus};
use super::clock::{ManualTicker, Ticker};
use super::config::{SessionConfig, SessionMode};
use super::dispatch::Dispatcher;
use super::policy::{Command, CompletionDecision, CompletionPolicy};
use super::recorder::{FocusRecordSink, SessionRecorder};
use super::runtime::{Phase, SessionRuntime, SessionState};
use super::time::{SystemClock, WallClock};
use crate::error::ValidationError;
use crate::events::Event;

/// Buffered events per subscriber before it starts lagging.
pub const EVENT_CAPACITY: usize = 256;

/// Everything the machine talks to, injected at construction.
pub struct Collaborators {
    pub blocker: Arc<dyn AppBlocker>,
    pub recorder: Arc<dyn FocusRecordSink>,
    pub ticker: Box<dyn Ticker>,
    pub wall_clock: Arc<dyn WallClock>,
    pub dispatcher: Dispatcher,
}

impl Collaborators {
    /// Manual ticking, system time, inline side effects.
    pub fn new(blocker: Arc<dyn AppBlocker>, recorder: Arc<dyn FocusRecordSink>) -> Self {
        Self {
            blocker,
            recorder,
            ticker: Box::new(ManualTicker::new()),
            wall_clock: Arc::new(SystemClock),
            dispatcher: Dispatcher::inline(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Ticker + 'static) -> Self {
        self.ticker = Box::new(ticker);
        self
    }

    pub fn with_wall_clock(mut self, wall_clock: impl WallClock + 'static) -> Self {
        self.wall_clock = Arc::new(wall_clock);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

/// What the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub runtime_id: Uuid,
    pub mode: SessionMode,
    pub state: SessionState,
    pub phase: Phase,
    pub total_seconds: u64,
    pub remaining_seconds: i64,
    pub progress: f64,
    pub sessions_completed: u32,
    pub blocking: BlockingStatus,
}

pub struct SessionStateMachine {
    config: SessionConfig,
    runtime: SessionRuntime,
    sessions_completed: u32,
    ticker: Box<dyn Ticker>,
    wall_clock: Arc<dyn WallClock>,
    blocking: BlockingCoordinator,
    recorder: SessionRecorder,
    policy: CompletionPolicy,
    decision: Option<CompletionDecision>,
    pending_task_prompt: Option<String>,
    events: broadcast::Sender<Event>,
}

impl SessionStateMachine {
    /// Create an idle machine for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Result<Self, ValidationError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let Collaborators {
            blocker,
            recorder,
            ticker,
            wall_clock,
            dispatcher,
        } = collaborators;

        Ok(Self {
            runtime: SessionRuntime::idle(config.mode, 0),
            config,
            sessions_completed: 0,
            ticker,
            blocking: BlockingCoordinator::new(
                blocker,
                dispatcher.clone(),
                events.clone(),
                wall_clock.clone(),
            ),
            recorder: SessionRecorder::new(recorder, dispatcher),
            wall_clock,
            policy: CompletionPolicy,
            decision: None,
            pending_task_prompt: None,
            events,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn runtime(&self) -> &SessionRuntime {
        &self.runtime
    }

    pub fn state(&self) -> SessionState {
        self.runtime.state()
    }

    pub fn phase(&self) -> Phase {
        self.runtime.phase()
    }

    pub fn remaining_seconds(&self) -> i64 {
        self.runtime.remaining_seconds()
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn blocking_status(&self) -> BlockingStatus {
        self.blocking.status()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    /// Outcome of the last natural focus completion, while still relevant.
    pub fn completion_decision(&self) -> Option<&CompletionDecision> {
        self.decision.as_ref()
    }

    /// Linked task awaiting a "was it completed?" answer.
    pub fn pending_task_prompt(&self) -> Option<&str> {
        self.pending_task_prompt.as_deref()
    }

    /// The UI must confirm before canceling a deep-focus phase.
    pub fn requires_cancel_confirmation(&self) -> bool {
        self.config.is_deep_focus && self.state().is_active() && self.phase() == Phase::Focus
    }

    pub fn available_commands(&self) -> Vec<Command> {
        match (self.state(), &self.decision) {
            (SessionState::Completed, Some(decision)) => decision.next_commands(),
            (state, _) => self.policy.accepted_commands(state, self.phase()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            runtime_id: self.runtime.id(),
            mode: self.runtime.mode(),
            state: self.runtime.state(),
            phase: self.runtime.phase(),
            total_seconds: self.runtime.total_seconds(),
            remaining_seconds: self.runtime.remaining_seconds(),
            progress: self.runtime.progress(),
            sessions_completed: self.sessions_completed,
            blocking: self.blocking.status(),
        }
    }

    /// Broadcast the current snapshot.
    pub fn publish_snapshot(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        self.emit(Event::StateSnapshot {
            snapshot: snapshot.clone(),
            at: self.now(),
        });
        snapshot
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the config for the next session. Only honoured while idle.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate; the current config is kept.
    pub fn configure(&mut self, config: SessionConfig) -> Result<SessionState, ValidationError> {
        config.validate()?;
        if self.state() != SessionState::Idle {
            debug!(state = ?self.state(), "configure ignored outside idle");
            return Ok(self.state());
        }
        self.runtime = SessionRuntime::idle(config.mode, self.sessions_completed);
        self.config = config;
        Ok(self.state())
    }

    pub fn start(&mut self) -> SessionState {
        if self.state() != SessionState::Idle {
            return self.ignore(Command::Start);
        }
        self.begin_focus();
        self.state()
    }

    /// Blocking stays up while paused.
    pub fn pause(&mut self) -> SessionState {
        if self.state() != SessionState::Running {
            return self.ignore(Command::Pause);
        }
        let now = self.now();
        self.ticker.stop();
        self.runtime.pause(now);
        info!(phase = ?self.phase(), remaining = self.remaining_seconds(), "session paused");
        self.emit(Event::SessionPaused {
            phase: self.phase(),
            remaining_seconds: self.remaining_seconds(),
            at: now,
        });
        self.state()
    }

    pub fn resume(&mut self) -> SessionState {
        if self.state() != SessionState::Paused {
            return self.ignore(Command::Resume);
        }
        let now = self.now();
        self.runtime.resume(now);
        self.ticker.start();
        info!(phase = ?self.phase(), remaining = self.remaining_seconds(), "session resumed");
        self.emit(Event::SessionResumed {
            phase: self.phase(),
            remaining_seconds: self.remaining_seconds(),
            at: now,
        });
        self.state()
    }

    /// Shift the clock by `delta_seconds`.
    ///
    /// Count-down phases stay within `[0, total]`; a count-up flow phase is
    /// unclamped. Reaching zero is picked up by the next tick.
    pub fn adjust_time(&mut self, delta_seconds: i64) -> SessionState {
        if !self.state().is_active() {
            return self.ignore(Command::AdjustTime);
        }
        self.runtime.adjust(delta_seconds);
        debug!(delta_seconds, remaining = self.remaining_seconds(), "time adjusted");
        self.emit(Event::TimeAdjusted {
            phase: self.phase(),
            delta_seconds,
            remaining_seconds: self.remaining_seconds(),
            at: self.now(),
        });
        self.state()
    }

    /// Advance one second. Only has an effect while running.
    pub fn tick(&mut self) -> SessionState {
        if self.state() != SessionState::Running {
            trace!(state = ?self.state(), "tick ignored");
            return self.state();
        }
        let reached_zero = self.runtime.tick();
        self.emit(Event::Ticked {
            phase: self.phase(),
            remaining_seconds: self.remaining_seconds(),
            at: self.now(),
        });
        if reached_zero {
            match self.phase() {
                Phase::Focus => self.finish_focus(true, true),
                Phase::Break => self.complete_break(),
            }
        }
        self.state()
    }

    /// Finish the current phase by hand.
    ///
    /// `end(false)` cancels a focus phase; `end(true)` finishes it early and
    /// records it as completed. Ending a break drops it and returns to idle.
    /// Calling `end` on a finished session does nothing.
    pub fn end(&mut self, completed: bool) -> SessionState {
        match (self.state(), self.phase()) {
            (SessionState::Running | SessionState::Paused, Phase::Focus) => {
                self.finish_focus(completed, false);
            }
            (SessionState::Running | SessionState::Paused, Phase::Break) => {
                self.discard_break();
            }
            _ => return self.ignore(Command::End),
        }
        self.state()
    }

    pub fn start_break(&mut self) -> SessionState {
        if self.state() != SessionState::Completed || !self.config.offers_break() {
            return self.ignore(Command::StartBreak);
        }
        let now = self.now();
        self.runtime = SessionRuntime::begin(
            self.config.mode,
            Phase::Break,
            self.config.break_duration_seconds,
            self.sessions_completed,
            now,
        );
        self.decision = None;
        // No blocking during a break; it was stopped when focus completed.
        self.ticker.start();
        info!(break_secs = self.config.break_duration_seconds, "break started");
        self.emit_started(now);
        self.state()
    }

    pub fn skip_break(&mut self) -> SessionState {
        match (self.state(), self.phase()) {
            (SessionState::Completed, _) => {}
            (SessionState::Running | SessionState::Paused, Phase::Break) => {
                let now = self.now();
                self.runtime.finish(SessionState::Canceled, now);
                info!("break skipped");
            }
            _ => return self.ignore(Command::SkipBreak),
        }
        self.begin_focus();
        self.state()
    }

    pub fn start_next_session(&mut self) -> SessionState {
        if self.state() != SessionState::Completed {
            return self.ignore(Command::StartNextSession);
        }
        self.begin_focus();
        self.state()
    }

    /// Discard a finished runtime and return to idle.
    pub fn reset(&mut self) -> SessionState {
        if !self.state().is_terminal() {
            return self.ignore(Command::Reset);
        }
        self.return_to_idle(self.now());
        self.state()
    }

    /// Answer the linked-task prompt. Only the first answer counts.
    pub fn resolve_task_prompt(&mut self, completed: bool) -> Option<String> {
        let task_id = self.pending_task_prompt.take()?;
        info!(task_id = %task_id, completed, "linked task prompt answered");
        self.emit(Event::LinkedTaskResolved {
            task_id: task_id.clone(),
            completed,
            at: self.now(),
        });
        Some(task_id)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn now(&self) -> DateTime<Utc> {
        self.wall_clock.now()
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_started(&self, at: DateTime<Utc>) {
        self.emit(Event::SessionStarted {
            phase: self.phase(),
            mode: self.runtime.mode(),
            total_seconds: self.runtime.total_seconds(),
            remaining_seconds: self.remaining_seconds(),
            at,
        });
    }

    fn ignore(&self, command: Command) -> SessionState {
        debug!(?command, state = ?self.state(), phase = ?self.phase(), "command ignored");
        self.state()
    }

    fn begin_focus(&mut self) {
        let now = self.now();
        self.runtime = SessionRuntime::begin(
            self.config.mode,
            Phase::Focus,
            self.config.focus_duration_seconds,
            self.sessions_completed,
            now,
        );
        self.decision = None;
        self.ticker.start();
        info!(
            mode = %self.config.mode,
            total_secs = self.config.focus_duration_seconds,
            "focus session started"
        );
        self.emit_started(now);
        self.blocking.on_enter_running_focus(&self.config);
    }

    fn finish_focus(&mut self, completed: bool, natural: bool) {
        let now = self.now();
        let terminal = if completed {
            SessionState::Completed
        } else {
            SessionState::Canceled
        };
        if natural {
            self.runtime.record_completion();
            self.sessions_completed += 1;
        }
        // The transition lands before any side effect is dispatched, so a
        // second `end` in the same turn is already a no-op.
        self.runtime.finish(terminal, now);

        self.ticker.stop();
        if completed {
            info!(natural, sessions = self.sessions_completed, "focus session completed");
            self.emit(Event::PhaseCompleted {
                phase: Phase::Focus,
                sessions_completed: self.sessions_completed,
                at: now,
            });
        } else {
            info!(remaining = self.remaining_seconds(), "focus session canceled");
            self.emit(Event::SessionCanceled {
                phase: Phase::Focus,
                remaining_seconds: self.remaining_seconds(),
                at: now,
            });
        }

        self.blocking.on_exit_running_focus(completed);

        if let Some(record) = self.recorder.record(&self.runtime) {
            self.emit(Event::SessionRecorded { record, at: now });
        }

        if natural {
            self.apply_completion_policy(now);
        } else if completed {
            self.return_to_idle(now);
        }
    }

    fn apply_completion_policy(&mut self, now: DateTime<Utc>) {
        let decision = self.policy.decide(&self.config);
        if let Some(break_seconds) = decision.break_seconds {
            self.emit(Event::BreakOffered {
                break_seconds,
                at: now,
            });
        }
        if let Some(task_id) = &decision.task_prompt {
            self.pending_task_prompt = Some(task_id.clone());
            self.emit(Event::TaskCompletionPrompt {
                task_id: task_id.clone(),
                at: now,
            });
        }
        let offers_break = decision.offers_break();
        self.decision = Some(decision);
        if !offers_break {
            self.return_to_idle(now);
        }
    }

    fn complete_break(&mut self) {
        let now = self.now();
        self.runtime.finish(SessionState::Completed, now);
        info!("break completed");
        self.emit(Event::PhaseCompleted {
            phase: Phase::Break,
            sessions_completed: self.sessions_completed,
            at: now,
        });
        self.begin_focus();
    }

    fn discard_break(&mut self) {
        let now = self.now();
        self.runtime.finish(SessionState::Canceled, now);
        self.ticker.stop();
        info!("break ended early");
        self.emit(Event::SessionCanceled {
            phase: Phase::Break,
            remaining_seconds: self.remaining_seconds(),
            at: now,
        });
        self.return_to_idle(now);
    }

    fn return_to_idle(&mut self, now: DateTime<Utc>) {
        self.runtime = SessionRuntime::idle(self.config.mode, self.sessions_completed);
        self.decision = None;
        self.emit(Event::SessionReset { at: now });
    }
}
