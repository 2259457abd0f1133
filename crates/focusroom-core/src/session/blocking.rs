//! Best-effort app blocking, kept in lockstep with focus phases.
//!
//! Blocking starts when a focus phase starts running and stops the moment it
//! leaves running for good (completion or cancellation). Pausing leaves the
//! shield up. Breaks are never blocked. A collaborator failure only changes
//! [`BlockingStatus`]; the timer keeps counting either way.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::dispatch::Dispatcher;
use super::lock;
use super::time::WallClock;
use crate::error::BlockingError;
use crate::events::Event;

/// The platform screen-time service.
pub trait AppBlocker: Send + Sync {
    fn is_authorized(&self) -> bool;

    /// Whether at least one app or category is selected for blocking.
    fn has_apps_selected(&self) -> bool;

    fn start_session(
        &self,
        title: &str,
        duration_seconds: u64,
        is_deep_focus: bool,
    ) -> Result<(), BlockingError>;

    /// Must be safe to call when nothing is blocked.
    fn end_session(&self, completed: bool);
}

/// Passive status surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum BlockingStatus {
    Off,
    Active,
    /// Blocking is enabled but no apps are selected.
    NothingSelected,
    Unauthorized,
    Failed(String),
}

impl BlockingStatus {
    /// Notice text for the UI, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            BlockingStatus::Unauthorized => Some("Screen Time access required"),
            BlockingStatus::Failed(_) => Some("blocking failed"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct BlockingRequest {
    title: String,
    duration_seconds: u64,
    is_deep_focus: bool,
}

pub struct BlockingCoordinator {
    blocker: Arc<dyn AppBlocker>,
    dispatcher: Dispatcher,
    status: Arc<Mutex<BlockingStatus>>,
    events: broadcast::Sender<Event>,
    wall_clock: Arc<dyn WallClock>,
    /// A start was requested and its stop has not been requested yet.
    engaged: bool,
}

impl BlockingCoordinator {
    pub fn new(
        blocker: Arc<dyn AppBlocker>,
        dispatcher: Dispatcher,
        events: broadcast::Sender<Event>,
        wall_clock: Arc<dyn WallClock>,
    ) -> Self {
        Self {
            blocker,
            dispatcher,
            status: Arc::new(Mutex::new(BlockingStatus::Off)),
            events,
            wall_clock,
            engaged: false,
        }
    }

    pub fn status(&self) -> BlockingStatus {
        lock(&self.status).clone()
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn on_enter_running_focus(&mut self, config: &SessionConfig) {
        if self.engaged {
            // Start/stop pairs never overlap.
            warn!("blocking still engaged from a previous focus phase; stopping it first");
            self.on_exit_running_focus(false);
        }
        if !config.app_blocking_enabled {
            debug!("app blocking disabled for this session");
            return;
        }
        self.engaged = true;

        let request = BlockingRequest {
            title: config.display_title().to_string(),
            duration_seconds: config.focus_duration_seconds,
            is_deep_focus: config.is_deep_focus,
        };
        let blocker = self.blocker.clone();
        let status = self.status.clone();
        let events = self.events.clone();
        let wall_clock = self.wall_clock.clone();
        self.dispatcher.dispatch(move || {
            let outcome = request_start(blocker.as_ref(), &request);
            publish_status(&status, &events, wall_clock.as_ref(), outcome);
        });
    }

    /// Always requests a stop, whether or not blocking was actually active.
    pub fn on_exit_running_focus(&mut self, completed: bool) {
        self.engaged = false;

        let blocker = self.blocker.clone();
        let status = self.status.clone();
        let events = self.events.clone();
        let wall_clock = self.wall_clock.clone();
        self.dispatcher.dispatch(move || {
            blocker.end_session(completed);
            publish_status(&status, &events, wall_clock.as_ref(), BlockingStatus::Off);
        });
    }
}

fn request_start(blocker: &dyn AppBlocker, request: &BlockingRequest) -> BlockingStatus {
    if !blocker.is_authorized() {
        warn!("app blocking requested but not authorized; focusing without blocking");
        return BlockingStatus::Unauthorized;
    }
    if !blocker.has_apps_selected() {
        info!("no apps selected for blocking; focusing without blocking");
        return BlockingStatus::NothingSelected;
    }
    match blocker.start_session(&request.title, request.duration_seconds, request.is_deep_focus) {
        Ok(()) => {
            info!(title = %request.title, "app blocking started");
            BlockingStatus::Active
        }
        Err(BlockingError::Unauthorized) => {
            warn!("app blocking authorization was revoked; focusing without blocking");
            BlockingStatus::Unauthorized
        }
        Err(e) => {
            warn!("failed to start app blocking: {e}");
            BlockingStatus::Failed(e.to_string())
        }
    }
}

fn publish_status(
    cell: &Mutex<BlockingStatus>,
    events: &broadcast::Sender<Event>,
    wall_clock: &dyn WallClock,
    next: BlockingStatus,
) {
    {
        let mut current = lock(cell);
        if *current == next {
            return;
        }
        *current = next.clone();
    }
    let _ = events.send(Event::BlockingStatusChanged {
        status: next,
        at: wall_clock.now(),
    });
}
