//! Stand-in collaborators for running sessions from a terminal.

use focusroom_core::{AppBlocker, BlockingError, FocusRecordSink};
use tracing::info;

/// Pretends the screen-time service is authorized with a selection made,
/// and logs what it would block.
#[derive(Debug, Default)]
pub struct ConsoleBlocker;

impl AppBlocker for ConsoleBlocker {
    fn is_authorized(&self) -> bool {
        true
    }

    fn has_apps_selected(&self) -> bool {
        true
    }

    fn start_session(
        &self,
        title: &str,
        duration_seconds: u64,
        is_deep_focus: bool,
    ) -> Result<(), BlockingError> {
        info!(title, duration_seconds, is_deep_focus, "blocking distracting apps");
        Ok(())
    }

    fn end_session(&self, completed: bool) {
        info!(completed, "releasing app block");
    }
}

/// Prints each focus record to stderr.
#[derive(Debug, Default)]
pub struct ConsoleRecorder;

impl FocusRecordSink for ConsoleRecorder {
    fn record_focus_session(&self, mode: &str, duration_minutes: u32, completed: bool) {
        eprintln!("recorded {mode} session: {duration_minutes} min, completed={completed}");
    }
}
