use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionMode {
    Pomodoro,
    DeepWork,
    /// Open-ended, counts up, never completes on its own.
    Flow,
    Custom,
}

impl SessionMode {
    /// Name handed to the recording collaborator.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Pomodoro => "pomodoro",
            SessionMode::DeepWork => "deepWork",
            SessionMode::Flow => "flow",
            SessionMode::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionMode::Pomodoro => "Pomodoro",
            SessionMode::DeepWork => "Deep Work",
            SessionMode::Flow => "Flow",
            SessionMode::Custom => "Focus Session",
        }
    }

    pub fn counts_up(&self) -> bool {
        matches!(self, SessionMode::Flow)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a session, built by the caller before `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub mode: SessionMode,
    pub focus_duration_seconds: u64,
    /// `0` means no break is offered.
    pub break_duration_seconds: u64,
    /// Cancellation needs explicit confirmation from the UI.
    #[serde(default)]
    pub is_deep_focus: bool,
    #[serde(default)]
    pub linked_task_id: Option<String>,
    #[serde(default)]
    pub app_blocking_enabled: bool,
    /// Title passed to the blocking collaborator; falls back to the mode label.
    #[serde(default)]
    pub title: Option<String>,
}

impl SessionConfig {
    pub fn new(mode: SessionMode, focus_duration_seconds: u64, break_duration_seconds: u64) -> Self {
        Self {
            mode,
            focus_duration_seconds,
            break_duration_seconds,
            is_deep_focus: false,
            linked_task_id: None,
            app_blocking_enabled: false,
            title: None,
        }
    }

    /// 25 minutes of focus, 5 minute break.
    pub fn pomodoro() -> Self {
        Self::new(SessionMode::Pomodoro, 25 * 60, 5 * 60)
    }

    pub fn deep_work(focus_duration_seconds: u64) -> Self {
        Self::new(SessionMode::DeepWork, focus_duration_seconds, 0).with_deep_focus(true)
    }

    pub fn flow() -> Self {
        Self::new(SessionMode::Flow, 0, 0)
    }

    pub fn with_break(mut self, seconds: u64) -> Self {
        self.break_duration_seconds = seconds;
        self
    }

    pub fn with_deep_focus(mut self, enabled: bool) -> Self {
        self.is_deep_focus = enabled;
        self
    }

    pub fn with_app_blocking(mut self, enabled: bool) -> Self {
        self.app_blocking_enabled = enabled;
        self
    }

    pub fn with_linked_task(mut self, task_id: impl Into<String>) -> Self {
        self.linked_task_id = Some(task_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title shown by the blocking shield.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| self.mode.label())
    }

    pub fn offers_break(&self) -> bool {
        self.break_duration_seconds > 0
    }

    /// # Errors
    ///
    /// Returns an error when a count-down mode has no focus duration, or when
    /// the linked task identifier is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.focus_duration_seconds == 0 && !self.mode.counts_up() {
            return Err(ValidationError::ZeroFocusDuration {
                mode: self.mode.to_string(),
            });
        }
        if let Some(task_id) = &self.linked_task_id {
            if task_id.trim().is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "linked_task_id".into(),
                    message: "must not be blank".into(),
                });
            }
        }
        Ok(())
    }
}
