//! What happens after a focus phase runs out, and which commands are
//! accepted in each state.

use serde::{Deserialize, Serialize};

use super::config::SessionConfig;
use super::runtime::{Phase, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    AdjustTime,
    End,
    StartBreak,
    SkipBreak,
    StartNextSession,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionDecision {
    /// Break length offered to the user; the policy never picks for them.
    pub break_seconds: Option<u64>,
    /// Linked task to ask about, exactly once.
    pub task_prompt: Option<String>,
}

impl CompletionDecision {
    pub fn offers_break(&self) -> bool {
        self.break_seconds.is_some()
    }

    /// Commands open to the user once this decision has been applied.
    ///
    /// With a break on offer the session waits in `completed` for a choice;
    /// otherwise it is already back to idle.
    pub fn next_commands(&self) -> Vec<Command> {
        if self.offers_break() {
            vec![
                Command::StartBreak,
                Command::SkipBreak,
                Command::StartNextSession,
                Command::Reset,
            ]
        } else {
            vec![Command::Start]
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionPolicy;

impl CompletionPolicy {
    pub fn decide(&self, config: &SessionConfig) -> CompletionDecision {
        CompletionDecision {
            break_seconds: config
                .offers_break()
                .then_some(config.break_duration_seconds),
            task_prompt: config.linked_task_id.clone(),
        }
    }

    /// Commands the state machine will act on; anything else is a no-op.
    pub fn accepted_commands(&self, state: SessionState, phase: Phase) -> Vec<Command> {
        match (state, phase) {
            (SessionState::Idle, _) => vec![Command::Start],
            (SessionState::Running, Phase::Focus) => {
                vec![Command::Pause, Command::AdjustTime, Command::End]
            }
            (SessionState::Paused, Phase::Focus) => {
                vec![Command::Resume, Command::AdjustTime, Command::End]
            }
            (SessionState::Running, Phase::Break) => vec![
                Command::Pause,
                Command::AdjustTime,
                Command::SkipBreak,
                Command::End,
            ],
            (SessionState::Paused, Phase::Break) => vec![
                Command::Resume,
                Command::AdjustTime,
                Command::SkipBreak,
                Command::End,
            ],
            // Break choices come from the completion decision.
            (SessionState::Completed, _) => vec![Command::Reset],
            (SessionState::Canceled, _) => vec![Command::Reset],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::config::SessionMode;

    #[test]
    fn break_and_task_prompt() {
        let cfg = SessionConfig::pomodoro().with_linked_task("task-42");
        let decision = CompletionPolicy.decide(&cfg);
        assert_eq!(decision.break_seconds, Some(300));
        assert_eq!(decision.task_prompt.as_deref(), Some("task-42"));
        assert_eq!(
            decision.next_commands(),
            vec![
                Command::StartBreak,
                Command::SkipBreak,
                Command::StartNextSession,
                Command::Reset,
            ]
        );
    }

    #[test]
    fn no_break_leads_back_to_start() {
        let cfg = SessionConfig::new(SessionMode::Custom, 600, 0);
        let decision = CompletionPolicy.decide(&cfg);
        assert!(!decision.offers_break());
        assert_eq!(decision.task_prompt, None);
        assert_eq!(decision.next_commands(), vec![Command::Start]);
    }

    #[test]
    fn task_only_offers_no_break() {
        let cfg = SessionConfig::new(SessionMode::Custom, 600, 0).with_linked_task("t");
        let decision = CompletionPolicy.decide(&cfg);
        assert!(!decision.offers_break());
        assert_eq!(decision.task_prompt.as_deref(), Some("t"));
    }

    #[test]
    fn canceled_only_accepts_reset() {
        assert_eq!(
            CompletionPolicy.accepted_commands(SessionState::Canceled, Phase::Focus),
            vec![Command::Reset]
        );
    }
}
