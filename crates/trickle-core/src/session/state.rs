use serde::{Deserialize, Serialize};
use strum::Display;

/// How a request ended. Recorded exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    Errored { reason: String },
    Cancelled,
}

impl SessionOutcome {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionOutcome::Completed => SessionPhase::Completed,
            SessionOutcome::Errored { .. } => SessionPhase::Errored,
            SessionOutcome::Cancelled => SessionPhase::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Streaming,
    Completed,
    Errored,
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Errored | SessionPhase::Cancelled
        )
    }
}

/// Lifecycle of one orchestrated request:
/// `Idle -> Streaming -> {Completed | Errored | Cancelled}`.
#[derive(Debug, Default)]
pub struct SessionState {
    streaming: bool,
    outcome: Option<SessionOutcome>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.outcome, self.streaming) {
            (Some(outcome), _) => outcome.phase(),
            (None, true) => SessionPhase::Streaming,
            (None, false) => SessionPhase::Idle,
        }
    }

    /// `Idle -> Streaming`. False from any other phase.
    pub fn start(&mut self) -> bool {
        if self.phase() != SessionPhase::Idle {
            return false;
        }
        self.streaming = true;
        true
    }

    /// Records the terminal outcome. False if the session is not streaming,
    /// including when an outcome was already recorded; the first one stands.
    pub fn finish(&mut self, outcome: SessionOutcome) -> bool {
        if self.phase() != SessionPhase::Streaming {
            return false;
        }
        self.outcome = Some(outcome);
        true
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = SessionState::new();
        assert_eq!(state.phase(), SessionPhase::Idle);

        assert!(state.start());
        assert_eq!(state.phase(), SessionPhase::Streaming);

        assert!(state.finish(SessionOutcome::Completed));
        assert_eq!(state.phase(), SessionPhase::Completed);
        assert!(state.phase().is_terminal());
    }

    #[test]
    fn test_outcome_is_never_overwritten() {
        let mut state = SessionState::new();
        state.start();
        assert!(state.finish(SessionOutcome::Errored {
            reason: "boom".into()
        }));

        assert!(!state.finish(SessionOutcome::Completed));
        assert!(!state.finish(SessionOutcome::Cancelled));
        assert_eq!(
            state.outcome(),
            Some(&SessionOutcome::Errored {
                reason: "boom".into()
            })
        );
    }

    #[test]
    fn test_cannot_finish_before_start() {
        let mut state = SessionState::new();
        assert!(!state.finish(SessionOutcome::Completed));
        assert_eq!(state.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_cannot_restart() {
        let mut state = SessionState::new();
        assert!(state.start());
        assert!(!state.start());
        state.finish(SessionOutcome::Cancelled);
        assert!(!state.start());
        assert_eq!(state.phase(), SessionPhase::Cancelled);
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(SessionOutcome::Errored {
            reason: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "errored", "reason": "boom"}));
    }
}
