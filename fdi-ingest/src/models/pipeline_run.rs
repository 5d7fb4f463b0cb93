//! Pipeline run state machine
//!
//! Idle → Acquiring → Normalizing → Retrieving → Done, or → Aborted from a
//! working state. A run is single-pass: retrying means a new run.

use chrono::{DateTime, Utc};
use fdi_common::events::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One pipeline run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub year: i32,
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub transitions: Vec<StateTransition>,
}

impl PipelineRun {
    pub fn new(year: i32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            year,
            state: PipelineState::Idle,
            started_at: Utc::now(),
            ended_at: None,
            transitions: Vec::new(),
        }
    }

    /// Move to `new_state`
    ///
    /// Illegal transitions (re-entering a state, leaving a terminal state)
    /// are refused and return `None`.
    pub fn transition_to(&mut self, new_state: PipelineState) -> Option<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            tracing::error!(
                run_id = %self.run_id,
                from = %self.state,
                to = %new_state,
                "Refusing illegal pipeline transition"
            );
            return None;
        }

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(transition.transitioned_at);
        }

        self.transitions.push(transition.clone());
        Some(transition)
    }

    /// States visited so far, starting with `Idle`
    pub fn visited_states(&self) -> Vec<PipelineState> {
        std::iter::once(PipelineState::Idle)
            .chain(self.transitions.iter().map(|t| t.new_state))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut run = PipelineRun::new(2024);
        for state in [
            PipelineState::Acquiring,
            PipelineState::Normalizing,
            PipelineState::Retrieving,
            PipelineState::Done,
        ] {
            assert!(run.transition_to(state).is_some());
        }

        assert_eq!(run.state, PipelineState::Done);
        assert!(run.ended_at.is_some());
        assert_eq!(run.visited_states().len(), 5);
    }

    #[test]
    fn test_abort_is_terminal() {
        let mut run = PipelineRun::new(2024);
        run.transition_to(PipelineState::Acquiring);
        run.transition_to(PipelineState::Aborted);

        assert!(run.transition_to(PipelineState::Normalizing).is_none());
        assert!(run.transition_to(PipelineState::Idle).is_none());
        assert_eq!(run.state, PipelineState::Aborted);
        assert_eq!(
            run.visited_states(),
            vec![PipelineState::Idle, PipelineState::Acquiring, PipelineState::Aborted]
        );
    }

    #[test]
    fn test_states_cannot_be_skipped() {
        let mut run = PipelineRun::new(2024);
        assert!(run.transition_to(PipelineState::Retrieving).is_none());
        assert_eq!(run.state, PipelineState::Idle);
        assert!(run.ended_at.is_none());
    }
}
