// SPDX-License-Identifier: MIT

//! Result and event types returned by the graph engine

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pausegraph::workflow::state::{StateUpdate, WorkflowState};

use super::node::ResumeKind;

/// Outcome of a `run`, `resume` or `continue_run` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunResult {
    /// `End` was reached; carries the final state
    Completed { state: WorkflowState },
    /// A node asked for external input
    Paused(PauseInfo),
}

impl RunResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, RunResult::Paused(_))
    }

    /// Final state when completed
    pub fn state(&self) -> Option<&WorkflowState> {
        match self {
            RunResult::Completed { state } => Some(state),
            RunResult::Paused(_) => None,
        }
    }

    pub fn pause(&self) -> Option<&PauseInfo> {
        match self {
            RunResult::Paused(info) => Some(info),
            RunResult::Completed { .. } => None,
        }
    }
}

/// Details of the pause a run is waiting on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauseInfo {
    /// Node that paused and will be re-invoked on resume
    pub node: String,
    pub payload: Value,
    pub expects: ResumeKind,
}

/// Per-step progress event, emitted by the streaming variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    NodeStarted { node: String, step: u64 },
    NodeUpdated { node: String, update: StateUpdate },
    Interrupted { node: String, payload: Value },
    Completed { state: WorkflowState },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_result_serializes_with_status_tag() {
        let paused = RunResult::Paused(PauseInfo {
            node: "human_feedback".to_string(),
            payload: json!("feedback?"),
            expects: ResumeKind::Any,
        });
        let value = serde_json::to_value(&paused).unwrap();
        assert_eq!(value["status"], "paused");
        assert_eq!(value["node"], "human_feedback");
        assert_eq!(value["expects"], "any");

        let done = RunResult::Completed {
            state: WorkflowState::from_value(json!({"joke": "..."})).unwrap(),
        };
        let value = serde_json::to_value(&done).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["state"]["joke"], "...");
    }

    #[test]
    fn test_run_event_tagging() {
        let event = RunEvent::NodeUpdated {
            node: "evaluator".to_string(),
            update: StateUpdate::new().set("funny_or_not", "funny"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "node_updated");
        assert_eq!(value["update"]["funny_or_not"], "funny");
    }

    #[test]
    fn test_accessors() {
        let done = RunResult::Completed {
            state: WorkflowState::empty(),
        };
        assert!(done.is_completed());
        assert!(done.pause().is_none());
        assert!(done.state().is_some());
    }
}
