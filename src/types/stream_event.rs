use serde::{Deserialize, Serialize};

use crate::types::thought_step::free_form_text;
use crate::types::{ReviewResult, ThoughtStep};

/// One line of the `/query/stream` NDJSON response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Progress narration.
    Status {
        /// The status text.
        message: String,
    },

    /// One executed agent step.
    Step {
        /// One-based position of the step.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step_number: Option<u32>,
        /// Tool name.
        action: String,
        /// Tool arguments, possibly truncated by the backend.
        #[serde(default, deserialize_with = "free_form_text")]
        action_input: String,
        /// Tool output, possibly truncated by the backend.
        #[serde(default, deserialize_with = "free_form_text")]
        observation: String,
    },

    /// The agent's final answer.
    DeveloperResult {
        /// The response text.
        response: String,
        /// Full, untruncated steps; absent when details were not requested.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought_process: Option<Vec<ThoughtStep>>,
    },

    /// The reviewing lead's verdict.
    Review {
        /// The review.
        review: ReviewResult,
    },

    /// The turn finished.
    Complete {
        /// Closing narration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// The backend failed while producing the turn.
    Error {
        /// What went wrong.
        message: String,
        /// Backend stack trace, when provided.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        traceback: Option<String>,
    },
}

impl StreamEvent {
    /// The wire name of this event's type.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Step { .. } => "step",
            StreamEvent::DeveloperResult { .. } => "developer_result",
            StreamEvent::Review { .. } => "review",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_each_event_type() {
        let lines = [
            r#"{"type": "status", "message": "Analyzing requirements..."}"#,
            r#"{"type": "step", "step_number": 1, "action": "read_file", "action_input": "src/app.py", "observation": "def main(): ..."}"#,
            r#"{"type": "developer_result", "response": "Done", "thought_process": [{"action": "read_file", "action_input": {"path": "a"}, "observation": "x", "reasoning": "look"}]}"#,
            r#"{"type": "review", "review": {"status": "success", "decision": "approved", "review": "Good"}}"#,
            r#"{"type": "complete", "message": "Task completed"}"#,
            r#"{"type": "error", "message": "boom", "traceback": "Traceback..."}"#,
        ];
        let kinds: Vec<&str> = lines
            .iter()
            .map(|line| serde_json::from_str::<StreamEvent>(line).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "status",
                "step",
                "developer_result",
                "review",
                "complete",
                "error"
            ]
        );
    }

    #[test]
    fn developer_result_without_details() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type": "developer_result", "response": "ok"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::DeveloperResult {
                response: "ok".to_string(),
                thought_process: None,
            }
        );
        assert!(!event.is_terminal());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<StreamEvent>(r#"{"type": "heartbeat"}"#).is_err());
        assert!(serde_json::from_str::<StreamEvent>(r#"{"message": "no type"}"#).is_err());
    }
}
