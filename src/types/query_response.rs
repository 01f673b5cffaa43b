use serde::{Deserialize, Serialize};

use crate::types::{ReviewResult, ThoughtStep};

/// Response of the non-streaming `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// `success` on success.
    pub status: String,

    /// The session the exchange was recorded in.
    pub session_id: String,

    /// The agent's answer.
    pub response: String,

    /// Agent steps, present when details were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<Vec<ThoughtStep>>,

    /// Reviewer verdict, present when review ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewResult>,

    /// Messages now held by the backend for this session.
    #[serde(default)]
    pub message_count: usize,
}
