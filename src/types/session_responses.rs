//! Responses of the `/session` endpoints.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::HistoryEntry;

/// Response of `POST /session/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub status: String,
    pub session_id: String,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /session/{id}/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    pub status: String,
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}

/// Plain acknowledgement, e.g. from `POST /session/{id}/clear`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /session/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(with = "crate::utils::time")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::utils::time")]
    pub last_accessed: OffsetDateTime,
    #[serde(default)]
    pub message_count: usize,
}

/// Response of `GET /sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub active_sessions: usize,
    #[serde(default)]
    pub sessions: Vec<SessionInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_session_list() {
        let json = r#"{
            "status": "success",
            "active_sessions": 1,
            "sessions": [{
                "session_id": "4f1c",
                "created_at": "2024-05-01T09:30:15.000001",
                "last_accessed": "2024-05-01T09:45:00",
                "message_count": 4
            }]
        }"#;
        let list: SessionList = serde_json::from_str(json).unwrap();
        assert_eq!(list.active_sessions, 1);
        assert_eq!(list.sessions[0].session_id, "4f1c");
        assert_eq!(list.sessions[0].message_count, 4);
    }

    #[test]
    fn parse_history_without_messages() {
        let history: SessionHistory =
            serde_json::from_str(r#"{"status": "success", "session_id": "x"}"#).unwrap();
        assert!(history.messages.is_empty());
    }
}
