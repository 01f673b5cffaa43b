use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{ReviewResult, ThoughtStep};

/// The role of a message in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Sent by the operator.
    User,
    /// A developer result from the backend agent.
    Assistant,
    /// Transient progress narration.
    Status,
    /// The reviewing lead's verdict.
    Review,
    /// A failure surfaced into the log.
    Error,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Status => "status",
            MessageRole::Review => "review",
            MessageRole::Error => "error",
        };
        f.write_str(s)
    }
}

/// One entry in the conversation log.
///
/// Each role carries only the fields that make sense for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    /// A query typed by the operator.
    User {
        /// The query text.
        content: String,
        /// Names of files sent with the query.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<String>,
        /// When the message was created.
        #[serde(default, with = "crate::utils::time::option")]
        timestamp: Option<OffsetDateTime>,
    },

    /// The agent's answer.
    Assistant {
        /// The response text.
        content: String,
        /// Steps the agent took. Always retained; display is a renderer choice.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        thought_process: Vec<ThoughtStep>,
        /// When the message was created.
        #[serde(default, with = "crate::utils::time::option")]
        timestamp: Option<OffsetDateTime>,
    },

    /// Progress narration such as "Analyzing requirements...".
    Status {
        /// The status text.
        content: String,
        /// When the message was created.
        #[serde(default, with = "crate::utils::time::option")]
        timestamp: Option<OffsetDateTime>,
    },

    /// A review of the preceding assistant message.
    Review {
        /// The review itself.
        review: ReviewResult,
        /// When the message was created.
        #[serde(default, with = "crate::utils::time::option")]
        timestamp: Option<OffsetDateTime>,
    },

    /// A failure.
    Error {
        /// What went wrong.
        content: String,
        /// When the message was created.
        #[serde(default, with = "crate::utils::time::option")]
        timestamp: Option<OffsetDateTime>,
    },
}

impl Message {
    /// A user message stamped with the current time.
    pub fn user(content: impl Into<String>, attachments: Vec<String>) -> Self {
        Message::User {
            content: content.into(),
            attachments,
            timestamp: Some(now()),
        }
    }

    /// An assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>, thought_process: Vec<ThoughtStep>) -> Self {
        Message::Assistant {
            content: content.into(),
            thought_process,
            timestamp: Some(now()),
        }
    }

    /// A status message stamped with the current time.
    pub fn status(content: impl Into<String>) -> Self {
        Message::Status {
            content: content.into(),
            timestamp: Some(now()),
        }
    }

    /// A review message stamped with the current time.
    pub fn review(review: ReviewResult) -> Self {
        Message::Review {
            review,
            timestamp: Some(now()),
        }
    }

    /// An error message stamped with the current time.
    pub fn error(content: impl Into<String>) -> Self {
        Message::Error {
            content: content.into(),
            timestamp: Some(now()),
        }
    }

    /// The role of this message.
    pub fn role(&self) -> MessageRole {
        match self {
            Message::User { .. } => MessageRole::User,
            Message::Assistant { .. } => MessageRole::Assistant,
            Message::Status { .. } => MessageRole::Status,
            Message::Review { .. } => MessageRole::Review,
            Message::Error { .. } => MessageRole::Error,
        }
    }

    /// The primary text of this message; for reviews, the summary.
    pub fn content(&self) -> &str {
        match self {
            Message::User { content, .. }
            | Message::Assistant { content, .. }
            | Message::Status { content, .. }
            | Message::Error { content, .. } => content,
            Message::Review { review, .. } => &review.summary,
        }
    }

    /// When this message was created, if known.
    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Message::User { timestamp, .. }
            | Message::Assistant { timestamp, .. }
            | Message::Status { timestamp, .. }
            | Message::Review { timestamp, .. }
            | Message::Error { timestamp, .. } => *timestamp,
        }
    }
}

/// A message as stored by the backend's session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `user` or `assistant` today; other roles are tolerated.
    pub role: String,

    /// The message text.
    #[serde(default)]
    pub content: String,

    /// When the backend recorded the message.
    #[serde(default, with = "crate::utils::time::option")]
    pub timestamp: Option<OffsetDateTime>,
}

impl From<HistoryEntry> for Message {
    fn from(entry: HistoryEntry) -> Self {
        let HistoryEntry {
            role,
            content,
            timestamp,
        } = entry;
        match role.as_str() {
            "user" => Message::User {
                content,
                attachments: Vec::new(),
                timestamp,
            },
            "assistant" => Message::Assistant {
                content,
                thought_process: Vec::new(),
                timestamp,
            },
            "status" => Message::Status { content, timestamp },
            "error" => Message::Error { content, timestamp },
            other => Message::Error {
                content: format!("[unrecognized role '{other}'] {content}"),
                timestamp,
            },
        }
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entries_convert_by_role() {
        let json = r#"[
            {"role": "user", "content": "add a test", "timestamp": "2024-05-01T09:30:15.123456"},
            {"role": "assistant", "content": "done", "timestamp": "2024-05-01T09:31:00"}
        ]"#;
        let entries: Vec<HistoryEntry> = serde_json::from_str(json).unwrap();
        let messages: Vec<Message> = entries.into_iter().map(Message::from).collect();
        assert_eq!(messages[0].role(), MessageRole::User);
        assert_eq!(messages[0].content(), "add a test");
        assert!(messages[0].timestamp().is_some());
        assert_eq!(messages[1].role(), MessageRole::Assistant);
    }

    #[test]
    fn unknown_history_role_becomes_error() {
        let entry = HistoryEntry {
            role: "system".to_string(),
            content: "boot".to_string(),
            timestamp: None,
        };
        let message = Message::from(entry);
        assert_eq!(message.role(), MessageRole::Error);
        assert!(message.content().contains("system"));
        assert!(message.content().ends_with("boot"));
    }

    #[test]
    fn serialized_role_tag() {
        let message = Message::Status {
            content: "Analyzing requirements...".to_string(),
            timestamp: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "status");
        assert_eq!(json["content"], "Analyzing requirements...");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }
}
