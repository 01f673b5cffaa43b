use serde::{Deserialize, Serialize};

use crate::types::{AgentType, AttachedFileData};

/// Body of `POST /query` and `POST /query/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The operator's query text.
    pub query: String,

    /// Session to append to; the backend creates one when absent.
    pub session_id: Option<String>,

    /// Ask the backend for the agent's thought process.
    pub show_details: bool,

    /// Ask the backend to run the reviewing lead.
    pub enable_review: bool,

    /// Which agent handles the query.
    pub agent_type: AgentType,

    /// Base64-encoded files sent with the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_files: Option<Vec<AttachedFileData>>,

    /// Set to `false` for `/query`; omitted for `/query/stream`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl QueryRequest {
    /// A query with details and review enabled for the developer agent.
    pub fn new(query: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            query: query.into(),
            session_id,
            show_details: true,
            enable_review: true,
            agent_type: AgentType::Developer,
            attached_files: None,
            stream: None,
        }
    }

    /// Sets whether the thought process is requested.
    pub fn with_show_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    /// Sets whether review is requested.
    pub fn with_review(mut self, enable_review: bool) -> Self {
        self.enable_review = enable_review;
        self
    }

    /// Sets the agent type.
    pub fn with_agent_type(mut self, agent_type: AgentType) -> Self {
        self.agent_type = agent_type;
        self
    }

    /// Attaches encoded files; an empty list sends none.
    pub fn with_attachments(mut self, files: Vec<AttachedFileData>) -> Self {
        self.attached_files = if files.is_empty() { None } else { Some(files) };
        self
    }
}
