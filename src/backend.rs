//! The seam between the console's state holders and the backend service.
//!
//! [`DevAssistant`](crate::DevAssistant) is the HTTP implementation; the
//! state holders are generic over this trait so they can be driven by any
//! backend, including in-memory ones.

use crate::ndjson::EventStream;
use crate::types::{
    CreateSessionResponse, DirectoryListing, HealthStatus, QueryRequest, QueryResponse,
    SessionHistory, SessionInfo, SessionList, Settings, SettingsUpdate, SettingsUpdateResponse,
    StatusResponse,
};
use crate::Result;

/// Every operation the developer-assistant backend offers.
#[async_trait::async_trait]
pub trait AssistantBackend: Send + Sync {
    /// `GET /health`.
    async fn health(&self) -> Result<HealthStatus>;

    /// `POST /session/create`.
    async fn create_session(&self) -> Result<CreateSessionResponse>;

    /// `GET /session/{id}`.
    async fn session_info(&self, session_id: &str) -> Result<SessionInfo>;

    /// `GET /session/{id}/history`.
    async fn session_history(&self, session_id: &str) -> Result<SessionHistory>;

    /// `POST /session/{id}/clear`.
    async fn clear_session(&self, session_id: &str) -> Result<StatusResponse>;

    /// `DELETE /session/{id}`.
    async fn delete_session(&self, session_id: &str) -> Result<StatusResponse>;

    /// `GET /sessions`.
    async fn list_sessions(&self) -> Result<SessionList>;

    /// `POST /query` with `stream: false`.
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse>;

    /// `POST /query/stream`, returning the parsed NDJSON events.
    async fn query_stream(&self, request: QueryRequest) -> Result<EventStream>;

    /// `GET /settings`.
    async fn settings(&self) -> Result<Settings>;

    /// `POST /settings`.
    async fn update_settings(&self, update: &SettingsUpdate) -> Result<SettingsUpdateResponse>;

    /// `GET /browse-directory`, defaulting to the backend user's home directory.
    async fn browse_directory(&self, path: Option<&str>) -> Result<DirectoryListing>;
}
