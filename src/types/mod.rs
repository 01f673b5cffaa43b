// Public modules
pub mod agent_type;
pub mod attached_file_data;
pub mod directory_listing;
pub mod health;
pub mod message;
pub mod query_request;
pub mod query_response;
pub mod review_result;
pub mod session_responses;
pub mod settings;
pub mod stream_event;
pub mod thought_step;

// Re-exports
pub use agent_type::AgentType;
pub use attached_file_data::AttachedFileData;
pub use directory_listing::{DirectoryItem, DirectoryListing};
pub use health::HealthStatus;
pub use message::{HistoryEntry, Message, MessageRole};
pub use query_request::QueryRequest;
pub use query_response::QueryResponse;
pub use review_result::ReviewResult;
pub use session_responses::{
    CreateSessionResponse, SessionHistory, SessionInfo, SessionList, StatusResponse,
};
pub use settings::{Settings, SettingsUpdate, SettingsUpdateResponse};
pub use stream_event::StreamEvent;
pub use thought_step::ThoughtStep;
