// Public modules
pub mod attachments;
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod ndjson;
pub mod observability;
pub mod render;
pub mod session;
pub mod settings;
pub mod types;
pub mod utils;

// Re-exports
pub use attachments::{FileCategory, PendingAttachments, Selection};
pub use backend::AssistantBackend;
pub use client::DevAssistant;
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use conversation::{Conversation, Turn, TurnStatus};
pub use directory::DirectoryBrowser;
pub use error::{Error, Result};
pub use ndjson::{EventStream, NdjsonDecoder, process_ndjson};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use session::{QueryOptions, Session};
pub use settings::SettingsState;
pub use types::*;
