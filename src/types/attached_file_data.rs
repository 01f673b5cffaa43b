use serde::{Deserialize, Serialize};

/// A file sent alongside a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFileData {
    /// The file's base name.
    pub filename: String,

    /// Base64 payload, without any data-URL prefix.
    pub content: String,
}

impl AttachedFileData {
    /// Create a new attachment from an already-encoded payload.
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}
