use serde::{Deserialize, Serialize};

/// Backend configuration as returned by `GET /settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory the agents operate in.
    pub project_root: String,

    /// Model the agents use.
    pub model_name: String,

    /// Models the backend accepts.
    #[serde(default)]
    pub available_models: Vec<String>,
}

/// Body of `POST /settings`. Absent fields are left unchanged by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

impl SettingsUpdate {
    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.project_root.is_none() && self.model_name.is_none()
    }
}

/// Response of `POST /settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdateResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub project_root: String,
    pub model_name: String,
}
