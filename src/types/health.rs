use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Backend configuration summary; shape is backend-defined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}
