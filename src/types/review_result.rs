use serde::{Deserialize, Serialize};

/// The reviewing lead's verdict on a developer result.
///
/// `decision` is whatever the backend sent (today `approved`,
/// `needs_improvement`, `rejected` or `error`); it is not interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResult {
    /// Whether the review itself ran (`success` or `error`).
    #[serde(default)]
    pub status: String,

    /// The reviewer's decision.
    #[serde(default)]
    pub decision: String,

    /// Free-text summary of the review.
    #[serde(rename = "review", default)]
    pub summary: String,

    /// Problems the reviewer found.
    #[serde(default)]
    pub issues: Vec<String>,

    /// Suggested improvements.
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Other remarks, typically praise on approval.
    #[serde(default)]
    pub comments: Vec<String>,
}

impl ReviewResult {
    /// Human-facing form of the decision: `needs_improvement` becomes `NEEDS IMPROVEMENT`.
    pub fn decision_label(&self) -> String {
        if self.decision.is_empty() {
            "UNKNOWN".to_string()
        } else {
            self.decision.replace('_', " ").to_uppercase()
        }
    }
}
