use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which backend agent handles a query.
///
/// The cloud architect runs without a reviewing lead, so review output is
/// never produced for it regardless of the `enable_review` flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    /// General coding agent reviewed by the dev lead.
    #[default]
    Developer,
    /// Infrastructure agent reviewed by the devops lead.
    Devops,
    /// Architecture agent, never reviewed.
    CloudArchitect,
}

impl AgentType {
    /// All agent types in display order.
    pub const ALL: [AgentType; 3] = [
        AgentType::Developer,
        AgentType::Devops,
        AgentType::CloudArchitect,
    ];

    /// The wire name of this agent type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Developer => "developer",
            AgentType::Devops => "devops",
            AgentType::CloudArchitect => "cloud_architect",
        }
    }

    /// Whether the backend pairs this agent with a reviewer.
    pub fn has_reviewer(&self) -> bool {
        !matches!(self, AgentType::CloudArchitect)
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "developer" | "dev" => Ok(AgentType::Developer),
            "devops" => Ok(AgentType::Devops),
            "cloud_architect" | "architect" => Ok(AgentType::CloudArchitect),
            _ => Err(format!(
                "Invalid agent type: {s}. Valid options: developer, devops, cloud_architect"
            )),
        }
    }
}
