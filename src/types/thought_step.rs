use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One action the agent took while working on a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtStep {
    /// Name of the tool the agent invoked.
    pub action: String,

    /// The tool arguments. Structured arguments are kept as their JSON text.
    #[serde(default, deserialize_with = "free_form_text")]
    pub action_input: String,

    /// What the tool returned.
    #[serde(default, deserialize_with = "free_form_text")]
    pub observation: String,

    /// The agent's reasoning before the action; empty for streamed steps.
    #[serde(default, deserialize_with = "free_form_text")]
    pub reasoning: String,
}

impl ThoughtStep {
    /// Create a step without reasoning text.
    pub fn new(
        action: impl Into<String>,
        action_input: impl Into<String>,
        observation: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            action_input: action_input.into(),
            observation: observation.into(),
            reasoning: String::new(),
        }
    }

    /// Attach reasoning text.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// Accept a string, or any other JSON value rendered as JSON text.
pub(crate) fn free_form_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_input_becomes_json_text() {
        let json = r#"{
            "action": "write_file",
            "action_input": {"path": "main.py", "content": "print(1)"},
            "observation": "File written",
            "reasoning": "I should create the file."
        }"#;
        let step: ThoughtStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.action, "write_file");
        assert_eq!(
            step.action_input,
            r#"{"path":"main.py","content":"print(1)"}"#
        );
        assert_eq!(step.reasoning, "I should create the file.");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let step: ThoughtStep = serde_json::from_str(r#"{"action": "list_files"}"#).unwrap();
        assert_eq!(step, ThoughtStep::new("list_files", "", ""));
    }
}
