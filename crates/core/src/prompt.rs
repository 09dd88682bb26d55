//! The assembled prompt value.
//!
//! An AugmentedPrompt is a structured request to the model gateway:
//! explicit fields for instructions, bounded history, retrieved snippets,
//! and the new user message. It is serialized to a provider wire format
//! only at the gateway boundary, never earlier, so structure is not lost
//! to string concatenation. Ephemeral, never persisted.

use serde::{Deserialize, Serialize};

use crate::knowledge::Category;
use crate::session::Turn;

/// The task a request is asking the assistant to perform. Each task gets
/// its own instruction block and sampling temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Chat,
    Analyze,
    Review,
    Troubleshoot,
    Decide,
    Insight,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chat => "chat",
            Self::Analyze => "analyze",
            Self::Review => "review",
            Self::Troubleshoot => "troubleshoot",
            Self::Decide => "decide",
            Self::Insight => "insight",
        };
        write!(f, "{name}")
    }
}

/// A retrieved knowledge snippet folded into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub topic: String,
    pub category: Category,
    pub body: String,
}

/// The assembled request to the model gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentedPrompt {
    /// Task-specific system instructions
    pub instructions: String,

    /// Bounded window of prior turns, oldest first
    pub history: Vec<Turn>,

    /// Labeled reference snippets from retrieval (may be empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<Snippet>,

    /// The new user message
    pub user_message: String,
}

impl AugmentedPrompt {
    /// Render the system text: instructions plus a labeled reference
    /// block when snippets are present. This is the only place snippet
    /// formatting happens, so every gateway adapter agrees on it.
    pub fn system_text(&self) -> String {
        if self.snippets.is_empty() {
            return self.instructions.clone();
        }

        let mut out = String::with_capacity(self.instructions.len() + 256);
        out.push_str(&self.instructions);
        out.push_str("\n\n[Reference Material]\n");
        for snippet in &self.snippets {
            out.push_str(&format!(
                "- ({}) {}: {}\n",
                snippet.category, snippet.topic, snippet.body
            ));
        }
        out
    }

    /// Rough token estimate for the whole prompt (4 chars per token).
    pub fn estimated_tokens(&self) -> usize {
        let history: usize = self.history.iter().map(|t| t.content.len()).sum();
        (self.instructions.len() + history + self.user_message.len()) / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_text_without_snippets_is_instructions() {
        let prompt = AugmentedPrompt {
            instructions: "You are a lab assistant.".into(),
            history: vec![],
            snippets: vec![],
            user_message: "hello".into(),
        };
        assert_eq!(prompt.system_text(), "You are a lab assistant.");
    }

    #[test]
    fn system_text_labels_snippets() {
        let prompt = AugmentedPrompt {
            instructions: "You are a lab assistant.".into(),
            history: vec![],
            snippets: vec![Snippet {
                topic: "iec_61215".into(),
                category: Category::Standard,
                body: "Design qualification for crystalline silicon PV modules".into(),
            }],
            user_message: "What is IEC 61215?".into(),
        };
        let system = prompt.system_text();
        assert!(system.contains("[Reference Material]"));
        assert!(system.contains("(standard) iec_61215"));
    }

    #[test]
    fn task_serializes_snake_case() {
        let json = serde_json::to_string(&Task::Troubleshoot).unwrap();
        assert_eq!(json, "\"troubleshoot\"");
    }
}
