//! Intent classification domain types.

use serde::{Deserialize, Serialize};

/// The closed set of intents a user message can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    AnalyzeData,
    Troubleshoot,
    Question,
    ReviewReport,
    DecisionSupport,
    Chat,
}

impl std::fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::AnalyzeData => "analyze_data",
            Self::Troubleshoot => "troubleshoot",
            Self::Question => "question",
            Self::ReviewReport => "review_report",
            Self::DecisionSupport => "decision_support",
            Self::Chat => "chat",
        };
        write!(f, "{name}")
    }
}

/// The outcome of classifying one message. Produced fresh per request,
/// never persisted; the original message is kept for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    /// The winning label
    pub label: IntentLabel,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// The message that was classified
    pub message: String,
}
