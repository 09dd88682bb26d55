//! Structured replies and the caller-facing response envelope.
//!
//! The raw gateway text is parsed into a shape appropriate to the task:
//! reviews get a completeness indicator on top of the free text, all
//! other tasks return free text plus usage metadata. Failures never
//! produce partially-assembled replies; the envelope carries an explicit
//! success flag either way.

use chrono::{DateTime, Utc};
use heliolab_core::gateway::{GatewayReply, Usage};
use heliolab_core::prompt::Task;
use serde::{Deserialize, Serialize};

/// Words counted as positive review findings.
const POSITIVE_WORDS: &[&str] = &["complete", "adequate", "sufficient", "good", "correct"];
/// Words counted as negative review findings.
const NEGATIVE_WORDS: &[&str] = &["missing", "incomplete", "insufficient", "error", "incorrect"];
/// Words that flag an issue in a review regardless of balance.
const ISSUE_WORDS: &[&str] = &["error", "missing", "issue", "problem", "incorrect"];

/// The parsed reply for one exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredReply {
    /// The session this exchange was committed to (server-generated when
    /// the caller supplied none)
    pub session_key: String,

    /// The task that produced this reply
    pub task: Task,

    /// Task-shaped content
    pub body: ReplyBody,

    /// Which model replied
    pub model: String,

    /// Token usage counters
    pub usage: Usage,

    /// When the reply was produced
    pub timestamp: DateTime<Utc>,
}

/// Task-shaped reply content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyBody {
    /// Free text (chat, analyze, troubleshoot, decide, insight)
    Text { text: String },

    /// Review result: free text plus a completeness indicator
    Review {
        text: String,
        completeness_score: f32,
        has_issues: bool,
    },
}

impl ReplyBody {
    /// The assistant text, whatever the shape.
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text } => text,
            Self::Review { text, .. } => text,
        }
    }
}

/// Parse a gateway reply into the task's structured shape.
pub fn parse_reply(session_key: String, task: Task, reply: GatewayReply) -> StructuredReply {
    let body = match task {
        Task::Review => {
            let lowered = reply.text.to_lowercase();
            ReplyBody::Review {
                completeness_score: estimate_completeness(&lowered),
                has_issues: ISSUE_WORDS.iter().any(|w| lowered.contains(w)),
                text: reply.text,
            }
        }
        _ => ReplyBody::Text { text: reply.text },
    };

    StructuredReply {
        session_key,
        task,
        body,
        model: reply.model,
        usage: reply.usage,
        timestamp: Utc::now(),
    }
}

/// Ratio of positive to positive-plus-negative review words; 0.5 when
/// neither kind appears.
fn estimate_completeness(lowered_text: &str) -> f32 {
    let positive = POSITIVE_WORDS
        .iter()
        .filter(|w| lowered_text.contains(*w))
        .count();
    let negative = NEGATIVE_WORDS
        .iter()
        .filter(|w| lowered_text.contains(*w))
        .count();

    let total = positive + negative;
    if total == 0 {
        0.5
    } else {
        positive as f32 / total as f32
    }
}

/// The caller-facing response envelope for one exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistResponse {
    /// Explicit success flag; failures never carry a reply
    pub success: bool,

    /// The structured reply on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<StructuredReply>,

    /// Human-readable failure description on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the response was produced
    pub timestamp: DateTime<Utc>,
}

impl AssistResponse {
    pub fn ok(reply: StructuredReply) -> Self {
        Self {
            success: true,
            reply: Some(reply),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            success: false,
            reply: None,
            error: Some(description.into()),
            timestamp: Utc::now(),
        }
    }
}
