//! Session and Turn domain types.
//!
//! These are the core value objects for conversation state:
//! a Session holds a bounded window of role-tagged Turns, keyed by an
//! opaque session key. The session store exclusively owns the live
//! instances; everything else sees cloned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Generate a fresh server-side key.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionKey {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
}

/// One message exchange unit. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// When the turn was created
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation session: an ordered, bounded sequence of turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The session key
    pub key: SessionKey,

    /// Optional user identifier attached at creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Ordered turns, oldest first
    pub turns: Vec<Turn>,

    /// Session-level metadata (last analysis info, etc.)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// When this session was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended or metadata written
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a new empty session under the given key.
    pub fn new(key: SessionKey, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            key,
            user_id,
            turns: Vec::new(),
            metadata: serde_json::Map::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a turn, evicting the oldest once `cap` is reached.
    /// The newest turn is never the one dropped.
    pub fn push_turn(&mut self, turn: Turn, cap: usize) {
        while self.turns.len() >= cap && !self.turns.is_empty() {
            self.turns.remove(0);
        }
        self.turns.push(turn);
        self.last_activity = Utc::now();
    }

    /// The most recent `limit` turns, oldest first.
    pub fn window(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    /// Whether the session has been idle longer than `ttl_secs` as of `now`.
    pub fn expired(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        (now - self.last_activity).num_seconds() > ttl_secs
    }
}
