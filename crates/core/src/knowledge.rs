//! Knowledge base domain types.
//!
//! A KnowledgeEntry is a static reference unit: loaded once at process
//! start, never mutated, shared read-only by all requests.

use serde::{Deserialize, Serialize};

/// The category of a knowledge entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Certification standards (IEC, UL)
    Standard,
    /// Test procedures
    Procedure,
    /// Lab equipment notes
    Equipment,
    /// Best practices
    Practice,
}

impl Category {
    /// Parse a caller-supplied category hint. Accepts the snake_case
    /// wire names and a few common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "standards" => Some(Self::Standard),
            "procedure" | "procedures" | "test_procedure" => Some(Self::Procedure),
            "equipment" => Some(Self::Equipment),
            "practice" | "practices" | "best_practice" => Some(Self::Practice),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::Procedure => "procedure",
            Self::Equipment => "equipment",
            Self::Practice => "practice",
        };
        write!(f, "{name}")
    }
}

/// A static reference unit in the knowledge corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Topic identifier (e.g. "iec_61215")
    pub topic: String,

    /// Which category this entry belongs to
    pub category: Category,

    /// Keywords used for lexical retrieval
    pub keywords: Vec<String>,

    /// The reference text itself
    pub body: String,
}

/// A knowledge entry paired with a relevance score, as produced by the
/// retrieval engine. Ordered highest score first in results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub entry: KnowledgeEntry,
    pub score: f32,
}
