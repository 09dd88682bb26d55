//! Lexical retrieval over the knowledge corpus.
//!
//! Scores each entry by normalized term overlap between query tokens and
//! the entry's keywords, topic and body. Keyword hits dominate because
//! corpus keywords are curated; the denominator normalizes long queries.
//! Ties keep corpus declaration order (stable sort), so ranking is fully
//! deterministic for a fixed corpus and query.

use std::sync::Arc;

use heliolab_core::knowledge::{Category, KnowledgeEntry, ScoredEntry};
use tracing::debug;

/// Relative weights of the three match kinds.
const KEYWORD_WEIGHT: f32 = 3.0;
const TOPIC_WEIGHT: f32 = 2.0;
const BODY_WEIGHT: f32 = 1.0;

/// Ranks knowledge entries against free-text queries.
pub struct RetrievalEngine {
    corpus: Arc<crate::Corpus>,
}

impl RetrievalEngine {
    pub fn new(corpus: Arc<crate::Corpus>) -> Self {
        Self { corpus }
    }

    /// Return the top `k` entries with score > 0, highest score first.
    ///
    /// A category hint restricts the candidate set before scoring; when
    /// the restricted set produces no match the full corpus is scored
    /// instead, so a bad hint never hides results that exist.
    pub fn retrieve(&self, query: &str, k: usize, hint: Option<Category>) -> Vec<ScoredEntry> {
        let tokens = tokenize(query);
        if tokens.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut results = match hint {
            Some(category) => {
                let restricted = self.score_candidates(
                    self.corpus.all().iter().filter(|e| e.category == category),
                    &tokens,
                );
                if restricted.is_empty() {
                    debug!(%category, "No match under category hint, falling back to full corpus");
                    self.score_candidates(self.corpus.all().iter(), &tokens)
                } else {
                    restricted
                }
            }
            None => self.score_candidates(self.corpus.all().iter(), &tokens),
        };

        // Stable sort keeps declaration order for equal scores.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        results
    }

    fn score_candidates<'a>(
        &self,
        candidates: impl Iterator<Item = &'a KnowledgeEntry>,
        tokens: &[String],
    ) -> Vec<ScoredEntry> {
        candidates
            .filter_map(|entry| {
                let score = score_entry(entry, tokens);
                (score > 0.0).then(|| ScoredEntry {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect()
    }
}

/// Score one entry against the query tokens.
///
/// score = (3*keyword_hits + 2*topic_hits + body_hits) / (3*|tokens|),
/// clamped to 1.0. A token hits at most once per match kind.
pub fn score_entry(entry: &KnowledgeEntry, tokens: &[String]) -> f32 {
    let topic_tokens = tokenize(&entry.topic);
    let body_tokens = tokenize(&entry.body);

    let mut raw = 0.0;
    for token in tokens {
        if entry.keywords.iter().any(|kw| kw == token) {
            raw += KEYWORD_WEIGHT;
        }
        if topic_tokens.iter().any(|t| t == token) {
            raw += TOPIC_WEIGHT;
        }
        if body_tokens.iter().any(|t| t == token) {
            raw += BODY_WEIGHT;
        }
    }

    let normalized = raw / (KEYWORD_WEIGHT * tokens.len() as f32);
    normalized.min(1.0)
}

/// Lowercased alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_string())
        .collect()
}
