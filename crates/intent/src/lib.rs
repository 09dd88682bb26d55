//! Rule-based intent classification.
//!
//! An ordered table of (signals, label, confidence) rules evaluated
//! top-down; the first rule whose signal matches wins. Rule precedence is
//! the contract: troubleshoot signals outrank analyze signals, which
//! outrank review, decision and generic question markers. Anything else
//! is `Chat` at a low confidence floor.
//!
//! `classify` is a pure function: identical input always yields the
//! identical result. No network, no mutation, no randomness.

use heliolab_core::intent::{IntentLabel, IntentResult};

/// Confidence assigned when no rule matches.
const CHAT_FLOOR: f32 = 0.3;

/// One classification rule: any phrase match fires the rule.
struct Rule {
    label: IntentLabel,
    confidence: f32,
    signals: &'static [&'static str],
}

/// The rule table, highest priority first.
const RULES: &[Rule] = &[
    Rule {
        label: IntentLabel::Troubleshoot,
        confidence: 0.9,
        signals: &[
            "error",
            "problem",
            "issue",
            "troubleshoot",
            "not working",
            "failing",
            "malfunction",
        ],
    },
    Rule {
        label: IntentLabel::ReviewReport,
        confidence: 0.85,
        signals: &["review report", "check report", "validate report", "report review"],
    },
    Rule {
        label: IntentLabel::AnalyzeData,
        confidence: 0.85,
        signals: &[
            "analyze",
            "analysis",
            "check data",
            "review data",
            "examine",
            "anomaly",
            "trend",
        ],
    },
    Rule {
        label: IntentLabel::DecisionSupport,
        confidence: 0.8,
        signals: &[
            "should i",
            "should we",
            "recommend",
            "suggest",
            "which option",
            "decide",
        ],
    },
    Rule {
        label: IntentLabel::Question,
        confidence: 0.7,
        signals: &[
            "what",
            "how",
            "why",
            "when",
            "where",
            "explain",
            "tell me",
        ],
    },
];

/// Classify a message into exactly one intent.
pub fn classify(message: &str) -> IntentResult {
    let lowered = message.to_lowercase();

    for rule in RULES {
        if rule.signals.iter().any(|signal| lowered.contains(signal)) {
            return IntentResult {
                label: rule.label,
                confidence: rule.confidence,
                message: message.to_string(),
            };
        }
    }

    IntentResult {
        label: IntentLabel::Chat,
        confidence: CHAT_FLOOR,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn troubleshoot_signals_win() {
        let result = classify("The simulator lamp shows an error during the sweep");
        assert_eq!(result.label, IntentLabel::Troubleshoot);
        assert!(result.confidence > 0.8);
    }

    #[test]
    fn troubleshoot_outranks_question_words() {
        // Contains both "why" and "error"; the troubleshoot rule is
        // evaluated first and must win.
        let result = classify("Why does the chamber report an error at -40?");
        assert_eq!(result.label, IntentLabel::Troubleshoot);
    }

    #[test]
    fn review_report_detected() {
        let result = classify("Please review report TR-2041 before submission");
        assert_eq!(result.label, IntentLabel::ReviewReport);
    }

    #[test]
    fn analyze_detected() {
        let result = classify("Can you analyze the thermal cycling results?");
        assert_eq!(result.label, IntentLabel::AnalyzeData);
    }

    #[test]
    fn decision_support_detected() {
        let result = classify("Should I recalibrate before the next batch?");
        assert_eq!(result.label, IntentLabel::DecisionSupport);
    }

    #[test]
    fn question_words_detected() {
        let result = classify("What is IEC 61215?");
        assert_eq!(result.label, IntentLabel::Question);
    }

    #[test]
    fn default_is_chat_at_floor() {
        let result = classify("good morning");
        assert_eq!(result.label, IntentLabel::Chat);
        assert!((result.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify("What is IEC 61215?");
        let b = classify("What is IEC 61215?");
        assert_eq!(a.label, b.label);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.message, b.message);
    }

    #[test]
    fn original_message_preserved() {
        let result = classify("Tell me about damp heat");
        assert_eq!(result.message, "Tell me about damp heat");
    }
}
