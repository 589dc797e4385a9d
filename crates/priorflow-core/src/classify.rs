//! Text-classification capability consumed by the normalizer and intake.
//!
//! Both the semantic answer matcher and the intake-field extractor sit behind
//! one interface so rule-based and LLM-backed implementations are
//! interchangeable. Implementations absorb their own failures (network,
//! malformed output, deadline) and report a no-match instead of erroring,
//! which keeps the normalization pipeline free of external error paths. Any
//! inference deadline also lives inside the implementation.

use crate::models::IntakeFields;

/// Semantic match result for one answer against one option list.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerMatch {
    /// True when exactly one option was confidently selected
    pub matched: bool,
    /// The selected option text (may differ in casing from the node's list)
    pub option: Option<String>,
    /// Confidence of the selection (0.0 - 1.0)
    pub confidence: f64,
    /// Plausible options when the answer is ambiguous
    pub possible_matches: Vec<String>,
}

impl AnswerMatch {
    /// Nothing matched; also the failure-absorbing result.
    pub fn none() -> Self {
        Self {
            matched: false,
            option: None,
            confidence: 0.0,
            possible_matches: Vec::new(),
        }
    }

    /// A single confident selection.
    pub fn single(option: impl Into<String>, confidence: f64) -> Self {
        Self {
            matched: true,
            option: Some(option.into()),
            confidence,
            possible_matches: Vec::new(),
        }
    }

    /// Several plausible options; the caller must clarify.
    pub fn ambiguous(possible_matches: Vec<String>) -> Self {
        Self {
            matched: false,
            option: None,
            confidence: 0.0,
            possible_matches,
        }
    }
}

/// Capability interface for semantic answer matching and intake extraction.
pub trait TextClassifier: Send + Sync {
    /// Match a raw answer against a question's option list.
    fn match_answer(&self, question: &str, options: &[String], raw_answer: &str) -> AnswerMatch;

    /// Best-effort extraction of intake fields from a free-text utterance.
    fn extract_intake(&self, utterance: &str) -> IntakeFields;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_match_constructors() {
        let none = AnswerMatch::none();
        assert!(!none.matched);
        assert!(none.option.is_none());

        let single = AnswerMatch::single("Rheumatoid Arthritis", 0.92);
        assert!(single.matched);
        assert_eq!(single.option.as_deref(), Some("Rheumatoid Arthritis"));

        let ambiguous =
            AnswerMatch::ambiguous(vec!["Type 1 Diabetes".into(), "Type 2 Diabetes".into()]);
        assert!(!ambiguous.matched);
        assert_eq!(ambiguous.possible_matches.len(), 2);
    }
}
