//! Canonical answers and matching outcomes.

use serde::{Deserialize, Serialize};

/// A normalized answer value, drawn from a question's fixed domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CanonicalAnswer {
    /// One of a multiple-choice node's declared options (canonical casing)
    Choice(String),
    /// Resolved yes/no polarity
    YesNo(bool),
    /// Parsed numeric value
    Number(f64),
    /// Validated free text
    Text(String),
}

impl std::fmt::Display for CanonicalAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanonicalAnswer::Choice(s) | CanonicalAnswer::Text(s) => write!(f, "{}", s),
            CanonicalAnswer::YesNo(true) => write!(f, "yes"),
            CanonicalAnswer::YesNo(false) => write!(f, "no"),
            CanonicalAnswer::Number(n) => write!(f, "{}", n),
        }
    }
}

/// An option offered back to the caller during clarification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedOption {
    pub option: String,
    /// Match confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// Result of normalizing one raw answer against one question node.
///
/// Transient: produced and consumed within a single answer-processing call.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// The accepted canonical answer, if any
    pub answer: Option<CanonicalAnswer>,
    /// True when the caller must re-ask instead of advancing
    pub needs_clarification: bool,
    /// Why clarification is needed, phrased for the operator
    pub clarification: Option<String>,
    /// Competing candidates, best first (never silently picked from)
    pub candidates: Vec<RankedOption>,
}

impl MatchResult {
    /// A confident single match.
    pub fn matched(answer: CanonicalAnswer) -> Self {
        Self {
            answer: Some(answer),
            needs_clarification: false,
            clarification: None,
            candidates: Vec::new(),
        }
    }

    /// A clarification with no competing candidates.
    pub fn clarify(reason: impl Into<String>) -> Self {
        Self {
            answer: None,
            needs_clarification: true,
            clarification: Some(reason.into()),
            candidates: Vec::new(),
        }
    }

    /// A clarification carrying the candidates the answer could mean.
    pub fn ambiguous(reason: impl Into<String>, candidates: Vec<RankedOption>) -> Self {
        Self {
            answer: None,
            needs_clarification: true,
            clarification: Some(reason.into()),
            candidates,
        }
    }

    /// True when a canonical answer was produced.
    pub fn is_match(&self) -> bool {
        self.answer.is_some() && !self.needs_clarification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(CanonicalAnswer::YesNo(true).to_string(), "yes");
        assert_eq!(CanonicalAnswer::YesNo(false).to_string(), "no");
        assert_eq!(CanonicalAnswer::Number(7.5).to_string(), "7.5");
        assert_eq!(
            CanonicalAnswer::Choice("Type 2 Diabetes".into()).to_string(),
            "Type 2 Diabetes"
        );
    }

    #[test]
    fn test_match_result_states() {
        let hit = MatchResult::matched(CanonicalAnswer::YesNo(true));
        assert!(hit.is_match());
        assert!(!hit.needs_clarification);

        let miss = MatchResult::clarify("please answer yes or no");
        assert!(!miss.is_match());
        assert!(miss.needs_clarification);
        assert!(miss.candidates.is_empty());

        let split = MatchResult::ambiguous(
            "which one?",
            vec![RankedOption {
                option: "Type 1 Diabetes".into(),
                confidence: 0.6,
            }],
        );
        assert!(!split.is_match());
        assert_eq!(split.candidates.len(), 1);
    }

    #[test]
    fn test_canonical_answer_serde_round_trip() {
        let answer = CanonicalAnswer::Number(6.5);
        let json = serde_json::to_string(&answer).unwrap();
        assert_eq!(json, r#"{"type":"number","value":6.5}"#);
        let back: CanonicalAnswer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answer);
    }
}
