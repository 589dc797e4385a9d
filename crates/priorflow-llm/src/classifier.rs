//! Classifier implementations and LLM reply parsing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use priorflow_core::classify::{AnswerMatch, TextClassifier};
use priorflow_core::models::IntakeFields;

use crate::prompts;

/// Classification errors. These never leave the classifier: every public
/// path absorbs them into a no-match result.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("LLM inference error: {0}")]
    Inference(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

// =========================================================================
// LLM reply parsing
// =========================================================================

/// Raw matching reply from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReply {
    pub matched: bool,
    pub option: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub possible_matches: Vec<String>,
}

/// Raw intake-extraction reply from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReply {
    pub member_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub drug_name: Option<String>,
}

/// Slice out the JSON object in a reply (models sometimes add extra text).
fn json_slice(reply: &str) -> ClassifierResult<&str> {
    let start = reply
        .find('{')
        .ok_or_else(|| ClassifierError::InvalidFormat("No JSON object found in reply".into()))?;
    let end = reply
        .rfind('}')
        .ok_or_else(|| ClassifierError::InvalidFormat("No closing brace found in reply".into()))?;
    Ok(&reply[start..=end])
}

/// Parse an LLM matching reply.
pub fn parse_match_reply(reply: &str) -> ClassifierResult<MatchReply> {
    Ok(serde_json::from_str(json_slice(reply)?)?)
}

/// Parse an LLM intake reply.
pub fn parse_intake_reply(reply: &str) -> ClassifierResult<IntakeReply> {
    Ok(serde_json::from_str(json_slice(reply)?)?)
}

impl From<MatchReply> for AnswerMatch {
    fn from(reply: MatchReply) -> Self {
        AnswerMatch {
            matched: reply.matched,
            option: reply.option,
            confidence: reply.confidence,
            possible_matches: reply.possible_matches,
        }
    }
}

impl From<IntakeReply> for IntakeFields {
    fn from(reply: IntakeReply) -> Self {
        IntakeFields {
            member_name: reply.member_name,
            date_of_birth: reply.date_of_birth,
            drug_name: reply.drug_name,
            drug_id: None,
        }
    }
}

// =========================================================================
// LLM-backed classifier
// =========================================================================

/// Inference backend: completes a prompt within its own deadline.
///
/// Implementations own their latency budget (generation token cap, request
/// timeout); a deadline overrun comes back as an `Inference` error and is
/// absorbed by the classifier.
pub trait CompletionBackend: Send + Sync {
    fn complete(&self, prompt: &str) -> ClassifierResult<String>;
}

/// `TextClassifier` backed by an LLM completion backend.
pub struct LlmClassifier {
    backend: Box<dyn CompletionBackend>,
    include_examples: bool,
}

impl LlmClassifier {
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            include_examples: true,
        }
    }

    /// Disable few-shot examples (smaller prompts for tight token budgets).
    pub fn without_examples(mut self) -> Self {
        self.include_examples = false;
        self
    }
}

impl TextClassifier for LlmClassifier {
    fn match_answer(&self, question: &str, options: &[String], raw_answer: &str) -> AnswerMatch {
        let prompt =
            prompts::build_match_prompt(question, options, raw_answer, self.include_examples);
        match self
            .backend
            .complete(&prompt)
            .and_then(|reply| parse_match_reply(&reply))
        {
            Ok(reply) => reply.into(),
            Err(e) => {
                tracing::warn!(error = %e, "semantic match failed; reporting no match");
                AnswerMatch::none()
            }
        }
    }

    fn extract_intake(&self, utterance: &str) -> IntakeFields {
        let prompt = prompts::build_intake_prompt(utterance);
        match self
            .backend
            .complete(&prompt)
            .and_then(|reply| parse_intake_reply(&reply))
        {
            Ok(reply) => reply.into(),
            Err(e) => {
                tracing::warn!(error = %e, "intake extraction failed; leaving fields unset");
                IntakeFields::default()
            }
        }
    }
}

// =========================================================================
// Rule-based classifier
// =========================================================================

/// Drug names the rule-based extractor recognizes in free text.
const DEFAULT_DRUG_LEXICON: &[&str] = &[
    "ozempic",
    "mounjaro",
    "trulicity",
    "rybelsus",
    "wegovy",
    "humira",
    "enbrel",
    "semaglutide",
    "tirzepatide",
    "dulaglutide",
    "adalimumab",
    "etanercept",
];

/// Minimum token overlap for the rule-based matcher to consider an option.
const OVERLAP_FLOOR: f64 = 0.5;

/// Margin over the runner-up required to call a single match.
const OVERLAP_MARGIN: f64 = 0.25;

/// Pattern-based `TextClassifier` for hosts running without a model.
pub struct RuleBasedClassifier {
    lexicon: Vec<String>,
    name_re: regex::Regex,
    dob_res: Vec<regex::Regex>,
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self {
            lexicon: DEFAULT_DRUG_LEXICON.iter().map(|s| s.to_string()).collect(),
            name_re: regex::Regex::new(
                r"(?i)(?:my name is|member name is|name is|this is|calling for)\s+([A-Za-z'-]+(?: [A-Za-z'-]+)?)",
            )
            .expect("static pattern compiles"),
            dob_res: vec![
                regex::Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("static pattern compiles"),
                regex::Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").expect("static pattern compiles"),
            ],
        }
    }

    /// Replace the drug lexicon (e.g., with the host's catalog names).
    pub fn with_lexicon(mut self, lexicon: Vec<String>) -> Self {
        self.lexicon = lexicon.into_iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// Fraction of the option's tokens present in the answer.
    fn overlap(option: &str, answer_tokens: &[String]) -> f64 {
        let option_tokens: Vec<String> = tokenize(option);
        if option_tokens.is_empty() {
            return 0.0;
        }
        let hits = option_tokens
            .iter()
            .filter(|t| answer_tokens.contains(t))
            .count();
        hits as f64 / option_tokens.len() as f64
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

impl TextClassifier for RuleBasedClassifier {
    fn match_answer(&self, _question: &str, options: &[String], raw_answer: &str) -> AnswerMatch {
        let answer_tokens = tokenize(raw_answer);

        let mut scored: Vec<(&String, f64)> = options
            .iter()
            .map(|o| (o, Self::overlap(o, &answer_tokens)))
            .filter(|(_, score)| *score >= OVERLAP_FLOOR)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        match scored.len() {
            0 => AnswerMatch::none(),
            1 => AnswerMatch::single(scored[0].0.clone(), scored[0].1),
            _ if scored[0].1 - scored[1].1 >= OVERLAP_MARGIN => {
                AnswerMatch::single(scored[0].0.clone(), scored[0].1)
            }
            _ => AnswerMatch::ambiguous(scored.into_iter().map(|(o, _)| o.clone()).collect()),
        }
    }

    fn extract_intake(&self, utterance: &str) -> IntakeFields {
        let mut fields = IntakeFields::default();

        if let Some(captures) = self.name_re.captures(utterance) {
            fields.member_name = captures.get(1).map(|m| m.as_str().trim().to_string());
        }

        for re in &self.dob_res {
            if let Some(captures) = re.captures(utterance) {
                fields.date_of_birth = captures.get(1).map(|m| m.as_str().to_string());
                break;
            }
        }

        let lowered = utterance.to_lowercase();
        fields.drug_name = self
            .lexicon
            .iter()
            .find(|name| lowered.contains(name.as_str()))
            .cloned();

        fields
    }
}
