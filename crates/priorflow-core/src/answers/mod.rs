//! Tiered answer normalization.
//!
//! Converts a raw operator answer into a canonical value for the current
//! question node, or a clarification request. Tiers run in order and a later
//! tier is consulted only when the previous one is inconclusive:
//!
//! 1. Triviality gate (any node type)
//! 2. Type-specific exact tier (synonym sets, option list, number parsing)
//! 3. Fuzzy tier (multiple choice: containment, then similarity)
//! 4. External semantic tier (multiple choice, optional classifier)
//! 5. Clarification naming the valid answer domain
//!
//! The governing rule at every tier: never guess between multiple plausible
//! interpretations. Two or more qualifying candidates always come back as a
//! clarification listing them.

mod choice;
mod yes_no;

use regex::Regex;

use crate::classify::TextClassifier;
use crate::models::{
    CanonicalAnswer, MatchResult, NumericRange, QuestionKind, QuestionNode, RankedOption,
};
use crate::similarity::similarity;

use yes_no::Polarity;

/// Matching thresholds, configurable per engine.
#[derive(Debug, Clone, Copy)]
pub struct MatchConfig {
    /// Trimmed answers shorter than this are rejected outright
    pub min_answer_len: usize,
    /// Similarity bar for accepting a fuzzy multiple-choice match
    pub fuzzy_accept: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_answer_len: 2,
            fuzzy_accept: 0.70,
        }
    }
}

/// The answer-normalization pipeline.
pub struct AnswerNormalizer {
    config: MatchConfig,
    number_re: Regex,
    classifier: Option<Box<dyn TextClassifier>>,
}

impl Default for AnswerNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerNormalizer {
    /// Create a normalizer with default thresholds and no semantic tier.
    pub fn new() -> Self {
        Self::with_config(MatchConfig::default())
    }

    /// Create a normalizer with custom thresholds.
    pub fn with_config(config: MatchConfig) -> Self {
        Self {
            config,
            number_re: Regex::new(r"-?\d+(?:\.\d+)?").expect("static pattern compiles"),
            classifier: None,
        }
    }

    /// Attach the external semantic-match collaborator.
    pub fn with_classifier(mut self, classifier: Box<dyn TextClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Normalize one raw answer against one question node.
    pub fn normalize(&self, raw: &str, node: &QuestionNode) -> MatchResult {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase();

        if lowered.chars().count() < self.config.min_answer_len {
            tracing::debug!(node = %node.id, "answer rejected by triviality gate");
            return MatchResult::clarify("that answer was too short; could you say a bit more?");
        }

        match &node.kind {
            QuestionKind::YesNo { .. } => self.normalize_yes_no(&lowered),
            QuestionKind::Numeric { validation, .. } => {
                self.normalize_numeric(trimmed, validation.as_ref())
            }
            QuestionKind::Text { min_length, .. } => Self::normalize_text(trimmed, *min_length),
            QuestionKind::MultipleChoice { options, .. } => {
                self.normalize_choice(node, options, trimmed, &lowered)
            }
        }
    }

    fn normalize_yes_no(&self, lowered: &str) -> MatchResult {
        match yes_no::detect(lowered) {
            Polarity::Yes => MatchResult::matched(CanonicalAnswer::YesNo(true)),
            Polarity::No => MatchResult::matched(CanonicalAnswer::YesNo(false)),
            Polarity::Conflict => {
                MatchResult::clarify("I heard both a yes and a no; please answer with just one")
            }
            Polarity::Unknown => MatchResult::clarify("please answer yes or no"),
        }
    }

    fn normalize_numeric(&self, trimmed: &str, validation: Option<&NumericRange>) -> MatchResult {
        let Some(found) = self.number_re.find(trimmed) else {
            return MatchResult::clarify("please answer with a number");
        };
        let value: f64 = match found.as_str().parse() {
            Ok(v) => v,
            Err(_) => return MatchResult::clarify("please answer with a number"),
        };
        if let Some(range) = validation {
            if !range.contains(value) {
                return MatchResult::clarify(format!(
                    "that value is outside the accepted range; please give a number between {} and {}",
                    range.min, range.max
                ));
            }
        }
        MatchResult::matched(CanonicalAnswer::Number(value))
    }

    fn normalize_text(trimmed: &str, min_length: usize) -> MatchResult {
        if trimmed.chars().count() < min_length {
            return MatchResult::clarify(format!(
                "could you give a little more detail (at least {} characters)?",
                min_length
            ));
        }
        MatchResult::matched(CanonicalAnswer::Text(trimmed.to_string()))
    }

    fn normalize_choice(
        &self,
        node: &QuestionNode,
        options: &[String],
        trimmed: &str,
        lowered: &str,
    ) -> MatchResult {
        // Tier 2: exact option
        if let Some(option) = choice::exact(options, lowered) {
            return MatchResult::matched(CanonicalAnswer::Choice(option.clone()));
        }

        // Tier 3a: containment in either direction
        let contained = choice::containment(options, lowered);
        match contained.len() {
            1 => {
                tracing::debug!(node = %node.id, option = %contained[0].option, "containment match");
                return MatchResult::matched(CanonicalAnswer::Choice(contained[0].option.clone()));
            }
            n if n > 1 => {
                return MatchResult::ambiguous(
                    "your answer could mean more than one option; which did you mean?",
                    contained,
                );
            }
            _ => {}
        }

        // Tier 3b: edit-distance similarity
        let close = choice::fuzzy(options, lowered, self.config.fuzzy_accept);
        match close.len() {
            1 => {
                tracing::debug!(node = %node.id, option = %close[0].option, "fuzzy match");
                return MatchResult::matched(CanonicalAnswer::Choice(close[0].option.clone()));
            }
            n if n > 1 => {
                return MatchResult::ambiguous(
                    "your answer could mean more than one option; which did you mean?",
                    close,
                );
            }
            _ => {}
        }

        // Tier 4: external semantic match
        if let Some(result) = self.semantic_choice(node, options, trimmed) {
            return result;
        }

        // Tier 5: spell out the valid domain
        MatchResult::clarify(format!("please choose one of: {}", options.join(", ")))
    }

    /// Consult the semantic collaborator; `None` falls through to tier 5.
    fn semantic_choice(
        &self,
        node: &QuestionNode,
        options: &[String],
        trimmed: &str,
    ) -> Option<MatchResult> {
        let classifier = self.classifier.as_ref()?;
        let reply = classifier.match_answer(&node.text, options, trimmed);

        if reply.matched {
            if let Some(option) = reply
                .option
                .as_deref()
                .and_then(|o| choice::canonical(options, o))
            {
                tracing::debug!(node = %node.id, option = %option, "semantic match");
                return Some(MatchResult::matched(CanonicalAnswer::Choice(option.clone())));
            }
            tracing::warn!(
                node = %node.id,
                option = ?reply.option,
                "semantic matcher returned an option not on the node; ignoring"
            );
        }

        // Plausible set follows the same single-vs-multiple rule as tier 3.
        let plausible: Vec<&String> = reply
            .possible_matches
            .iter()
            .filter_map(|m| choice::canonical(options, m))
            .collect();
        match plausible.len() {
            0 => None,
            1 => Some(MatchResult::matched(CanonicalAnswer::Choice(
                plausible[0].clone(),
            ))),
            _ => {
                let lowered = trimmed.to_lowercase();
                let candidates = plausible
                    .into_iter()
                    .map(|o| RankedOption {
                        option: o.clone(),
                        confidence: similarity(&lowered, &o.to_lowercase()),
                    })
                    .collect();
                Some(MatchResult::ambiguous(
                    "your answer could mean more than one option; which did you mean?",
                    candidates,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AnswerMatch;
    use crate::models::{Decision, DecisionOutcome, IntakeFields, Target};
    use std::collections::HashMap;

    fn diagnosis_node() -> QuestionNode {
        QuestionNode {
            id: "diagnosis".into(),
            text: "What is the member's primary diagnosis?".into(),
            role: None,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    "Type 1 Diabetes".into(),
                    "Type 2 Diabetes".into(),
                    "Obesity".into(),
                    "Other".into(),
                ],
                transitions: HashMap::new(),
                default: None,
            },
        }
    }

    fn yes_no_node() -> QuestionNode {
        QuestionNode {
            id: "metformin".into(),
            text: "Has the member tried metformin?".into(),
            role: None,
            kind: QuestionKind::YesNo {
                on_yes: Target::Node("next".into()),
                on_no: Target::Decide(Decision::new(
                    DecisionOutcome::DocumentationRequired,
                    "step therapy required",
                )),
            },
        }
    }

    fn a1c_node() -> QuestionNode {
        QuestionNode {
            id: "a1c".into(),
            text: "What is the most recent HbA1c?".into(),
            role: None,
            kind: QuestionKind::Numeric {
                validation: Some(NumericRange { min: 6.5, max: 15.0 }),
                ranges: vec![],
                default: None,
            },
        }
    }

    #[test]
    fn test_triviality_gate_applies_to_every_type() {
        let normalizer = AnswerNormalizer::new();
        for node in [diagnosis_node(), yes_no_node(), a1c_node()] {
            let result = normalizer.normalize(" a ", &node);
            assert!(result.needs_clarification, "node {}", node.id);
        }
    }

    #[test]
    fn test_yes_no_exact_and_containment() {
        let normalizer = AnswerNormalizer::new();
        let node = yes_no_node();

        let result = normalizer.normalize("yep", &node);
        assert_eq!(result.answer, Some(CanonicalAnswer::YesNo(true)));

        let result = normalizer.normalize("nope, never tried it", &node);
        assert_eq!(result.answer, Some(CanonicalAnswer::YesNo(false)));
    }

    #[test]
    fn test_yes_no_polarity_conflict_clarifies() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("yes but actually no", &yes_no_node());
        assert!(result.needs_clarification);
        assert!(result.answer.is_none());
    }

    #[test]
    fn test_numeric_extracts_first_token() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("it was 7.9 percent last month", &a1c_node());
        assert_eq!(result.answer, Some(CanonicalAnswer::Number(7.9)));
    }

    #[test]
    fn test_numeric_out_of_range_names_bounds() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("5.0", &a1c_node());
        assert!(result.needs_clarification);
        let reason = result.clarification.unwrap();
        assert!(reason.contains("6.5"));
        assert!(reason.contains("15"));
    }

    #[test]
    fn test_numeric_without_number_clarifies() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("pretty high i think", &a1c_node());
        assert!(result.needs_clarification);
    }

    #[test]
    fn test_text_minimum_length() {
        let normalizer = AnswerNormalizer::new();
        let node = QuestionNode {
            id: "notes".into(),
            text: "Any additional notes?".into(),
            role: None,
            kind: QuestionKind::Text {
                min_length: 3,
                next: Target::Decide(Decision::new(DecisionOutcome::Approve, "criteria met")),
            },
        };

        let result = normalizer.normalize("ok", &node);
        assert!(result.needs_clarification);

        let result = normalizer.normalize("stable on current regimen", &node);
        assert_eq!(
            result.answer,
            Some(CanonicalAnswer::Text("stable on current regimen".into()))
        );
    }

    #[test]
    fn test_choice_exact_restores_canonical_casing() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("type 2 diabetes", &diagnosis_node());
        assert_eq!(
            result.answer,
            Some(CanonicalAnswer::Choice("Type 2 Diabetes".into()))
        );
    }

    #[test]
    fn test_ambiguous_containment_never_guesses() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("diabetes", &diagnosis_node());
        assert!(result.needs_clarification);
        let names: Vec<&str> = result.candidates.iter().map(|c| c.option.as_str()).collect();
        assert_eq!(names, vec!["Type 1 Diabetes", "Type 2 Diabetes"]);
    }

    #[test]
    fn test_single_containment_accepted() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("morbid obesity", &diagnosis_node());
        assert_eq!(result.answer, Some(CanonicalAnswer::Choice("Obesity".into())));
    }

    #[test]
    fn test_fuzzy_typo_accepted() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("obesty", &diagnosis_node());
        assert_eq!(result.answer, Some(CanonicalAnswer::Choice("Obesity".into())));
    }

    #[test]
    fn test_unmatched_choice_lists_options() {
        let normalizer = AnswerNormalizer::new();
        let result = normalizer.normalize("something unrelated entirely", &diagnosis_node());
        assert!(result.needs_clarification);
        assert!(result.clarification.unwrap().contains("Type 1 Diabetes"));
    }

    /// Scripted classifier standing in for the LLM collaborator.
    struct ScriptedClassifier(AnswerMatch);

    impl TextClassifier for ScriptedClassifier {
        fn match_answer(&self, _q: &str, _o: &[String], _raw: &str) -> AnswerMatch {
            self.0.clone()
        }
        fn extract_intake(&self, _utterance: &str) -> IntakeFields {
            IntakeFields::default()
        }
    }

    fn arthritis_node() -> QuestionNode {
        QuestionNode {
            id: "diagnosis".into(),
            text: "What condition is being treated?".into(),
            role: None,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    "Rheumatoid Arthritis".into(),
                    "Psoriatic Arthritis".into(),
                    "Crohn's Disease".into(),
                ],
                transitions: HashMap::new(),
                default: None,
            },
        }
    }

    #[test]
    fn test_semantic_single_match_accepted() {
        let normalizer = AnswerNormalizer::new().with_classifier(Box::new(ScriptedClassifier(
            AnswerMatch::single("rheumatoid arthritis", 0.93),
        )));
        // Local tiers cannot bridge this phrasing; the semantic tier can
        let result = normalizer.normalize("her joints are inflamed from RA", &arthritis_node());
        assert_eq!(
            result.answer,
            Some(CanonicalAnswer::Choice("Rheumatoid Arthritis".into()))
        );
    }

    #[test]
    fn test_semantic_ambiguity_clarifies() {
        let normalizer = AnswerNormalizer::new().with_classifier(Box::new(ScriptedClassifier(
            AnswerMatch::ambiguous(vec![
                "Rheumatoid Arthritis".into(),
                "Psoriatic Arthritis".into(),
            ]),
        )));
        let result = normalizer.normalize("some kind of arthritis flare", &arthritis_node());
        assert!(result.needs_clarification);
        assert_eq!(result.candidates.len(), 2);
    }

    #[test]
    fn test_semantic_foreign_option_ignored() {
        let normalizer = AnswerNormalizer::new().with_classifier(Box::new(ScriptedClassifier(
            AnswerMatch::single("Lupus", 0.9),
        )));
        let result = normalizer.normalize("an autoimmune condition", &arthritis_node());
        // Bad collaborator output degrades to the final clarification
        assert!(result.needs_clarification);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_semantic_no_match_falls_through() {
        let normalizer = AnswerNormalizer::new()
            .with_classifier(Box::new(ScriptedClassifier(AnswerMatch::none())));
        let result = normalizer.normalize("unclear mumbling", &arthritis_node());
        assert!(result.needs_clarification);
        assert!(result.clarification.unwrap().contains("Rheumatoid Arthritis"));
    }
}
