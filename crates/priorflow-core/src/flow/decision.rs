//! Fallback decision rules.
//!
//! Used only when traversal runs off the graph without reaching a declared
//! terminal (a configuration gap). The rules inspect the collected answers
//! and always produce a decision with an explicit reason; a graph-declared
//! terminal is never overridden because this path is never consulted when
//! one exists.

use std::collections::HashMap;

use crate::models::{
    CanonicalAnswer, Decision, DecisionOutcome, NodeRole, QuestionGraph,
};

/// Derive a decision from the collected answers.
///
/// Rule order: any contraindication answered yes denies; any required
/// screening left unanswered requires documentation; otherwise approve.
pub fn derive(graph: &QuestionGraph, answers: &HashMap<String, CanonicalAnswer>) -> Decision {
    for node in &graph.nodes {
        if node.role != Some(NodeRole::Contraindication) {
            continue;
        }
        if answers.get(&node.id) == Some(&CanonicalAnswer::YesNo(true)) {
            return Decision::new(
                DecisionOutcome::Deny,
                format!("contraindication reported: {}", node.text),
            );
        }
    }

    for node in &graph.nodes {
        if node.role != Some(NodeRole::RequiredScreening) {
            continue;
        }
        if !answers.contains_key(&node.id) {
            return Decision::new(
                DecisionOutcome::DocumentationRequired,
                format!("required screening not on file: {}", node.text),
            );
        }
    }

    Decision::new(
        DecisionOutcome::Approve,
        "all collected answers satisfy the clinical criteria",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionKind, QuestionNode, Target};

    fn graph() -> QuestionGraph {
        QuestionGraph {
            id: "set".into(),
            start: "pancreatitis".into(),
            nodes: vec![
                QuestionNode {
                    id: "pancreatitis".into(),
                    text: "Any history of pancreatitis?".into(),
                    role: Some(NodeRole::Contraindication),
                    kind: QuestionKind::YesNo {
                        on_yes: Target::Node("a1c".into()),
                        on_no: Target::Node("a1c".into()),
                    },
                },
                QuestionNode {
                    id: "a1c".into(),
                    text: "What is the most recent HbA1c?".into(),
                    role: Some(NodeRole::RequiredScreening),
                    kind: QuestionKind::Numeric {
                        validation: None,
                        ranges: vec![],
                        default: None,
                    },
                },
            ],
        }
    }

    #[test]
    fn test_contraindication_denies() {
        let graph = graph();
        let mut answers = HashMap::new();
        answers.insert("pancreatitis".to_string(), CanonicalAnswer::YesNo(true));
        answers.insert("a1c".to_string(), CanonicalAnswer::Number(8.0));

        let decision = derive(&graph, &answers);
        assert_eq!(decision.outcome, DecisionOutcome::Deny);
        assert!(decision.reason.contains("pancreatitis"));
    }

    #[test]
    fn test_missing_screening_requires_documentation() {
        let graph = graph();
        let mut answers = HashMap::new();
        answers.insert("pancreatitis".to_string(), CanonicalAnswer::YesNo(false));

        let decision = derive(&graph, &answers);
        assert_eq!(decision.outcome, DecisionOutcome::DocumentationRequired);
        assert!(decision.reason.contains("HbA1c"));
    }

    #[test]
    fn test_clean_answers_approve() {
        let graph = graph();
        let mut answers = HashMap::new();
        answers.insert("pancreatitis".to_string(), CanonicalAnswer::YesNo(false));
        answers.insert("a1c".to_string(), CanonicalAnswer::Number(8.0));

        let decision = derive(&graph, &answers);
        assert_eq!(decision.outcome, DecisionOutcome::Approve);
    }

    #[test]
    fn test_contraindication_outranks_missing_screening() {
        let graph = graph();
        let mut answers = HashMap::new();
        answers.insert("pancreatitis".to_string(), CanonicalAnswer::YesNo(true));

        let decision = derive(&graph, &answers);
        assert_eq!(decision.outcome, DecisionOutcome::Deny);
    }
}
