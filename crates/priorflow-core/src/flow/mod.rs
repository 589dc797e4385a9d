//! Question-graph integrity checks.
//!
//! A graph is validated when its catalog loads: the start node must exist,
//! every transition target must resolve, and no cycle may be reachable from
//! the start. A reachable node without a fallback transition is reported as
//! a warning rather than rejected; the fallback decision rules close any
//! session that runs off such a node.

pub mod decision;

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{QuestionGraph, QuestionKind, QuestionNode, Target};

/// Graph integrity errors.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("question set {set} declares start node {start}, which does not exist")]
    MissingStart { set: String, start: String },

    #[error("question set {set} declares node {node} more than once")]
    DuplicateNode { set: String, node: String },

    #[error("node {node} in question set {set} references unknown node {target}")]
    DanglingTarget {
        set: String,
        node: String,
        target: String,
    },

    #[error("question set {set} contains a cycle through node {node}")]
    Cycle { set: String, node: String },
}

/// Validate a graph; returns human-readable warnings for fallback gaps.
pub fn validate_graph(graph: &QuestionGraph) -> Result<Vec<String>, GraphError> {
    let mut seen = HashMap::new();
    for node in &graph.nodes {
        if seen.insert(node.id.as_str(), ()).is_some() {
            return Err(GraphError::DuplicateNode {
                set: graph.id.clone(),
                node: node.id.clone(),
            });
        }
    }

    if graph.start_node().is_none() {
        return Err(GraphError::MissingStart {
            set: graph.id.clone(),
            start: graph.start.clone(),
        });
    }

    for node in &graph.nodes {
        for target in targets(node) {
            if let Target::Node(id) = target {
                if graph.node(id).is_none() {
                    return Err(GraphError::DanglingTarget {
                        set: graph.id.clone(),
                        node: node.id.clone(),
                        target: id.clone(),
                    });
                }
            }
        }
    }

    check_acyclic(graph)?;

    Ok(fallback_warnings(graph))
}

/// All transition targets declared by a node.
fn targets(node: &QuestionNode) -> Vec<&Target> {
    match &node.kind {
        QuestionKind::MultipleChoice {
            transitions,
            default,
            ..
        } => transitions.values().chain(default.as_ref()).collect(),
        QuestionKind::YesNo { on_yes, on_no } => vec![on_yes, on_no],
        QuestionKind::Numeric {
            ranges, default, ..
        } => ranges
            .iter()
            .map(|r| &r.target)
            .chain(default.as_ref())
            .collect(),
        QuestionKind::Text { next, .. } => vec![next],
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search from the start node rejecting reachable cycles.
fn check_acyclic(graph: &QuestionGraph) -> Result<(), GraphError> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut stack: Vec<(&str, usize)> = vec![(graph.start.as_str(), 0)];

    while let Some((id, next_child)) = stack.pop() {
        let node = match graph.node(id) {
            Some(n) => n,
            None => continue, // dangling targets are reported separately
        };
        if next_child == 0 {
            if marks.get(id) == Some(&Mark::Done) {
                continue;
            }
            marks.insert(id, Mark::Visiting);
        }

        let children: Vec<&str> = targets(node)
            .into_iter()
            .filter_map(|t| match t {
                Target::Node(child) => Some(child.as_str()),
                Target::Decide(_) => None,
            })
            .collect();

        if next_child < children.len() {
            stack.push((id, next_child + 1));
            let child = children[next_child];
            match marks.get(child) {
                Some(Mark::Visiting) => {
                    return Err(GraphError::Cycle {
                        set: graph.id.clone(),
                        node: child.to_string(),
                    });
                }
                Some(Mark::Done) => {}
                None => stack.push((child, 0)),
            }
        } else {
            marks.insert(id, Mark::Done);
        }
    }

    Ok(())
}

/// Warnings for nodes a traversal could run off without a decision.
fn fallback_warnings(graph: &QuestionGraph) -> Vec<String> {
    let mut warnings = Vec::new();
    for node in &graph.nodes {
        match &node.kind {
            QuestionKind::MultipleChoice {
                options,
                transitions,
                default,
            } if default.is_none() => {
                let uncovered: Vec<&str> = options
                    .iter()
                    .filter(|o| !transitions.contains_key(*o))
                    .map(|o| o.as_str())
                    .collect();
                if !uncovered.is_empty() {
                    warnings.push(format!(
                        "question set {}: node {} has no default and no transition for: {}",
                        graph.id,
                        node.id,
                        uncovered.join(", ")
                    ));
                }
            }
            QuestionKind::Numeric { default, .. } if default.is_none() => {
                warnings.push(format!(
                    "question set {}: numeric node {} has no default transition",
                    graph.id, node.id
                ));
            }
            _ => {}
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, DecisionOutcome};
    use std::collections::HashMap;

    fn yes_no(id: &str, on_yes: Target, on_no: Target) -> QuestionNode {
        QuestionNode {
            id: id.into(),
            text: format!("{}?", id),
            role: None,
            kind: QuestionKind::YesNo { on_yes, on_no },
        }
    }

    fn approve() -> Target {
        Target::Decide(Decision::new(DecisionOutcome::Approve, "criteria met"))
    }

    fn deny() -> Target {
        Target::Decide(Decision::new(DecisionOutcome::Deny, "criteria not met"))
    }

    #[test]
    fn test_valid_chain_passes() {
        let graph = QuestionGraph {
            id: "set".into(),
            start: "first".into(),
            nodes: vec![
                yes_no("first", Target::Node("second".into()), deny()),
                yes_no("second", approve(), deny()),
            ],
        };
        let warnings = validate_graph(&graph).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_start_rejected() {
        let graph = QuestionGraph {
            id: "set".into(),
            start: "nowhere".into(),
            nodes: vec![yes_no("first", approve(), deny())],
        };
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::MissingStart { .. })
        ));
    }

    #[test]
    fn test_dangling_target_rejected() {
        let graph = QuestionGraph {
            id: "set".into(),
            start: "first".into(),
            nodes: vec![yes_no("first", Target::Node("ghost".into()), deny())],
        };
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::DanglingTarget { .. })
        ));
    }

    #[test]
    fn test_reachable_cycle_rejected() {
        let graph = QuestionGraph {
            id: "set".into(),
            start: "first".into(),
            nodes: vec![
                yes_no("first", Target::Node("second".into()), deny()),
                yes_no("second", Target::Node("first".into()), approve()),
            ],
        };
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let graph = QuestionGraph {
            id: "set".into(),
            start: "first".into(),
            nodes: vec![
                yes_no("first", approve(), deny()),
                yes_no("first", approve(), deny()),
            ],
        };
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        // Two branches reconverging on the same node is fine
        let graph = QuestionGraph {
            id: "set".into(),
            start: "first".into(),
            nodes: vec![
                yes_no(
                    "first",
                    Target::Node("left".into()),
                    Target::Node("right".into()),
                ),
                yes_no("left", Target::Node("last".into()), deny()),
                yes_no("right", Target::Node("last".into()), deny()),
                yes_no("last", approve(), deny()),
            ],
        };
        assert!(validate_graph(&graph).is_ok());
    }

    #[test]
    fn test_uncovered_choice_warns() {
        let mut transitions = HashMap::new();
        transitions.insert("A".to_string(), approve());
        let graph = QuestionGraph {
            id: "set".into(),
            start: "pick".into(),
            nodes: vec![QuestionNode {
                id: "pick".into(),
                text: "Pick one".into(),
                role: None,
                kind: QuestionKind::MultipleChoice {
                    options: vec!["A".into(), "B".into()],
                    transitions,
                    default: None,
                },
            }],
        };
        let warnings = validate_graph(&graph).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("B"));
    }
}
