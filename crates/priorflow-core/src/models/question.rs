//! Question graph model: typed nodes, transitions, and terminal decisions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::answer::CanonicalAnswer;

/// Terminal outcome of a question flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approve,
    Deny,
    DocumentationRequired,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::Approve => "approve",
            DecisionOutcome::Deny => "deny",
            DecisionOutcome::DocumentationRequired => "documentation_required",
        }
    }
}

/// A terminal decision with its stated reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub outcome: DecisionOutcome,
    pub reason: String,
}

impl Decision {
    pub fn new(outcome: DecisionOutcome, reason: impl Into<String>) -> Self {
        Self {
            outcome,
            reason: reason.into(),
        }
    }
}

/// Where a transition leads: another node, or a terminal decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Advance to the named node
    Node(String),
    /// Close the flow with this decision
    Decide(Decision),
}

/// Inclusive numeric bounds used for answer validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A numeric branch: first declared range containing the answer wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeTransition {
    pub min: f64,
    pub max: f64,
    pub target: Target,
}

impl RangeTransition {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Marker consumed by the fallback decision rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// A yes answer here means the drug must not be approved
    Contraindication,
    /// Must be answered before an approval can be issued
    RequiredScreening,
}

fn default_min_length() -> usize {
    3
}

/// Type-specific payload of a question node.
///
/// The variant fixes both the answer domain and how transitions resolve,
/// so malformed combinations cannot be constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        /// Declared options, in presentation order
        options: Vec<String>,
        /// Canonical option -> target
        transitions: HashMap<String, Target>,
        /// Fallback for options without an explicit transition
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Target>,
    },
    YesNo {
        on_yes: Target,
        on_no: Target,
    },
    Numeric {
        /// Accepted value bounds; out-of-range answers are re-asked
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validation: Option<NumericRange>,
        /// Branch ranges, first match wins
        #[serde(default)]
        ranges: Vec<RangeTransition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Target>,
    },
    Text {
        #[serde(default = "default_min_length")]
        min_length: usize,
        /// Free text is recorded but never branches
        next: Target,
    },
}

impl QuestionKind {
    /// Stable name used in views and logs.
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::YesNo { .. } => "yes_no",
            QuestionKind::Numeric { .. } => "numeric",
            QuestionKind::Text { .. } => "text",
        }
    }
}

/// One question in a drug's clinical questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionNode {
    pub id: String,
    /// Question text as read to the operator
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<NodeRole>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Result of resolving a node's transition for a canonical answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Advance to this node
    Node(String),
    /// The flow is closed by this decision
    Decide(Decision),
    /// No applicable transition; the fallback decision rules take over
    Exhausted,
}

impl From<&Target> for Step {
    fn from(target: &Target) -> Self {
        match target {
            Target::Node(id) => Step::Node(id.clone()),
            Target::Decide(decision) => Step::Decide(decision.clone()),
        }
    }
}

impl QuestionNode {
    /// Options for multiple-choice nodes, empty otherwise.
    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => options,
            _ => &[],
        }
    }

    /// Resolve the transition for an accepted canonical answer.
    ///
    /// An answer whose kind does not fit the node is a pipeline bug; it is
    /// logged and surfaced as `Exhausted` so the fallback rules still close
    /// the session.
    pub fn next_step(&self, answer: &CanonicalAnswer) -> Step {
        match (&self.kind, answer) {
            (
                QuestionKind::MultipleChoice {
                    transitions,
                    default,
                    ..
                },
                CanonicalAnswer::Choice(choice),
            ) => transitions
                .get(choice)
                .or(default.as_ref())
                .map(Step::from)
                .unwrap_or(Step::Exhausted),
            (QuestionKind::YesNo { on_yes, on_no }, CanonicalAnswer::YesNo(value)) => {
                Step::from(if *value { on_yes } else { on_no })
            }
            (
                QuestionKind::Numeric {
                    ranges, default, ..
                },
                CanonicalAnswer::Number(value),
            ) => ranges
                .iter()
                .find(|r| r.contains(*value))
                .map(|r| Step::from(&r.target))
                .or_else(|| default.as_ref().map(Step::from))
                .unwrap_or(Step::Exhausted),
            (QuestionKind::Text { next, .. }, CanonicalAnswer::Text(_)) => Step::from(next),
            (kind, answer) => {
                tracing::warn!(
                    node = %self.id,
                    kind = kind.name(),
                    ?answer,
                    "answer kind does not fit node; treating transition as exhausted"
                );
                Step::Exhausted
            }
        }
    }
}

/// A drug's directed question graph: one start node, branching transitions,
/// terminals that decide the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionGraph {
    /// Question set identifier referenced by drug records
    pub id: String,
    /// Designated start node
    pub start: String,
    /// Nodes in declaration order
    pub nodes: Vec<QuestionNode>,
}

impl QuestionGraph {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&QuestionNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The start node, when the graph is well formed.
    pub fn start_node(&self) -> Option<&QuestionNode> {
        self.node(&self.start)
    }
}
