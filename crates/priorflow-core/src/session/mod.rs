//! Session state machine.
//!
//! Owns the lifecycle of every conversation: intake (identity + drug), the
//! question flow, and the recorded decision. All mutation goes through the
//! engine; sessions themselves are plain values behind the store.

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::answers::AnswerNormalizer;
use crate::catalog::DrugCatalog;
use crate::flow;
use crate::models::{
    Decision, DrugSuggestion, IntakeField, IntakeFields, QuestionNode, RankedOption, Session,
    SessionPhase, Step,
};
use crate::resolver::DrugResolver;
use crate::store::{MemorySessionStore, SessionStore, StoreError};

/// Sessions idle longer than this are eligible for reaping.
const DEFAULT_MAX_IDLE_MINUTES: i64 = 30;

/// Session operation errors. Conversational trouble is never an error; these
/// cover unknown ids, closed sessions, and configuration gaps.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session is closed: {0}")]
    Closed(String),

    #[error("no question set available for drug {drug}")]
    GraphNotFound { drug: String },

    #[error("question node {node} missing from question set {question_set}")]
    NodeNotFound { node: String, question_set: String },

    #[error("session {session} is in phase {phase}; operation not valid there")]
    WrongPhase { session: String, phase: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Presentation data for one question.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QuestionView {
    pub node_id: String,
    pub text: String,
    pub kind: String,
    /// Options for multiple-choice questions, empty otherwise
    pub options: Vec<String>,
}

impl From<&QuestionNode> for QuestionView {
    fn from(node: &QuestionNode) -> Self {
        Self {
            node_id: node.id.clone(),
            text: node.text.clone(),
            kind: node.kind.name().to_string(),
            options: node.options().to_vec(),
        }
    }
}

/// What intake needs next.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeStep {
    /// Fields still unset; keep collecting
    AwaitingFields { missing: Vec<IntakeField> },
    /// The drug name did not resolve; offer "did you mean" candidates
    DrugUnresolved { alternatives: Vec<DrugSuggestion> },
    /// Intake finished; the question flow has begun
    FirstQuestion { question: QuestionView },
}

/// Outcome of processing one answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    /// Answer recorded; ask this next
    NextQuestion { question: QuestionView },
    /// Flow finished; decision recorded and the session is read-only
    Complete { decision: Decision },
    /// The answer needs to be re-asked; the session is unchanged
    Clarification {
        reason: String,
        candidates: Vec<RankedOption>,
    },
}

/// Read-model of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: String,
    pub phase: String,
    pub collected: IntakeFields,
    /// Canonical answers rendered as display strings, keyed by question id
    pub answers: std::collections::HashMap<String, String>,
    pub decision: Option<Decision>,
    pub created_at: String,
    pub updated_at: String,
}

/// Drives sessions through intake, question flow, and decision.
pub struct SessionEngine {
    catalog: DrugCatalog,
    store: Box<dyn SessionStore>,
    resolver: DrugResolver,
    normalizer: AnswerNormalizer,
    max_idle: Duration,
}

impl SessionEngine {
    /// Engine with the default in-memory store and components.
    pub fn new(catalog: DrugCatalog) -> Self {
        Self::with_store(catalog, Box::new(MemorySessionStore::new()))
    }

    /// Engine over a caller-provided store.
    pub fn with_store(catalog: DrugCatalog, store: Box<dyn SessionStore>) -> Self {
        Self {
            catalog,
            store,
            resolver: DrugResolver::new(),
            normalizer: AnswerNormalizer::new(),
            max_idle: Duration::minutes(DEFAULT_MAX_IDLE_MINUTES),
        }
    }

    /// Replace the answer normalizer (e.g., to attach a semantic classifier).
    pub fn with_normalizer(mut self, normalizer: AnswerNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replace the drug resolver.
    pub fn with_resolver(mut self, resolver: DrugResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Change the idle age after which sessions are reaped.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// The catalog this engine serves.
    pub fn catalog(&self) -> &DrugCatalog {
        &self.catalog
    }

    /// The drug resolver, for direct access.
    pub fn resolver(&self) -> &DrugResolver {
        &self.resolver
    }

    /// Allocate a fresh session in intake.
    pub fn create(&mut self) -> SessionResult<String> {
        let session = Session::new();
        let id = session.id.clone();
        self.store.put(&session)?;
        tracing::info!(session = %id, "session created");
        Ok(id)
    }

    /// Record one extracted intake field.
    ///
    /// Submitting the drug name runs entity resolution; once the drug
    /// resolves, the session moves to question flow and the first question
    /// is returned.
    pub fn submit_intake_field(
        &mut self,
        id: &str,
        field: IntakeField,
        value: &str,
    ) -> SessionResult<IntakeStep> {
        let mut session = self.load_active(id)?;
        if session.phase != SessionPhase::Intake {
            return Err(SessionError::WrongPhase {
                session: id.to_string(),
                phase: session.phase.as_str().to_string(),
            });
        }

        match field {
            IntakeField::MemberName => {
                session.collected.member_name = Some(value.trim().to_string());
            }
            IntakeField::DateOfBirth => {
                session.collected.date_of_birth = Some(value.trim().to_string());
            }
            IntakeField::DrugName => {
                let resolution = self.resolver.resolve(value, self.catalog.drugs());
                let Some(drug) = resolution.drug else {
                    // Unresolved: nothing recorded, the field is re-requested
                    return Ok(IntakeStep::DrugUnresolved {
                        alternatives: resolution.alternatives,
                    });
                };

                let graph = self.catalog.graph_for(&drug).ok_or_else(|| {
                    SessionError::GraphNotFound {
                        drug: drug.name.clone(),
                    }
                })?;

                session.collected.drug_name = Some(drug.name.clone());
                session.collected.drug_id = Some(drug.id.clone());
                session.phase = SessionPhase::QuestionFlow;
                session.current_node = Some(graph.start.clone());
                let first = self.node_view(&graph.id, &graph.start)?;
                session.touch();
                self.store.put(&session)?;
                tracing::info!(
                    session = %id,
                    drug = %drug.id,
                    question_set = %graph.id,
                    "intake complete, question flow started"
                );
                return Ok(IntakeStep::FirstQuestion { question: first });
            }
        }

        session.touch();
        let missing = session.collected.missing();
        self.store.put(&session)?;
        Ok(IntakeStep::AwaitingFields { missing })
    }

    /// Process one raw answer for the session's current question.
    pub fn submit_answer(&mut self, id: &str, raw_answer: &str) -> SessionResult<AnswerOutcome> {
        let mut session = self.load_active(id)?;
        if session.phase != SessionPhase::QuestionFlow {
            return Err(SessionError::WrongPhase {
                session: id.to_string(),
                phase: session.phase.as_str().to_string(),
            });
        }

        let graph_id = self.session_graph_id(&session)?;
        let graph = self
            .catalog
            .graph(&graph_id)
            .ok_or_else(|| SessionError::GraphNotFound {
                drug: session.collected.drug_name.clone().unwrap_or_default(),
            })?;

        let node_id = session.current_node.clone().unwrap_or_default();
        let node = graph
            .node(&node_id)
            .ok_or_else(|| SessionError::NodeNotFound {
                node: node_id.clone(),
                question_set: graph.id.clone(),
            })?;

        let result = self.normalizer.normalize(raw_answer, node);
        let Some(answer) = result.answer else {
            // Clarification: the session is deliberately left untouched
            return Ok(AnswerOutcome::Clarification {
                reason: result
                    .clarification
                    .unwrap_or_else(|| "could you rephrase that?".to_string()),
                candidates: result.candidates,
            });
        };

        session.answers.insert(node.id.clone(), answer.clone());

        let outcome = match node.next_step(&answer) {
            Step::Node(next_id) => {
                let question = self.node_view(&graph.id, &next_id)?;
                session.current_node = Some(next_id);
                session.touch();
                AnswerOutcome::NextQuestion { question }
            }
            Step::Decide(decision) => {
                tracing::info!(
                    session = %id,
                    outcome = decision.outcome.as_str(),
                    "question flow reached a terminal decision"
                );
                session.complete(decision.clone());
                AnswerOutcome::Complete { decision }
            }
            Step::Exhausted => {
                // Configuration gap: close the session via the fallback rules
                let decision = flow::decision::derive(graph, &session.answers);
                tracing::warn!(
                    session = %id,
                    node = %node.id,
                    outcome = decision.outcome.as_str(),
                    "traversal exhausted without a declared terminal; fallback decision applied"
                );
                session.complete(decision.clone());
                AnswerOutcome::Complete { decision }
            }
        };

        self.store.put(&session)?;
        Ok(outcome)
    }

    /// Explicit teardown; later mutations fail with `Closed`.
    pub fn end(&mut self, id: &str) -> SessionResult<()> {
        let mut session = self.load(id)?;
        if session.status == crate::models::SessionStatus::Ended {
            return Err(SessionError::Closed(id.to_string()));
        }
        session.end();
        self.store.put(&session)?;
        tracing::info!(session = %id, "session ended");
        Ok(())
    }

    /// The question the session is currently waiting on.
    pub fn current_question(&self, id: &str) -> SessionResult<QuestionView> {
        let session = self.load(id)?;
        if session.phase != SessionPhase::QuestionFlow {
            return Err(SessionError::WrongPhase {
                session: id.to_string(),
                phase: session.phase.as_str().to_string(),
            });
        }
        let graph_id = self.session_graph_id(&session)?;
        let node_id = session.current_node.clone().unwrap_or_default();
        self.node_view(&graph_id, &node_id)
    }

    /// Read-model for the presentation layer.
    pub fn session_summary(&self, id: &str) -> SessionResult<SessionSummary> {
        let session = self.load(id)?;
        Ok(SessionSummary {
            session_id: session.id.clone(),
            status: session.status.as_str().to_string(),
            phase: session.phase.as_str().to_string(),
            collected: session.collected.clone(),
            answers: session
                .answers
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
            decision: session.decision.clone(),
            created_at: session.created_at.to_rfc3339(),
            updated_at: session.updated_at.to_rfc3339(),
        })
    }

    /// Reap sessions idle longer than the configured age.
    pub fn sweep_idle(&mut self) -> SessionResult<usize> {
        let cutoff = Utc::now() - self.max_idle;
        let removed = self.store.sweep(cutoff)?;
        if removed > 0 {
            tracing::info!(removed, "idle sessions reaped");
        }
        Ok(removed)
    }

    fn load(&self, id: &str) -> SessionResult<Session> {
        self.store
            .get(id)?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn load_active(&self, id: &str) -> SessionResult<Session> {
        let session = self.load(id)?;
        if !session.is_active() {
            return Err(SessionError::Closed(id.to_string()));
        }
        Ok(session)
    }

    /// Question-set id for a session already in question flow.
    fn session_graph_id(&self, session: &Session) -> SessionResult<String> {
        let drug_id = session.collected.drug_id.as_deref().unwrap_or_default();
        let drug = self
            .catalog
            .drug(drug_id)
            .ok_or_else(|| SessionError::GraphNotFound {
                drug: drug_id.to_string(),
            })?;
        Ok(drug.question_set_id.clone())
    }

    fn node_view(&self, graph_id: &str, node_id: &str) -> SessionResult<QuestionView> {
        let graph = self
            .catalog
            .graph(graph_id)
            .ok_or_else(|| SessionError::GraphNotFound {
                drug: graph_id.to_string(),
            })?;
        let node = graph
            .node(node_id)
            .ok_or_else(|| SessionError::NodeNotFound {
                node: node_id.to_string(),
                question_set: graph_id.to_string(),
            })?;
        Ok(QuestionView::from(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecisionOutcome;

    fn engine() -> SessionEngine {
        SessionEngine::new(DrugCatalog::builtin())
    }

    /// Run intake through to the first question for the given drug.
    fn start_flow(engine: &mut SessionEngine, drug: &str) -> String {
        let id = engine.create().unwrap();
        engine
            .submit_intake_field(&id, IntakeField::MemberName, "Jordan Alvarez")
            .unwrap();
        engine
            .submit_intake_field(&id, IntakeField::DateOfBirth, "1984-03-11")
            .unwrap();
        let step = engine
            .submit_intake_field(&id, IntakeField::DrugName, drug)
            .unwrap();
        assert!(matches!(step, IntakeStep::FirstQuestion { .. }));
        id
    }

    #[test]
    fn test_create_starts_in_intake() {
        let mut engine = engine();
        let id = engine.create().unwrap();
        let summary = engine.session_summary(&id).unwrap();
        assert_eq!(summary.status, "active");
        assert_eq!(summary.phase, "intake");
    }

    #[test]
    fn test_unknown_session_is_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.session_summary("no-such-session"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_intake_reports_missing_fields() {
        let mut engine = engine();
        let id = engine.create().unwrap();
        let step = engine
            .submit_intake_field(&id, IntakeField::MemberName, "Jordan Alvarez")
            .unwrap();
        match step {
            IntakeStep::AwaitingFields { missing } => {
                assert_eq!(missing, vec![IntakeField::DateOfBirth, IntakeField::DrugName]);
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_drug_keeps_session_in_intake() {
        let mut engine = engine();
        let id = engine.create().unwrap();
        let step = engine
            .submit_intake_field(&id, IntakeField::DrugName, "ozem")
            .unwrap();
        assert!(matches!(step, IntakeStep::DrugUnresolved { .. }));
        let summary = engine.session_summary(&id).unwrap();
        assert_eq!(summary.phase, "intake");
        assert!(summary.collected.drug_id.is_none());
    }

    #[test]
    fn test_resolved_drug_starts_question_flow() {
        let mut engine = engine();
        let id = start_flow(&mut engine, "ozempic");

        let question = engine.current_question(&id).unwrap();
        assert_eq!(question.node_id, "diagnosis");
        assert_eq!(question.kind, "multiple_choice");
        assert_eq!(question.options.len(), 4);
    }

    #[test]
    fn test_clarification_leaves_session_unchanged() {
        let mut engine = engine();
        let id = start_flow(&mut engine, "ozempic");
        let before = engine.session_summary(&id).unwrap();

        let outcome = engine.submit_answer(&id, "diabetes").unwrap();
        match outcome {
            AnswerOutcome::Clarification { candidates, .. } => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let after = engine.session_summary(&id).unwrap();
        assert_eq!(after.answers.len(), 0);
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(
            engine.current_question(&id).unwrap().node_id,
            "diagnosis"
        );
    }

    #[test]
    fn test_answer_advances_to_next_node() {
        let mut engine = engine();
        let id = start_flow(&mut engine, "ozempic");

        let outcome = engine.submit_answer(&id, "type 2 diabetes").unwrap();
        match outcome {
            AnswerOutcome::NextQuestion { question } => assert_eq!(question.node_id, "a1c"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_terminal_decision_completes_session() {
        let mut engine = engine();
        let id = start_flow(&mut engine, "ozempic");

        let outcome = engine.submit_answer(&id, "Type 1 Diabetes").unwrap();
        match outcome {
            AnswerOutcome::Complete { decision } => {
                assert_eq!(decision.outcome, DecisionOutcome::Deny);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let summary = engine.session_summary(&id).unwrap();
        assert_eq!(summary.status, "completed");
        assert_eq!(summary.phase, "complete");

        // Completed sessions refuse further answers
        assert!(matches!(
            engine.submit_answer(&id, "yes"),
            Err(SessionError::Closed(_))
        ));
    }

    #[test]
    fn test_answers_rejected_during_intake() {
        let mut engine = engine();
        let id = engine.create().unwrap();
        assert!(matches!(
            engine.submit_answer(&id, "yes"),
            Err(SessionError::WrongPhase { .. })
        ));
    }

    #[test]
    fn test_end_blocks_everything_after() {
        let mut engine = engine();
        let id = engine.create().unwrap();
        engine.end(&id).unwrap();

        assert!(matches!(engine.end(&id), Err(SessionError::Closed(_))));
        assert!(matches!(
            engine.submit_intake_field(&id, IntakeField::MemberName, "x"),
            Err(SessionError::Closed(_))
        ));
        // Read access still works for auditing
        assert_eq!(engine.session_summary(&id).unwrap().status, "ended");
    }

    #[test]
    fn test_sweep_reaps_idle_sessions() {
        let mut engine = engine().with_max_idle(Duration::minutes(0));
        let _id = engine.create().unwrap();
        // Zero idle allowance: everything not updated "in the future" goes
        std::thread::sleep(std::time::Duration::from_millis(5));
        let removed = engine.sweep_idle().unwrap();
        assert_eq!(removed, 1);
    }
}
