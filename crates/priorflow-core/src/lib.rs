//! Priorflow Core Library
//!
//! Question-flow decision engine for medication prior-authorization intake.
//!
//! # Architecture
//!
//! ```text
//! Operator utterance → Intake extraction → Drug resolution
//!                                                │
//!                                   [SESSION: phase = question_flow]
//!                                                │
//!                               Question graph drives the conversation
//!                                                │
//!                    ┌───────────────────────────▼───────────────────────────┐
//!                    │              Answer normalization tiers               │
//!                    │  gate → exact → fuzzy → semantic → clarification      │
//!                    └───────────────────────────┬───────────────────────────┘
//!                                                │
//!                        canonical answer        │        clarification
//!                    ┌───────────────────────────┼───────────────────────────┐
//!                    ▼                           ▼                           ▼
//!               Next question           Terminal decision             Re-ask, session
//!                                   (approve / deny / docs)              unchanged
//! ```
//!
//! # Core Principle
//!
//! **The normalizer never guesses between plausible interpretations.** Two or
//! more qualifying candidates at any tier always surface as a clarification
//! request listing them.
//!
//! # Modules
//!
//! - [`answers`]: Tiered answer normalization
//! - [`catalog`]: Drug records and their question graphs
//! - [`classify`]: Text-classification capability (semantic match, intake extraction)
//! - [`flow`]: Graph integrity checks and fallback decision rules
//! - [`models`]: Domain types (QuestionNode, Session, MatchResult, etc.)
//! - [`resolver`]: Free-text drug-name resolution
//! - [`session`]: Session state machine
//! - [`similarity`]: Shared edit-distance scorer
//! - [`store`]: Session storage (memory, SQLite snapshots)

pub mod answers;
pub mod catalog;
pub mod classify;
pub mod flow;
pub mod models;
pub mod resolver;
pub mod session;
pub mod similarity;
pub mod store;

// Re-export commonly used types
pub use answers::{AnswerNormalizer, MatchConfig};
pub use catalog::DrugCatalog;
pub use classify::{AnswerMatch, TextClassifier};
pub use models::{
    CanonicalAnswer, Decision, DecisionOutcome, DrugRecord, DrugResolution, IntakeField,
    MatchResult, QuestionGraph, QuestionNode, Session, SessionPhase, SessionStatus,
};
pub use resolver::{DrugResolver, ResolverConfig};
pub use session::{AnswerOutcome, IntakeStep, SessionEngine, SessionError};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PriorflowError {
    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<SessionError> for PriorflowError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) | SessionError::NodeNotFound { .. } => {
                PriorflowError::NotFound(e.to_string())
            }
            SessionError::GraphNotFound { .. } => PriorflowError::CatalogError(e.to_string()),
            SessionError::Store(_) => PriorflowError::StorageError(e.to_string()),
            SessionError::Closed(_) | SessionError::WrongPhase { .. } => {
                PriorflowError::SessionError(e.to_string())
            }
        }
    }
}

impl From<catalog::CatalogError> for PriorflowError {
    fn from(e: catalog::CatalogError) -> Self {
        PriorflowError::CatalogError(e.to_string())
    }
}

impl From<store::StoreError> for PriorflowError {
    fn from(e: store::StoreError) -> Self {
        PriorflowError::StorageError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PriorflowError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PriorflowError::SessionError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Engine over the built-in demo catalog with in-memory sessions.
#[uniffi::export]
pub fn new_engine() -> Arc<PriorflowEngine> {
    Arc::new(PriorflowEngine {
        inner: Mutex::new(SessionEngine::new(DrugCatalog::builtin())),
    })
}

/// Engine over a caller-provided catalog document.
#[uniffi::export]
pub fn new_engine_with_catalog(catalog_json: String) -> Result<Arc<PriorflowEngine>, PriorflowError> {
    let catalog = DrugCatalog::from_json(&catalog_json)?;
    Ok(Arc::new(PriorflowEngine {
        inner: Mutex::new(SessionEngine::new(catalog)),
    }))
}

/// Engine that snapshots sessions to SQLite at the given path.
#[uniffi::export]
pub fn new_engine_with_snapshot(
    catalog_json: String,
    db_path: String,
) -> Result<Arc<PriorflowEngine>, PriorflowError> {
    let catalog = DrugCatalog::from_json(&catalog_json)?;
    let store = SqliteSessionStore::open(&db_path)?;
    Ok(Arc::new(PriorflowEngine {
        inner: Mutex::new(SessionEngine::with_store(catalog, Box::new(store))),
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PriorflowEngine {
    inner: Mutex<SessionEngine>,
}

#[uniffi::export]
impl PriorflowEngine {
    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Allocate a fresh session; returns its opaque token.
    pub fn create_session(&self) -> Result<String, PriorflowError> {
        let mut engine = self.inner.lock()?;
        Ok(engine.create()?)
    }

    /// Record one extracted intake field.
    pub fn submit_intake_field(
        &self,
        session_id: String,
        field: FfiIntakeField,
        value: String,
    ) -> Result<FfiIntakeStep, PriorflowError> {
        let mut engine = self.inner.lock()?;
        let step = engine.submit_intake_field(&session_id, field.into(), &value)?;
        Ok(step.into())
    }

    /// Process one raw answer for the session's current question.
    pub fn submit_answer(
        &self,
        session_id: String,
        raw_answer: String,
    ) -> Result<FfiAnswerOutcome, PriorflowError> {
        let mut engine = self.inner.lock()?;
        let outcome = engine.submit_answer(&session_id, &raw_answer)?;
        Ok(outcome.into())
    }

    /// Explicitly tear down a session.
    pub fn end_session(&self, session_id: String) -> Result<(), PriorflowError> {
        let mut engine = self.inner.lock()?;
        Ok(engine.end(&session_id)?)
    }

    // =========================================================================
    // Read Accessors
    // =========================================================================

    /// The question the session is currently waiting on.
    pub fn get_current_question(&self, session_id: String) -> Result<FfiQuestion, PriorflowError> {
        let engine = self.inner.lock()?;
        Ok(engine.current_question(&session_id)?.into())
    }

    /// Status, collected fields, answers, and decision for a session.
    pub fn get_session_summary(
        &self,
        session_id: String,
    ) -> Result<FfiSessionSummary, PriorflowError> {
        let engine = self.inner.lock()?;
        Ok(engine.session_summary(&session_id)?.into())
    }

    // =========================================================================
    // Resolver Operations
    // =========================================================================

    /// Resolve a free-text drug name against the catalog.
    pub fn resolve_drug(&self, raw_name: String) -> Result<FfiDrugResolution, PriorflowError> {
        let engine = self.inner.lock()?;
        let resolution = engine.resolver().resolve(&raw_name, engine.catalog().drugs());
        Ok(resolution.into())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Reap sessions idle longer than the configured age.
    pub fn sweep_idle_sessions(&self) -> Result<u32, PriorflowError> {
        let mut engine = self.inner.lock()?;
        Ok(engine.sweep_idle()? as u32)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe intake field selector.
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiIntakeField {
    MemberName,
    DateOfBirth,
    DrugName,
}

impl From<FfiIntakeField> for IntakeField {
    fn from(field: FfiIntakeField) -> Self {
        match field {
            FfiIntakeField::MemberName => IntakeField::MemberName,
            FfiIntakeField::DateOfBirth => IntakeField::DateOfBirth,
            FfiIntakeField::DrugName => IntakeField::DrugName,
        }
    }
}

/// FFI-safe question view.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQuestion {
    pub node_id: String,
    pub text: String,
    pub kind: String,
    pub options: Vec<String>,
}

impl From<session::QuestionView> for FfiQuestion {
    fn from(view: session::QuestionView) -> Self {
        Self {
            node_id: view.node_id,
            text: view.text,
            kind: view.kind,
            options: view.options,
        }
    }
}

/// FFI-safe intake progress.
///
/// `status` is one of `awaiting_fields`, `drug_unresolved`, `first_question`;
/// the matching payload fields are populated.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntakeStep {
    pub status: String,
    pub missing_fields: Vec<String>,
    pub alternatives: Vec<FfiDrugSuggestion>,
    pub question: Option<FfiQuestion>,
}

impl From<IntakeStep> for FfiIntakeStep {
    fn from(step: IntakeStep) -> Self {
        match step {
            IntakeStep::AwaitingFields { missing } => Self {
                status: "awaiting_fields".into(),
                missing_fields: missing.iter().map(|f| f.as_str().to_string()).collect(),
                alternatives: Vec::new(),
                question: None,
            },
            IntakeStep::DrugUnresolved { alternatives } => Self {
                status: "drug_unresolved".into(),
                missing_fields: Vec::new(),
                alternatives: alternatives.into_iter().map(Into::into).collect(),
                question: None,
            },
            IntakeStep::FirstQuestion { question } => Self {
                status: "first_question".into(),
                missing_fields: Vec::new(),
                alternatives: Vec::new(),
                question: Some(question.into()),
            },
        }
    }
}

/// FFI-safe answer outcome.
///
/// `action` is one of `next_question`, `complete`, `clarification`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnswerOutcome {
    pub action: String,
    pub question: Option<FfiQuestion>,
    pub decision: Option<FfiDecision>,
    pub clarification: Option<String>,
    pub candidates: Vec<FfiRankedOption>,
}

impl From<AnswerOutcome> for FfiAnswerOutcome {
    fn from(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::NextQuestion { question } => Self {
                action: "next_question".into(),
                question: Some(question.into()),
                decision: None,
                clarification: None,
                candidates: Vec::new(),
            },
            AnswerOutcome::Complete { decision } => Self {
                action: "complete".into(),
                question: None,
                decision: Some(decision.into()),
                clarification: None,
                candidates: Vec::new(),
            },
            AnswerOutcome::Clarification { reason, candidates } => Self {
                action: "clarification".into(),
                question: None,
                decision: None,
                clarification: Some(reason),
                candidates: candidates.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// FFI-safe decision.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDecision {
    pub outcome: String,
    pub reason: String,
}

impl From<Decision> for FfiDecision {
    fn from(decision: Decision) -> Self {
        Self {
            outcome: decision.outcome.as_str().to_string(),
            reason: decision.reason,
        }
    }
}

/// FFI-safe clarification candidate.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRankedOption {
    pub option: String,
    pub confidence: f64,
}

impl From<models::RankedOption> for FfiRankedOption {
    fn from(candidate: models::RankedOption) -> Self {
        Self {
            option: candidate.option,
            confidence: candidate.confidence,
        }
    }
}

/// FFI-safe drug suggestion.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugSuggestion {
    pub name: String,
    pub confidence: f64,
}

impl From<models::DrugSuggestion> for FfiDrugSuggestion {
    fn from(suggestion: models::DrugSuggestion) -> Self {
        Self {
            name: suggestion.name,
            confidence: suggestion.confidence,
        }
    }
}

/// FFI-safe drug resolution.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugResolution {
    pub drug_id: Option<String>,
    pub drug_name: Option<String>,
    pub confidence: f64,
    pub alternatives: Vec<FfiDrugSuggestion>,
}

impl From<DrugResolution> for FfiDrugResolution {
    fn from(resolution: DrugResolution) -> Self {
        Self {
            drug_id: resolution.drug.as_ref().map(|d| d.id.clone()),
            drug_name: resolution.drug.map(|d| d.name),
            confidence: resolution.confidence,
            alternatives: resolution.alternatives.into_iter().map(Into::into).collect(),
        }
    }
}

/// FFI-safe session summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSessionSummary {
    pub session_id: String,
    pub status: String,
    pub phase: String,
    pub member_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub drug_name: Option<String>,
    pub answers: std::collections::HashMap<String, String>,
    pub decision: Option<FfiDecision>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<session::SessionSummary> for FfiSessionSummary {
    fn from(summary: session::SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            status: summary.status,
            phase: summary.phase,
            member_name: summary.collected.member_name,
            date_of_birth: summary.collected.date_of_birth,
            drug_name: summary.collected.drug_name,
            answers: summary.answers,
            decision: summary.decision.map(Into::into),
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}
