//! Session state: one conversation's lifecycle from intake to decision.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::CanonicalAnswer;
use super::question::Decision;

/// Whether a session can still be mutated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting intake fields or answers
    Active,
    /// A decision has been recorded; read-only
    Completed,
    /// Explicitly torn down; read-only
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Ended => "ended",
        }
    }
}

/// Which stage of the conversation the session is in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Collecting member identity and the requested drug
    Intake,
    /// Walking the drug's question graph
    QuestionFlow,
    /// Decision recorded
    Complete,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Intake => "intake",
            SessionPhase::QuestionFlow => "question_flow",
            SessionPhase::Complete => "complete",
        }
    }
}

/// An intake field the extraction collaborator can populate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntakeField {
    MemberName,
    DateOfBirth,
    DrugName,
}

impl IntakeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeField::MemberName => "member_name",
            IntakeField::DateOfBirth => "date_of_birth",
            IntakeField::DrugName => "drug_name",
        }
    }
}

/// Fields collected during intake. Extraction is best-effort; anything the
/// collaborator fails to populate stays unset and is re-requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IntakeFields {
    pub member_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub drug_name: Option<String>,
    /// Catalog id, set once the drug name resolves
    pub drug_id: Option<String>,
}

impl IntakeFields {
    /// Intake fields still awaiting a value.
    pub fn missing(&self) -> Vec<IntakeField> {
        let mut missing = Vec::new();
        if self.member_name.is_none() {
            missing.push(IntakeField::MemberName);
        }
        if self.date_of_birth.is_none() {
            missing.push(IntakeField::DateOfBirth);
        }
        if self.drug_id.is_none() {
            missing.push(IntakeField::DrugName);
        }
        missing
    }
}

/// One prior-authorization conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Opaque session token
    pub id: String,
    pub status: SessionStatus,
    pub phase: SessionPhase,
    pub collected: IntakeFields,
    /// Current graph position while in question flow
    pub current_node: Option<String>,
    /// Canonical answers keyed by question id
    pub answers: HashMap<String, CanonicalAnswer>,
    pub decision: Option<Decision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Allocate a fresh session in intake.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: SessionStatus::Active,
            phase: SessionPhase::Intake,
            collected: IntakeFields::default(),
            current_node: None,
            answers: HashMap::new(),
            decision: None,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    /// True while the session accepts mutation.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Bump the idle clock.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Record the decision and close the flow.
    pub fn complete(&mut self, decision: Decision) {
        self.decision = Some(decision);
        self.phase = SessionPhase::Complete;
        self.status = SessionStatus::Completed;
        self.touch();
    }

    /// Explicit teardown.
    pub fn end(&mut self) {
        self.status = SessionStatus::Ended;
        self.ended_at = Some(Utc::now());
        self.touch();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DecisionOutcome;

    #[test]
    fn test_new_session_is_active_intake() {
        let session = Session::new();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.phase, SessionPhase::Intake);
        assert_eq!(session.id.len(), 36);
        assert!(session.current_node.is_none());
        assert!(session.answers.is_empty());
    }

    #[test]
    fn test_missing_fields_shrink_as_collected() {
        let mut fields = IntakeFields::default();
        assert_eq!(
            fields.missing(),
            vec![
                IntakeField::MemberName,
                IntakeField::DateOfBirth,
                IntakeField::DrugName
            ]
        );

        fields.member_name = Some("Jordan Alvarez".into());
        fields.date_of_birth = Some("1984-03-11".into());
        assert_eq!(fields.missing(), vec![IntakeField::DrugName]);

        // A raw drug name alone is not enough; resolution sets the id
        fields.drug_name = Some("ozempic".into());
        assert_eq!(fields.missing(), vec![IntakeField::DrugName]);
        fields.drug_id = Some("ozempic".into());
        assert!(fields.missing().is_empty());
    }

    #[test]
    fn test_complete_freezes_session() {
        let mut session = Session::new();
        session.complete(Decision::new(DecisionOutcome::Approve, "criteria met"));
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.phase, SessionPhase::Complete);
        assert!(!session.is_active());
    }

    #[test]
    fn test_end_sets_timestamp() {
        let mut session = Session::new();
        session.end();
        assert_eq!(session.status, SessionStatus::Ended);
        assert!(session.ended_at.is_some());
    }
}
