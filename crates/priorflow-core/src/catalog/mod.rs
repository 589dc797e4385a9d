//! Drug catalog: medication records and the question graphs they share.
//!
//! The catalog is read-only configuration, loaded once and shared by every
//! session. Catalogs are JSON documents; a built-in demo catalog ships with
//! the crate and doubles as the format reference.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::{validate_graph, GraphError};
use crate::models::{DrugRecord, QuestionGraph};

/// The built-in demo catalog (GLP-1 and TNF-biologic questionnaires).
const BUILTIN_CATALOG: &str = include_str!("builtin.json");

/// Catalog loading and integrity errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("drug {drug} references unknown question set {question_set}")]
    UnknownQuestionSet { drug: String, question_set: String },

    #[error("drug {0} is declared more than once")]
    DuplicateDrug(String),
}

/// Drug records plus their shared question graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugCatalog {
    drugs: Vec<DrugRecord>,
    question_sets: Vec<QuestionGraph>,
}

impl DrugCatalog {
    /// Build a catalog from parts, validating integrity.
    pub fn new(
        drugs: Vec<DrugRecord>,
        question_sets: Vec<QuestionGraph>,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            drugs,
            question_sets,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: DrugCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_CATALOG).expect("built-in catalog is valid")
    }

    /// Serialize for export or snapshotting.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for drug in &self.drugs {
            if !seen.insert(drug.id.as_str()) {
                return Err(CatalogError::DuplicateDrug(drug.id.clone()));
            }
            if self.graph(&drug.question_set_id).is_none() {
                return Err(CatalogError::UnknownQuestionSet {
                    drug: drug.id.clone(),
                    question_set: drug.question_set_id.clone(),
                });
            }
        }
        for graph in &self.question_sets {
            for warning in validate_graph(graph)? {
                tracing::warn!("{}", warning);
            }
        }
        Ok(())
    }

    /// All drug records, in declaration order.
    pub fn drugs(&self) -> &[DrugRecord] {
        &self.drugs
    }

    /// Look up a drug by catalog id.
    pub fn drug(&self, id: &str) -> Option<&DrugRecord> {
        self.drugs.iter().find(|d| d.id == id)
    }

    /// Look up a question graph by question-set id.
    pub fn graph(&self, id: &str) -> Option<&QuestionGraph> {
        self.question_sets.iter().find(|g| g.id == id)
    }

    /// The question graph governing a drug.
    pub fn graph_for(&self, drug: &DrugRecord) -> Option<&QuestionGraph> {
        self.graph(&drug.question_set_id)
    }
}
