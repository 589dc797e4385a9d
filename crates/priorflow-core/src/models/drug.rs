//! Drug catalog records and resolution results.

use serde::{Deserialize, Serialize};

/// A medication in the prior-authorization catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugRecord {
    /// Unique identifier
    pub id: String,
    /// Brand name (e.g., "Ozempic")
    pub name: String,
    /// Generic/INN name (e.g., "semaglutide")
    pub generic_name: String,
    /// Other names an operator might use (spoken variants, street spellings)
    #[serde(default)]
    pub common_names: Vec<String>,
    /// Question set that governs this drug's clinical questionnaire
    pub question_set_id: String,
}

impl DrugRecord {
    /// Create a record with required fields.
    pub fn new(id: String, name: String, generic_name: String, question_set_id: String) -> Self {
        Self {
            id,
            name,
            generic_name,
            common_names: Vec::new(),
            question_set_id,
        }
    }

    /// Case-insensitive equality against any of this drug's names.
    pub fn matches_name(&self, query_lower: &str) -> bool {
        self.name.to_lowercase() == query_lower
            || self.generic_name.to_lowercase() == query_lower
            || self
                .common_names
                .iter()
                .any(|n| n.to_lowercase() == query_lower)
    }

    /// All name strings of this record, brand name first.
    pub fn name_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str())
            .chain(std::iter::once(self.generic_name.as_str()))
            .chain(self.common_names.iter().map(|s| s.as_str()))
    }
}

/// A near-miss candidate offered for "did you mean" disambiguation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugSuggestion {
    pub name: String,
    /// Similarity score (0.0 - 1.0)
    pub confidence: f64,
}

/// Outcome of resolving a free-text medication name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugResolution {
    /// The resolved record, if one cleared the strict threshold
    pub drug: Option<DrugRecord>,
    /// Confidence of the resolved match (1.0 for exact hits)
    pub confidence: f64,
    /// Sub-threshold candidates for disambiguation prompts
    pub alternatives: Vec<DrugSuggestion>,
}

impl DrugResolution {
    /// A confident resolution with no alternatives.
    pub fn matched(drug: DrugRecord, confidence: f64) -> Self {
        Self {
            drug: Some(drug),
            confidence,
            alternatives: Vec::new(),
        }
    }

    /// No match; carry the best near-misses for the caller's prompt.
    pub fn unresolved(alternatives: Vec<DrugSuggestion>) -> Self {
        Self {
            drug: None,
            confidence: 0.0,
            alternatives,
        }
    }
}
