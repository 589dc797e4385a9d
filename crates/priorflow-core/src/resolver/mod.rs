//! Drug-name resolution.
//!
//! Pipeline: transcription correction → exact match → fuzzy match with
//! asymmetric thresholds → sub-threshold alternatives for disambiguation.

mod corrections;

pub use corrections::default_corrections;

use std::collections::HashMap;

use crate::models::{DrugRecord, DrugResolution, DrugSuggestion};
use crate::similarity::similarity;

/// Thresholds governing fuzzy drug matching.
///
/// Short names tolerate fewer edits before becoming a different entity, so a
/// compared name whose length is close to the query gets a slightly lower
/// bar than one differing by more than `near_length_window` characters. The
/// loose pair only feeds the alternatives list.
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Strict bar for names within the length window
    pub strict_near: f64,
    /// Strict bar for names outside the length window
    pub strict_far: f64,
    /// Loose bar (alternatives) within the window
    pub loose_near: f64,
    /// Loose bar (alternatives) outside the window
    pub loose_far: f64,
    /// Length difference separating "near" from "far" names
    pub near_length_window: usize,
    /// Maximum alternatives returned on a failed resolution
    pub max_alternatives: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strict_near: 0.80,
            strict_far: 0.85,
            loose_near: 0.70,
            loose_far: 0.75,
            near_length_window: 2,
            max_alternatives: 3,
        }
    }
}

/// Resolves free-text medication names against the drug catalog.
pub struct DrugResolver {
    config: ResolverConfig,
    /// Known transcription confusions: heard form -> canonical form
    corrections: HashMap<String, String>,
}

impl Default for DrugResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DrugResolver {
    /// Create a resolver with default thresholds and corrections.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a resolver with custom thresholds.
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            config,
            corrections: default_corrections(),
        }
    }

    /// Register an additional transcription correction.
    pub fn add_correction(&mut self, heard: &str, canonical: &str) {
        self.corrections
            .insert(heard.to_lowercase(), canonical.to_lowercase());
    }

    /// Apply the correction table to a raw transcription.
    pub fn correct(&self, raw: &str) -> String {
        let lower = raw.trim().to_lowercase();
        self.corrections.get(&lower).cloned().unwrap_or(lower)
    }

    /// Resolve a raw name against the catalog.
    ///
    /// Ties at identical similarity break by catalog declaration order; the
    /// first declared drug wins.
    pub fn resolve(&self, raw_name: &str, drugs: &[DrugRecord]) -> DrugResolution {
        let query = self.correct(raw_name);

        // Exact hit on any name form short-circuits at full confidence.
        if let Some(drug) = drugs.iter().find(|d| d.matches_name(&query)) {
            tracing::debug!(query = %query, drug = %drug.id, "exact drug match");
            return DrugResolution::matched(drug.clone(), 1.0);
        }

        let mut resolved: Option<(&DrugRecord, f64)> = None;
        let mut near_misses: Vec<DrugSuggestion> = Vec::new();

        for drug in drugs {
            let scored = self.score_drug(drug, &query);
            if scored.clears_strict {
                let better = resolved
                    .map(|(_, best)| scored.score > best)
                    .unwrap_or(true);
                if better {
                    resolved = Some((drug, scored.score));
                }
            } else if scored.clears_loose {
                near_misses.push(DrugSuggestion {
                    name: drug.name.clone(),
                    confidence: scored.score,
                });
            }
        }

        if let Some((drug, score)) = resolved {
            tracing::debug!(query = %query, drug = %drug.id, score, "fuzzy drug match");
            return DrugResolution::matched(drug.clone(), score);
        }

        near_misses.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        near_misses.truncate(self.config.max_alternatives);
        tracing::debug!(
            query = %query,
            alternatives = near_misses.len(),
            "no drug cleared the strict threshold"
        );
        DrugResolution::unresolved(near_misses)
    }

    /// Best similarity across a drug's name forms, with threshold verdicts.
    fn score_drug(&self, drug: &DrugRecord, query: &str) -> ScoredName {
        let query_len = query.chars().count();
        let mut best = ScoredName::default();

        for field in drug.name_fields() {
            let field_lower = field.to_lowercase();
            let score = similarity(query, &field_lower);
            let far = field_lower.chars().count().abs_diff(query_len) > self.config.near_length_window;
            let (strict_bar, loose_bar) = if far {
                (self.config.strict_far, self.config.loose_far)
            } else {
                (self.config.strict_near, self.config.loose_near)
            };

            if score > best.score {
                best.score = score;
            }
            best.clears_strict |= score >= strict_bar;
            best.clears_loose |= score >= loose_bar;
        }

        best
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ScoredName {
    score: f64,
    clears_strict: bool,
    clears_loose: bool,
}
