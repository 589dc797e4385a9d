//! Multiple-choice matching helpers: exact, containment, similarity.

use crate::models::RankedOption;
use crate::similarity::similarity;

/// Case-insensitive exact match against the option list.
pub(crate) fn exact<'a>(options: &'a [String], lowered: &str) -> Option<&'a String> {
    options.iter().find(|o| o.to_lowercase() == lowered)
}

/// Map a candidate string back to the node's canonical option casing.
pub(crate) fn canonical<'a>(options: &'a [String], candidate: &str) -> Option<&'a String> {
    let lowered = candidate.trim().to_lowercase();
    options.iter().find(|o| o.to_lowercase() == lowered)
}

/// Options related to the answer by containment, in either direction.
pub(crate) fn containment(options: &[String], lowered: &str) -> Vec<RankedOption> {
    options
        .iter()
        .filter(|o| {
            let option_lower = o.to_lowercase();
            option_lower.contains(lowered) || lowered.contains(&option_lower)
        })
        .map(|o| RankedOption {
            option: o.clone(),
            confidence: similarity(lowered, &o.to_lowercase()),
        })
        .collect()
}

/// Options clearing the similarity threshold, best first.
pub(crate) fn fuzzy(options: &[String], lowered: &str, accept: f64) -> Vec<RankedOption> {
    let mut scored: Vec<RankedOption> = options
        .iter()
        .map(|o| RankedOption {
            option: o.clone(),
            confidence: similarity(lowered, &o.to_lowercase()),
        })
        .filter(|c| c.confidence >= accept)
        .collect();
    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}
