//! Yes/no answer interpretation.

/// Affirmative synonym set.
const YES_WORDS: [&str; 9] = [
    "yes", "y", "yeah", "yep", "sure", "okay", "correct", "right", "true",
];

/// Negative synonym set.
const NO_WORDS: [&str; 8] = [
    "no", "n", "nope", "nah", "negative", "false", "incorrect", "wrong",
];

/// Interpreted polarity of a trimmed, lowercased answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Polarity {
    Yes,
    No,
    /// Tokens from both families; must be clarified, never guessed
    Conflict,
    Unknown,
}

/// Detect polarity: exact synonym membership first, then token containment.
///
/// Single-character synonyms ("y", "n") only count as exact matches: as
/// containment tokens they would fire on nearly any sentence.
pub(crate) fn detect(lowered: &str) -> Polarity {
    if YES_WORDS.contains(&lowered) {
        return Polarity::Yes;
    }
    if NO_WORDS.contains(&lowered) {
        return Polarity::No;
    }

    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let yes_hit = YES_WORDS
        .iter()
        .any(|w| w.len() > 1 && tokens.contains(w));
    let no_hit = NO_WORDS
        .iter()
        .any(|w| w.len() > 1 && tokens.contains(w));

    match (yes_hit, no_hit) {
        (true, true) => Polarity::Conflict,
        (true, false) => Polarity::Yes,
        (false, true) => Polarity::No,
        (false, false) => Polarity::Unknown,
    }
}
