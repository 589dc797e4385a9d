//! Prompts for semantic answer matching and intake extraction.
//!
//! These prompts are designed for Llama 3.2-1B with JSON grammar constraints.

/// System prompt for clinical answer matching.
pub const MATCH_SYSTEM_PROMPT: &str = r#"You are a clinical intake assistant matching a caller's answer to one of a fixed list of options for a prior-authorization questionnaire.

Rules:
- Only select an option when the answer clearly means it.
- Medical phrasing counts: "severe rheumatoid arthritis" matches the option "Rheumatoid Arthritis".
- If the answer could mean several options, do not pick one; list them all as possible matches.
- If the answer means none of the options, report no match.

Output JSON with "matched" (boolean), "option" (string or null), "confidence" (0 to 1), and "possible_matches" (array of option strings)."#;

/// System prompt for intake-field extraction.
pub const INTAKE_SYSTEM_PROMPT: &str = r#"You are a clinical intake assistant extracting caller details from an utterance.

Extract when present:
- member_name: The member's full name
- date_of_birth: The member's date of birth, as spoken
- drug_name: The medication being requested

Leave any field you are not sure about null. Output JSON with those three keys."#;

/// User prompt for matching one answer against one option list.
pub fn make_match_prompt(question: &str, options: &[String], raw_answer: &str) -> String {
    format!(
        r#"Question asked: "{}"

Options:
{}

Caller's answer: "{}"

Return a JSON object with:
- matched: true only if exactly one option clearly applies
- option: the matching option text, or null
- confidence: 0 to 1
- possible_matches: every option the answer could plausibly mean (empty if none)"#,
        question,
        options
            .iter()
            .map(|o| format!("- {}", o))
            .collect::<Vec<_>>()
            .join("\n"),
        raw_answer
    )
}

/// User prompt for extracting intake fields from an utterance.
pub fn make_intake_prompt(utterance: &str) -> String {
    format!(
        r#"Extract the member's details from this utterance:

"{}"

Return a JSON object with "member_name", "date_of_birth", and "drug_name" (null when absent)."#,
        utterance
    )
}

/// JSON grammar constraint for llama.cpp to ensure valid match output.
pub const MATCH_JSON_GRAMMAR: &str = r#"
root ::= "{" ws
    "\"matched\"" ws ":" ws boolean ws "," ws
    "\"option\"" ws ":" ws (string | "null") ws "," ws
    "\"confidence\"" ws ":" ws number ws "," ws
    "\"possible_matches\"" ws ":" ws strings ws
"}"
strings ::= "[" ws (string (ws "," ws string)*)? ws "]"
boolean ::= "true" | "false"
string ::= "\"" ([^"\\] | "\\" .)* "\""
number ::= "-"? [0-9]+ ("." [0-9]+)?
ws ::= [ \t\n]*
"#;

/// JSON grammar constraint for llama.cpp to ensure valid intake output.
pub const INTAKE_JSON_GRAMMAR: &str = r#"
root ::= "{" ws
    "\"member_name\"" ws ":" ws (string | "null") ws "," ws
    "\"date_of_birth\"" ws ":" ws (string | "null") ws "," ws
    "\"drug_name\"" ws ":" ws (string | "null") ws
"}"
string ::= "\"" ([^"\\] | "\\" .)* "\""
ws ::= [ \t\n]*
"#;

/// Few-shot examples for better matching accuracy.
pub const FEW_SHOT_MATCH_EXAMPLES: &[(&str, &str)] = &[
    (
        "she has severe rheumatoid arthritis in both hands",
        r#"{"matched":true,"option":"Rheumatoid Arthritis","confidence":0.95,"possible_matches":[]}"#,
    ),
    (
        "it's the diabetes",
        r#"{"matched":false,"option":null,"confidence":0.4,"possible_matches":["Type 1 Diabetes","Type 2 Diabetes"]}"#,
    ),
    (
        "she broke her wrist skiing",
        r#"{"matched":false,"option":null,"confidence":0.0,"possible_matches":[]}"#,
    ),
];

/// Build a complete matching prompt with system context and few-shot examples.
pub fn build_match_prompt(
    question: &str,
    options: &[String],
    raw_answer: &str,
    include_examples: bool,
) -> String {
    let mut prompt = String::new();

    // System context
    prompt.push_str("<|system|>\n");
    prompt.push_str(MATCH_SYSTEM_PROMPT);
    prompt.push_str("\n<|end|>\n");

    // Few-shot examples
    if include_examples {
        for (answer, output) in FEW_SHOT_MATCH_EXAMPLES {
            prompt.push_str("<|user|>\n");
            prompt.push_str(&make_match_prompt(question, options, answer));
            prompt.push_str("\n<|end|>\n");
            prompt.push_str("<|assistant|>\n");
            prompt.push_str(output);
            prompt.push_str("\n<|end|>\n");
        }
    }

    // Actual request
    prompt.push_str("<|user|>\n");
    prompt.push_str(&make_match_prompt(question, options, raw_answer));
    prompt.push_str("\n<|end|>\n");
    prompt.push_str("<|assistant|>\n");

    prompt
}

/// Build a complete intake-extraction prompt.
pub fn build_intake_prompt(utterance: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("<|system|>\n");
    prompt.push_str(INTAKE_SYSTEM_PROMPT);
    prompt.push_str("\n<|end|>\n");
    prompt.push_str("<|user|>\n");
    prompt.push_str(&make_intake_prompt(utterance));
    prompt.push_str("\n<|end|>\n");
    prompt.push_str("<|assistant|>\n");
    prompt
}
