use once_cell::sync::Lazy;
use regex::Regex;

// Speaker-style prefix such as "reviewer:" or "dr. smith:".
static LEADING_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z\s'.]{2,20}:\s*").expect("valid label regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([.,!?;:])").expect("valid punctuation regex"));

/// Normalize raw model output into a summary sentence.
///
/// Lowercases and trims, drops a short leading `label:` prefix, collapses
/// whitespace, removes spaces before `.,!?;:` and capitalizes the first
/// character.
///
/// ```
/// use review_pipelines::summarization::clean;
///
/// assert_eq!(clean("DR. SMITH: hello   world ."), "Hello world.");
/// assert_eq!(clean(""), "");
/// ```
pub fn clean(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lowered = text.to_lowercase();
    let text = lowered.trim();
    let text = LEADING_LABEL.replace(text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");

    capitalize_first(&text)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
