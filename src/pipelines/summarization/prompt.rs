/// Task marker every summarization prompt starts with.
pub const TASK_PREFIX: &str = "summarize: ";

/// Default cap on prompt words; roughly 512 T5 tokens.
pub const DEFAULT_WORD_LIMIT: usize = 250;

/// Build a summarization prompt from a group of reviews.
///
/// Reviews are trimmed, blank ones dropped, and the rest joined with single
/// spaces in input order. When the result has more than `word_limit` words
/// only the first `word_limit` are kept.
///
/// ```
/// use review_pipelines::summarization::prepare;
///
/// assert_eq!(prepare(&["  a b c ", "", "d e"], 2), "summarize: a b");
/// ```
pub fn prepare<S: AsRef<str>>(reviews: &[S], word_limit: usize) -> String {
    let text = reviews
        .iter()
        .map(|r| r.as_ref().trim())
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > word_limit {
        return format!("{TASK_PREFIX}{}", words[..word_limit].join(" "));
    }
    format!("{TASK_PREFIX}{text}")
}
