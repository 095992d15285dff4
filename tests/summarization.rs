#![cfg(feature = "integration")]

use review_pipelines::error::Result;
use review_pipelines::summarization::{ReviewSummarizerBuilder, T5Size};

#[test]
fn summarize_one_basic() -> Result<()> {
    let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small).build()?;

    let summary = summarizer.summarize_one(&[
        "Audiobook narration was stellar.",
        "The thematic exploration of grief was heartfelt and moving.",
        "Great writing overall, but a few chapters dragged on.",
    ])?;

    assert!(!summary.trim().is_empty());
    assert!(!summary.contains("  "));
    let first = summary.chars().next().expect("non-empty summary");
    assert!(!first.is_lowercase());
    Ok(())
}

#[test]
fn summarize_many_preserves_slots() -> Result<()> {
    let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small)
        .batch_size(2)
        .build()?;

    let groups = vec![
        vec!["Loved the pacing.", "Characters were vivid."],
        vec![],
        vec!["Too long.", "The ending made no sense."],
    ];
    let summaries = summarizer.summarize_many(&groups)?;

    assert_eq!(summaries.len(), 3);
    assert!(!summaries[0].is_empty());
    assert_eq!(summaries[1], "");
    assert!(!summaries[2].is_empty());
    Ok(())
}

#[test]
fn summarize_is_deterministic() -> Result<()> {
    let summarizer = ReviewSummarizerBuilder::t5(T5Size::Small).build()?;
    let reviews = ["A slow start but a wonderful ending."];

    let first = summarizer.summarize_one(&reviews)?;
    let second = summarizer.summarize_one(&reviews)?;

    assert_eq!(first, second);
    Ok(())
}
