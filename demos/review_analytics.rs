use review_pipelines::error::Result;
use review_pipelines::sentiment::{mean_score, SentimentScorerBuilder};
use review_pipelines::settings::Settings;
use review_pipelines::store::{document, Collections, DocumentStore, MemoryStore};
use review_pipelines::summarization::ReviewSummarizerBuilder;
use serde_json::json;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const REVIEWS: [&str; 5] = [
    "Loved the pacing and the character development. The ending was satisfying and tied up all major plot threads in a way that felt earned. I especially appreciated how the author handled the antagonist's arc, giving them depth rather than making them a one-dimensional villain.",
    "Great writing overall, but a few chapters dragged on with overly descriptive passages. While I enjoy detailed world-building, there were moments where the story's momentum slowed. Still, the author's command of dialogue kept me invested, and the relationships between characters were engaging and believable.",
    "Overhyped for me. Some plot holes in the central mystery left me unconvinced, and the prose felt uneven at times, beautiful in certain chapters but rushed and clumsy in others. I also felt the subplot involving the sidekick was left unresolved, which was disappointing.",
    "Audiobook narration was stellar; the narrator brought each character to life with distinct voices and subtle emotional inflections. This made the slower sections much easier to get through. I would recommend the audiobook format for anyone considering reading this title, as it elevates the experience.",
    "The thematic exploration of grief and recovery was heartfelt and moving, though occasionally heavy-handed. There were a few passages that felt more like lectures than natural parts of the story. That said, the emotional core of the book resonated with me, and I found myself thinking about certain scenes long after finishing.",
];

fn main() -> Result<()> {
    let settings = Settings::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    let store = MemoryStore::new(Collections::from_settings(&settings.mongo));
    let docs = REVIEWS
        .iter()
        .map(|text| document(json!({ "parent_asin": "B000DEMO", "text": text })))
        .collect::<Result<Vec<_>>>()?;
    store.insert_many("reviews_clean", docs)?;

    println!("Building pipelines...");
    let scorer = SentimentScorerBuilder::from_settings(&settings.sentiment).build()?;
    let summarizer = ReviewSummarizerBuilder::from_settings(&settings.summarizer).build()?;

    let reviews: Vec<String> = store
        .find("reviews_clean", &document(json!({ "parent_asin": "B000DEMO" }))?, None)?
        .into_iter()
        .filter_map(|doc| doc.get("text").and_then(|t| t.as_str()).map(String::from))
        .collect();

    let start = Instant::now();
    let scores = scorer.score(reviews.iter().map(String::as_str))?;
    println!("\n=== Sentiment ===");
    for (review, score) in reviews.iter().zip(&scores) {
        let preview: String = review.chars().take(48).collect();
        match score.probability() {
            Some(p) => println!("  {:.3}  {preview}...", p.value()),
            None => println!("  -----  {preview}..."),
        }
    }
    if let Some(mean) = mean_score(&scores) {
        println!("Mean positivity: {:.3}", mean.value());
    }
    println!("Scored in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    let start = Instant::now();
    let summary = summarizer.summarize_one(&reviews)?;
    println!("\n=== Summary ===");
    println!("{summary}");
    println!("Summarized in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    store.insert_one(
        "summarized_reviews",
        document(json!({
            "parent_asin": "B000DEMO",
            "summary": summary,
            "mean_sentiment": mean_score(&scores).map(|p| p.value()),
        }))?,
    )?;

    Ok(())
}
