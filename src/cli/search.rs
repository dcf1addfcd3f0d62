use anyhow::{anyhow, Result};

use mneme::engine::MemoryEngine;
use mneme::memory::{EmotionCue, EntryType};

/// Run a recall from the terminal. `tiers` is `(short_term, long_term)`.
pub fn search(
    engine: &mut MemoryEngine,
    query: &str,
    top_k: Option<usize>,
    tags: &[String],
    entry_types: &[String],
    tiers: (bool, bool),
) -> Result<()> {
    let entry_types = entry_types
        .iter()
        .map(|t| t.parse::<EntryType>().map_err(|e| anyhow!(e)))
        .collect::<Result<Vec<_>>>()?;

    let recall = engine
        .query(query, top_k)
        .tags(tags.iter().cloned())
        .entry_types(entry_types)
        .tiers(tiers.0, tiers.1);
    let results = engine.recall_with(&recall, None);

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} ({}, importance: {:.2}, score: {:.4})",
            i + 1,
            result.memory_type.tag(),
            result.id,
            result.entry_type,
            result.importance,
            result.score,
        );
        println!("     {}", super::preview(&result.content, 120));
        if !result.tags.is_empty() {
            println!("     tags: {}", result.tags.join(", "));
        }
        println!();
    }

    Ok(())
}

/// Print the prompt-injection block a caller would receive for `query`.
pub fn context(engine: &mut MemoryEngine, query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let ctx = engine.get_rag_context(query, top_k, EmotionCue::default(), None);
    if json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
    } else {
        println!("{}", ctx.prompt_injection);
    }
    Ok(())
}
