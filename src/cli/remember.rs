use anyhow::{anyhow, bail, Result};

use mneme::engine::MemoryEngine;
use mneme::memory::{EntryType, NewMemory, Source};

pub struct RememberArgs {
    pub content: String,
    pub importance: Option<f64>,
    pub long_term: bool,
    pub tags: Vec<String>,
    pub entry_type: Option<String>,
    pub source: Option<String>,
    pub ttl_days: Option<f64>,
}

/// Store a memory in the selected profile and print where it landed.
pub fn remember(engine: &mut MemoryEngine, args: RememberArgs) -> Result<()> {
    if args.content.trim().is_empty() {
        bail!("refusing to store empty content");
    }

    let retrieval = &engine.config().retrieval;
    let default_importance = if args.long_term {
        retrieval.long_term_importance
    } else {
        retrieval.short_term_importance
    };

    let mut memory = NewMemory::new(args.content)
        .importance(args.importance.unwrap_or(default_importance))
        .tags(args.tags);
    if args.long_term {
        memory = memory.long_term();
    }
    if let Some(entry_type) = args.entry_type {
        memory = memory.entry_type(entry_type.parse::<EntryType>().map_err(|e| anyhow!(e))?);
    }
    if let Some(source) = args.source {
        memory = memory.source(source.parse::<Source>().map_err(|e| anyhow!(e))?);
    }
    if let Some(days) = args.ttl_days {
        memory = memory.ttl_days(days);
    }

    let id = engine
        .store(memory, None)
        .ok_or_else(|| anyhow!("memory was not stored"))?;
    let stats = engine.stats(None).ok_or_else(|| anyhow!("no active profile"))?;

    println!("Stored {id}");
    println!(
        "  {}: {} short-term, {} long-term",
        stats.profile, stats.short_term_count, stats.long_term_count
    );
    Ok(())
}
