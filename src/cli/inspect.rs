//! CLI `inspect` command: display full details for a single memory.

use anyhow::{bail, Result};

use mneme::engine::MemoryEngine;
use mneme::memory::MemoryTier;

/// Inspect a single memory by ID and display full details.
pub fn inspect(engine: &mut MemoryEngine, id: &str) -> Result<()> {
    let mem = super::active(engine)?;
    let found = [MemoryTier::ShortTerm, MemoryTier::LongTerm]
        .into_iter()
        .find_map(|tier| mem.store(tier).get(id).map(|entry| (tier, entry)));

    let Some((tier, entry)) = found else {
        bail!("memory not found: {id}");
    };

    let m = &entry.metadata;
    println!("Memory: {}", entry.id);
    println!("{}", "=".repeat(50));
    println!("  Tier:           {tier}");
    println!("  Entry type:     {}", m.entry_type);
    println!("  Source:         {}", m.source);
    println!("  Importance:     {:.2}", m.importance.get());
    println!("  Access count:   {}", m.access_count);
    println!("  Last accessed:  {}", m.last_accessed.to_rfc3339());
    println!("  Created:        {}", m.created_at.to_rfc3339());
    println!("  Session:        {}", m.session_id);
    if let Some(promoted) = m.promoted_at {
        println!("  Promoted:       {}", promoted.to_rfc3339());
    }
    if let Some(consolidated) = m.consolidated_at {
        println!(
            "  Consolidated:   {} ({} merges)",
            consolidated.to_rfc3339(),
            m.consolidation_count
        );
    }
    if let Some(ref user) = m.user_id {
        println!("  User:           {user}");
    }
    if m.emotion_valence.is_some() || m.emotion_arousal.is_some() {
        println!(
            "  Emotion:        valence {:?}, arousal {:?}",
            m.emotion_valence, m.emotion_arousal
        );
    }
    if let Some(ttl) = m.ttl_days {
        println!("  TTL:            {ttl} days");
    }
    if !m.tags.is_empty() {
        let tags: Vec<&str> = m.tags.iter().map(String::as_str).collect();
        println!("  Tags:           {}", tags.join(", "));
    }
    println!();
    println!("Content:");
    println!("  {}", entry.content);

    Ok(())
}
