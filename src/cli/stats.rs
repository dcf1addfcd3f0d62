use anyhow::{Context, Result};

use mneme::engine::MemoryEngine;
use mneme::memory::stats::TierBreakdown;

/// Display memory statistics in the terminal.
pub fn stats(engine: &mut MemoryEngine, all: bool) -> Result<()> {
    if all {
        return all_profiles(engine);
    }

    let mem = super::active(engine)?;
    let stats = mem.stats();
    let (short_term, long_term) = mem.breakdown();

    println!("Memory Statistics: {}", stats.profile);
    println!("{}", "=".repeat(40));
    println!("  Directory:           {}", mem.dir().display());
    println!("  Session:             {}", stats.session_id);
    println!("  Short-term:          {}", stats.short_term_count);
    println!("  Long-term:           {}", stats.long_term_count);
    println!("  Total:               {}", stats.total);
    println!();

    print_tier("Short-term", &short_term);
    print_tier("Long-term", &long_term);
    Ok(())
}

fn print_tier(label: &str, tier: &TierBreakdown) {
    println!("{label}:");
    if tier.entries == 0 {
        println!("  (empty)");
        println!();
        return;
    }
    println!("  Mean importance:     {:.2}", tier.mean_importance);
    println!("  Promoted:            {}", tier.promoted);
    println!("  Consolidated:        {}", tier.consolidated);
    println!("  With TTL:            {}", tier.with_ttl);
    for (entry_type, count) in &tier.by_entry_type {
        println!("  {:<20} {}", format!("{entry_type}:"), count);
    }
    for (source, count) in &tier.by_source {
        println!("  {:<20} {}", format!("from {source}:"), count);
    }
    if let Some(oldest) = tier.oldest {
        println!("  Oldest:              {}", oldest.to_rfc3339());
    }
    if let Some(newest) = tier.newest {
        println!("  Newest:              {}", newest.to_rfc3339());
    }
    println!();
}

/// One line per profile directory under the base directory.
fn all_profiles(engine: &mut MemoryEngine) -> Result<()> {
    let base_dir = engine.base_dir().to_path_buf();
    let mut names: Vec<String> = std::fs::read_dir(&base_dir)
        .with_context(|| format!("failed to read {}", base_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();

    println!("{:<24} {:>10} {:>10} {:>8}", "Profile", "Short", "Long", "Total");
    println!("{}", "-".repeat(55));
    for name in names {
        if let Some(stats) = engine.stats(Some(name.as_str())) {
            println!(
                "{:<24} {:>10} {:>10} {:>8}",
                name, stats.short_term_count, stats.long_term_count, stats.total
            );
        }
    }
    Ok(())
}
