//! CLI `doctor` command: check a profile's store files and print a report.

use anyhow::Result;

use mneme::engine::MemoryEngine;
use mneme::memory::MemoryTier;
use mneme::store::persist;

pub fn doctor(engine: &mut MemoryEngine) -> Result<()> {
    let config = engine.config().clone();
    let mem = super::active(engine)?;

    println!("Mneme Health Report");
    println!("===================");
    println!();
    println!("Profile:           {} ({})", mem.name(), mem.slug());
    println!("Directory:         {}", mem.dir().display());
    println!("Embedding:         {} ({} dims)", config.embedding.provider, mneme::embedding::EMBEDDING_DIM);
    println!(
        "Retention:         {}",
        if config.retention.enabled { "enabled" } else { "disabled" }
    );
    println!();

    let mut healthy = true;
    for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
        let path = mem.dir().join(tier.file_name());
        let report = persist::health(&path);
        println!("{tier}:");
        println!("  File:            {}", report.path.display());
        if !report.exists {
            println!("  Status:          not created yet");
            println!();
            continue;
        }
        println!("  File size:       {}", super::format_bytes(report.size_bytes));
        println!("  Entries:         {}", report.entries);
        if let Some(ref error) = report.error {
            println!("  Status:          UNREADABLE ({error})");
        } else if report.malformed_embeddings > 0 {
            println!("  Status:          {} malformed embeddings", report.malformed_embeddings);
        } else {
            println!("  Status:          OK");
        }
        healthy &= report.is_ok();
        println!();
    }

    if !healthy {
        println!("Recovery steps:");
        println!("  1. Malformed embeddings: run `mneme re-embed`.");
        println!("  2. Unreadable file: restore it from a backup, or");
        println!("     mneme export > backup.json && mneme reset && mneme import backup.json");
    }

    Ok(())
}
