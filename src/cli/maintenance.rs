//! CLI `consolidate` command.

use anyhow::{anyhow, Result};

use mneme::engine::MemoryEngine;

/// Prune TTL-expired entries and, with retention enabled, archive decayed ones.
///
/// Session summarization needs a language model and is left to library callers.
pub fn consolidate(engine: &mut MemoryEngine) -> Result<()> {
    let retention_enabled = engine.config().retention.enabled;
    let report = engine
        .consolidate(None, None)
        .ok_or_else(|| anyhow!("no active profile"))?;

    println!("Consolidation complete:");
    println!("  Expired entries pruned:  {}", report.pruned_expired);
    if retention_enabled {
        println!("  Decayed entries archived: {}", report.archived_decayed);
    } else {
        println!("  Decay archival:          skipped (retention disabled)");
    }
    Ok(())
}
