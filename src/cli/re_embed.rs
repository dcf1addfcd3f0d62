//! CLI `re-embed` command: recompute every embedding of a profile.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use mneme::engine::MemoryEngine;

pub fn re_embed(engine: &mut MemoryEngine) -> Result<()> {
    let provider = engine.config().embedding.provider.clone();
    let mem = super::active(engine)?;

    let total = mem.short_term().count() + mem.long_term().count();
    if total == 0 {
        println!("No memories to re-embed.");
        return Ok(());
    }

    println!("Re-embedding {total} memories with provider '{provider}'...");

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let updated = mem.re_embed(|done, _| pb.set_position(done as u64));
    pb.finish_and_clear();

    println!("Re-embedded {updated} memories.");
    Ok(())
}
