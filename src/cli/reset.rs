//! CLI `reset` command: delete every memory of a profile after confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use mneme::engine::MemoryEngine;

pub fn reset(engine: &mut MemoryEngine) -> Result<()> {
    let mem = super::active(engine)?;

    println!(
        "WARNING: This will permanently delete ALL short-term and long-term memories of '{}'.",
        mem.name()
    );
    println!("Directory: {}", mem.dir().display());
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("reset cancelled");
    }

    mem.clear_all();
    println!("All memories deleted. Profile reset complete.");
    Ok(())
}
