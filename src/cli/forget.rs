use anyhow::{bail, Result};

use mneme::engine::MemoryEngine;

/// Delete a memory by ID from whichever tier holds it.
pub fn forget(engine: &mut MemoryEngine, id: &str) -> Result<()> {
    if !engine.forget(id, None) {
        bail!("memory not found: {id}");
    }
    println!("Forgot {id}");
    Ok(())
}

/// Delete every memory similar to `topic`.
pub fn forget_about(engine: &mut MemoryEngine, topic: &str, threshold: Option<f64>) -> Result<()> {
    let removed = engine.forget_about(topic, threshold, None);
    println!("Removed {removed} memories about \"{topic}\".");
    Ok(())
}
