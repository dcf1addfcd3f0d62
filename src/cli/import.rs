use anyhow::{Context, Result};
use std::path::Path;

use mneme::engine::MemoryEngine;
use mneme::memory::MemoryEntry;

use super::export::ExportData;

/// Import memories from an export file into the selected profile.
///
/// Each entry keeps its id and metadata and is re-embedded. Ids already present
/// are skipped.
pub fn import(engine: &mut MemoryEngine, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let data: ExportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let mem = super::active(engine)?;
    println!(
        "Importing {} memories from '{}' into '{}'...",
        data.memories.len(),
        data.profile,
        mem.name()
    );

    let mut imported = 0u64;
    let mut skipped = 0u64;
    for exported in data.memories {
        let entry = MemoryEntry {
            id: exported.id,
            content: exported.content,
            embedding: Vec::new(),
            metadata: exported.metadata,
        };
        let id = entry.id.clone();
        match mem.import_entry(entry) {
            Ok(true) => imported += 1,
            Ok(false) => skipped += 1,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "skipping entry");
                skipped += 1;
            }
        }
    }

    println!("Import complete: {imported} imported, {skipped} skipped.");
    Ok(())
}
