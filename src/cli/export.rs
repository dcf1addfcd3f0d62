use anyhow::Result;
use serde::{Deserialize, Serialize};

use mneme::engine::MemoryEngine;
use mneme::memory::{MemoryEntry, MemoryMetadata, MemoryTier};

/// Export format. Embeddings are left out and recomputed on import.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub profile: String,
    pub memories: Vec<ExportedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedEntry {
    pub id: String,
    pub content: String,
    pub metadata: MemoryMetadata,
}

impl From<&MemoryEntry> for ExportedEntry {
    fn from(entry: &MemoryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            content: entry.content.clone(),
            metadata: entry.metadata.clone(),
        }
    }
}

/// Export both tiers of the selected profile as JSON to stdout.
pub fn export(engine: &mut MemoryEngine) -> Result<()> {
    let mem: &_ = super::active(engine)?;

    let mut memories: Vec<ExportedEntry> = [MemoryTier::ShortTerm, MemoryTier::LongTerm]
        .into_iter()
        .flat_map(|tier| mem.store(tier).all_entries())
        .map(ExportedEntry::from)
        .collect();
    memories.sort_by(|a, b| {
        a.metadata
            .created_at
            .cmp(&b.metadata.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let data = ExportData {
        profile: mem.name().to_string(),
        memories,
    };

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!("Exported {} memories from '{}'.", data.memories.len(), data.profile);
    Ok(())
}
