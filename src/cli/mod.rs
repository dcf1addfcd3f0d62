pub mod doctor;
pub mod export;
pub mod forget;
pub mod import;
pub mod inspect;
pub mod maintenance;
pub mod re_embed;
pub mod remember;
pub mod reset;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};

use mneme::engine::MemoryEngine;
use mneme::memory::ProfileMemory;

/// The profile selected on the command line.
fn active(engine: &mut MemoryEngine) -> Result<&mut ProfileMemory> {
    engine.memory(None).context("no active profile")
}

/// First `max_chars` characters of `content`, with an ellipsis if cut.
fn preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
