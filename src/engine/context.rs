//! Prompt-injection rendering of recalled memories.
//!
//! Downstream prompt assembly depends on this exact shape: a header naming the
//! profile, numbered `[ST]`/`[LT]` lines, and a closing anti-fabrication line.

use serde::Serialize;

use crate::memory::{MemoryTier, ProfileStats, RecallHit};

/// Rough characters-per-token ratio used for the context budget.
pub const CHARS_PER_TOKEN: usize = 4;

/// Block rendered when nothing relevant was recalled.
pub const NO_MEMORIES: &str = "[Memory Context]\nNo relevant memories found for this conversation.";

const FOOTER: &str = "Use these memories to inform your response where relevant. \
                      Do not fabricate memories that are not listed above.";

/// A recalled memory flattened into plain fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalledMemory {
    pub id: String,
    pub content: String,
    /// Ranking score rounded to 4 decimals.
    pub score: f64,
    pub source: String,
    pub memory_type: MemoryTier,
    pub importance: f64,
    pub tags: Vec<String>,
    pub entry_type: String,
    pub emotion_valence: Option<f64>,
    pub emotion_arousal: Option<f64>,
    pub session_id: String,
}

impl From<RecallHit> for RecalledMemory {
    fn from(hit: RecallHit) -> Self {
        let meta = hit.entry.metadata;
        Self {
            id: hit.entry.id,
            content: hit.entry.content,
            score: (hit.score * 10_000.0).round() / 10_000.0,
            source: meta.source.to_string(),
            memory_type: hit.tier,
            importance: meta.importance.get(),
            tags: meta.tags.into_iter().collect(),
            entry_type: meta.entry_type.to_string(),
            emotion_valence: meta.emotion_valence,
            emotion_arousal: meta.emotion_arousal,
            session_id: meta.session_id,
        }
    }
}

/// Recall results plus their rendered prompt block.
#[derive(Debug, Clone, Serialize)]
pub struct RagContext {
    pub relevant_memories: Vec<RecalledMemory>,
    pub prompt_injection: String,
    /// Profile the memories came from; `None` when no profile was available.
    pub profile: Option<String>,
    pub stats: Option<ProfileStats>,
}

/// Render `memories` for prompt injection within `max_context_tokens`.
///
/// Lines are added in rank order until the next whole line would exceed the
/// character budget. Header counts describe the lines actually emitted.
pub fn render_context(profile: &str, memories: &[RecalledMemory], max_context_tokens: usize) -> String {
    if memories.is_empty() {
        return NO_MEMORIES.to_string();
    }

    let char_limit = max_context_tokens.saturating_mul(CHARS_PER_TOKEN);
    let mut lines = Vec::new();
    let mut used = 0usize;
    let mut short_term = 0usize;
    let mut long_term = 0usize;

    for (i, memory) in memories.iter().enumerate() {
        let line = format!("{}. [{}] {}", i + 1, memory.memory_type.tag(), memory.content);
        let len = line.chars().count();
        if used + len > char_limit {
            break;
        }
        used += len;
        match memory.memory_type {
            MemoryTier::ShortTerm => short_term += 1,
            MemoryTier::LongTerm => long_term += 1,
        }
        lines.push(line);
    }

    let mut out = format!(
        "[Memory Context — Profile: {profile}]\nRetrieved {} relevant memories ({short_term} recent, {long_term} long-term):\n",
        lines.len()
    );
    for line in &lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(FOOTER);
    out
}
