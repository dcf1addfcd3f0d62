//! Two-tier profile memory: types, tier policy, recall, and maintenance.

pub mod consolidate;
pub mod policy;
pub mod profile;
pub mod recall;
pub mod stats;
pub mod types;

pub use consolidate::{ConsolidationReport, Summarizer};
pub use profile::{slugify, ProfileMemory};
pub use recall::{RecallHit, RecallQuery};
pub use stats::ProfileStats;
pub use types::{EmotionCue, EntryType, MemoryEntry, MemoryMetadata, MemoryTier, NewMemory, Source};
