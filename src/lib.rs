//! Durable, per-profile semantic memory for conversational agents.
//!
//! Mneme stores snippets of interaction as embedded vectors and retrieves the
//! ones most relevant to a new query, so a persona's responses can be grounded
//! in prior context without replaying a full transcript. Each profile owns two
//! tiers:
//!
//! | Tier | Capacity | Written by | Lifecycle |
//! |------|----------|------------|-----------|
//! | **Short-term** | capped (FIFO) | chat turns, observations | evicted oldest-first; important entries promoted first |
//! | **Long-term** | unbounded | promotion, facts, summaries | near-duplicates merged on insert |
//!
//! # Architecture
//!
//! - **Embeddings**: deterministic, model-free random indexing over words and
//!   character n-grams (384 dimensions, SHA-256 feature hashing)
//! - **Storage**: one JSON file per tier under `<base_dir>/<profile-slug>/`,
//!   rewritten atomically after every mutation
//! - **Search**: brute-force cosine similarity, rescaled by importance
//! - **Orchestration**: a multi-profile engine that renders recall results into a
//!   bounded prompt-injection block and announces mutations to a notifier
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`embedding`]: text-to-vector embedding pipeline
//! - [`store`]: file-backed brute-force vector store
//! - [`memory`]: two-tier profile memory with promotion, consolidation, and recall
//! - [`engine`]: multi-profile orchestrator, context rendering, and event intake

pub mod config;
pub mod embedding;
pub mod engine;
pub mod memory;
pub mod store;

pub use config::MnemeConfig;
pub use engine::MemoryEngine;
pub use memory::{NewMemory, ProfileMemory, RecallQuery};
