//! Multi-profile orchestrator.
//!
//! [`MemoryEngine`] lazily opens one [`ProfileMemory`] per profile, tracks the
//! active profile, flattens recall results, renders them into a bounded prompt
//! block, and announces every mutation through an optional [`Notifier`].
//!
//! Calls made with no explicit profile and no active profile return an empty
//! result (`None`, `false`, `0`, or an empty `Vec`) rather than an error.

pub mod context;
pub mod events;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::config::MnemeConfig;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::memory::{
    slugify, ConsolidationReport, EmotionCue, NewMemory, ProfileMemory, ProfileStats, RecallQuery,
    Source, Summarizer,
};

pub use context::{render_context, RagContext, RecalledMemory};
pub use events::Notifier;

/// Optional fields of a stored conversation turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Defaults to `[retrieval] short_term_importance`.
    pub importance: Option<f64>,
    pub tags: Vec<String>,
    pub emotion: EmotionCue,
    pub user_id: Option<String>,
}

pub struct MemoryEngine {
    config: MnemeConfig,
    base_dir: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    /// Keyed by profile slug so two names that slugify alike share one owner.
    profiles: HashMap<String, ProfileMemory>,
    active: Option<String>,
    notifier: Option<Box<dyn Notifier>>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("base_dir", &self.base_dir)
            .field("profiles", &self.profiles.keys().collect::<Vec<_>>())
            .field("active", &self.active)
            .finish()
    }
}

impl MemoryEngine {
    /// Build an engine with the embedding provider named in `config`.
    pub fn new(config: MnemeConfig) -> Result<Self> {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(&config.embedding)?);
        Ok(Self::with_embedder(config, embedder))
    }

    pub fn with_embedder(config: MnemeConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let base_dir = config.resolved_base_dir();
        tracing::info!(base_dir = %base_dir.display(), "memory engine ready");
        Self {
            config,
            base_dir,
            embedder,
            profiles: HashMap::new(),
            active: None,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    pub fn config(&self) -> &MnemeConfig {
        &self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // ── Profiles ─────────────────────────────────────────────────────────────

    /// Make `name` the active profile, opening it on first use. No-op if already active.
    pub fn switch_profile(&mut self, name: &str) {
        let slug = slugify(name);
        if self.active.as_deref() == Some(slug.as_str()) {
            return;
        }
        self.open_profile(name);
        self.active = Some(slug.clone());
        tracing::info!(profile = name, slug = %slug, "switched memory context");

        if let Some(stats) = self.profiles.get(&slug).map(ProfileMemory::stats) {
            self.emit(events::MEMORY_CONTEXT_SWITCHED, &events::stats_payload(&stats));
        }
    }

    /// Name of the active profile, if any.
    pub fn active_profile(&self) -> Option<&str> {
        self.active
            .as_ref()
            .and_then(|slug| self.profiles.get(slug))
            .map(ProfileMemory::name)
    }

    /// The named profile (opened on demand) or, with `None`, the active one.
    pub fn memory(&mut self, profile: Option<&str>) -> Option<&mut ProfileMemory> {
        let slug = match profile {
            Some(name) => {
                self.open_profile(name);
                slugify(name)
            }
            None => self.active.clone()?,
        };
        self.profiles.get_mut(&slug)
    }

    fn open_profile(&mut self, name: &str) {
        let slug = slugify(name);
        if self.profiles.contains_key(&slug) {
            return;
        }
        let memory = ProfileMemory::open(
            name,
            &self.base_dir,
            self.config.memory.clone(),
            self.config.retention.clone(),
            Arc::clone(&self.embedder),
        );
        self.profiles.insert(slug, memory);
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Store a memory in the named or active profile. `None` if there is no
    /// profile or the write was rejected.
    pub fn store(&mut self, memory: NewMemory, profile: Option<&str>) -> Option<String> {
        let mem = self.memory(profile)?;
        let id = match mem.remember(memory) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(profile = mem.name(), error = %e, "memory rejected");
                return None;
            }
        };
        let stats = mem.stats();
        self.announce(&stats);
        Some(id)
    }

    /// Store directly in long-term with source `system`.
    ///
    /// `importance` defaults to `[retrieval] long_term_importance`.
    pub fn store_long_term(
        &mut self,
        content: &str,
        importance: Option<f64>,
        tags: &[String],
        profile: Option<&str>,
    ) -> Option<String> {
        let memory = NewMemory::new(content)
            .source(Source::System)
            .importance(importance.unwrap_or(self.config.retrieval.long_term_importance))
            .tags(tags.iter().cloned())
            .long_term();
        self.store(memory, profile)
    }

    /// Store both sides of a conversation turn. Returns `(user_id, assistant_id)`.
    pub fn store_conversation(
        &mut self,
        user_message: &str,
        assistant_response: &str,
        options: &TurnOptions,
        profile: Option<&str>,
    ) -> Option<(String, String)> {
        let importance = options
            .importance
            .unwrap_or(self.config.retrieval.short_term_importance);
        let mem = self.memory(profile)?;
        let ids = match mem.remember_conversation(
            user_message,
            assistant_response,
            importance,
            &options.tags,
            options.emotion,
            options.user_id.as_deref(),
        ) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(profile = mem.name(), error = %e, "conversation turn rejected");
                return None;
            }
        };
        let stats = mem.stats();
        self.announce(&stats);
        Some(ids)
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// A recall query carrying the configured `top_k` and `min_similarity`.
    pub fn query(&self, text: &str, top_k: Option<usize>) -> RecallQuery {
        RecallQuery::new(text)
            .top_k(top_k.unwrap_or(self.config.retrieval.top_k))
            .min_similarity(self.config.retrieval.min_similarity)
    }

    /// Recall with configured defaults.
    pub fn recall(&mut self, text: &str, top_k: Option<usize>, profile: Option<&str>) -> Vec<RecalledMemory> {
        let query = self.query(text, top_k);
        self.recall_with(&query, profile)
    }

    /// Recall with a fully specified query.
    pub fn recall_with(&mut self, query: &RecallQuery, profile: Option<&str>) -> Vec<RecalledMemory> {
        match self.memory(profile) {
            Some(mem) => mem
                .recall(query)
                .into_iter()
                .map(RecalledMemory::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Recall and render a bounded prompt-injection block.
    pub fn get_rag_context(
        &mut self,
        text: &str,
        top_k: Option<usize>,
        emotion: EmotionCue,
        profile: Option<&str>,
    ) -> RagContext {
        let query = self.query(text, top_k).emotion(emotion);
        let max_tokens = self.config.retrieval.max_context_tokens;

        let Some(mem) = self.memory(profile) else {
            return RagContext {
                relevant_memories: Vec::new(),
                prompt_injection: context::NO_MEMORIES.to_string(),
                profile: None,
                stats: None,
            };
        };

        let memories: Vec<RecalledMemory> = mem
            .recall(&query)
            .into_iter()
            .map(RecalledMemory::from)
            .collect();
        let prompt_injection = render_context(mem.name(), &memories, max_tokens);

        RagContext {
            relevant_memories: memories,
            prompt_injection,
            profile: Some(mem.name().to_string()),
            stats: Some(mem.stats()),
        }
    }

    pub fn stats(&mut self, profile: Option<&str>) -> Option<ProfileStats> {
        self.memory(profile).map(|mem| mem.stats())
    }

    /// Stats of every profile opened so far, sorted by profile name.
    pub fn all_profile_stats(&self) -> Vec<ProfileStats> {
        let mut all: Vec<ProfileStats> = self.profiles.values().map(ProfileMemory::stats).collect();
        all.sort_by(|a, b| a.profile.cmp(&b.profile));
        all
    }

    // ── Deletes and maintenance ──────────────────────────────────────────────

    pub fn forget(&mut self, id: &str, profile: Option<&str>) -> bool {
        let Some(mem) = self.memory(profile) else {
            return false;
        };
        if !mem.forget(id) {
            return false;
        }
        let stats = mem.stats();
        self.announce(&stats);
        true
    }

    /// Remove everything similar to `topic`.
    ///
    /// `threshold` defaults to `[retrieval] forget_threshold`.
    pub fn forget_about(&mut self, topic: &str, threshold: Option<f64>, profile: Option<&str>) -> usize {
        let threshold = threshold.unwrap_or(self.config.retrieval.forget_threshold);
        let Some(mem) = self.memory(profile) else {
            return 0;
        };
        let removed = mem.forget_about(topic, threshold);
        if removed > 0 {
            let stats = mem.stats();
            self.announce(&stats);
        }
        removed
    }

    pub fn promote(&mut self, id: &str, profile: Option<&str>) -> bool {
        let Some(mem) = self.memory(profile) else {
            return false;
        };
        let promoted = mem.promote(id);
        let stats = mem.stats();
        self.announce(&stats);
        promoted
    }

    pub fn consolidate(
        &mut self,
        summarizer: Option<Summarizer<'_>>,
        profile: Option<&str>,
    ) -> Option<ConsolidationReport> {
        let mem = self.memory(profile)?;
        let report = mem.consolidate(summarizer);
        let stats = mem.stats();
        self.announce(&stats);
        self.emit(
            events::MEMORY_CONSOLIDATED,
            &events::consolidated_payload(&stats.profile, &report),
        );
        Some(report)
    }

    /// Rotate the session id. Returns the new id.
    pub fn new_session(&mut self, profile: Option<&str>) -> Option<String> {
        let mem = self.memory(profile)?;
        let session = mem.new_session();
        let stats = mem.stats();
        self.announce(&stats);
        Some(session)
    }

    /// End the current session by clearing short-term memory. Returns `false`
    /// when there is no profile to act on.
    pub fn end_session(&mut self, profile: Option<&str>) -> bool {
        let Some(mem) = self.memory(profile) else {
            return false;
        };
        mem.clear_short_term();
        let stats = mem.stats();
        self.announce(&stats);
        true
    }

    // ── Notifications ────────────────────────────────────────────────────────

    fn announce(&self, stats: &ProfileStats) {
        self.emit(events::MEMORY_UPDATED, &events::stats_payload(stats));
    }

    fn emit(&self, event: &str, payload: &serde_json::Value) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(event, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(dir: &Path) -> MemoryEngine {
        MemoryEngine::new(MnemeConfig::with_base_dir(dir)).unwrap()
    }

    #[test]
    fn test_no_active_profile_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        assert_eq!(engine.active_profile(), None);
        assert!(engine.store(NewMemory::new("orphan"), None).is_none());
        assert!(engine.recall("orphan", None, None).is_empty());
        assert!(!engine.forget("x", None));
        assert_eq!(engine.forget_about("orphan", None, None), 0);
        assert!(engine.stats(None).is_none());
        assert!(engine.consolidate(None, None).is_none());
        assert!(engine.new_session(None).is_none());
        assert!(!engine.end_session(None));

        let ctx = engine.get_rag_context("anything", None, EmotionCue::default(), None);
        assert!(ctx.relevant_memories.is_empty());
        assert!(ctx.profile.is_none());
        assert_eq!(ctx.prompt_injection, context::NO_MEMORIES);
    }

    #[test]
    fn test_switch_profile_is_lazy_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.switch_profile("Astra");
        engine.switch_profile("Astra");
        assert_eq!(engine.active_profile(), Some("Astra"));
        assert_eq!(engine.all_profile_stats().len(), 1);
        assert!(dir.path().join("astra").is_dir());
    }

    #[test]
    fn test_named_profile_opens_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let id = engine.store(NewMemory::new("side note"), Some("Helper"));
        assert!(id.is_some());
        assert_eq!(engine.active_profile(), None);
        assert_eq!(engine.stats(Some("Helper")).unwrap().total, 1);
    }

    #[test]
    fn test_store_long_term_uses_configured_importance() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.switch_profile("Astra");
        let id = engine.store_long_term("User's name is Sam", None, &[], None).unwrap();
        let mem = engine.memory(None).unwrap();
        let entry = mem.long_term().get(&id).unwrap();
        assert!((entry.metadata.importance.get() - 0.7).abs() < 1e-12);
        assert_eq!(entry.metadata.source, Source::System);
    }
}
