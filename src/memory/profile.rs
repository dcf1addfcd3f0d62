//! Two-tier memory for a single profile.
//!
//! A [`ProfileMemory`] owns a short-term and a long-term [`VectorStore`] under
//! `<base_dir>/<slug>/`. Short-term is a FIFO-capped working set; entries whose
//! importance meets the auto-promote threshold are copied into long-term, where
//! inserts are consolidated against their nearest near-duplicate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::policy;
use super::types::{
    EmotionCue, EntryType, Importance, MemoryEntry, MemoryMetadata, MemoryTier, NewMemory, Source,
    FACT_IMPORTANCE, OBSERVATION_IMPORTANCE,
};
use crate::config::{MemoryConfig, RetentionConfig};
use crate::embedding::EmbeddingProvider;
use crate::store::{StoreError, VectorStore};

/// Number of nearest neighbours considered by `forget_about`.
const FORGET_SEARCH_LIMIT: usize = 100;

/// Memory of one persona: two tiers plus the current session.
pub struct ProfileMemory {
    pub(super) name: String,
    pub(super) slug: String,
    pub(super) dir: PathBuf,
    pub(super) config: MemoryConfig,
    pub(super) retention: RetentionConfig,
    pub(super) embedder: Arc<dyn EmbeddingProvider>,
    pub(super) short_term: VectorStore,
    pub(super) long_term: VectorStore,
    pub(super) session_id: String,
}

impl std::fmt::Debug for ProfileMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileMemory")
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("short_term", &self.short_term.count())
            .field("long_term", &self.long_term.count())
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Directory-safe form of a profile name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into `_`,
/// trims leading and trailing `_`, and falls back to `"default"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        "default".to_string()
    } else {
        slug
    }
}

/// First 12 hex characters of a random UUID.
pub fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

impl ProfileMemory {
    /// Open (or lazily create) the memory of profile `name` under `base_dir`.
    ///
    /// Never fails: an uncreatable directory or unreadable files leave the
    /// profile empty and only in memory until a later write succeeds.
    pub fn open(
        name: &str,
        base_dir: &Path,
        config: MemoryConfig,
        retention: RetentionConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let slug = slugify(name);
        let dir = base_dir.join(&slug);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to create profile directory");
        }

        let short_term = VectorStore::open(dir.join(MemoryTier::ShortTerm.file_name()));
        let long_term = VectorStore::open(dir.join(MemoryTier::LongTerm.file_name()));
        let session_id = new_session_id();

        tracing::info!(
            profile = name,
            slug = %slug,
            short_term = short_term.count(),
            long_term = long_term.count(),
            session = %session_id,
            "profile memory opened"
        );

        Self {
            name: name.to_string(),
            slug,
            dir,
            config,
            retention,
            embedder,
            short_term,
            long_term,
            session_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn short_term(&self) -> &VectorStore {
        &self.short_term
    }

    pub fn long_term(&self) -> &VectorStore {
        &self.long_term
    }

    pub fn store(&self, tier: MemoryTier) -> &VectorStore {
        match tier {
            MemoryTier::ShortTerm => &self.short_term,
            MemoryTier::LongTerm => &self.long_term,
        }
    }

    pub(super) fn store_mut(&mut self, tier: MemoryTier) -> &mut VectorStore {
        match tier {
            MemoryTier::ShortTerm => &mut self.short_term,
            MemoryTier::LongTerm => &mut self.long_term,
        }
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Rotate to a fresh session id and return it.
    pub fn new_session(&mut self) -> String {
        self.session_id = new_session_id();
        tracing::debug!(profile = %self.name, session = %self.session_id, "new session");
        self.session_id.clone()
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Store a new memory and return the id it ended up under.
    ///
    /// Long-term requests go through consolidation, so the returned id may be an
    /// existing entry's. Short-term requests are inserted, the cap is enforced,
    /// and an entry meeting the auto-promote threshold is also copied to long-term.
    pub fn remember(&mut self, memory: NewMemory) -> Result<String, StoreError> {
        let now = Utc::now();
        let embedding = self.embedder.embed(&memory.content);
        let metadata = memory.metadata(&self.session_id, now);

        if memory.tier == MemoryTier::LongTerm {
            return self.add_long_term(memory.content, embedding, metadata, now);
        }

        let importance = metadata.importance.get();
        let id = self.short_term.add(memory.content, embedding, metadata, None)?;
        self.enforce_short_term_cap();

        if importance >= self.config.auto_promote_threshold {
            self.promote(&id);
        }
        Ok(id)
    }

    /// Store both sides of a conversation turn as separate short-term entries.
    ///
    /// Returns `(user_entry_id, assistant_entry_id)`.
    pub fn remember_conversation(
        &mut self,
        user_message: &str,
        assistant_response: &str,
        importance: f64,
        tags: &[String],
        emotion: EmotionCue,
        user_id: Option<&str>,
    ) -> Result<(String, String), StoreError> {
        let mut user_turn = NewMemory::new(format!("User said: {user_message}"))
            .source(Source::User)
            .importance(importance)
            .tags(tags.iter().cloned())
            .entry_type(EntryType::Conversation)
            .emotion_cue(emotion);
        if let Some(user_id) = user_id {
            user_turn = user_turn.user(user_id);
        }
        let user_entry = self.remember(user_turn)?;

        let assistant_turn = NewMemory::new(format!("Assistant said: {assistant_response}"))
            .source(Source::Assistant)
            .importance(importance)
            .tags(tags.iter().cloned())
            .entry_type(EntryType::Conversation)
            .emotion_cue(emotion);
        let assistant_entry = self.remember(assistant_turn)?;

        Ok((user_entry, assistant_entry))
    }

    /// Store an extracted fact (preference, goal, boundary) directly in long-term.
    pub fn remember_fact(
        &mut self,
        content: impl Into<String>,
        importance: Option<f64>,
        tags: &[String],
    ) -> Result<String, StoreError> {
        self.remember(
            NewMemory::new(content)
                .source(Source::System)
                .importance(importance.unwrap_or(FACT_IMPORTANCE))
                .tags(tags.iter().cloned())
                .entry_type(EntryType::Fact)
                .long_term(),
        )
    }

    /// Store an observation (environment change, sensor event) in short-term.
    pub fn remember_observation(
        &mut self,
        content: impl Into<String>,
        importance: Option<f64>,
        tags: &[String],
    ) -> Result<String, StoreError> {
        self.remember(
            NewMemory::new(content)
                .source(Source::Observation)
                .importance(importance.unwrap_or(OBSERVATION_IMPORTANCE))
                .tags(tags.iter().cloned())
                .entry_type(EntryType::Observation),
        )
    }

    /// Copy a short-term entry into long-term. Returns `false` if no such entry.
    ///
    /// The short-term copy stays until it is evicted or forgotten.
    pub fn promote(&mut self, id: &str) -> bool {
        let Some(entry) = self.short_term.get(id) else {
            return false;
        };
        let now = Utc::now();
        let content = entry.content.clone();
        let embedding = entry.embedding.clone();
        let mut metadata = entry.metadata.clone();
        metadata.memory_type = MemoryTier::LongTerm;
        metadata.promoted_at = Some(now);

        match self.add_long_term(content, embedding, metadata, now) {
            Ok(long_term_id) => {
                tracing::debug!(profile = %self.name, id, long_term_id = %long_term_id, "promoted to long-term");
                true
            }
            Err(e) => {
                tracing::warn!(profile = %self.name, id, error = %e, "promotion rejected");
                false
            }
        }
    }

    /// The long-term insert path: merge into the nearest near-duplicate, or insert.
    fn add_long_term(
        &mut self,
        content: String,
        embedding: Vec<f32>,
        metadata: MemoryMetadata,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let nearest = self
            .long_term
            .search(&embedding, 1, self.config.consolidation_threshold, None)
            .into_iter()
            .next();

        let Some(hit) = nearest else {
            return self.long_term.add(content, embedding, metadata, None);
        };

        let existing = hit.entry;
        let merged_content = policy::keep_longer_content(&existing.content, &content);
        let replacement = (merged_content != existing.content)
            .then(|| (merged_content.to_string(), self.embedder.embed(merged_content)));

        let importance = policy::merged_importance(
            existing.metadata.importance.get(),
            metadata.importance.get(),
        );

        self.long_term.update(&existing.id, |entry| {
            let meta = &mut entry.metadata;
            meta.importance = Importance::new(importance);
            meta.consolidated_at = Some(now);
            meta.consolidation_count += 1;
            meta.emotion_valence = policy::merge_emotion(meta.emotion_valence, metadata.emotion_valence);
            meta.emotion_arousal = policy::merge_emotion(meta.emotion_arousal, metadata.emotion_arousal);
            meta.tags.extend(metadata.tags);
            if let Some((content, embedding)) = replacement {
                entry.content = content;
                entry.embedding = embedding;
            }
        })?;

        tracing::debug!(
            profile = %self.name,
            id = %existing.id,
            similarity = hit.score,
            importance,
            "consolidated into existing long-term entry"
        );
        Ok(existing.id)
    }

    /// Evict oldest short-term entries until the cap holds, promoting important ones first.
    fn enforce_short_term_cap(&mut self) {
        let excess = self
            .short_term
            .count()
            .saturating_sub(self.config.max_short_term);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(DateTime<Utc>, String, f64)> = self
            .short_term
            .all_entries()
            .into_iter()
            .map(|e| (e.metadata.created_at, e.id.clone(), e.metadata.importance.get()))
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for (_, id, importance) in by_age.into_iter().take(excess) {
            if importance >= self.config.auto_promote_threshold {
                self.promote(&id);
            }
            self.short_term.remove(&id);
            tracing::debug!(profile = %self.name, id = %id, importance, "evicted from short-term");
        }
    }

    // ── Deletes ──────────────────────────────────────────────────────────────

    /// Remove an entry from whichever tier holds it.
    pub fn forget(&mut self, id: &str) -> bool {
        self.short_term.remove(id) || self.long_term.remove(id)
    }

    /// Remove every entry (up to 100 per tier) whose similarity to `topic` is at
    /// least `threshold`. Returns the number removed.
    pub fn forget_about(&mut self, topic: &str, threshold: f64) -> usize {
        let query = self.embedder.embed(topic);
        let mut removed = 0;
        for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
            let store = self.store_mut(tier);
            let hits = store.search(&query, FORGET_SEARCH_LIMIT, threshold, None);
            for hit in hits {
                if store.remove(&hit.entry.id) {
                    removed += 1;
                }
            }
        }
        tracing::info!(profile = %self.name, topic, removed, "forgot memories about topic");
        removed
    }

    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    /// Clear both tiers. Destructive.
    pub fn clear_all(&mut self) {
        self.short_term.clear();
        self.long_term.clear();
    }

    // ── Maintenance ──────────────────────────────────────────────────────────

    /// Recompute every embedding from its content, one save per tier.
    ///
    /// `progress` is called after each entry with `(done, total)`. Returns the
    /// number of entries updated.
    pub fn re_embed(&mut self, mut progress: impl FnMut(usize, usize)) -> usize {
        let total = self.short_term.count() + self.long_term.count();
        let embedder = Arc::clone(&self.embedder);
        let mut done = 0;
        let mut updated = 0;
        for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
            updated += self.store_mut(tier).replace_embeddings(|entry| {
                done += 1;
                progress(done, total);
                embedder.embed(&entry.content)
            });
        }
        tracing::info!(profile = %self.name, updated, "re-embedded profile");
        updated
    }

    /// Insert an exported entry into the tier its metadata names, keeping its id and
    /// metadata but recomputing the embedding. Returns `Ok(false)` if the id exists.
    pub fn import_entry(&mut self, entry: MemoryEntry) -> Result<bool, StoreError> {
        let tier = entry.metadata.memory_type;
        if self.store(tier).contains(&entry.id) {
            return Ok(false);
        }
        let embedding = self.embedder.embed(&entry.content);
        self.store_mut(tier)
            .add(entry.content, embedding, entry.metadata, Some(entry.id))?;
        if tier == MemoryTier::ShortTerm {
            self.enforce_short_term_cap();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::hashed::HashedEmbeddingProvider;

    fn open_profile(dir: &Path, config: MemoryConfig) -> ProfileMemory {
        ProfileMemory::open(
            "Test Profile",
            dir,
            config,
            RetentionConfig::default(),
            Arc::new(HashedEmbeddingProvider::default()),
        )
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Astra"), "astra");
        assert_eq!(slugify("  Dr. Who?! 2 "), "dr_who_2");
        assert_eq!(slugify("a--b__c"), "a_b_c");
        assert_eq!(slugify("***"), "default");
        assert_eq!(slugify(""), "default");
        assert_eq!(slugify("Ünïcode name"), "n_code_name");
    }

    #[test]
    fn test_session_ids() {
        let a = new_session_id();
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, new_session_id());
    }

    #[test]
    fn test_open_creates_slug_directory() {
        let dir = tempfile::tempdir().unwrap();
        let profile = open_profile(dir.path(), MemoryConfig::default());
        assert_eq!(profile.slug(), "test_profile");
        assert!(dir.path().join("test_profile").is_dir());
    }

    #[test]
    fn test_low_importance_stays_short_term() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let id = profile
            .remember(NewMemory::new("The weather was cloudy today").importance(0.3))
            .unwrap();
        assert!(profile.short_term().contains(&id));
        assert_eq!(profile.long_term().count(), 0);
        let entry = profile.short_term().get(&id).unwrap();
        assert_eq!(entry.metadata.session_id, profile.session_id());
    }

    #[test]
    fn test_high_importance_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let id = profile
            .remember(NewMemory::new("User likes dark mode").importance(0.9))
            .unwrap();
        assert!(profile.short_term().contains(&id));
        assert_eq!(profile.long_term().count(), 1);

        let lt = profile.long_term().all_entries()[0].clone();
        assert_eq!(lt.content, "User likes dark mode");
        assert_eq!(lt.metadata.memory_type, MemoryTier::LongTerm);
        assert!(lt.metadata.promoted_at.is_some());
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            max_short_term: 3,
            ..MemoryConfig::default()
        };
        let mut profile = open_profile(dir.path(), config);
        let topics = ["apples", "bicycles", "clouds", "dolphins", "engines"];
        let ids: Vec<String> = topics
            .iter()
            .map(|t| profile.remember(NewMemory::new(format!("Notes on {t}")).importance(0.2)).unwrap())
            .collect();

        assert_eq!(profile.short_term().count(), 3);
        assert!(!profile.short_term().contains(&ids[0]));
        assert!(!profile.short_term().contains(&ids[1]));
        assert!(profile.short_term().contains(&ids[4]));
        assert_eq!(profile.long_term().count(), 0);
    }

    #[test]
    fn test_eviction_promotes_important_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            max_short_term: 1,
            ..MemoryConfig::default()
        };
        let mut profile = open_profile(dir.path(), config);
        let important = profile
            .remember(NewMemory::new("Birthday is on March third").importance(0.85))
            .unwrap();
        profile
            .remember(NewMemory::new("Completely unrelated note about gardening").importance(0.1))
            .unwrap();

        assert_eq!(profile.short_term().count(), 1);
        assert!(!profile.short_term().contains(&important));
        // promoted on insert, then merged into itself on eviction
        assert_eq!(profile.long_term().count(), 1);
        let lt = profile.long_term().all_entries()[0].clone();
        assert_eq!(lt.content, "Birthday is on March third");
        assert_eq!(lt.metadata.consolidation_count, 1);
    }

    #[test]
    fn test_long_term_near_duplicates_consolidate() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let first = profile
            .remember(NewMemory::new("User likes dark mode").importance(0.5).long_term().tags(["ui"]))
            .unwrap();
        let second = profile
            .remember(
                NewMemory::new("User likes dark mode!!")
                    .importance(0.6)
                    .long_term()
                    .tags(["prefs"]),
            )
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(profile.long_term().count(), 1);
        let merged = profile.long_term().get(&first).unwrap();
        assert_eq!(merged.content, "User likes dark mode!!");
        assert!((merged.metadata.importance.get() - 0.7).abs() < 1e-9);
        assert_eq!(merged.metadata.consolidation_count, 1);
        assert!(merged.metadata.consolidated_at.is_some());
        assert_eq!(merged.metadata.tags.len(), 2);
    }

    #[test]
    fn test_distinct_long_term_entries_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        profile.remember_fact("User's favourite food is ramen", None, &[]).unwrap();
        profile.remember_fact("User works as a marine biologist", None, &[]).unwrap();
        assert_eq!(profile.long_term().count(), 2);
        for entry in profile.long_term().all_entries() {
            assert_eq!(entry.metadata.entry_type, EntryType::Fact);
            assert_eq!(entry.metadata.source, Source::System);
            assert!((entry.metadata.importance.get() - FACT_IMPORTANCE).abs() < 1e-12);
        }
    }

    #[test]
    fn test_remember_conversation_prefixes_roles() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let (u, a) = profile
            .remember_conversation(
                "hi there",
                "hello!",
                0.4,
                &[],
                EmotionCue::new(Some(0.5), None),
                Some("user-1"),
            )
            .unwrap();
        let user = profile.short_term().get(&u).unwrap();
        let assistant = profile.short_term().get(&a).unwrap();
        assert_eq!(user.content, "User said: hi there");
        assert_eq!(user.metadata.user_id.as_deref(), Some("user-1"));
        assert_eq!(assistant.content, "Assistant said: hello!");
        assert_eq!(assistant.metadata.source, Source::Assistant);
        assert_eq!(assistant.metadata.entry_type, EntryType::Conversation);
        assert_eq!(assistant.metadata.emotion_valence, Some(0.5));
    }

    #[test]
    fn test_forget_and_forget_about() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let id = profile.remember_observation("The cat knocked over a vase", None, &[]).unwrap();
        assert!(profile.forget(&id));
        assert!(!profile.forget(&id));

        profile.remember(NewMemory::new("User has a dog named Rex").importance(0.9)).unwrap();
        profile.remember(NewMemory::new("Quarterly tax filing deadline")).unwrap();
        let removed = profile.forget_about("User has a dog named Rex", 0.5);
        // short-term copy plus promoted long-term copy
        assert_eq!(removed, 2);
        assert_eq!(profile.long_term().count(), 0);
        assert_eq!(profile.short_term().count(), 1);
    }

    #[test]
    fn test_import_skips_existing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        let id = profile.remember_fact("Imported fact", None, &[]).unwrap();
        let mut exported = profile.long_term().get(&id).unwrap().clone();

        assert!(!profile.import_entry(exported.clone()).unwrap());

        exported.id = "fresh-id".into();
        exported.embedding = Vec::new();
        assert!(profile.import_entry(exported).unwrap());
        assert_eq!(profile.long_term().count(), 2);
        assert_eq!(
            profile.long_term().get("fresh-id").unwrap().embedding.len(),
            crate::embedding::EMBEDDING_DIM
        );
    }

    #[test]
    fn test_re_embed_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let mut profile = open_profile(dir.path(), MemoryConfig::default());
        profile.remember(NewMemory::new("first note")).unwrap();
        profile.remember_fact("second note is a fact", None, &[]).unwrap();

        let mut calls = Vec::new();
        let updated = profile.re_embed(|done, total| calls.push((done, total)));
        assert_eq!(updated, 2);
        assert_eq!(calls, vec![(1, 2), (2, 2)]);
    }
}
