//! Ranked retrieval across a profile's tiers.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use super::policy;
use super::profile::ProfileMemory;
use super::types::{EmotionCue, EntryType, MemoryEntry, MemoryTier};

/// Parameters of a recall. Build with [`RecallQuery::new`] and the chained setters.
#[derive(Debug, Clone)]
pub struct RecallQuery {
    pub text: String,
    pub top_k: usize,
    pub include_short_term: bool,
    pub include_long_term: bool,
    pub min_similarity: f64,
    /// Keep only entries sharing at least one of these tags. Empty means no filter.
    pub tags: BTreeSet<String>,
    /// Keep only entries of these types. Empty means no filter.
    pub entry_types: HashSet<EntryType>,
    /// Bias ranking toward entries stored in a similar emotional state.
    pub emotion: EmotionCue,
}

impl RecallQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: 5,
            include_short_term: true,
            include_long_term: true,
            min_similarity: 0.1,
            tags: BTreeSet::new(),
            entry_types: HashSet::new(),
            emotion: EmotionCue::default(),
        }
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn tiers(mut self, short_term: bool, long_term: bool) -> Self {
        self.include_short_term = short_term;
        self.include_long_term = long_term;
        self
    }

    pub fn min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry_types(mut self, types: impl IntoIterator<Item = EntryType>) -> Self {
        self.entry_types = types.into_iter().collect();
        self
    }

    pub fn emotion(mut self, cue: EmotionCue) -> Self {
        self.emotion = cue;
        self
    }

    /// Filter applied inside the store scan, before scoring.
    fn admits(&self, entry: &MemoryEntry, now: DateTime<Utc>) -> bool {
        let meta = &entry.metadata;
        if !self.tags.is_empty() && self.tags.is_disjoint(&meta.tags) {
            return false;
        }
        if !self.entry_types.is_empty() && !self.entry_types.contains(&meta.entry_type) {
            return false;
        }
        !policy::is_expired(meta, now)
    }
}

/// One recalled entry with its final ranking score.
#[derive(Debug, Clone)]
pub struct RecallHit {
    pub entry: MemoryEntry,
    /// Tier the entry was found in.
    pub tier: MemoryTier,
    /// Raw cosine similarity to the query.
    pub similarity: f64,
    /// Importance-adjusted ranking score.
    pub score: f64,
}

impl ProfileMemory {
    /// Retrieve the entries most relevant to `query`, best first.
    ///
    /// Every candidate found bumps its `access_count` and `last_accessed`; the bump
    /// is kept in memory and written out with the next mutation of its tier.
    pub fn recall(&mut self, query: &RecallQuery) -> Vec<RecallHit> {
        if query.top_k == 0 {
            return Vec::new();
        }
        let now = Utc::now();
        let query_embedding = self.embedder.embed(&query.text);
        let admits = |entry: &MemoryEntry| query.admits(entry, now);

        let mut hits = Vec::new();
        for (tier, included) in [
            (MemoryTier::ShortTerm, query.include_short_term),
            (MemoryTier::LongTerm, query.include_long_term),
        ] {
            if !included {
                continue;
            }
            let found = self.store(tier).search(
                &query_embedding,
                query.top_k.saturating_mul(2),
                query.min_similarity,
                Some(&admits),
            );
            for hit in found {
                let score = self.rank(&hit.entry, hit.score, &query.emotion, now);
                hits.push(RecallHit {
                    entry: hit.entry,
                    tier,
                    similarity: hit.score,
                    score,
                });
            }
        }

        for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
            let ids: Vec<String> = hits
                .iter()
                .filter(|h| h.tier == tier)
                .map(|h| h.entry.id.clone())
                .collect();
            if !ids.is_empty() {
                self.store_mut(tier).touch(ids.iter().map(String::as_str), now);
            }
        }
        for hit in &mut hits {
            hit.entry.metadata.access_count = hit.entry.metadata.access_count.saturating_add(1);
            hit.entry.metadata.last_accessed = now;
        }

        let mut seen = HashSet::new();
        hits.retain(|h| seen.insert(h.entry.id.clone()));
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entry.id.cmp(&b.entry.id))
        });
        hits.truncate(query.top_k);

        tracing::debug!(profile = %self.name, returned = hits.len(), "recall");
        hits
    }

    /// Final score of one candidate.
    ///
    /// With retention off this is `similarity × (0.5 + 0.5 × importance)`; with it on,
    /// importance is time-decayed and a recency bonus is added. The emotion bonus
    /// applies whenever the query carries a valence.
    fn rank(&self, entry: &MemoryEntry, similarity: f64, cue: &EmotionCue, now: DateTime<Utc>) -> f64 {
        let meta = &entry.metadata;
        let emotion = policy::emotion_bonus(
            self.config.emotion_retrieval_bias,
            cue.valence,
            cue.arousal,
            meta.emotion_valence,
            meta.emotion_arousal,
        );

        if !self.retention.enabled {
            return policy::importance_weighted_score(similarity, meta.importance.get()) + emotion;
        }

        let importance = policy::effective_importance(
            meta.importance.get(),
            meta.created_at,
            meta.access_count,
            self.retention.decay_rate_days,
            now,
        );
        let recency = policy::recency_bonus(self.retention.recency_boost, meta.created_at, now);
        policy::importance_weighted_score(similarity, importance) + recency + emotion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryConfig, RetentionConfig};
    use crate::embedding::hashed::HashedEmbeddingProvider;
    use crate::memory::types::NewMemory;
    use std::sync::Arc;

    fn profile(dir: &std::path::Path, retention: RetentionConfig) -> ProfileMemory {
        ProfileMemory::open(
            "recall",
            dir,
            MemoryConfig::default(),
            retention,
            Arc::new(HashedEmbeddingProvider::default()),
        )
    }

    #[test]
    fn test_recall_orders_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        for text in [
            "User likes dark mode in the editor",
            "User likes dark chocolate",
            "User dislikes light mode",
            "Dark mode is easier on the eyes at night",
        ] {
            p.remember(NewMemory::new(text)).unwrap();
        }

        let hits = p.recall(&RecallQuery::new("dark mode").top_k(2).min_similarity(0.0));
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_zero_top_k_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        p.remember(NewMemory::new("anything at all")).unwrap();
        assert!(p.recall(&RecallQuery::new("anything").top_k(0)).is_empty());
    }

    #[test]
    fn test_importance_scales_score() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        p.remember(NewMemory::new("Meeting about the budget").importance(0.0)).unwrap();

        let hit = &p.recall(&RecallQuery::new("Meeting about the budget"))[0];
        assert!((hit.similarity - 1.0).abs() < 1e-4);
        assert!((hit.score - 0.5 * hit.similarity).abs() < 1e-9);
    }

    #[test]
    fn test_tag_and_type_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        p.remember(NewMemory::new("Coffee order is a flat white").tags(["drinks"])).unwrap();
        p.remember(
            NewMemory::new("Coffee beans come from Ethiopia")
                .entry_type(EntryType::Fact)
                .tags(["origin"]),
        )
        .unwrap();

        let tagged = p.recall(&RecallQuery::new("coffee").min_similarity(0.0).tags(["drinks"]));
        assert_eq!(tagged.len(), 1);
        assert!(tagged[0].entry.content.contains("flat white"));

        let facts = p.recall(
            &RecallQuery::new("coffee")
                .min_similarity(0.0)
                .entry_types([EntryType::Fact]),
        );
        assert_eq!(facts.len(), 1);
        assert!(facts[0].entry.content.contains("Ethiopia"));
    }

    #[test]
    fn test_access_is_tracked_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        let id = p.remember(NewMemory::new("The wifi password is on the fridge")).unwrap();

        let hits = p.recall(&RecallQuery::new("wifi password"));
        assert_eq!(hits[0].entry.metadata.access_count, 1);
        p.recall(&RecallQuery::new("wifi password"));
        assert_eq!(p.short_term().get(&id).unwrap().metadata.access_count, 2);
    }

    #[test]
    fn test_expired_entries_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = profile(dir.path(), RetentionConfig::default());
        let id = p.remember(NewMemory::new("Parking spot is B12").ttl_days(1.0)).unwrap();
        assert_eq!(p.recall(&RecallQuery::new("parking spot")).len(), 1);

        p.short_term
            .update(&id, |e| e.metadata.created_at -= chrono::Duration::days(2))
            .unwrap();
        assert!(p.recall(&RecallQuery::new("parking spot")).is_empty());
    }

    #[test]
    fn test_emotion_cue_breaks_ties() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = ProfileMemory::open(
            "recall",
            dir.path(),
            MemoryConfig {
                emotion_retrieval_bias: 1.0,
                ..MemoryConfig::default()
            },
            RetentionConfig::default(),
            Arc::new(HashedEmbeddingProvider::default()),
        );
        p.remember(NewMemory::new("Went hiking on the ridge trail").emotion(Some(0.9), Some(0.8)))
            .unwrap();
        p.remember(NewMemory::new("Went hiking on the river trail").emotion(Some(-0.9), Some(0.2)))
            .unwrap();

        let happy = p.recall(
            &RecallQuery::new("hiking trail")
                .min_similarity(0.0)
                .emotion(EmotionCue::new(Some(0.9), Some(0.8))),
        );
        assert!(happy[0].entry.content.contains("ridge"));

        let sad = p.recall(
            &RecallQuery::new("hiking trail")
                .min_similarity(0.0)
                .emotion(EmotionCue::new(Some(-0.9), Some(0.2))),
        );
        assert!(sad[0].entry.content.contains("river"));
    }

    #[test]
    fn test_retention_prefers_recent_entries() {
        let dir = tempfile::tempdir().unwrap();
        let retention = RetentionConfig {
            enabled: true,
            ..RetentionConfig::default()
        };
        let mut p = profile(dir.path(), retention);
        let old = p.remember(NewMemory::new("Dentist appointment on Monday")).unwrap();
        p.remember(NewMemory::new("Dentist appointment on Friday")).unwrap();
        p.short_term
            .update(&old, |e| e.metadata.created_at -= chrono::Duration::days(60))
            .unwrap();

        let hits = p.recall(&RecallQuery::new("dentist appointment").min_similarity(0.0));
        assert_eq!(hits.len(), 2);
        assert!(hits[0].entry.content.contains("Friday"));
    }
}
