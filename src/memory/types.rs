//! Core memory type definitions.
//!
//! Defines [`MemoryTier`] (short-term vs long-term), [`Source`] and [`EntryType`]
//! (provenance and episodic category), [`Importance`] (a clamped score),
//! [`MemoryMetadata`] and [`MemoryEntry`] (a full stored record), and
//! [`NewMemory`] (the write request accepted by a profile).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Importance assigned when a caller gives none, or gives a non-finite value.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// Default importance of an extracted fact.
pub const FACT_IMPORTANCE: f64 = 0.7;

/// Default importance of an observation.
pub const OBSERVATION_IMPORTANCE: f64 = 0.4;

/// The two storage pools of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    /// Bounded working memory: recent turns and observations, FIFO-evicted.
    ShortTerm,
    /// Unbounded durable memory: promoted or explicitly stored entries.
    LongTerm,
}

impl MemoryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::LongTerm => "long_term",
        }
    }

    /// Compact label used in rendered context blocks.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ShortTerm => "ST",
            Self::LongTerm => "LT",
        }
    }

    /// File name of the tier's backing store inside a profile directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term.json",
            Self::LongTerm => "long_term.json",
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short_term" => Ok(Self::ShortTerm),
            "long_term" => Ok(Self::LongTerm),
            _ => Err(format!("unknown memory tier: {s}")),
        }
    }
}

/// Who produced a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[default]
    User,
    Assistant,
    System,
    Observation,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Observation => "observation",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "observation" => Ok(Self::Observation),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

/// Episodic category of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    #[default]
    Event,
    Fact,
    Conversation,
    Observation,
    Summary,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Fact => "fact",
            Self::Conversation => "conversation",
            Self::Observation => "observation",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "event" => Ok(Self::Event),
            "fact" => Ok(Self::Fact),
            "conversation" => Ok(Self::Conversation),
            "observation" => Ok(Self::Observation),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("unknown entry type: {s}")),
        }
    }
}

/// An importance score, always within `[0.0, 1.0]`.
///
/// Every construction path clamps, including deserialization of persisted files.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Importance(f64);

impl Importance {
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 1.0))
        } else {
            Self(DEFAULT_IMPORTANCE)
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Importance {
    fn default() -> Self {
        Self(DEFAULT_IMPORTANCE)
    }
}

impl From<f64> for Importance {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Importance> for f64 {
    fn from(value: Importance) -> Self {
        value.0
    }
}

/// Clamp an emotional valence into `[-1, 1]`, dropping non-finite input.
pub fn clamp_valence(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(-1.0, 1.0))
}

/// Clamp an emotional arousal into `[0, 1]`, dropping non-finite input.
pub fn clamp_arousal(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| v.clamp(0.0, 1.0))
}

/// An emotional state used to tag new memories or bias recall toward similar ones.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EmotionCue {
    pub valence: Option<f64>,
    pub arousal: Option<f64>,
}

impl EmotionCue {
    pub fn new(valence: Option<f64>, arousal: Option<f64>) -> Self {
        Self {
            valence: clamp_valence(valence),
            arousal: clamp_arousal(arousal),
        }
    }
}

/// Structured per-entry metadata persisted alongside content and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Tier this entry was written to.
    pub memory_type: MemoryTier,
    pub source: Source,
    pub importance: Importance,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Number of times this entry has been returned by recall.
    #[serde(default)]
    pub access_count: u32,
    pub last_accessed: DateTime<Utc>,
    /// Set when a short-term entry was copied into long-term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_at: Option<DateTime<Utc>>,
    /// Set when a near-duplicate was merged into this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consolidated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub consolidation_count: u32,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Emotional valence in `[-1, 1]` at storage time.
    #[serde(default)]
    pub emotion_valence: Option<f64>,
    /// Emotional arousal in `[0, 1]` at storage time.
    #[serde(default)]
    pub emotion_arousal: Option<f64>,
    /// Lifetime in days; `None` never expires.
    #[serde(default)]
    pub ttl_days: Option<f64>,
}

impl MemoryMetadata {
    /// Fresh metadata stamped at `now`.
    pub fn new(tier: MemoryTier, source: Source, importance: f64, now: DateTime<Utc>) -> Self {
        Self {
            memory_type: tier,
            source,
            importance: Importance::new(importance),
            tags: BTreeSet::new(),
            created_at: now,
            access_count: 0,
            last_accessed: now,
            promoted_at: None,
            consolidated_at: None,
            consolidation_count: 0,
            session_id: String::new(),
            entry_type: EntryType::default(),
            user_id: None,
            emotion_valence: None,
            emotion_arousal: None,
            ttl_days: None,
        }
    }

    /// Age in fractional days at `now`, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.created_at).num_milliseconds() as f64 / 1000.0;
        (secs / 86_400.0).max(0.0)
    }
}

/// A stored memory: content, its embedding, and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique within the owning store.
    pub id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: MemoryMetadata,
}

/// A write request for [`ProfileMemory::remember`](crate::memory::profile::ProfileMemory::remember).
///
/// Built with [`NewMemory::new`] and the chained setters; unset fields take the
/// documented defaults (source `user`, importance 0.5, short-term, entry type `event`).
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub source: Source,
    pub importance: f64,
    pub tags: BTreeSet<String>,
    pub tier: MemoryTier,
    pub entry_type: EntryType,
    /// Defaults to the profile's current session.
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub emotion_valence: Option<f64>,
    pub emotion_arousal: Option<f64>,
    pub ttl_days: Option<f64>,
}

impl NewMemory {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: Source::User,
            importance: DEFAULT_IMPORTANCE,
            tags: BTreeSet::new(),
            tier: MemoryTier::ShortTerm,
            entry_type: EntryType::Event,
            session_id: None,
            user_id: None,
            emotion_valence: None,
            emotion_arousal: None,
            ttl_days: None,
        }
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance;
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

    pub fn tier(mut self, tier: MemoryTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn long_term(self) -> Self {
        self.tier(MemoryTier::LongTerm)
    }

    pub fn entry_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = entry_type;
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn emotion(mut self, valence: Option<f64>, arousal: Option<f64>) -> Self {
        self.emotion_valence = valence;
        self.emotion_arousal = arousal;
        self
    }

    pub fn emotion_cue(self, cue: EmotionCue) -> Self {
        self.emotion(cue.valence, cue.arousal)
    }

    pub fn ttl_days(mut self, days: f64) -> Self {
        self.ttl_days = Some(days);
        self
    }

    /// Build the metadata this request describes, stamped at `now`.
    pub(crate) fn metadata(&self, session_id: &str, now: DateTime<Utc>) -> MemoryMetadata {
        let mut meta = MemoryMetadata::new(self.tier, self.source, self.importance, now);
        meta.tags = self.tags.clone();
        meta.session_id = self
            .session_id
            .clone()
            .unwrap_or_else(|| session_id.to_string());
        meta.entry_type = self.entry_type;
        meta.user_id = self.user_id.clone().filter(|u| !u.is_empty());
        meta.emotion_valence = clamp_valence(self.emotion_valence);
        meta.emotion_arousal = clamp_arousal(self.emotion_arousal);
        meta.ttl_days = self.ttl_days.filter(|d| d.is_finite());
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn importance_is_clamped() {
        assert_eq!(Importance::new(1.7).get(), 1.0);
        assert_eq!(Importance::new(-0.2).get(), 0.0);
        assert_eq!(Importance::new(f64::NAN).get(), DEFAULT_IMPORTANCE);
        assert_eq!(Importance::new(0.42).get(), 0.42);
    }

    #[test]
    fn importance_clamps_when_deserialized() {
        let imp: Importance = serde_json::from_str("3.5").unwrap();
        assert_eq!(imp.get(), 1.0);
        assert_eq!(serde_json::to_string(&Importance::new(0.25)).unwrap(), "0.25");
    }

    #[test]
    fn tier_round_trips_through_str() {
        for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
            assert_eq!(tier.as_str().parse::<MemoryTier>().unwrap(), tier);
        }
        assert!("mid_term".parse::<MemoryTier>().is_err());
        assert_eq!(MemoryTier::LongTerm.tag(), "LT");
    }

    #[test]
    fn metadata_serializes_snake_case_fields() {
        let now = Utc::now();
        let meta = MemoryMetadata::new(MemoryTier::ShortTerm, Source::Assistant, 0.3, now);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["memory_type"], "short_term");
        assert_eq!(json["source"], "assistant");
        assert_eq!(json["entry_type"], "event");
        assert!(json.get("promoted_at").is_none());
    }

    #[test]
    fn new_memory_builds_clamped_metadata() {
        let now = Utc::now();
        let meta = NewMemory::new("x")
            .importance(2.0)
            .emotion(Some(-4.0), Some(0.5))
            .tags(["b", "a", "a"])
            .metadata("sess01", now);
        assert_eq!(meta.importance.get(), 1.0);
        assert_eq!(meta.emotion_valence, Some(-1.0));
        assert_eq!(meta.emotion_arousal, Some(0.5));
        assert_eq!(meta.tags.len(), 2);
        assert_eq!(meta.session_id, "sess01");
    }

    #[test]
    fn age_is_never_negative() {
        let now = Utc::now();
        let meta = MemoryMetadata::new(MemoryTier::LongTerm, Source::System, 0.5, now);
        assert_eq!(meta.age_days(now - chrono::Duration::days(1)), 0.0);
        let later = now + chrono::Duration::hours(36);
        assert!((meta.age_days(later) - 1.5).abs() < 1e-9);
    }
}
