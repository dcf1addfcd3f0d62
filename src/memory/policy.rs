//! Scoring and merge heuristics, isolated so they can be swapped without
//! touching the recall or consolidation algorithms.

use chrono::{DateTime, Utc};

use super::types::MemoryMetadata;

/// Importance bump applied when a near-duplicate is merged into an existing entry.
pub const CONSOLIDATION_BOOST: f64 = 0.1;

/// Cap on the importance restored by repeated access.
const MAX_ACCESS_BONUS: f64 = 0.2;
const ACCESS_BONUS_STEP: f64 = 0.02;

/// Arousal assumed for either side of an emotion comparison when it is unknown.
const NEUTRAL_AROUSAL: f64 = 0.5;

// ── Consolidation ────────────────────────────────────────────────────────────

/// Pick the content a merged entry keeps: the longer text, the existing one on a tie.
pub fn keep_longer_content<'a>(existing: &'a str, incoming: &'a str) -> &'a str {
    if incoming.chars().count() > existing.chars().count() {
        incoming
    } else {
        existing
    }
}

/// Importance of a merged entry: `min(1, max(a, b) + 0.1)`.
pub fn merged_importance(existing: f64, incoming: f64) -> f64 {
    (existing.max(incoming) + CONSOLIDATION_BOOST).min(1.0)
}

/// Average two emotion readings; otherwise keep whichever side has one, preferring the incoming.
pub fn merge_emotion(existing: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match (existing, incoming) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (existing, incoming) => incoming.or(existing),
    }
}

// ── Recall scoring ───────────────────────────────────────────────────────────

/// Blend similarity with importance so neither fully dominates.
pub fn importance_weighted_score(similarity: f64, importance: f64) -> f64 {
    similarity * (0.5 + 0.5 * importance)
}

/// Time-decayed importance.
///
/// `half_life_days` halves the base importance per elapsed half-life; each past
/// access restores a little, up to a cap. A non-positive half-life disables decay.
pub fn effective_importance(
    base: f64,
    created_at: DateTime<Utc>,
    access_count: u32,
    half_life_days: f64,
    now: DateTime<Utc>,
) -> f64 {
    let age_days = age_days(created_at, now);
    let decay = if half_life_days <= 0.0 {
        1.0
    } else {
        0.5f64.powf(age_days / half_life_days)
    };
    let access_bonus = (f64::from(access_count) * ACCESS_BONUS_STEP).min(MAX_ACCESS_BONUS);
    (base * decay + access_bonus).min(1.0)
}

/// True iff the entry carries a TTL and is older than it.
pub fn is_expired(meta: &MemoryMetadata, now: DateTime<Utc>) -> bool {
    match meta.ttl_days {
        Some(ttl) => meta.age_days(now) > ttl,
        None => false,
    }
}

/// Extra score for very recent entries, decaying with a one-day time constant.
pub fn recency_bonus(max_boost: f64, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = age_days(created_at, now) * 24.0;
    max_boost * (-age_hours / 24.0).exp()
}

/// Bonus for entries whose stored emotion is close to the query's.
///
/// Zero unless both the cue and the entry carry a valence.
pub fn emotion_bonus(
    bias: f64,
    cue_valence: Option<f64>,
    cue_arousal: Option<f64>,
    entry_valence: Option<f64>,
    entry_arousal: Option<f64>,
) -> f64 {
    let (Some(cue_v), Some(entry_v)) = (cue_valence, entry_valence) else {
        return 0.0;
    };
    let dv = (cue_v - entry_v).abs();
    let da = (cue_arousal.unwrap_or(NEUTRAL_AROUSAL) - entry_arousal.unwrap_or(NEUTRAL_AROUSAL)).abs();
    bias * (1.0 - (dv + da) / 3.0).max(0.0)
}

fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    ((now - created_at).num_milliseconds() as f64 / 86_400_000.0).max(0.0)
}
