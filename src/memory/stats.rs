use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::profile::ProfileMemory;

/// Counts announced after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub profile: String,
    pub short_term_count: usize,
    pub long_term_count: usize,
    pub total: usize,
    pub session_id: String,
}

/// Detailed per-tier breakdown for operators.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TierBreakdown {
    pub entries: usize,
    pub by_entry_type: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub promoted: usize,
    pub consolidated: usize,
    pub with_ttl: usize,
    pub mean_importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

impl ProfileMemory {
    pub fn stats(&self) -> ProfileStats {
        let short_term_count = self.short_term.count();
        let long_term_count = self.long_term.count();
        ProfileStats {
            profile: self.name.clone(),
            short_term_count,
            long_term_count,
            total: short_term_count + long_term_count,
            session_id: self.session_id.clone(),
        }
    }

    /// Per-tier breakdown: `(short_term, long_term)`.
    pub fn breakdown(&self) -> (TierBreakdown, TierBreakdown) {
        (tier_breakdown(&self.short_term), tier_breakdown(&self.long_term))
    }
}

fn tier_breakdown(store: &crate::store::VectorStore) -> TierBreakdown {
    let mut out = TierBreakdown::default();
    let mut importance_sum = 0.0;

    for entry in store.all_entries() {
        let meta = &entry.metadata;
        out.entries += 1;
        *out.by_entry_type.entry(meta.entry_type.to_string()).or_insert(0) += 1;
        *out.by_source.entry(meta.source.to_string()).or_insert(0) += 1;
        if meta.promoted_at.is_some() {
            out.promoted += 1;
        }
        if meta.consolidation_count > 0 {
            out.consolidated += 1;
        }
        if meta.ttl_days.is_some() {
            out.with_ttl += 1;
        }
        importance_sum += meta.importance.get();
        out.oldest = Some(out.oldest.map_or(meta.created_at, |t| t.min(meta.created_at)));
        out.newest = Some(out.newest.map_or(meta.created_at, |t| t.max(meta.created_at)));
    }

    if out.entries > 0 {
        out.mean_importance = importance_sum / out.entries as f64;
    }
    out
}
