//! Maintenance pass: TTL pruning, decay archival, and session summarization.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;

use super::policy;
use super::profile::ProfileMemory;
use super::types::{EntryType, MemoryTier, NewMemory, Source};

/// Short-term must hold at least this many entries before summarization runs.
const MIN_ENTRIES_TO_SUMMARIZE: usize = 5;

/// A session needs at least this many short-term entries to get a summary.
const MIN_SESSION_ENTRIES: usize = 3;

const SUMMARY_IMPORTANCE: f64 = 0.7;
const SUMMARY_PREFIX: &str = "[Session Summary]";

/// Turns a session's texts (oldest first) into one summary sentence.
///
/// An empty result means "nothing worth keeping"; an error is logged and skipped.
pub type Summarizer<'a> = &'a dyn Fn(&[&str]) -> anyhow::Result<String>;

/// What one consolidation pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsolidationReport {
    pub pruned_expired: usize,
    pub archived_decayed: usize,
    pub summaries_created: usize,
}

/// Short-term entries of one session, gathered for summarization.
struct SessionGroup {
    session_id: String,
    texts: Vec<String>,
    tags: BTreeSet<String>,
    valences: Vec<f64>,
    arousals: Vec<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

impl ProfileMemory {
    /// Run the consolidation pipeline.
    ///
    /// 1. Remove TTL-expired entries from both tiers.
    /// 2. With retention enabled, archive long-term entries whose decayed importance
    ///    fell below `ttl_floor`.
    /// 3. With a summarizer and at least five short-term entries, summarize each
    ///    session holding three or more of them into a long-term summary entry.
    ///
    /// Near-duplicate merging is not re-run across the store; it only happens on insert.
    pub fn consolidate(&mut self, summarizer: Option<Summarizer<'_>>) -> ConsolidationReport {
        let now = Utc::now();
        let mut report = ConsolidationReport::default();

        for tier in [MemoryTier::ShortTerm, MemoryTier::LongTerm] {
            let expired: Vec<String> = self
                .store(tier)
                .all_entries()
                .into_iter()
                .filter(|e| policy::is_expired(&e.metadata, now))
                .map(|e| e.id.clone())
                .collect();
            for id in expired {
                if self.store_mut(tier).remove(&id) {
                    report.pruned_expired += 1;
                }
            }
        }

        if self.retention.enabled {
            let floor = self.retention.ttl_floor;
            let half_life = self.retention.decay_rate_days;
            let decayed: Vec<String> = self
                .long_term
                .all_entries()
                .into_iter()
                .filter(|e| {
                    let m = &e.metadata;
                    policy::effective_importance(
                        m.importance.get(),
                        m.created_at,
                        m.access_count,
                        half_life,
                        now,
                    ) < floor
                })
                .map(|e| e.id.clone())
                .collect();
            for id in decayed {
                if self.long_term.remove(&id) {
                    report.archived_decayed += 1;
                }
            }
        }

        if let Some(summarize) = summarizer {
            if self.short_term.count() >= MIN_ENTRIES_TO_SUMMARIZE {
                for group in self.session_groups() {
                    if group.texts.len() < MIN_SESSION_ENTRIES {
                        continue;
                    }
                    if self.summarize_session(summarize, group) {
                        report.summaries_created += 1;
                    }
                }
            }
        }

        tracing::info!(
            profile = %self.name,
            pruned_expired = report.pruned_expired,
            archived_decayed = report.archived_decayed,
            summaries_created = report.summaries_created,
            "consolidation complete"
        );
        report
    }

    /// Short-term entries grouped by session, sessions in order of first appearance.
    fn session_groups(&self) -> Vec<SessionGroup> {
        let mut entries = self.short_term.all_entries();
        entries.sort_by(|a, b| {
            a.metadata
                .created_at
                .cmp(&b.metadata.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut groups: Vec<SessionGroup> = Vec::new();
        for entry in entries {
            let meta = &entry.metadata;
            let idx = match groups.iter().position(|g| g.session_id == meta.session_id) {
                Some(idx) => idx,
                None => {
                    groups.push(SessionGroup {
                        session_id: meta.session_id.clone(),
                        texts: Vec::new(),
                        tags: BTreeSet::new(),
                        valences: Vec::new(),
                        arousals: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            group.texts.push(entry.content.clone());
            group.tags.extend(meta.tags.iter().cloned());
            group.valences.extend(meta.emotion_valence);
            group.arousals.extend(meta.emotion_arousal);
        }
        groups
    }

    /// Summarize one session into long-term. Returns `true` if a summary was stored.
    fn summarize_session(&mut self, summarize: Summarizer<'_>, group: SessionGroup) -> bool {
        let texts: Vec<&str> = group.texts.iter().map(String::as_str).collect();
        let summary = match summarize(&texts) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(profile = %self.name, session = %group.session_id, error = %e, "summarizer failed");
                return false;
            }
        };
        let summary = summary.trim();
        if summary.is_empty() {
            return false;
        }

        let memory = NewMemory::new(format!("{SUMMARY_PREFIX} {summary}"))
            .source(Source::System)
            .importance(SUMMARY_IMPORTANCE)
            .tags(group.tags)
            .long_term()
            .entry_type(EntryType::Summary)
            .session(group.session_id.clone())
            .emotion(mean(&group.valences), mean(&group.arousals));

        match self.remember(memory) {
            Ok(id) => {
                tracing::debug!(profile = %self.name, session = %group.session_id, id = %id, "session summarized");
                true
            }
            Err(e) => {
                tracing::warn!(profile = %self.name, session = %group.session_id, error = %e, "summary rejected");
                false
            }
        }
    }
}
