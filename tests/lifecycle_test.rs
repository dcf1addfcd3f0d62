mod helpers;

use chrono::{Duration, Utc};
use helpers::{engine_with, test_config, test_engine};
use mneme::memory::{EntryType, MemoryEntry, MemoryMetadata, MemoryTier, NewMemory, Source};

fn aged_entry(id: &str, content: &str, tier: MemoryTier, age_days: i64) -> MemoryEntry {
    let created = Utc::now() - Duration::days(age_days);
    let mut metadata = MemoryMetadata::new(tier, Source::User, 0.5, created);
    metadata.last_accessed = created;
    MemoryEntry {
        id: id.to_string(),
        content: content.to_string(),
        embedding: Vec::new(),
        metadata,
    }
}

#[test]
fn short_term_cap_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.memory.max_short_term = 5;
    let mut engine = engine_with(config, "Astra");

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(engine.store(NewMemory::new(format!("note number {i}")), None).unwrap());
    }

    let mem = engine.memory(None).unwrap();
    assert_eq!(mem.short_term().count(), 5);
    assert_eq!(mem.long_term().count(), 0);
    // The newest entries remain.
    assert!(mem.short_term().contains(&ids[11]));
    assert!(!mem.short_term().contains(&ids[0]));
}

#[test]
fn important_entries_survive_eviction() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.memory.max_short_term = 3;
    let mut engine = engine_with(config, "Astra");

    engine
        .store(NewMemory::new("User's birthday is March 3rd").importance(0.95), None)
        .unwrap();
    for i in 0..5 {
        engine.store(NewMemory::new(format!("filler message {i}")), None).unwrap();
    }

    let mem = engine.memory(None).unwrap();
    assert_eq!(mem.short_term().count(), 3);
    let long_term: Vec<&str> = mem
        .long_term()
        .all_entries()
        .into_iter()
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(long_term, vec!["User's birthday is March 3rd"]);
}

#[test]
fn near_duplicate_facts_merge() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");

    let first = engine
        .store_long_term("User's favourite colour is blue", Some(0.6), &["prefs".to_string()], None)
        .unwrap();
    let second = engine
        .store_long_term("User's favourite colour is blue.", Some(0.6), &["colour".to_string()], None)
        .unwrap();

    assert_eq!(first, second);
    let mem = engine.memory(None).unwrap();
    assert_eq!(mem.long_term().count(), 1);
    let entry = mem.long_term().get(&first).unwrap();
    assert_eq!(entry.metadata.consolidation_count, 1);
    assert!((entry.metadata.importance.get() - 0.7).abs() < 1e-9);
    assert!(entry.metadata.tags.contains("prefs"));
    assert!(entry.metadata.tags.contains("colour"));
}

#[test]
fn consolidation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");
    engine.store_long_term("Favorite programming language is Rust", None, &[], None);
    engine.store(NewMemory::new("User enjoys gardening on weekends"), None);

    let first = engine.consolidate(None, None).unwrap();
    let before = engine.stats(None).unwrap();
    let second = engine.consolidate(None, None).unwrap();
    let after = engine.stats(None).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.pruned_expired + second.archived_decayed + second.summaries_created, 0);
    assert_eq!(before, after);
}

#[test]
fn expired_entries_are_pruned_and_hidden() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");
    let mem = engine.memory(None).unwrap();

    let mut stale = aged_entry("stale", "Went hiking in the Alps", MemoryTier::ShortTerm, 3);
    stale.metadata.ttl_days = Some(1.0);
    let mut fresh = aged_entry("fresh", "Went hiking near the lake", MemoryTier::ShortTerm, 3);
    fresh.metadata.ttl_days = Some(7.0);
    assert!(mem.import_entry(stale).unwrap());
    assert!(mem.import_entry(fresh).unwrap());

    let ids: Vec<String> = engine
        .recall("hiking", None, None)
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["fresh".to_string()]);

    let report = engine.consolidate(None, None).unwrap();
    assert_eq!(report.pruned_expired, 1);
    assert_eq!(engine.stats(None).unwrap().short_term_count, 1);
}

#[test]
fn decayed_entries_are_archived_with_retention() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.retention.enabled = true;
    let mut engine = engine_with(config, "Astra");
    let mem = engine.memory(None).unwrap();

    // Eight half-lives at importance 0.5 decays far below the 0.05 floor.
    assert!(mem
        .import_entry(aged_entry("old", "Went hiking in the Alps", MemoryTier::LongTerm, 240))
        .unwrap());
    assert!(mem
        .import_entry(aged_entry("new", "Sam loves ramen", MemoryTier::LongTerm, 0))
        .unwrap());

    let report = engine.consolidate(None, None).unwrap();
    assert_eq!(report.archived_decayed, 1);
    let mem = engine.memory(None).unwrap();
    assert!(!mem.long_term().contains("old"));
    assert!(mem.long_term().contains("new"));
}

#[test]
fn summarizer_condenses_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");
    for topic in ["hiking", "ramen", "gardening", "chess", "jazz"] {
        engine.store(NewMemory::new(format!("User talked about {topic}")), None);
    }

    let summarize = |texts: &[&str]| -> anyhow::Result<String> {
        Ok(format!("The user discussed {} hobbies", texts.len()))
    };
    let report = engine.consolidate(Some(&summarize), None).unwrap();
    assert_eq!(report.summaries_created, 1);

    let mem = engine.memory(None).unwrap();
    let summaries: Vec<_> = mem
        .long_term()
        .all_entries()
        .into_iter()
        .filter(|e| e.metadata.entry_type == EntryType::Summary)
        .collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].content, "[Session Summary] The user discussed 5 hobbies");
    assert_eq!(summaries[0].metadata.session_id, mem.session_id());
}

#[test]
fn forget_about_removes_matching_memories_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");
    engine.store(NewMemory::new("User said: I love hiking in the Alps"), None);
    engine.store_long_term("Planned a hiking trip for June", None, &[], None);
    let kept = engine.store(NewMemory::new("Bought new headphones"), None).unwrap();

    let removed = engine.forget_about("hiking", Some(0.3), None);
    assert_eq!(removed, 2);

    let stats = engine.stats(None).unwrap();
    assert_eq!(stats.total, 1);
    assert!(engine.memory(None).unwrap().short_term().contains(&kept));
}

#[test]
fn forget_and_end_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = test_engine(dir.path(), "Astra");
    let id = engine.store(NewMemory::new("Sam loves ramen"), None).unwrap();
    let fact = engine.store_long_term("Sam is vegetarian", None, &[], None).unwrap();

    assert!(engine.forget(&id, None));
    assert!(!engine.forget(&id, None));

    engine.store(NewMemory::new("Went hiking near the lake"), None);
    let session = engine.memory(None).unwrap().session_id().to_string();
    assert!(engine.end_session(None));

    let mem = engine.memory(None).unwrap();
    assert_eq!(mem.short_term().count(), 0);
    assert!(mem.long_term().contains(&fact));
    assert_eq!(mem.session_id(), session);

    let rotated = engine.new_session(None).unwrap();
    assert_ne!(rotated, session);
}
