#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use mneme::config::MnemeConfig;
use mneme::engine::MemoryEngine;
use serde_json::Value;

/// Default config rooted at a temp directory.
pub fn test_config(dir: &Path) -> MnemeConfig {
    MnemeConfig::with_base_dir(dir)
}

/// Engine over `dir` with `profile` active.
pub fn test_engine(dir: &Path, profile: &str) -> MemoryEngine {
    engine_with(test_config(dir), profile)
}

pub fn engine_with(config: MnemeConfig, profile: &str) -> MemoryEngine {
    let mut engine = MemoryEngine::new(config).unwrap();
    engine.switch_profile(profile);
    engine
}

/// Notifications captured by [`recording_engine`].
pub type Recorded = Arc<Mutex<Vec<(String, Value)>>>;

/// Engine whose notifications are appended to the returned log. No profile is active.
pub fn recording_engine(config: MnemeConfig) -> (MemoryEngine, Recorded) {
    let log: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let engine = MemoryEngine::new(config)
        .unwrap()
        .with_notifier(move |event: &str, payload: &Value| {
            sink.lock().unwrap().push((event.to_string(), payload.clone()));
        });
    (engine, log)
}

/// Names of recorded events, in order.
pub fn event_names(log: &Recorded) -> Vec<String> {
    log.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
}
