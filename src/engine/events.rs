//! Inbound event intake and outbound notifications.
//!
//! Inbound events map 1:1 onto [`MemoryEngine`] operations; outbound
//! notifications announce `{profile, stats}` after every mutation.

use serde::Deserialize;
use serde_json::{json, Value};

use super::MemoryEngine;
use crate::memory::{ConsolidationReport, EntryType, NewMemory, ProfileStats, Source};

// ── Event names ──────────────────────────────────────────────────────────────

pub const PROFILE_SELECTED: &str = "profile_selected";
pub const CHAT_MESSAGE: &str = "chat_message";
pub const MEMORY_COMMAND: &str = "memory_command";

pub const MEMORY_UPDATED: &str = "memory_updated";
pub const MEMORY_CONTEXT_SWITCHED: &str = "memory_context_switched";
pub const MEMORY_CONSOLIDATED: &str = "memory_consolidated";

/// Receiver of outbound notifications. Any `Fn(&str, &Value)` closure qualifies.
pub trait Notifier: Send {
    fn notify(&self, event: &str, payload: &Value);
}

impl<F> Notifier for F
where
    F: Fn(&str, &Value) + Send,
{
    fn notify(&self, event: &str, payload: &Value) {
        self(event, payload)
    }
}

pub(super) fn stats_payload(stats: &ProfileStats) -> Value {
    json!({ "profile": stats.profile, "stats": stats })
}

pub(super) fn consolidated_payload(profile: &str, report: &ConsolidationReport) -> Value {
    json!({ "profile": profile, "result": report })
}

// ── Inbound payloads ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ProfileSelected {
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    emotion_valence: Option<f64>,
    #[serde(default)]
    emotion_arousal: Option<f64>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum MemoryCommand {
    StoreLongTerm {
        #[serde(default)]
        content: String,
        #[serde(default)]
        source: Option<Source>,
        #[serde(default)]
        importance: Option<f64>,
        #[serde(default)]
        tags: Vec<String>,
    },
    Forget {
        #[serde(default)]
        entry_id: String,
    },
    ForgetAbout {
        #[serde(default)]
        topic: String,
        #[serde(default)]
        threshold: Option<f64>,
    },
    EndSession,
    Promote {
        #[serde(default)]
        entry_id: String,
    },
    Consolidate,
    NewSession,
}

impl MemoryEngine {
    /// Dispatch an external trigger. Returns `false` for unknown events and
    /// malformed payloads, which are otherwise ignored.
    pub fn handle_event(&mut self, event: &str, payload: &Value) -> bool {
        match event {
            PROFILE_SELECTED => match parse::<ProfileSelected>(event, payload) {
                Some(ProfileSelected { value: Some(name) }) if !name.is_empty() => {
                    self.switch_profile(&name);
                    true
                }
                _ => false,
            },
            CHAT_MESSAGE => match parse::<ChatMessage>(event, payload) {
                Some(msg) => {
                    self.on_chat_message(msg);
                    true
                }
                None => false,
            },
            MEMORY_COMMAND => match parse::<MemoryCommand>(event, payload) {
                Some(cmd) => {
                    self.on_memory_command(cmd);
                    true
                }
                None => false,
            },
            other => {
                tracing::debug!(event = other, "ignoring unknown event");
                false
            }
        }
    }

    fn on_chat_message(&mut self, msg: ChatMessage) {
        if !self.config.retrieval.auto_store_chat || msg.content.is_empty() {
            return;
        }
        let (source, prefix) = match msg.role.as_deref() {
            Some("user") | None => (Source::User, "User said"),
            Some(_) => (Source::Assistant, "Assistant said"),
        };

        let mut memory = NewMemory::new(format!("{prefix}: {}", msg.content))
            .source(source)
            .importance(
                msg.importance
                    .unwrap_or(self.config.retrieval.short_term_importance),
            )
            .tags(msg.tags)
            .entry_type(EntryType::Conversation)
            .emotion(msg.emotion_valence, msg.emotion_arousal);
        if let Some(user_id) = msg.user_id {
            memory = memory.user(user_id);
        }
        self.store(memory, None);
    }

    fn on_memory_command(&mut self, cmd: MemoryCommand) {
        match cmd {
            MemoryCommand::StoreLongTerm {
                content,
                source,
                importance,
                tags,
            } => {
                if content.is_empty() {
                    tracing::debug!("ignoring store_long_term without content");
                    return;
                }
                let memory = NewMemory::new(content)
                    .source(source.unwrap_or(Source::System))
                    .importance(importance.unwrap_or(self.config.retrieval.long_term_importance))
                    .tags(tags)
                    .long_term();
                self.store(memory, None);
            }
            MemoryCommand::Forget { entry_id } => {
                self.forget(&entry_id, None);
            }
            MemoryCommand::ForgetAbout { topic, threshold } => {
                self.forget_about(&topic, threshold, None);
            }
            MemoryCommand::EndSession => {
                self.end_session(None);
            }
            MemoryCommand::Promote { entry_id } => {
                self.promote(&entry_id, None);
            }
            MemoryCommand::Consolidate => {
                self.consolidate(None, None);
            }
            MemoryCommand::NewSession => {
                self.new_session(None);
            }
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(event: &str, payload: &Value) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::debug!(event, error = %e, "ignoring malformed event payload");
            None
        }
    }
}
