use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MnemeConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub memory: MemoryConfig,
    pub retention: RetentionConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory holding one sub-directory per profile slug.
    pub base_dir: String,
    /// Profile the CLI operates on when `--profile` is not given.
    pub default_profile: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    /// Maximum number of cached feature vectors before the cache is cleared.
    pub cache_capacity: usize,
}

/// Tier policy for a single profile.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_short_term: usize,
    pub auto_promote_threshold: f64,
    pub consolidation_threshold: f64,
    pub emotion_retrieval_bias: f64,
}

/// Time-based importance decay, recency weighting and decayed-entry archival.
///
/// Disabled by default: recall then ranks by `similarity × (0.5 + 0.5 × importance)` only.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    /// Importance half-life in days. Non-positive disables decay.
    pub decay_rate_days: f64,
    /// Long-term entries whose effective importance drops below this are archived.
    pub ttl_floor: f64,
    /// Maximum score bonus for very recent memories.
    pub recency_boost: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_similarity: f64,
    pub max_context_tokens: usize,
    pub auto_store_chat: bool,
    pub short_term_importance: f64,
    pub long_term_importance: f64,
    pub forget_threshold: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base_dir = default_mneme_dir()
            .join("memory_data")
            .to_string_lossy()
            .into_owned();
        Self {
            base_dir,
            default_profile: "default".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashed".into(),
            cache_capacity: 10_000,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_short_term: 50,
            auto_promote_threshold: 0.8,
            consolidation_threshold: 0.85,
            emotion_retrieval_bias: 0.1,
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            decay_rate_days: 30.0,
            ttl_floor: 0.05,
            recency_boost: 0.15,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 7,
            min_similarity: 0.1,
            max_context_tokens: 2000,
            auto_store_chat: true,
            short_term_importance: 0.4,
            long_term_importance: 0.7,
            forget_threshold: 0.5,
        }
    }
}

/// Returns `~/.mneme/`, or `./.mneme` when no home directory can be resolved.
pub fn default_mneme_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mneme")
}

/// Returns the default config file path: `~/.mneme/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mneme_dir().join("config.toml")
}

impl MnemeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MnemeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (MNEME_DIR, MNEME_PROFILE, MNEME_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MNEME_DIR") {
            self.storage.base_dir = val;
        }
        if let Ok(val) = std::env::var("MNEME_PROFILE") {
            self.storage.default_profile = val;
        }
        if let Ok(val) = std::env::var("MNEME_LOG_LEVEL") {
            self.logging.log_level = val;
        }
    }

    /// Resolve the memory root directory, expanding `~` if needed.
    pub fn resolved_base_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.base_dir)
    }

    /// A default config rooted at `base_dir`, for tests and embedding callers.
    pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
        let mut config = Self::default();
        config.storage.base_dir = base_dir.as_ref().to_string_lossy().into_owned();
        config
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
