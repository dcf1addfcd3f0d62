//! Deterministic random-indexing embedding provider.
//!
//! Implements [`EmbeddingProvider`] without any model files. Text is split into
//! word unigrams (stop words removed) and padded character 3/4-grams; every
//! distinct feature maps to a pseudo-random unit vector derived from iterated
//! SHA-256 of the feature string, and the weighted sum is L2-normalized.
//! Character n-grams let related word forms ("program", "programmer") share
//! components.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;
use sha2::{Digest, Sha256};

use super::{EmbeddingProvider, EMBEDDING_DIM};

/// Weight of a whole-word feature relative to a character n-gram.
const WORD_WEIGHT: f64 = 3.0;
const NGRAM_WEIGHT: f64 = 1.0;

/// Character n-gram sizes extracted from each token.
const NGRAM_SIZES: [usize; 2] = [3, 4];

/// SHA-256 rounds needed to fill `EMBEDDING_DIM` 4-byte groups.
const HASH_ROUNDS: usize = (EMBEDDING_DIM * 4).div_ceil(32);

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9']+").expect("word pattern is valid"));

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "have", "has",
        "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
        "shall", "can", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as",
        "into", "about", "between", "through", "during", "before", "after", "above",
        "below", "and", "but", "or", "nor", "not", "so", "yet", "both", "either",
        "neither", "each", "every", "this", "that", "these", "those", "it", "its", "i",
        "me", "my", "we", "our", "you", "your", "he", "him", "his", "she", "her", "they",
        "them", "their", "what", "which", "who", "whom", "said", "just",
    ]
    .into_iter()
    .collect()
});

/// Bounded per-feature vector cache. Cleared wholesale when full.
struct FeatureCache {
    capacity: usize,
    vectors: HashMap<String, Arc<[f32]>>,
}

impl FeatureCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            vectors: HashMap::new(),
        }
    }

    fn get(&self, feature: &str) -> Option<Arc<[f32]>> {
        self.vectors.get(feature).cloned()
    }

    fn insert(&mut self, feature: String, vector: Arc<[f32]>) {
        if self.capacity == 0 {
            return;
        }
        if self.vectors.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "feature cache full, clearing");
            self.vectors.clear();
        }
        self.vectors.insert(feature, vector);
    }
}

/// Model-free embedding provider. Cheap to construct; share one per process.
pub struct HashedEmbeddingProvider {
    cache: Mutex<FeatureCache>,
}

impl HashedEmbeddingProvider {
    /// `cache_capacity` bounds the number of memoized feature vectors; 0 disables caching.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: Mutex::new(FeatureCache::new(cache_capacity)),
        }
    }

    /// Number of feature vectors currently cached.
    pub fn cached_features(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .vectors
            .len()
    }

    fn feature_vector(&self, feature: &str) -> Arc<[f32]> {
        // Every cached value is a pure function of its key, so a poisoned lock is harmless.
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(v) = cache.get(feature) {
            return v;
        }
        let vector: Arc<[f32]> = feature_vector(feature).into();
        cache.insert(feature.to_string(), Arc::clone(&vector));
        vector
    }
}

impl Default for HashedEmbeddingProvider {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn embed(&self, text: &str) -> Vec<f32> {
        let (words, ngrams) = tokenize(text);
        if words.is_empty() && ngrams.is_empty() {
            return vec![0.0; EMBEDDING_DIM];
        }

        let mut acc = vec![0.0f64; EMBEDDING_DIM];
        let mut accumulate = |prefix: &str, features: &[String], base_weight: f64| {
            for (feature, count) in count_features(features) {
                let weight = base_weight * (1.0 + (count as f64).ln());
                let fv = self.feature_vector(&format!("{prefix}{feature}"));
                for (a, f) in acc.iter_mut().zip(fv.iter()) {
                    *a += weight * f64::from(*f);
                }
            }
        };
        accumulate("w:", &words, WORD_WEIGHT);
        accumulate("c:", &ngrams, NGRAM_WEIGHT);

        let norm = acc.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-10 {
            return vec![0.0; EMBEDDING_DIM];
        }
        acc.iter().map(|x| (x / norm) as f32).collect()
    }
}

/// Split text into `(words, char_ngrams)`.
///
/// Words are lowercase unigrams with stop words and single characters removed.
/// Character n-grams come from every token longer than two characters, stop
/// words included.
pub fn tokenize(text: &str) -> (Vec<String>, Vec<String>) {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = WORD_RE.find_iter(&lowered).map(|m| m.as_str()).collect();

    let words = tokens
        .iter()
        .filter(|t| t.len() > 1 && !STOPWORDS.contains(*t))
        .map(|t| t.to_string())
        .collect();

    let ngrams = tokens
        .iter()
        .filter(|t| t.len() > 2)
        .flat_map(|t| char_ngrams(t))
        .collect();

    (words, ngrams)
}

/// Overlapping n-grams of `#word#` for each size in [`NGRAM_SIZES`].
fn char_ngrams(word: &str) -> Vec<String> {
    let padded: Vec<char> = format!("#{word}#").chars().collect();
    let mut grams = Vec::new();
    for n in NGRAM_SIZES {
        if padded.len() < n {
            continue;
        }
        for window in padded.windows(n) {
            grams.push(window.iter().collect());
        }
    }
    grams
}

/// Occurrence counts in a stable (sorted) order so the float sum is reproducible.
fn count_features(features: &[String]) -> BTreeMap<&str, u32> {
    let mut counts = BTreeMap::new();
    for f in features {
        *counts.entry(f.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Deterministic unit vector for a feature string.
///
/// Chains SHA-256 over the feature bytes, reads consecutive big-endian `u32`s
/// and maps each linearly onto `[-1, 1]` before normalizing.
fn feature_vector(feature: &str) -> Vec<f32> {
    let mut bytes = Vec::with_capacity(HASH_ROUNDS * 32);
    let mut seed = feature.as_bytes().to_vec();
    for _ in 0..HASH_ROUNDS {
        let digest = Sha256::digest(&seed);
        bytes.extend_from_slice(&digest);
        seed = digest.to_vec();
    }

    let raw: Vec<f64> = bytes
        .chunks_exact(4)
        .take(EMBEDDING_DIM)
        .map(|c| {
            let val = u32::from_be_bytes([c[0], c[1], c[2], c[3]]);
            f64::from(val) / 2_147_483_647.5 - 1.0
        })
        .collect();

    let norm = raw.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < 1e-10 {
        return vec![0.0; EMBEDDING_DIM];
    }
    raw.iter().map(|x| (x / norm) as f32).collect()
}
