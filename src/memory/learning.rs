use ahash::AHashSet;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::store::{InMemoryKeyValueStore, KeyValueStore};
use super::types::{Correction, LearningPattern, LearningStats};
use crate::error::PersistenceError;
use crate::intent::types::{Entity, EntityKind, Intent};

/// Key the whole learning state is saved under.
pub const STORE_KEY: &str = "learning-store";
/// Corrections kept in the log (and therefore on disk).
pub const MAX_CORRECTIONS: usize = 1_000;
/// Exact hits below this are treated like any other near miss.
const EXACT_HIT_CONFIDENCE: f32 = 0.6;
/// Word-set overlap needed before a similar phrase counts.
const SIMILARITY_THRESHOLD: f32 = 0.7;
const MAX_SUGGESTIONS: usize = 5;

/// Everything the store owns. Ordered maps keep lookups and ties deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    pub corrections: Vec<Correction>,
    pub patterns: BTreeMap<String, LearningPattern>,
    pub synonyms: BTreeMap<String, BTreeSet<String>>,
}

impl LearningState {
    /// Exact phrase hit first, then the nearest similar phrase.
    pub fn check_learned_pattern(&self, text: &str) -> Option<Intent> {
        let key = normalize_pattern(text);
        if let Some(pattern) = self.patterns.get(&key) {
            if pattern.confidence > EXACT_HIT_CONFIDENCE {
                return Some(pattern_to_intent(pattern, pattern.confidence, text));
            }
        }
        self.find_similar(text)
    }

    /// Jaccard overlap of synonym-widened word sets.
    pub fn find_similar(&self, text: &str) -> Option<Intent> {
        let input = self.expand(&normalize_pattern(text));
        if input.is_empty() {
            return None;
        }

        let mut best: Option<(&LearningPattern, f32)> = None;
        for pattern in self.patterns.values() {
            let candidate = self.expand(&pattern.pattern);
            let score = jaccard(&input, &candidate);
            if score > SIMILARITY_THRESHOLD && best.map_or(true, |(_, s)| score > s) {
                best = Some((pattern, score));
            }
        }

        best.map(|(pattern, score)| {
            debug!("Similar learned pattern '{}' ({:.2})", pattern.pattern, score);
            pattern_to_intent(pattern, pattern.confidence * score, text)
        })
    }

    pub fn suggestions(&self, partial: &str) -> Vec<String> {
        let prefix = normalize_pattern(partial);
        let mut matching: Vec<&LearningPattern> = self
            .patterns
            .values()
            .filter(|p| p.pattern.starts_with(&prefix))
            .collect();
        matching.sort_by(|a, b| {
            b.weight()
                .partial_cmp(&a.weight())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matching
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|p| p.pattern.clone())
            .collect()
    }

    pub fn stats(&self) -> LearningStats {
        let edges: usize = self.synonyms.values().map(|s| s.len()).sum();
        LearningStats {
            total_corrections: self.corrections.len(),
            accepted_corrections: self.corrections.iter().filter(|c| c.accepted).count(),
            learned_patterns: self.patterns.len(),
            synonym_pairs: edges / 2,
        }
    }

    fn apply_correction(
        &mut self,
        original: &str,
        recognized: &Intent,
        corrected: &Intent,
        accepted: bool,
        now: DateTime<Utc>,
    ) {
        self.corrections.push(Correction {
            original_input: original.to_string(),
            recognized_intent: recognized.clone(),
            corrected_intent: corrected.clone(),
            timestamp: now,
            accepted,
        });
        if self.corrections.len() > MAX_CORRECTIONS {
            let overflow = self.corrections.len() - MAX_CORRECTIONS;
            self.corrections.drain(..overflow);
        }

        if !accepted {
            return;
        }

        let key = normalize_pattern(original);
        if key.is_empty() {
            return;
        }
        match self.patterns.get_mut(&key) {
            Some(pattern) => pattern.reinforce(corrected, now),
            None => {
                self.patterns
                    .insert(key.clone(), LearningPattern::new(key.clone(), corrected, now));
            }
        }

        if let Some(value) = resolved_value(corrected) {
            let value = value.to_lowercase();
            for word in key.split_whitespace() {
                if word.len() > 2 && word != value {
                    self.link(word, &value);
                }
            }
        }
    }

    fn link(&mut self, a: &str, b: &str) {
        self.synonyms
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.synonyms
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    fn expand(&self, normalized: &str) -> AHashSet<String> {
        let mut words = AHashSet::new();
        for word in normalized.split_whitespace() {
            words.insert(word.to_string());
            if let Some(synonyms) = self.synonyms.get(word) {
                words.extend(synonyms.iter().cloned());
            }
        }
        words
    }
}

/// Owns patterns, corrections and synonyms; persists them as one blob.
pub struct LearningStore {
    state: RwLock<LearningState>,
    backend: Arc<dyn KeyValueStore>,
    /// Serializes mutate-then-save so saves land in mutation order.
    writer: Mutex<()>,
    persistence_ok: AtomicBool,
}

impl LearningStore {
    /// Load from `backend`, starting empty on absence or corruption.
    /// An unreadable backend downgrades the store to memory only.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let (state, healthy) = match Self::load_state(backend.as_ref()) {
            Ok(Some(state)) => {
                info!(
                    "Loaded learning store: {} patterns, {} corrections",
                    state.patterns.len(),
                    state.corrections.len()
                );
                (state, true)
            }
            Ok(None) => (LearningState::default(), true),
            Err(PersistenceError::Serialization(e)) => {
                warn!("Learning store is corrupt, starting empty: {}", e);
                (LearningState::default(), true)
            }
            Err(e) => {
                warn!("Learning store unavailable, continuing in memory only: {}", e);
                (LearningState::default(), false)
            }
        };
        Self {
            state: RwLock::new(state),
            backend,
            writer: Mutex::new(()),
            persistence_ok: AtomicBool::new(healthy),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(InMemoryKeyValueStore::new()))
    }

    fn load_state(backend: &dyn KeyValueStore) -> Result<Option<LearningState>, PersistenceError> {
        match backend.load(STORE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn record_correction(
        &self,
        original: &str,
        recognized: &Intent,
        corrected: &Intent,
        accepted: bool,
    ) {
        let _writer = self.writer.lock();
        let persist = self.persistence_ok.load(Ordering::Relaxed);
        let bytes = {
            let mut state = self.state.write();
            state.apply_correction(original, recognized, corrected, accepted, Utc::now());
            let encoded = persist.then(|| serde_json::to_vec_pretty(&*state));
            encoded
        };
        info!(
            "Recorded correction -> {} (accepted: {})",
            corrected.kind.as_str(),
            accepted
        );

        let Some(bytes) = bytes else {
            return;
        };
        let result = bytes
            .map_err(PersistenceError::from)
            .and_then(|bytes| self.backend.save(STORE_KEY, &bytes));
        if let Err(e) = result {
            warn!("Could not persist learning store, keeping it in memory: {}", e);
            self.persistence_ok.store(false, Ordering::Relaxed);
        }
    }

    pub fn check_learned_pattern(&self, text: &str) -> Option<Intent> {
        self.state.read().check_learned_pattern(text)
    }

    pub fn find_similar(&self, text: &str) -> Option<Intent> {
        self.state.read().find_similar(text)
    }

    pub fn get_suggestions(&self, partial: &str) -> Vec<String> {
        self.state.read().suggestions(partial)
    }

    pub fn stats(&self) -> LearningStats {
        self.state.read().stats()
    }

    /// Run `f` against a consistent view of the state.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&LearningState) -> R) -> R {
        f(&self.state.read())
    }

    pub fn snapshot(&self) -> LearningState {
        self.state.read().clone()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence_ok.load(Ordering::Relaxed)
    }
}

/// Lower-case, drop everything but word characters and spaces, collapse runs.
pub fn normalize_pattern(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolved_value(corrected: &Intent) -> Option<&str> {
    EntityKind::primary_for(corrected.kind)
        .and_then(|kind| corrected.entity(kind))
        .or_else(|| corrected.entities.first().map(|e| e.value.as_str()))
}

fn pattern_to_intent(pattern: &LearningPattern, confidence: f32, original: &str) -> Intent {
    let entities = pattern
        .entities
        .iter()
        .map(|(kind, value)| Entity::new(*kind, value.clone(), confidence))
        .collect();
    Intent::new(pattern.intent, confidence, entities, original)
}

fn jaccard(a: &AHashSet<String>, b: &AHashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}
