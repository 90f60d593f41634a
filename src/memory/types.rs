use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::intent::types::{EntityKind, Intent, IntentKind};

/// Starting confidence of a freshly learned phrase.
pub const NEW_PATTERN_CONFIDENCE: f32 = 0.7;
/// Gain per repeated accepted correction.
pub const PATTERN_CONFIDENCE_STEP: f32 = 0.05;
/// Learned confidence never climbs above this.
pub const MAX_PATTERN_CONFIDENCE: f32 = 0.95;

/// A user correction, kept append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub original_input: String,
    pub recognized_intent: Intent,
    pub corrected_intent: Intent,
    pub timestamp: DateTime<Utc>,
    pub accepted: bool,
}

/// Phrase -> intent mapping derived from accepted corrections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    /// Normalized phrase; also the table key.
    pub pattern: String,
    pub intent: IntentKind,
    pub entities: BTreeMap<EntityKind, String>,
    pub confidence: f32, // 0.0 - 0.95
    pub frequency: u32,
    pub last_seen: DateTime<Utc>,
}

impl LearningPattern {
    pub fn new(pattern: String, corrected: &Intent, now: DateTime<Utc>) -> Self {
        let mut entities = BTreeMap::new();
        for entity in &corrected.entities {
            entities.entry(entity.kind).or_insert_with(|| entity.value.clone());
        }
        Self {
            pattern,
            intent: corrected.kind,
            entities,
            confidence: NEW_PATTERN_CONFIDENCE,
            frequency: 1,
            last_seen: now,
        }
    }

    /// Repeated confirmation only ever raises confidence.
    pub fn reinforce(&mut self, corrected: &Intent, now: DateTime<Utc>) {
        self.frequency = self.frequency.saturating_add(1);
        self.confidence = (self.confidence + PATTERN_CONFIDENCE_STEP).min(MAX_PATTERN_CONFIDENCE);
        self.last_seen = now;
        self.intent = corrected.kind;
        for entity in &corrected.entities {
            self.entities.insert(entity.kind, entity.value.clone());
        }
    }

    /// Ranking used for autocomplete.
    pub fn weight(&self) -> f32 {
        self.frequency as f32 * self.confidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearningStats {
    pub total_corrections: usize,
    pub accepted_corrections: usize,
    pub learned_patterns: usize,
    pub synonym_pairs: usize,
}
