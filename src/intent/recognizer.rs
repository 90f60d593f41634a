use std::sync::Arc;
use tracing::debug;

use super::ambiguity::{check_ambiguity, Clarification, DEFAULT_AMBIGUITY_MARGIN};
use super::rules::match_rules;
use super::statistical::statistical_match;
use super::types::{Intent, IntentKind, UNKNOWN_CONFIDENCE};
use crate::memory::learning::{LearningState, LearningStore};

/// A learned hit above this skips every other stage.
const LEARNED_SHORT_CIRCUIT: f32 = 0.8;
/// A rule hit above this skips statistics.
const RULE_SHORT_CIRCUIT: f32 = 0.9;
/// Rule results above this win the combine step.
const RULE_ACCEPT: f32 = 0.8;
/// Statistical results above this win when nothing better exists.
const STATISTICAL_ACCEPT: f32 = 0.5;

/// Lower-case, trim, drop `?!.,`, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '?' | '!' | '.' | ','))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pure recognition against a fixed learning snapshot. Never fails;
/// the floor is `Unknown` at 0.3.
///
/// Order: learned (> 0.8) -> rules (> 0.9) -> statistics -> combine.
/// A learned hit that did not short-circuit still outranks statistics in
/// the combine step, so a freshly taught phrase (0.7) is honored.
pub fn recognize(text: &str, learned: &LearningState) -> Intent {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Intent::unknown(text);
    }

    let learned_hit = learned.check_learned_pattern(text);
    if let Some(hit) = &learned_hit {
        if hit.confidence > LEARNED_SHORT_CIRCUIT {
            debug!("Learned short-circuit -> {}", hit.kind.as_str());
            return hit.clone();
        }
    }

    let rule_hit = match_rules(&normalized, text);
    if let Some(hit) = &rule_hit {
        if hit.confidence > RULE_SHORT_CIRCUIT {
            return hit.clone();
        }
    }

    let statistical = statistical_match(&normalized, text);
    combine(rule_hit, learned_hit, statistical, text)
}

fn combine(
    rule_hit: Option<Intent>,
    learned_hit: Option<Intent>,
    statistical: Intent,
    text: &str,
) -> Intent {
    if let Some(rule) = rule_hit.as_ref().filter(|r| r.confidence > RULE_ACCEPT) {
        return rule.clone();
    }
    if let Some(learned) = learned_hit.as_ref() {
        return learned.clone();
    }
    if statistical.confidence > STATISTICAL_ACCEPT {
        return statistical;
    }

    // Nothing cleared its bar: keep every reading for the ambiguity check.
    let mut alternatives: Vec<Intent> = rule_hit.into_iter().collect();
    if statistical.kind != IntentKind::Unknown {
        let mut statistical = statistical;
        let runners_up = std::mem::take(&mut statistical.alternatives);
        alternatives.push(statistical);
        alternatives.extend(runners_up);
    }
    Intent::new(IntentKind::Unknown, UNKNOWN_CONFIDENCE, Vec::new(), text)
        .with_alternatives(alternatives)
}

/// Recognition result plus the out-of-band clarification flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub intent: Intent,
    pub clarification: Option<Clarification>,
}

impl Recognition {
    pub fn needs_clarification(&self) -> bool {
        self.clarification.is_some()
    }
}

/// Recognizer bound to a live learning store; each call reads one snapshot.
#[derive(Clone)]
pub struct IntentRecognizer {
    learning: Arc<LearningStore>,
    ambiguity_margin: f32,
}

impl IntentRecognizer {
    pub fn new(learning: Arc<LearningStore>) -> Self {
        Self {
            learning,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
        }
    }

    pub fn with_ambiguity_margin(mut self, margin: f32) -> Self {
        self.ambiguity_margin = margin;
        self
    }

    pub fn recognize(&self, text: &str) -> Intent {
        self.learning.with_snapshot(|state| recognize(text, state))
    }

    pub fn resolve(&self, text: &str) -> Recognition {
        let intent = self.recognize(text);
        let clarification = check_ambiguity(&intent, self.ambiguity_margin);
        debug!(
            "Recognized {} ({:.2}), clarify: {}",
            intent.kind.as_str(),
            intent.confidence,
            clarification.is_some()
        );
        Recognition {
            intent,
            clarification,
        }
    }
}
