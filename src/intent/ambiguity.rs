use serde::{Deserialize, Serialize};

use super::types::{Intent, IntentKind};

/// Top two readings closer than this are treated as a tie.
pub const DEFAULT_AMBIGUITY_MARGIN: f32 = 0.15;
/// Readings at or below this are not worth offering.
const CANDIDATE_FLOOR: f32 = 0.3;

const CLARIFY_PROMPT: &str = "I want to make sure I understand. Are you trying to:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationOption {
    pub kind: IntentKind,
    pub label: String,
    pub example: String,
    pub confidence: f32,
}

/// Out-of-band flag raised next to an intent the user should confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub options: Vec<ClarificationOption>,
}

impl Clarification {
    /// Question plus one numbered line per option.
    pub fn render(&self) -> String {
        let mut out = self.question.clone();
        for (i, option) in self.options.iter().enumerate() {
            out.push_str(&format!(
                "\n  {}. {} (e.g. \"{}\")",
                i + 1,
                option.label,
                option.example
            ));
        }
        out
    }
}

/// Flags `intent` when its competing readings are too close to call.
pub fn check_ambiguity(intent: &Intent, margin: f32) -> Option<Clarification> {
    if intent.alternatives.is_empty() {
        return None;
    }

    let mut candidates: Vec<(IntentKind, f32)> = Vec::new();
    let primary = (!intent.is_unknown()).then_some(intent);
    for candidate in primary.into_iter().chain(intent.alternatives.iter()) {
        if candidate.is_unknown() || candidate.confidence <= CANDIDATE_FLOOR {
            continue;
        }
        match candidates.iter_mut().find(|(kind, _)| *kind == candidate.kind) {
            Some(existing) => existing.1 = existing.1.max(candidate.confidence),
            None => candidates.push((candidate.kind, candidate.confidence)),
        }
    }
    if candidates.len() < 2 {
        return None;
    }
    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if candidates[0].1 - candidates[1].1 >= margin {
        return None;
    }

    let top = candidates[0].1;
    let options = candidates
        .into_iter()
        .filter(|(_, confidence)| top - confidence < margin)
        .map(|(kind, confidence)| ClarificationOption {
            kind,
            label: kind.label().to_string(),
            example: kind.example().to_string(),
            confidence,
        })
        .collect();

    Some(Clarification {
        question: CLARIFY_PROMPT.to_string(),
        options,
    })
}
