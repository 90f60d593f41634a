use super::entities::entities_for_kind;
use super::types::{Intent, IntentKind};

/// Per-keyword weight and the ceiling a keyword score can reach.
const KEYWORD_WEIGHT: f32 = 0.3;
const MAX_CONFIDENCE: f32 = 0.8;
const NO_MATCH_CONFIDENCE: f32 = 0.1;

const KEYWORD_SETS: &[(IntentKind, &[&str])] = &[
    (IntentKind::Install, &["install", "need", "want", "get", "download"]),
    (IntentKind::Update, &["update", "upgrade", "latest", "new"]),
    (IntentKind::Query, &["what", "show", "list", "tell", "which"]),
    (IntentKind::Troubleshoot, &["fix", "broken", "working", "help", "problem"]),
    (IntentKind::Config, &["change", "configure", "set", "adjust", "make"]),
];

/// Bag-of-words guess. The best kind becomes the intent and every other
/// kind that scored rides along as an alternative. Ties keep table order.
pub fn statistical_match(normalized: &str, original: &str) -> Intent {
    let words: Vec<&str> = normalized.split_whitespace().collect();

    let mut scored: Vec<(IntentKind, f32)> = KEYWORD_SETS
        .iter()
        .filter_map(|(kind, keywords)| {
            let hits = keywords.iter().filter(|k| words.contains(k)).count();
            if hits == 0 {
                None
            } else {
                Some((*kind, (hits as f32 * KEYWORD_WEIGHT).min(MAX_CONFIDENCE)))
            }
        })
        .collect();

    // Stable sort keeps table order among equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranked = scored
        .into_iter()
        .map(|(kind, confidence)| {
            Intent::new(kind, confidence, entities_for_kind(kind, normalized), original)
        });

    match ranked.next() {
        Some(best) => {
            let alternatives: Vec<Intent> = ranked.collect();
            best.with_alternatives(alternatives)
        }
        None => Intent::new(IntentKind::Unknown, NO_MATCH_CONFIDENCE, Vec::new(), original),
    }
}
