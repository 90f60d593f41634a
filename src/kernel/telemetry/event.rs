use serde::{Deserialize, Serialize};

use crate::intent::types::IntentKind;

// Allowed: kinds, buckets, counts, durations
// Forbidden: request text, entity values, stdout/stderr

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    IntentRecognized {
        kind: IntentKind,
        confidence: ConfidenceBucket,
    },

    CommandSucceeded {
        kind: IntentKind,
        duration_ms: u64,
        dry_run: bool,
    },

    CommandFailed {
        kind: IntentKind,
        reason: FailureReason,
    },

    ClarificationRequested {
        candidates: usize,
    },

    /// Recognized but not buildable, or not recognized at all.
    Unsupported {
        kind: IntentKind,
    },

    Cancelled {
        kind: IntentKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBucket {
    Low,    // <= 0.5
    Medium, // <= 0.8
    High,
}

impl ConfidenceBucket {
    pub fn from_confidence(c: f32) -> Self {
        if c <= 0.5 {
            ConfidenceBucket::Low
        } else if c <= 0.8 {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Timeout,
    NonZeroExit,
    Rejected,
    RolledBack,
}
