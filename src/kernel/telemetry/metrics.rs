use std::collections::{BTreeMap, VecDeque};
use super::event::{ConfidenceBucket, FailureReason, TelemetryEvent};
use crate::intent::types::IntentKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageSnapshot {
    pub recognized: BTreeMap<IntentKind, u64>,
    pub low_confidence: u64,
    pub successes: u64,
    pub dry_runs: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub rollbacks: u64,
    pub clarifications: u64,
    pub unsupported: u64,
    pub cancellations: u64,
    pub avg_success_ms: f64,
    /// successes / (successes + failures); 0 when nothing ran.
    pub success_rate: f64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> UsageSnapshot {
    let mut snap = UsageSnapshot::default();
    let mut success_ms_total: u64 = 0;

    for event in events {
        match event {
            TelemetryEvent::IntentRecognized { kind, confidence } => {
                *snap.recognized.entry(*kind).or_insert(0) += 1;
                if *confidence == ConfidenceBucket::Low {
                    snap.low_confidence += 1;
                }
            }
            TelemetryEvent::CommandSucceeded { duration_ms, dry_run, .. } => {
                snap.successes += 1;
                success_ms_total += duration_ms;
                if *dry_run {
                    snap.dry_runs += 1;
                }
            }
            TelemetryEvent::CommandFailed { reason, .. } => {
                snap.failures += 1;
                match reason {
                    FailureReason::Timeout => snap.timeouts += 1,
                    FailureReason::RolledBack => snap.rollbacks += 1,
                    FailureReason::NonZeroExit | FailureReason::Rejected => {}
                }
            }
            TelemetryEvent::ClarificationRequested { .. } => snap.clarifications += 1,
            TelemetryEvent::Unsupported { .. } => snap.unsupported += 1,
            TelemetryEvent::Cancelled { .. } => snap.cancellations += 1,
        }
    }

    if snap.successes > 0 {
        snap.avg_success_ms = success_ms_total as f64 / snap.successes as f64;
    }
    let ran = snap.successes + snap.failures;
    if ran > 0 {
        snap.success_rate = snap.successes as f64 / ran as f64;
    }

    snap
}
