//! Usage telemetry for the request pipeline.
//!
//! # SAFETY INVARIANT
//! Telemetry is a write-only side channel. Recognition, building and
//! execution never read it back.
//!
//! # PRIVACY INVARIANT
//! Events never carry user text, package names or command output. Only
//! intent kinds, coarse confidence buckets, counts and durations.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::*;
pub use metrics::{compute_snapshot, UsageSnapshot};
pub use recorder::TelemetryRecorder;
