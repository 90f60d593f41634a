use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::progress::ProgressCallback;
use crate::error::PipelineError;

/// Outcome of one `execute` call. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub rollback_available: bool,
    pub was_cancelled: bool,
    pub timed_out: bool,
    /// The critical-failure policy already restored the previous state.
    pub auto_rolled_back: bool,
    pub dry_run: bool,
}

impl ExecutionResult {
    pub(crate) fn cancelled(started: Instant) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: None,
            exit_code: None,
            duration_ms: elapsed_ms(started),
            rollback_available: false,
            was_cancelled: true,
            timed_out: false,
            auto_rolled_back: false,
            dry_run: false,
        }
    }

    pub(crate) fn failed(error: String, output: String, exit_code: Option<i32>, started: Instant) -> Self {
        Self {
            success: false,
            output,
            error: Some(error),
            exit_code,
            duration_ms: elapsed_ms(started),
            rollback_available: false,
            was_cancelled: false,
            timed_out: false,
            auto_rolled_back: false,
            dry_run: false,
        }
    }

    pub(crate) fn succeeded(output: String, exit_code: Option<i32>, started: Instant) -> Self {
        Self {
            success: true,
            output,
            error: None,
            exit_code,
            duration_ms: elapsed_ms(started),
            rollback_available: false,
            was_cancelled: false,
            timed_out: false,
            auto_rolled_back: false,
            dry_run: false,
        }
    }

    /// The taxonomy entry for a non-successful result.
    pub fn failure_kind(&self) -> Option<PipelineError> {
        if self.success {
            None
        } else if self.was_cancelled {
            Some(PipelineError::ExecutionCancelled)
        } else if self.timed_out {
            Some(PipelineError::ExecutionTimeout(self.duration_ms))
        } else {
            Some(PipelineError::ExecutionFailed {
                exit_code: self.exit_code,
                stderr: self.error.clone().unwrap_or_default(),
            })
        }
    }
}

/// Per-call execution switches.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
    pub dry_run: bool,
    /// Ask even if the command itself does not require it.
    pub require_confirmation: bool,
    /// Falls back to the executor's default when unset.
    pub timeout: Option<Duration>,
    pub on_progress: Option<ProgressCallback>,
    /// Cancels a pending confirmation or a running process.
    pub cancel: CancellationToken,
}

impl ExecuteOptions {
    pub fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    pub fn require_confirmation(mut self, yes: bool) -> Self {
        self.require_confirmation = yes;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u64::MAX as u128) as u64
}
