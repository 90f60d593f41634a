pub mod types;
pub mod confirm;
pub mod progress;
pub mod runner;
pub mod sandbox;

pub use confirm::{AutoConfirm, Confirmer};
pub use progress::{parse_progress, Progress, ProgressCallback};
pub use runner::{ProcessRunner, RunOutput, RunRequest, TokioProcessRunner};
pub use types::{ExecuteOptions, ExecutionResult};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::command::risk::{is_mutating, needs_confirmation};
use crate::command::types::{display_command, CommandSpec, RollbackCommand, DRY_RUN_FLAG};
use crate::config::PipelineConfig;
use sandbox::{capabilities_for, sandbox_env, sanitize_args, validate, SUDO_PROGRAM, TIMEOUT_MARKER};

/// Error text that means the profile or generation may be half-applied.
const CRITICAL_FAILURE_MARKERS: &[&str] = &[
    "collision between",
    "infinite recursion",
    "assertion failed",
    "out of memory",
];

/// Slack on top of timeout + grace before the executor stops waiting on a
/// runner that ignores its own deadline.
const RUNNER_SLACK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorLimits {
    pub default_timeout: Duration,
    pub kill_grace: Duration,
    pub max_output_bytes: usize,
}

impl ExecutorLimits {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            default_timeout: config.timeout(),
            kill_grace: config.kill_grace(),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

impl Default for ExecutorLimits {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// The only component that spawns processes.
///
/// `Pending -> (confirmation) -> Cancelled | Running -> Succeeded | Failed`.
/// Mutating commands hold the system lock exclusively while they run.
/// Everything else runs under a shared hold, so reads overlap each other but
/// never a running mutation. Confirmation waits never touch the lock.
#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
    confirmer: Arc<dyn Confirmer>,
    system_lock: Arc<RwLock<()>>,
    limits: ExecutorLimits,
}

impl Executor {
    pub fn new(runner: Arc<dyn ProcessRunner>, confirmer: Arc<dyn Confirmer>, limits: ExecutorLimits) -> Self {
        Self {
            runner,
            confirmer,
            system_lock: Arc::new(RwLock::new(())),
            limits,
        }
    }

    pub async fn execute(&self, spec: &CommandSpec, options: ExecuteOptions) -> ExecutionResult {
        let started = Instant::now();

        if let Err(e) = validate(spec) {
            error!("Rejected command before spawn: {}", e);
            return ExecutionResult::failed(e.to_string(), String::new(), None, started);
        }

        if options.require_confirmation || needs_confirmation(spec) {
            let approved = tokio::select! {
                approved = self.confirmer.ask(&spec.description) => approved,
                _ = options.cancel.cancelled() => false,
            };
            if !approved {
                info!("Declined: {}", spec.description);
                return ExecutionResult::cancelled(started);
            }
        }

        let mut args = spec.args.clone();
        if options.dry_run {
            if !spec.supports_dry_run {
                // Nothing runs for real when a dry run was asked for.
                let mut result = ExecutionResult::succeeded(
                    format!(
                        "Dry run: `{}` has no preview mode, so nothing was run.",
                        spec.command_line()
                    ),
                    None,
                    started,
                );
                result.dry_run = true;
                return result;
            }
            args.push(DRY_RUN_FLAG.to_string());
        }

        let (_exclusive, _shared) = if is_mutating(spec) && !options.dry_run {
            (Some(self.system_lock.write().await), None)
        } else {
            (None, Some(self.system_lock.read().await))
        };

        let timeout = options.timeout.unwrap_or(self.limits.default_timeout);
        let mut result = self
            .run(spec, args, timeout, &options)
            .await
            .finish(started);
        result.dry_run = options.dry_run;

        if result.success {
            result.rollback_available = spec.rollback.is_some() && !options.dry_run;
            return result;
        }
        if result.was_cancelled || options.dry_run {
            return result;
        }

        let failure_text = format!("{}\n{}", result.error.as_deref().unwrap_or(""), result.output);
        match &spec.rollback {
            Some(rollback) if is_critical_failure(&failure_text) => {
                warn!("Critical failure in {}; rolling back", spec.program);
                let restored = self
                    .run(&rollback.to_spec(), rollback.args.clone(), timeout, &ExecuteOptions::default())
                    .await
                    .finish(Instant::now());
                if restored.success {
                    result.auto_rolled_back = true;
                } else {
                    error!("Automatic rollback failed: {:?}", restored.error);
                    result.rollback_available = true;
                }
            }
            Some(_) => result.rollback_available = true,
            None => {}
        }
        result
    }

    /// Run a rollback explicitly (the `undo` path). No confirmation.
    pub async fn rollback(&self, rollback: &RollbackCommand) -> ExecutionResult {
        let started = Instant::now();
        let spec = rollback.to_spec();
        let _guard = self.system_lock.write().await;
        info!("{}", spec.description);
        self.run(&spec, spec.args.clone(), self.limits.default_timeout, &ExecuteOptions::default())
            .await
            .finish(started)
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        args: Vec<String>,
        timeout: Duration,
        options: &ExecuteOptions,
    ) -> Attempt {
        let capabilities = capabilities_for(&spec.program, &args);
        let (program, argv) = if spec.requires_sudo {
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push(spec.program.clone());
            argv.extend(args);
            (SUDO_PROGRAM.to_string(), argv)
        } else {
            (spec.program.clone(), args)
        };

        info!(
            "Running `{}` (network: {}, write: {})",
            display_command(&program, &sanitize_args(&argv)),
            capabilities.network,
            capabilities.file_write
        );

        let request = RunRequest {
            program,
            args: argv,
            env: sandbox_env(capabilities, |key| std::env::var(key).ok()),
            capabilities,
            timeout,
            kill_grace: self.limits.kill_grace,
            max_output_bytes: self.limits.max_output_bytes,
            cancel: options.cancel.clone(),
            on_progress: options.on_progress.clone(),
        };

        let deadline = timeout + self.limits.kill_grace + RUNNER_SLACK;
        match tokio::time::timeout(deadline, self.runner.run(request)).await {
            Ok(Ok(output)) => Attempt::Finished { output, timeout },
            Ok(Err(e)) => Attempt::Error(e.to_string()),
            Err(_) => Attempt::Finished {
                output: RunOutput {
                    timed_out: true,
                    ..RunOutput::default()
                },
                timeout,
            },
        }
    }
}

enum Attempt {
    Finished { output: RunOutput, timeout: Duration },
    Error(String),
}

impl Attempt {
    fn finish(self, started: Instant) -> ExecutionResult {
        let (output, timeout) = match self {
            Attempt::Error(e) => {
                error!("Command could not run: {}", e);
                return ExecutionResult::failed(e, String::new(), None, started);
            }
            Attempt::Finished { output, timeout } => (output, timeout),
        };

        if output.cancelled {
            let mut result = ExecutionResult::cancelled(started);
            result.output = output.stdout;
            result.error = Some("Cancelled while running".to_string());
            return result;
        }

        if output.timed_out {
            warn!("Command timed out after {:?}", timeout);
            let mut text = output.stdout;
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(TIMEOUT_MARKER);
            let mut result = ExecutionResult::failed(
                format!("Command timed out after {} ms", timeout.as_millis()),
                text,
                None,
                started,
            );
            result.timed_out = true;
            return result;
        }

        match output.exit_code {
            Some(0) => ExecutionResult::succeeded(output.stdout, Some(0), started),
            code => {
                let error = if output.stderr.trim().is_empty() {
                    match code {
                        Some(c) => format!("Command exited with code {}", c),
                        None => "Command was terminated by a signal".to_string(),
                    }
                } else {
                    output.stderr
                };
                ExecutionResult::failed(error, output.stdout, code, started)
            }
        }
    }
}

pub fn is_critical_failure(text: &str) -> bool {
    let lower = text.to_lowercase();
    CRITICAL_FAILURE_MARKERS.iter().any(|m| lower.contains(m))
}
