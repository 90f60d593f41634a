use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::progress::{parse_progress, ProgressCallback};
use super::sandbox::{push_capped, Capabilities, TRUNCATION_MARKER};
use crate::error::RunError;

/// Everything needed to run one process. `args` is passed as a vector,
/// never through a shell.
#[derive(Clone)]
pub struct RunRequest {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub capabilities: Capabilities,
    pub timeout: Duration,
    pub kill_grace: Duration,
    pub max_output_bytes: usize,
    pub cancel: CancellationToken,
    pub on_progress: Option<ProgressCallback>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub cancelled: bool,
}

/// The process-execution capability. The executor is its only caller.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, request: RunRequest) -> Result<RunOutput, RunError>;
}

/// Runs real processes with tokio.
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

enum Ending {
    Exited(Option<i32>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, request: RunRequest) -> Result<RunOutput, RunError> {
        let mut child = Command::new(&request.program)
            .args(&request.args)
            .env_clear()
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: request.program.clone(),
                source,
            })?;
        debug!("Spawned {} (pid {:?})", request.program, child.id());

        let cap = request.max_output_bytes;
        let stdout_task = child
            .stdout
            .take()
            .map(|s| tokio::spawn(collect(s, cap, request.on_progress.clone())));
        let stderr_task = child
            .stderr
            .take()
            .map(|s| tokio::spawn(collect(s, cap, request.on_progress.clone())));

        let ending = tokio::select! {
            status = child.wait() => Ending::Exited(status?.code()),
            _ = tokio::time::sleep(request.timeout) => Ending::TimedOut,
            _ = request.cancel.cancelled() => Ending::Cancelled,
        };

        let exit_code = match ending {
            Ending::Exited(code) => code,
            Ending::TimedOut | Ending::Cancelled => {
                terminate(&mut child, request.kill_grace).await;
                None
            }
        };

        Ok(RunOutput {
            stdout: join(stdout_task, request.kill_grace).await,
            stderr: join(stderr_task, request.kill_grace).await,
            exit_code,
            timed_out: matches!(ending, Ending::TimedOut),
            cancelled: matches!(ending, Ending::Cancelled),
        })
    }
}

/// Signal the child and wait at most `grace` for it to go away.
async fn terminate(child: &mut Child, grace: Duration) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to signal child: {}", e);
        return;
    }
    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!("Child did not exit within {:?} of termination", grace);
    }
}

async fn collect<R>(stream: R, cap: usize, on_progress: Option<ProgressCallback>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut buffer = String::new();
    let mut truncated = false;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(callback) = &on_progress {
                    if let Some(progress) = parse_progress(&line) {
                        callback(progress);
                    }
                }
                // Keep draining past the cap so the child never blocks on a full pipe.
                if !truncated && !push_capped(&mut buffer, &line, cap) {
                    truncated = true;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Output stream ended with error: {}", e);
                break;
            }
        }
    }
    if truncated {
        buffer.push_str(TRUNCATION_MARKER);
    }
    buffer
}

async fn join(task: Option<JoinHandle<String>>, grace: Duration) -> String {
    let Some(task) = task else {
        return String::new();
    };
    match tokio::time::timeout(grace, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("Output collector failed: {}", e);
            String::new()
        }
        Err(_) => String::new(),
    }
}
