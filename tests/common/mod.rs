#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use humanix::error::{PersistenceError, RunError};
use humanix::executor::{Confirmer, ProcessRunner, RunOutput, RunRequest};
use humanix::memory::KeyValueStore;

/// Records every request and replays scripted outputs (success by default).
#[derive(Default)]
pub struct SpyRunner {
    calls: Mutex<Vec<RunRequest>>,
    script: Mutex<VecDeque<RunOutput>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SpyRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scripted(outputs: Vec<RunOutput>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outputs.into()),
            ..Self::default()
        })
    }

    /// Each run takes `delay` unless its token is cancelled first.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<RunRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for SpyRunner {
    async fn run(&self, request: RunRequest) -> Result<RunOutput, RunError> {
        self.calls.lock().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut cancelled = false;
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = request.cancel.cancelled() => cancelled = true,
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            return Ok(RunOutput {
                cancelled: true,
                ..RunOutput::default()
            });
        }
        Ok(self.script.lock().pop_front().unwrap_or_else(|| ok("")))
    }
}

/// Panics on its first run, then succeeds.
#[derive(Default)]
pub struct PanicOnceRunner {
    fired: AtomicBool,
    calls: AtomicUsize,
}

impl PanicOnceRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for PanicOnceRunner {
    async fn run(&self, _request: RunRequest) -> Result<RunOutput, RunError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.fired.swap(true, Ordering::SeqCst) {
            panic!("runner blew up");
        }
        Ok(ok(""))
    }
}

/// In-memory sink for a test-local `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Installs an info-level subscriber for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub fn ok(stdout: &str) -> RunOutput {
    RunOutput {
        stdout: stdout.to_string(),
        exit_code: Some(0),
        ..RunOutput::default()
    }
}

pub fn failed(code: i32, stderr: &str) -> RunOutput {
    RunOutput {
        stderr: stderr.to_string(),
        exit_code: Some(code),
        ..RunOutput::default()
    }
}

/// Fixed answer that also counts how often it was asked.
pub struct CountingConfirmer {
    answer: bool,
    asked: AtomicUsize,
}

impl CountingConfirmer {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirmer for CountingConfirmer {
    async fn ask(&self, _description: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Never answers; only cancellation ends the wait.
pub struct HangingConfirmer;

#[async_trait]
impl Confirmer for HangingConfirmer {
    async fn ask(&self, _description: &str) -> bool {
        std::future::pending::<bool>().await
    }
}

/// A disk that is always broken.
pub struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }

    fn save(&self, _key: &str, _bytes: &[u8]) -> Result<(), PersistenceError> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
    }
}

/// Loads fine, fails every save.
#[derive(Default)]
pub struct FullDiskStore {
    pub saves: AtomicUsize,
}

impl KeyValueStore for FullDiskStore {
    fn load(&self, _key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(None)
    }

    fn save(&self, _key: &str, _bytes: &[u8]) -> Result<(), PersistenceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device").into())
    }
}
