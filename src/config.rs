use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::intent::ambiguity::DEFAULT_AMBIGUITY_MARGIN;

/// Runtime knobs for the whole pipeline.
///
/// Resolution order: defaults, then an optional JSON file, then `HUMANIX_*`
/// environment variables. The binary layers its flags on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard limit for a single command.
    pub default_timeout_ms: u64,
    /// How long a terminated process gets to exit before we stop waiting.
    pub kill_grace_ms: u64,
    /// Per-stream capture cap; the rest is dropped with a marker.
    pub max_output_bytes: usize,
    pub dry_run: bool,
    /// Batch policy: halt on the first failing step.
    pub stop_on_error: bool,
    pub learning_enabled: bool,
    /// Directory holding the learning store blob.
    pub store_dir: PathBuf,
    pub history_limit: usize,
    pub ambiguity_margin: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            kill_grace_ms: 5_000,
            max_output_bytes: 10 * 1024 * 1024,
            dry_run: false,
            stop_on_error: false,
            learning_enabled: true,
            store_dir: default_store_dir(),
            history_limit: 1_000,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
        }
    }
}

impl PipelineConfig {
    /// Defaults, overlaid with `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `HUMANIX_*` overrides. Unparseable values are ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("HUMANIX_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.default_timeout_ms = v;
        }
        if let Some(v) = lookup("HUMANIX_KILL_GRACE_MS").and_then(|v| v.parse().ok()) {
            self.kill_grace_ms = v;
        }
        if let Some(v) = lookup("HUMANIX_DRY_RUN").and_then(|v| parse_flag(&v)) {
            self.dry_run = v;
        }
        if let Some(v) = lookup("HUMANIX_STOP_ON_ERROR").and_then(|v| parse_flag(&v)) {
            self.stop_on_error = v;
        }
        if let Some(v) = lookup("HUMANIX_LEARNING").and_then(|v| parse_flag(&v)) {
            self.learning_enabled = v;
        }
        if let Some(v) = lookup("HUMANIX_STORE_DIR") {
            self.store_dir = PathBuf::from(v);
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_store_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config").join("humanix"),
        None => PathBuf::from(".humanix"),
    }
}
