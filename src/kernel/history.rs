use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use uuid::Uuid;

use crate::command::types::RollbackCommand;
use crate::intent::types::IntentKind;

const MAX_HISTORY_SUGGESTIONS: usize = 5;
const MOST_COMMON_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub intent: IntentKind,
    /// Command line that ran, if anything was built.
    pub command: Option<String>,
    pub success: bool,
    pub duration_ms: u64,
    /// Inverse still owed for this entry. Taken by `undo`.
    pub rollback: Option<RollbackCommand>,
}

impl HistoryEntry {
    pub fn new(input: &str, intent: IntentKind, command: Option<String>, success: bool, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input: input.to_string(),
            intent,
            command,
            success,
            duration_ms,
            rollback: None,
        }
    }

    pub fn with_rollback(mut self, rollback: Option<RollbackCommand>) -> Self {
        self.rollback = rollback;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total: usize,
    pub success_rate: f64,
    pub most_common: Vec<(IntentKind, usize)>,
    pub average_duration_ms: f64,
}

/// Bounded request log, newest first.
#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn add(&mut self, entry: HistoryEntry) -> Uuid {
        let id = entry.id;
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
        id
    }

    pub fn recent(&self, n: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().take(n).collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Case-insensitive match on the input or the command line.
    pub fn search(&self, query: &str) -> Vec<&HistoryEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.input.to_lowercase().contains(&query)
                    || e.command
                        .as_deref()
                        .is_some_and(|c| c.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Earlier successful inputs starting with `partial`, newest first.
    pub fn suggestions(&self, partial: &str) -> Vec<String> {
        let partial = partial.trim().to_lowercase();
        let mut out: Vec<String> = Vec::new();
        for entry in self.entries.iter().filter(|e| e.success) {
            if out.len() >= MAX_HISTORY_SUGGESTIONS {
                break;
            }
            if entry.input.to_lowercase().starts_with(&partial) && !out.contains(&entry.input) {
                out.push(entry.input.clone());
            }
        }
        out
    }

    pub fn stats(&self) -> HistoryStats {
        let total = self.entries.len();
        if total == 0 {
            return HistoryStats::default();
        }
        let successes = self.entries.iter().filter(|e| e.success).count();

        let mut counts: BTreeMap<IntentKind, usize> = BTreeMap::new();
        for entry in &self.entries {
            if entry.intent != IntentKind::Unknown {
                *counts.entry(entry.intent).or_insert(0) += 1;
            }
        }
        let mut most_common: Vec<(IntentKind, usize)> = counts.into_iter().collect();
        most_common.sort_by(|a, b| b.1.cmp(&a.1));
        most_common.truncate(MOST_COMMON_LIMIT);

        let total_ms: u64 = self.entries.iter().map(|e| e.duration_ms).sum();
        HistoryStats {
            total,
            success_rate: successes as f64 / total as f64,
            most_common,
            average_duration_ms: total_ms as f64 / total as f64,
        }
    }

    /// Detach the rollback of the newest entry that still has one.
    pub fn take_rollback(&mut self) -> Option<(Uuid, String, RollbackCommand)> {
        let entry = self.entries.iter_mut().find(|e| e.rollback.is_some())?;
        let rollback = entry.rollback.take()?;
        Some((entry.id, entry.input.clone(), rollback))
    }

    /// Put a rollback back after the undo itself failed.
    pub fn restore_rollback(&mut self, id: Uuid, rollback: RollbackCommand) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.rollback = Some(rollback);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
