use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SPLITTER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s*(?:and\s+|then\s+)?|\s+(?:and then|and|then|after that|next|finally)\s+").ok()
});
static DEV_ENVIRONMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)set\s*up\s+(?:a\s+)?(\w+)\s+(?:dev|development)\s+environment").ok()
});
static MAINTENANCE_ROUTINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:do\s+)?(?:system\s+)?maintenance$|clean\s*up\s+everything").ok()
});

/// Verbs a bare follow-on item inherits ("install git and vim").
const CARRIED_VERBS: &[&str] = &["install", "remove", "uninstall"];

fn dev_packages(language: &str) -> Vec<String> {
    let fixed: &[&str] = match language {
        "python" => &["python3", "python3-pip", "python3-venv", "ipython"],
        "javascript" | "node" => &["nodejs", "npm", "yarn"],
        "rust" => &["rustc", "cargo", "rust-analyzer"],
        "go" => &["go", "gopls"],
        "java" => &["openjdk", "maven", "gradle"],
        _ => return vec![format!("{}-dev", language)],
    };
    fixed.iter().map(|p| p.to_string()).collect()
}

/// Fixed multi-step routines, or `None` if `text` is not one of them.
pub fn expand_routine(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if let Some(caps) = DEV_ENVIRONMENT.as_ref().and_then(|re| re.captures(text)) {
        let language = caps.get(1)?.as_str().to_lowercase();
        return Some(
            dev_packages(&language)
                .into_iter()
                .map(|pkg| format!("install {}", pkg))
                .collect(),
        );
    }
    if MAINTENANCE_ROUTINE.as_ref().is_some_and(|re| re.is_match(text)) {
        return Some(vec!["update system".to_string(), "free up space".to_string()]);
    }
    None
}

/// Split on conjunctions and sequence words. Single-word items after an
/// install/remove step borrow its verb.
pub fn split_requests(text: &str) -> Vec<String> {
    let Some(re) = SPLITTER.as_ref() else {
        return vec![text.trim().to_string()];
    };
    let mut parts: Vec<String> = Vec::new();
    let mut verb: Option<&str> = None;
    for part in re.split(text).map(str::trim).filter(|p| !p.is_empty()) {
        let first = part.split_whitespace().next().unwrap_or("").to_lowercase();
        if let Some(carried) = CARRIED_VERBS.iter().find(|v| **v == first) {
            verb = Some(carried);
            parts.push(part.to_string());
        } else if let (Some(v), false) = (verb, part.contains(' ')) {
            parts.push(format!("{} {}", v, part));
        } else {
            verb = None;
            parts.push(part.to_string());
        }
    }
    parts
}

/// Sub-requests for `text`, or `None` when it is a single request.
pub fn parse_batch(text: &str) -> Option<Vec<String>> {
    if let Some(steps) = expand_routine(text) {
        return Some(steps);
    }
    let parts = split_requests(text);
    (parts.len() > 1).then_some(parts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStep {
    pub input: String,
    pub status: StepStatus,
    /// First output line on success, the reason otherwise.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub steps: Vec<BatchStep>,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn push(&mut self, step: BatchStep) {
        match step.status {
            StepStatus::Succeeded => self.successful += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
        }
        self.steps.push(step);
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

pub fn format_batch_result(result: &BatchResult) -> String {
    let mut lines = vec![
        format!("Completed {} operations:", result.steps.len()),
        format!("Successful: {}", result.successful),
    ];
    if result.failed > 0 {
        lines.push(format!("Failed: {}", result.failed));
    }
    if result.skipped > 0 {
        lines.push(format!("Skipped: {}", result.skipped));
    }
    lines.push(String::new());

    for (i, step) in result.steps.iter().enumerate() {
        let mark = match step.status {
            StepStatus::Succeeded => "[ok]",
            StepStatus::Failed => "[failed]",
            StepStatus::Skipped => "[skipped]",
        };
        lines.push(format!("{} {}. {}", mark, i + 1, step.input));
        if let Some(detail) = step.detail.as_deref().filter(|d| !d.is_empty()) {
            lines.push(format!("   -> {}", detail));
        }
    }
    lines.join("\n")
}
