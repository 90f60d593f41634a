use regex::Regex;
use std::sync::Arc;
use std::sync::LazyLock;

static PERCENT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\d{1,3})%").ok());
static STEP: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[(\d+)/(\d+)\]").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub message: String,
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Best-effort progress from one line of tool output.
/// Understands `NN%`, `[n/m]` counters and nix's "copying path" lines.
pub fn parse_progress(line: &str) -> Option<Progress> {
    let message = line.trim().to_string();

    if let Some(caps) = PERCENT.as_ref().and_then(|re| re.captures(line)) {
        if let Ok(p) = caps[1].parse::<u32>() {
            return Some(Progress {
                percent: p.min(100) as u8,
                message,
            });
        }
    }

    if let Some(caps) = STEP.as_ref().and_then(|re| re.captures(line)) {
        let done = caps[1].parse::<u64>().ok()?;
        let total = caps[2].parse::<u64>().ok()?;
        if total > 0 {
            return Some(Progress {
                percent: (u128::from(done.min(total)) * 100 / u128::from(total)) as u8,
                message,
            });
        }
    }

    if line.contains("copying path") {
        return Some(Progress {
            percent: 50,
            message,
        });
    }

    None
}
