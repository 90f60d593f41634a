//! Raw stderr to plain language. Each failure family is a case-insensitive
//! pattern; the first family that matches decides the message.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureExplanation {
    pub message: String,
    pub suggestion: String,
    pub can_retry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureFamily {
    Network,
    PackageMissing,
    Permission,
    DiskFull,
    AlreadyInstalled,
    BuildFailed,
    UnitMissing,
    SyntaxError,
    GenerationMissing,
    CommandMissing,
}

const FAMILY_PATTERNS: &[(FailureFamily, &str)] = &[
    (FailureFamily::Network, r"(?i)network|connection|download|timed? ?out|could not resolve"),
    (FailureFamily::PackageMissing, r"(?i)attribute.*missing|package.*not found"),
    (FailureFamily::Permission, r"(?i)permission denied|unauthorized|sudo"),
    (FailureFamily::DiskFull, r"(?i)no space|disk full"),
    (FailureFamily::AlreadyInstalled, r"(?i)already installed|collision between"),
    (FailureFamily::BuildFailed, r"(?i)build.*failed|compilation error"),
    (FailureFamily::UnitMissing, r"(?i)unit.*not found|service.*not found"),
    (FailureFamily::SyntaxError, r"(?i)syntax error|parse error"),
    (FailureFamily::GenerationMissing, r"(?i)generation.*does not exist"),
    (FailureFamily::CommandMissing, r"(?i)command not found|no such file or directory"),
];

static FAMILIES: LazyLock<Vec<(FailureFamily, Regex)>> = LazyLock::new(|| {
    FAMILY_PATTERNS
        .iter()
        .filter_map(|(family, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((*family, re)),
            Err(e) => {
                warn!("Dropping failure pattern {:?}: {}", family, e);
                None
            }
        })
        .collect()
});

static QUOTED_ATTRIBUTE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"attribute\s+'([^']+)'").ok());
static UNIT_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)unit\s+([^\s.]+(?:\.service)?)").ok());

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
    re.as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

fn explanation(message: impl Into<String>, suggestion: &str, can_retry: bool) -> FailureExplanation {
    FailureExplanation {
        message: message.into(),
        suggestion: suggestion.to_string(),
        can_retry,
    }
}

/// Translate a failure. `subject` names what the command was about
/// (a package or a unit) and is used when stderr doesn't say.
pub fn explain_failure(stderr: &str, subject: Option<&str>) -> FailureExplanation {
    let family = FAMILIES
        .iter()
        .find(|(_, re)| re.is_match(stderr))
        .map(|(family, _)| *family);

    match family {
        Some(FailureFamily::Network) => explanation(
            "I'm having trouble connecting to the internet.",
            "Check your network connection and try again.",
            true,
        ),
        Some(FailureFamily::PackageMissing) => {
            let name = capture(&QUOTED_ATTRIBUTE, stderr)
                .map(|attr| attr.trim_start_matches("nixpkgs.").to_string())
                .or_else(|| subject.map(str::to_string))
                .unwrap_or_else(|| "that package".to_string());
            explanation(
                format!("I couldn't find {} in the package repository.", name),
                "Try searching for a similar package or check the spelling.",
                false,
            )
        }
        Some(FailureFamily::Permission) => explanation(
            "I need administrator privileges to do that.",
            "Try again from an account that can use sudo.",
            true,
        ),
        Some(FailureFamily::DiskFull) => explanation(
            "Your disk is full and I can't complete this operation.",
            "Free up some space and try again. You can say 'free up space' to clean old packages.",
            true,
        ),
        Some(FailureFamily::AlreadyInstalled) => explanation(
            "That package is already installed.",
            "If you want a newer version, try 'update my system' instead.",
            false,
        ),
        Some(FailureFamily::BuildFailed) => explanation(
            "The package failed to build.",
            "This might be a temporary issue. Try again later.",
            true,
        ),
        Some(FailureFamily::UnitMissing) => {
            let name = capture(&UNIT_NAME, stderr)
                .or_else(|| subject.map(str::to_string))
                .unwrap_or_else(|| "that name".to_string());
            explanation(
                format!("I couldn't find a service called {}.", name),
                "Check the service name and try again.",
                false,
            )
        }
        Some(FailureFamily::SyntaxError) => explanation(
            "There's a problem with your system configuration.",
            "Check your configuration.nix file for syntax errors.",
            false,
        ),
        Some(FailureFamily::GenerationMissing) => explanation(
            "I couldn't find that system generation to roll back to.",
            "There may be no earlier generation to return to.",
            false,
        ),
        Some(FailureFamily::CommandMissing) => explanation(
            "That command isn't available on your system.",
            "The command might need to be installed first.",
            false,
        ),
        None => explanation(
            "Something went wrong while running that command.",
            "Check the technical details or try a simpler request.",
            true,
        ),
    }
}

pub fn format_failure(explanation: &FailureExplanation) -> String {
    let mut out = explanation.message.clone();
    if !explanation.suggestion.is_empty() {
        out.push(' ');
        out.push_str(&explanation.suggestion);
    }
    if explanation.can_retry {
        out.push_str(" Would you like me to try again?");
    }
    out
}
