use serde::{Deserialize, Serialize};

use crate::command::types::CommandSpec;
use crate::executor::ExecutionResult;
use crate::intent::entities::ServiceAction;
use crate::intent::types::{EntityKind, Intent, IntentKind};

pub const CANCELLED_TEXT: &str = "Command cancelled.";
pub const INTERNAL_ERROR_TEXT: &str = "An unexpected error occurred. Please try again.";
pub const UNKNOWN_TEXT: &str = "I didn't understand that. Try rephrasing it.";

/// What a front end gets back for one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub response_text: String,
    pub command_run: Option<String>,
    pub output: Option<String>,
    pub suggestions: Vec<String>,
    pub duration_ms: u64,
    pub needs_clarification: bool,
    /// Raw technical detail, kept out of `response_text`.
    pub error: Option<String>,
}

impl Response {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response_text: text.into(),
            ..Self::default()
        }
    }

    pub fn fail(text: impl Into<String>) -> Self {
        Self {
            success: false,
            response_text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command_run = command;
        self
    }

    pub fn with_output(mut self, output: &str) -> Self {
        if !output.trim().is_empty() {
            self.output = Some(output.to_string());
        }
        self
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn clarifying(mut self) -> Self {
        self.needs_clarification = true;
        self
    }

    pub fn took(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Plain-language account of a successful run.
pub fn success_text(intent: &Intent, spec: &CommandSpec, result: &ExecutionResult) -> String {
    if result.dry_run {
        return if spec.supports_dry_run {
            format!("Preview only: here is what \"{}\" would do. Nothing was changed.", spec.description)
        } else {
            result.output.clone()
        };
    }

    let package = intent.entity(EntityKind::Package).unwrap_or("the package");
    match intent.kind {
        IntentKind::Install => format!(
            "Great! I've installed {} for you. You can find it in your applications menu.",
            package
        ),
        IntentKind::Remove => format!("I've removed {} from your system.", package),
        IntentKind::Update => "Your system is now up to date!".to_string(),
        IntentKind::Query => {
            let count = result.output.lines().filter(|l| !l.trim().is_empty()).count();
            format!("You have {} packages installed.", count)
        }
        IntentKind::Service => {
            let action = spec.args.first().map(|a| ServiceAction::parse(a)).unwrap_or(ServiceAction::Status);
            let unit = spec.args.get(1).map(String::as_str).unwrap_or("the service");
            match action {
                ServiceAction::Status if is_running(&result.output) => {
                    format!("I've checked {}. It's running.", unit)
                }
                ServiceAction::Status => format!("I've checked {}. It's not running.", unit),
                ServiceAction::Start => format!("Started {}.", unit),
                ServiceAction::Stop => format!("Stopped {}.", unit),
                ServiceAction::Restart => format!("Restarted {}.", unit),
                ServiceAction::Enable => format!("{} will now start automatically.", unit),
                ServiceAction::Disable => format!("{} will no longer start automatically.", unit),
            }
        }
        IntentKind::Maintenance => "I've cleaned up old packages and freed up disk space!".to_string(),
        IntentKind::Logs => "Here are the recent system logs.".to_string(),
        IntentKind::Troubleshoot => "I've checked the network status. See the details below.".to_string(),
        IntentKind::Config => "Settings updated successfully!".to_string(),
        IntentKind::Unknown => format!("Done! {} completed successfully.", spec.description),
    }
}

fn is_running(status_output: &str) -> bool {
    status_output
        .lines()
        .any(|l| l.trim_start().starts_with("Active: active"))
}
