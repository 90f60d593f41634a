use serde::{Deserialize, Serialize};

/// Package profile manager.
pub const PACKAGE_PROGRAM: &str = "nix-env";
/// Whole-system rebuild.
pub const SYSTEM_REBUILD_PROGRAM: &str = "nixos-rebuild";
pub const SERVICE_PROGRAM: &str = "systemctl";
pub const GARBAGE_COLLECT_PROGRAM: &str = "nix-collect-garbage";
pub const LOG_PROGRAM: &str = "journalctl";
pub const DESKTOP_SETTING_PROGRAM: &str = "gsettings";

/// Argument appended when a dry run is requested.
pub const DRY_RUN_FLAG: &str = "--dry-run";

/// A fixed inverse command. Arguments are a vector; nothing is ever
/// joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackCommand {
    pub program: String,
    pub args: Vec<String>,
    pub requires_sudo: bool,
}

impl RollbackCommand {
    pub fn new(program: &str, args: &[&str], requires_sudo: bool) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            requires_sudo,
        }
    }

    /// The rollback as a runnable spec. Rollbacks never ask again.
    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec {
            program: self.program.clone(),
            args: self.args.clone(),
            requires_sudo: self.requires_sudo,
            requires_confirmation: false,
            supports_dry_run: false,
            description: format!("Rollback: {}", display_command(&self.program, &self.args)),
            rollback: None,
        }
    }
}

/// A fully resolved, not yet executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub requires_sudo: bool,
    pub requires_confirmation: bool,
    pub supports_dry_run: bool,
    pub description: String,
    pub rollback: Option<RollbackCommand>,
}

impl CommandSpec {
    pub fn new(program: &str, args: Vec<String>, description: impl Into<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
            requires_sudo: false,
            requires_confirmation: false,
            supports_dry_run: false,
            description: description.into(),
            rollback: None,
        }
    }

    pub fn sudo(mut self, yes: bool) -> Self {
        self.requires_sudo = yes;
        self
    }

    pub fn confirm(mut self, yes: bool) -> Self {
        self.requires_confirmation = yes;
        self
    }

    pub fn dry_run(mut self, yes: bool) -> Self {
        self.supports_dry_run = yes;
        self
    }

    pub fn rollback(mut self, rollback: RollbackCommand) -> Self {
        self.rollback = Some(rollback);
        self
    }

    /// Human-readable form for logs and responses. Never executed.
    pub fn command_line(&self) -> String {
        let line = display_command(&self.program, &self.args);
        if self.requires_sudo {
            format!("sudo {}", line)
        } else {
            line
        }
    }
}

pub fn display_command(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Safe,
    Moderate,
    Dangerous,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Safe => "safe",
            RiskTier::Moderate => "moderate",
            RiskTier::Dangerous => "dangerous",
        }
    }
}
