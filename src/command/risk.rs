//! Table-driven risk tiers. Only the program, its arguments and the sudo
//! flag are consulted, never anything about the running system.

use super::types::{
    CommandSpec, RiskTier, GARBAGE_COLLECT_PROGRAM, LOG_PROGRAM, PACKAGE_PROGRAM,
    SERVICE_PROGRAM, SYSTEM_REBUILD_PROGRAM,
};

pub fn classify(spec: &CommandSpec) -> RiskTier {
    let first = spec.args.first().map(String::as_str);

    if spec.program == SYSTEM_REBUILD_PROGRAM {
        return RiskTier::Dangerous;
    }
    if spec.program == SERVICE_PROGRAM
        && spec.requires_sudo
        && matches!(first, Some("stop") | Some("disable"))
    {
        return RiskTier::Dangerous;
    }

    if !spec.requires_sudo && is_read_only(spec) {
        return RiskTier::Safe;
    }

    RiskTier::Moderate
}

/// Query, status and log commands.
pub fn is_read_only(spec: &CommandSpec) -> bool {
    let first = spec.args.first().map(String::as_str);
    match spec.program.as_str() {
        LOG_PROGRAM => true,
        SERVICE_PROGRAM => first == Some("status"),
        PACKAGE_PROGRAM => first.is_some_and(|a| a.starts_with("-q")),
        _ => false,
    }
}

/// Commands that touch the package profile or system generation and must
/// hold the executor's mutation lock.
pub fn is_mutating(spec: &CommandSpec) -> bool {
    if is_read_only(spec) {
        return false;
    }
    spec.requires_sudo
        || matches!(
            spec.program.as_str(),
            PACKAGE_PROGRAM | SYSTEM_REBUILD_PROGRAM | GARBAGE_COLLECT_PROGRAM
        )
}

/// Whether the executor must ask first. Dangerous always asks.
pub fn needs_confirmation(spec: &CommandSpec) -> bool {
    spec.requires_confirmation || classify(spec) == RiskTier::Dangerous
}
