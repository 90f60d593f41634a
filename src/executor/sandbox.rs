//! Policy applied around every spawned process: what it may touch, what
//! environment it sees, what it is never allowed to be.

use serde::{Deserialize, Serialize};

use crate::command::types::CommandSpec;
use crate::error::RunError;

pub const SANDBOX_PATH: &str = "/run/current-system/sw/bin:/nix/var/nix/profiles/default/bin";
/// The setuid wrapper. The sandbox PATH does not include `/run/wrappers/bin`.
pub const SUDO_PROGRAM: &str = "/run/wrappers/bin/sudo";
pub const TRUNCATION_MARKER: &str = "[OUTPUT TRUNCATED]";
pub const TIMEOUT_MARKER: &str = "[EXECUTION TIMEOUT]";

const NETWORK_PROGRAMS: &[&str] = &["nix-env", "nixos-rebuild", "nix-channel"];
const NETWORK_ARGS: &[&str] = &["-i", "-iA", "--install", "--upgrade", "update"];

const FILE_WRITE_PROGRAMS: &[&str] = &[
    "nix-env",
    "nixos-rebuild",
    "nix-collect-garbage",
    "systemctl",
    "gsettings",
];
const FILE_WRITE_ARGS: &[&str] = &[
    "-i", "-iA", "-e", "-d", "--install", "--uninstall", "--rollback", "switch", "enable",
    "disable", "set",
];

const BLOCKED_PROGRAMS: &[&str] = &["rm", "dd", "mkfs", "fdisk", "shred", "chmod", "chown", "sh", "bash"];
const SHELL_METACHARACTERS: &[char] = &[';', '&', '|', '$', '`', '<', '>', '\n', '\r'];

const PROXY_VARS: &[&str] = &["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY", "all_proxy", "ALL_PROXY"];
const SECRET_MARKERS: &[&str] = &["password", "passwd", "token", "secret", "api-key", "apikey"];

/// What a command is allowed to reach. Derived only from program + args.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub network: bool,
    pub file_write: bool,
}

pub fn capabilities_for(program: &str, args: &[String]) -> Capabilities {
    let has_arg = |set: &[&str]| args.iter().any(|a| set.contains(&a.as_str()));
    Capabilities {
        network: NETWORK_PROGRAMS.contains(&program) && has_arg(NETWORK_ARGS),
        file_write: FILE_WRITE_PROGRAMS.contains(&program) && has_arg(FILE_WRITE_ARGS),
    }
}

/// Minimal environment for the child. Everything else is cleared.
pub fn sandbox_env(caps: Capabilities, lookup: impl Fn(&str) -> Option<String>) -> Vec<(String, String)> {
    let mut env = vec![
        ("PATH".to_string(), SANDBOX_PATH.to_string()),
        (
            "HOME".to_string(),
            lookup("HOME").unwrap_or_else(|| "/tmp".to_string()),
        ),
        (
            "LANG".to_string(),
            lookup("LANG").unwrap_or_else(|| "C.UTF-8".to_string()),
        ),
    ];
    if let Some(nix_path) = lookup("NIX_PATH") {
        env.push(("NIX_PATH".to_string(), nix_path));
    }
    for var in PROXY_VARS {
        if caps.network {
            if let Some(value) = lookup(var) {
                env.push((var.to_string(), value));
            }
        } else {
            env.push((var.to_string(), String::new()));
        }
    }
    env
}

/// Reject anything the builder should never have produced.
pub fn validate(spec: &CommandSpec) -> Result<(), RunError> {
    let base = spec.program.rsplit('/').next().unwrap_or(&spec.program);
    if BLOCKED_PROGRAMS.contains(&base) {
        return Err(RunError::Blocked {
            program: spec.program.clone(),
            reason: "program is on the blocklist".to_string(),
        });
    }
    if let Some(bad) = spec
        .args
        .iter()
        .find(|a| a.contains(SHELL_METACHARACTERS))
    {
        return Err(RunError::Blocked {
            program: spec.program.clone(),
            reason: format!("argument {:?} contains shell metacharacters", bad),
        });
    }
    Ok(())
}

/// Arguments with secrets replaced, for logging only.
pub fn sanitize_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut redact_next = false;
    for arg in args {
        let lower = arg.to_lowercase();
        if redact_next {
            out.push("***".to_string());
            redact_next = false;
        } else if let Some((key, _)) = arg.split_once('=') {
            if SECRET_MARKERS.iter().any(|m| key.to_lowercase().contains(m)) {
                out.push(format!("{}=***", key));
            } else {
                out.push(arg.clone());
            }
        } else if lower.starts_with('-') && SECRET_MARKERS.iter().any(|m| lower.contains(m)) {
            out.push(arg.clone());
            redact_next = true;
        } else {
            out.push(arg.clone());
        }
    }
    out
}

/// Append a line to captured output, honoring the byte cap.
/// Returns false once the cap is reached.
pub fn push_capped(buffer: &mut String, line: &str, cap: usize) -> bool {
    if buffer.len() + line.len() + 1 > cap {
        return false;
    }
    buffer.push_str(line);
    buffer.push('\n');
    true
}
