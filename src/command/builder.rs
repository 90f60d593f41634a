use crate::error::BuildError;
use crate::intent::entities::{ProblemCategory, ServiceAction};
use crate::intent::types::{EntityKind, Intent, IntentKind};

use super::risk::{classify, is_mutating};
use super::types::{
    CommandSpec, RiskTier, RollbackCommand, DESKTOP_SETTING_PROGRAM, GARBAGE_COLLECT_PROGRAM,
    LOG_PROGRAM, PACKAGE_PROGRAM, SERVICE_PROGRAM, SYSTEM_REBUILD_PROGRAM,
};

const GNOME_INTERFACE_SCHEMA: &str = "org.gnome.desktop.interface";
const TEXT_SCALING_KEY: &str = "text-scaling-factor";
const LARGER_TEXT_SCALE: &str = "1.2";
const SMALLER_TEXT_SCALE: &str = "0.9";

/// Intent -> command. Pure: no filesystem, network or process access.
pub fn build(intent: &Intent) -> Result<CommandSpec, BuildError> {
    let spec = match intent.kind {
        IntentKind::Install => {
            let pkg = package(intent, "What would you like to install?")?;
            CommandSpec::new(
                PACKAGE_PROGRAM,
                vec!["-iA".to_string(), format!("nixpkgs.{}", pkg)],
                format!("Install {}", pkg),
            )
            .confirm(true)
            .dry_run(true)
            .rollback(package_rollback())
        }
        IntentKind::Remove => {
            let pkg = package(intent, "What would you like to remove?")?;
            CommandSpec::new(
                PACKAGE_PROGRAM,
                vec!["-e".to_string(), pkg.clone()],
                format!("Remove {}", pkg),
            )
            .confirm(true)
            .dry_run(true)
            .rollback(package_rollback())
        }
        IntentKind::Update => CommandSpec::new(
            SYSTEM_REBUILD_PROGRAM,
            args(&["switch", "--upgrade"]),
            "Update the whole system",
        )
        .sudo(true)
        .confirm(true)
        .dry_run(true)
        .rollback(RollbackCommand::new(
            SYSTEM_REBUILD_PROGRAM,
            &["switch", "--rollback"],
            true,
        )),
        IntentKind::Query => {
            CommandSpec::new(PACKAGE_PROGRAM, args(&["-q"]), "List installed packages")
        }
        IntentKind::Service => {
            let svc = intent
                .entity(EntityKind::Service)
                .filter(|s| is_identifier(s))
                .ok_or_else(|| BuildError::MissingEntity {
                    intent: IntentKind::Service,
                    entity: "service",
                    question: "Which service would you like to manage?".to_string(),
                })?;
            let action = ServiceAction::parse(intent.entity(EntityKind::Action).unwrap_or("status"));
            let description = match action {
                ServiceAction::Status => format!("Check the status of {}", svc),
                other => format!("{} {}", capitalize(other.as_str()), svc),
            };
            CommandSpec::new(
                SERVICE_PROGRAM,
                vec![action.as_str().to_string(), svc.to_string()],
                description,
            )
            .sudo(action.needs_sudo())
            .confirm(action.needs_confirmation())
        }
        IntentKind::Maintenance => {
            let collect = intent.entity(EntityKind::Action) == Some("garbage-collection");
            let gc_args = if collect { args(&["-d"]) } else { Vec::new() };
            CommandSpec::new(
                GARBAGE_COLLECT_PROGRAM,
                gc_args,
                "Delete old generations and unused packages",
            )
            .confirm(true)
            .dry_run(true)
        }
        IntentKind::Logs => {
            let mut log_args = args(&["-xe", "--no-pager"]);
            let mut description = String::from("Show system logs");
            if intent.entity(EntityKind::Timeframe) == Some("recent") {
                log_args.extend(args(&["-n", "100"]));
                description = String::from("Show recent system logs");
            }
            if intent.entity(EntityKind::LogType) == Some("errors") {
                log_args.extend(args(&["-p", "err"]));
                description.push_str(" (errors only)");
            }
            CommandSpec::new(LOG_PROGRAM, log_args, description)
        }
        IntentKind::Troubleshoot => {
            let problem = intent.entity(EntityKind::Problem).map(ProblemCategory::parse);
            match problem {
                Some(ProblemCategory::Network) => CommandSpec::new(
                    SERVICE_PROGRAM,
                    args(&["status", "NetworkManager"]),
                    "Check the network service",
                ),
                Some(ProblemCategory::General) | None => {
                    return Err(BuildError::MissingEntity {
                        intent: IntentKind::Troubleshoot,
                        entity: "problem",
                        question: "What kind of problem are you experiencing?".to_string(),
                    })
                }
                Some(other) => {
                    return Err(BuildError::Unsupported {
                        intent: IntentKind::Troubleshoot,
                        question: format!(
                            "I can't diagnose {} problems yet. What specific issue are you experiencing?",
                            other.as_str()
                        ),
                    })
                }
            }
        }
        IntentKind::Config => {
            let scale = match intent.entity(EntityKind::Setting) {
                Some("font-size-increase") => LARGER_TEXT_SCALE,
                Some("font-size-decrease") => SMALLER_TEXT_SCALE,
                None | Some("general") => {
                    return Err(BuildError::MissingEntity {
                        intent: IntentKind::Config,
                        entity: "setting",
                        question: "Which setting would you like to change?".to_string(),
                    })
                }
                Some(_) => {
                    return Err(BuildError::Unsupported {
                        intent: IntentKind::Config,
                        question: "Right now I can only change the text size. Try \"make the text bigger\" or \"make the text smaller\".".to_string(),
                    })
                }
            };
            let verb = if scale == LARGER_TEXT_SCALE { "Enlarge" } else { "Shrink" };
            CommandSpec::new(
                DESKTOP_SETTING_PROGRAM,
                args(&["set", GNOME_INTERFACE_SCHEMA, TEXT_SCALING_KEY, scale]),
                format!("{} the desktop text", verb),
            )
            .confirm(true)
        }
        IntentKind::Unknown => {
            return Err(BuildError::Unsupported {
                intent: IntentKind::Unknown,
                question: "I didn't understand that. Could you rephrase it?".to_string(),
            })
        }
    };

    Ok(enforce_confirmation(spec))
}

/// Dangerous commands always ask, whatever the table above said.
fn enforce_confirmation(mut spec: CommandSpec) -> CommandSpec {
    if classify(&spec) == RiskTier::Dangerous {
        spec.requires_confirmation = true;
    }
    spec
}

/// Plain-language account of what a spec would do, for `explain:` requests
/// and confirmation prompts.
pub fn explain_command(spec: &CommandSpec) -> String {
    let mut out = format!("{}. This runs `{}`.", spec.description, spec.command_line());
    if spec.requires_sudo {
        out.push_str(" It needs administrator rights.");
    }
    match classify(spec) {
        RiskTier::Safe => out.push_str(" It only reads information and changes nothing."),
        RiskTier::Moderate if is_mutating(spec) => out.push_str(" It changes installed software."),
        RiskTier::Moderate => {}
        RiskTier::Dangerous => out.push_str(" It changes the whole system."),
    }
    if spec.requires_confirmation {
        out.push_str(" I'll ask before running it.");
    }
    if let Some(rollback) = &spec.rollback {
        out.push_str(&format!(
            " It can be undone with `{}`.",
            super::types::display_command(&rollback.program, &rollback.args)
        ));
    }
    out
}

fn package(intent: &Intent, question: &str) -> Result<String, BuildError> {
    intent
        .entity(EntityKind::Package)
        .filter(|p| is_identifier(p))
        .map(str::to_string)
        .ok_or_else(|| BuildError::MissingEntity {
            intent: intent.kind,
            entity: "package",
            question: question.to_string(),
        })
}

fn package_rollback() -> RollbackCommand {
    RollbackCommand::new(PACKAGE_PROGRAM, &["--rollback"], false)
}

/// Package and unit names only; anything else is treated as missing.
fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+'))
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
