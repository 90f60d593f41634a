use humanix::command::risk::{is_mutating, is_read_only};
use humanix::command::{build, classify, explain_command, CommandSpec, RiskTier};
use humanix::error::BuildError;
use humanix::intent::{recognize, Entity, EntityKind, Intent, IntentKind};
use humanix::memory::LearningState;

fn spec_for(text: &str) -> CommandSpec {
    let intent = recognize(text, &LearningState::default());
    build(&intent).unwrap_or_else(|e| panic!("{:?} should build, got {}", text, e))
}

fn question_for(text: &str) -> String {
    let intent = recognize(text, &LearningState::default());
    match build(&intent) {
        Ok(spec) => panic!("{:?} should not build, got {:?}", text, spec),
        Err(e) => e.question().to_string(),
    }
}

#[test]
fn test_scenario_a_install_firefox() {
    let spec = spec_for("I need a web browser");
    assert_eq!(spec.program, "nix-env");
    assert!(spec.args.iter().any(|a| a.contains("firefox")));
    assert!(spec.requires_confirmation);
    assert!(spec.supports_dry_run);
    assert!(!spec.requires_sudo);
    assert_eq!(classify(&spec), RiskTier::Moderate);
    let rollback = spec.rollback.expect("Installs can be rolled back");
    assert_eq!(rollback.args, vec!["--rollback".to_string()]);
}

#[test]
fn test_scenario_b_update_is_dangerous() {
    let spec = spec_for("update my system");
    assert_eq!(spec.program, "nixos-rebuild");
    assert_eq!(spec.args, vec!["switch".to_string(), "--upgrade".to_string()]);
    assert!(spec.requires_sudo);
    assert!(spec.requires_confirmation);
    assert_eq!(classify(&spec), RiskTier::Dangerous);
    let rollback = spec.rollback.expect("Rebuilds can be rolled back");
    assert_eq!(rollback.args, vec!["switch".to_string(), "--rollback".to_string()]);
    assert!(rollback.requires_sudo);
}

#[test]
fn test_scenario_c_network_check_is_safe() {
    let spec = spec_for("my internet isn't working");
    assert_eq!(spec.program, "systemctl");
    assert_eq!(spec.args, vec!["status".to_string(), "NetworkManager".to_string()]);
    assert_eq!(classify(&spec), RiskTier::Safe);
    assert!(!spec.requires_confirmation);
}

#[test]
fn test_scenario_d_unknown_does_not_build() {
    let intent = recognize("asdkjasd", &LearningState::default());
    assert!(matches!(build(&intent), Err(BuildError::Unsupported { .. })));
}

#[test]
fn test_service_flags_follow_action() {
    let status = spec_for("is nginx running");
    assert_eq!(status.args, vec!["status".to_string(), "nginx".to_string()]);
    assert!(!status.requires_sudo && !status.requires_confirmation);
    assert_eq!(classify(&status), RiskTier::Safe);

    let start = spec_for("start docker");
    assert!(start.requires_sudo);
    assert!(!start.requires_confirmation);
    assert_eq!(classify(&start), RiskTier::Moderate);

    let restart = spec_for("restart ssh");
    assert!(restart.requires_sudo && restart.requires_confirmation);

    let stop = spec_for("stop docker");
    assert!(stop.requires_sudo && stop.requires_confirmation);
    assert_eq!(classify(&stop), RiskTier::Dangerous);
}

#[test]
fn test_maintenance_logs_and_config() {
    let gc = spec_for("free up space");
    assert_eq!(gc.program, "nix-collect-garbage");
    assert_eq!(gc.args, vec!["-d".to_string()]);
    assert!(gc.requires_confirmation && gc.supports_dry_run);
    assert!(gc.rollback.is_none());

    let logs = spec_for("show recent errors");
    assert_eq!(logs.program, "journalctl");
    assert_eq!(logs.args, vec!["-xe", "--no-pager", "-n", "100", "-p", "err"]);
    assert_eq!(classify(&logs), RiskTier::Safe);

    let bigger = spec_for("make the text bigger");
    assert_eq!(bigger.program, "gsettings");
    assert_eq!(bigger.args.last().map(String::as_str), Some("1.2"));
    assert!(bigger.requires_confirmation);
    assert!(!bigger.supports_dry_run);

    let query = spec_for("what's installed");
    assert_eq!(query.args, vec!["-q".to_string()]);
    assert!(is_read_only(&query));
}

#[test]
fn test_missing_entities_become_questions() {
    assert_eq!(question_for("i need a really weird thing"), "What would you like to install?");
    assert_eq!(question_for("help me change my settings"), "Which setting would you like to change?");
    assert!(question_for("my printer isn't working").contains("print problems"));
    assert!(question_for("make the sound louder").starts_with("Right now I can only change the text size"));

    let bare = Intent::new(IntentKind::Remove, 0.95, Vec::new(), "remove");
    match build(&bare) {
        Err(BuildError::MissingEntity { entity, question, .. }) => {
            assert_eq!(entity, "package");
            assert_eq!(question, "What would you like to remove?");
        }
        other => panic!("Expected a missing package, got {:?}", other),
    }
}

#[test]
fn test_hostile_entity_values_are_refused() {
    for value in ["firefox; rm -rf /", "--upgrade", "$(reboot)", ""] {
        let intent = Intent::new(
            IntentKind::Install,
            0.95,
            vec![Entity::new(EntityKind::Package, value, 0.9)],
            "install",
        );
        assert!(build(&intent).is_err(), "{:?} must not reach an argument vector", value);
    }
}

#[test]
fn test_build_is_repeatable() {
    for text in ["install firefox", "update my system", "stop docker", "show logs", "free up space"] {
        let intent = recognize(text, &LearningState::default());
        let first = build(&intent).expect("builds");
        for _ in 0..3 {
            assert_eq!(build(&intent).expect("builds"), first, "Build drifted for {:?}", text);
        }
    }
}

#[test]
fn test_dangerous_always_confirms() {
    let texts = [
        "install firefox",
        "remove vlc",
        "update my system",
        "what's installed",
        "restart ssh",
        "stop docker",
        "disable bluetooth",
        "free up space",
        "show logs",
        "my wifi isn't working",
        "make the text smaller",
    ];
    for text in texts {
        let spec = spec_for(text);
        if classify(&spec) == RiskTier::Dangerous {
            assert!(spec.requires_confirmation, "{:?} is dangerous but unconfirmed", text);
        }
    }
}

#[test]
fn test_classifier_is_table_driven() {
    let rebuild = CommandSpec::new("nixos-rebuild", vec!["switch".to_string()], "Rebuild");
    assert_eq!(classify(&rebuild), RiskTier::Dangerous);

    let unprivileged_stop = CommandSpec::new("systemctl", vec!["stop".into(), "x".into()], "Stop x");
    assert_eq!(classify(&unprivileged_stop), RiskTier::Moderate);

    let install = CommandSpec::new("nix-env", vec!["-iA".into(), "nixpkgs.vlc".into()], "Install vlc");
    assert!(is_mutating(&install));
    assert!(!is_mutating(&CommandSpec::new("nix-env", vec!["-q".into()], "List")));
}

#[test]
fn test_explanation_mentions_sudo_and_rollback() {
    let text = explain_command(&spec_for("update my system"));
    assert!(text.contains("nixos-rebuild switch --upgrade"));
    assert!(text.contains("administrator"));
    assert!(text.contains("undone"));

    let safe = explain_command(&spec_for("show logs"));
    assert!(safe.contains("changes nothing"));
}
