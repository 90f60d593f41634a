mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{failed, ok, CountingConfirmer, LogCapture, PanicOnceRunner, SpyRunner};
use humanix::executor::sandbox::SUDO_PROGRAM;
use humanix::executor::{AutoConfirm, Confirmer};
use humanix::intent::IntentKind;
use humanix::kernel::response::{CANCELLED_TEXT, INTERNAL_ERROR_TEXT, UNKNOWN_TEXT};
use humanix::memory::LearningStore;
use humanix::{Orchestrator, PipelineConfig};

fn test_config() -> PipelineConfig {
    PipelineConfig {
        learning_enabled: true,
        ..PipelineConfig::default()
    }
}

fn orchestrator_with(config: PipelineConfig, runner: Arc<SpyRunner>, confirmer: Arc<dyn Confirmer>) -> Orchestrator {
    Orchestrator::new(config, Arc::new(LearningStore::in_memory()), runner, confirmer)
}

fn orchestrator(runner: Arc<SpyRunner>) -> Orchestrator {
    orchestrator_with(test_config(), runner, Arc::new(AutoConfirm(true)))
}

#[tokio::test]
async fn test_scenario_a_web_browser_installs_firefox() {
    let runner = SpyRunner::new();
    let confirmer = CountingConfirmer::new(true);
    let orchestrator = orchestrator_with(test_config(), runner.clone(), confirmer.clone());

    let response = orchestrator.process_request("I need a web browser").await;

    assert!(response.success, "{}", response.response_text);
    assert!(response.response_text.contains("installed firefox"));
    assert!(response.response_text.contains("undo"));
    assert_eq!(response.command_run.as_deref(), Some("nix-env -iA nixpkgs.firefox"));
    assert_eq!(confirmer.asked(), 1, "Installs ask before running");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "nix-env");
    assert_eq!(calls[0].args, vec!["-iA", "nixpkgs.firefox"]);
}

#[tokio::test]
async fn test_scenario_b_update_runs_under_sudo_after_confirmation() {
    let runner = SpyRunner::new();
    let confirmer = CountingConfirmer::new(true);
    let orchestrator = orchestrator_with(test_config(), runner.clone(), confirmer.clone());

    let response = orchestrator.process_request("update my system").await;

    assert!(response.success);
    assert_eq!(response.response_text.split('!').next(), Some("Your system is now up to date"));
    assert_eq!(confirmer.asked(), 1);
    let calls = runner.calls();
    assert_eq!(calls[0].program, SUDO_PROGRAM);
    assert_eq!(calls[0].args, vec!["nixos-rebuild", "switch", "--upgrade"]);
}

#[tokio::test]
async fn test_scenario_b_declined_update_never_spawns() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator_with(test_config(), runner.clone(), CountingConfirmer::new(false));

    let response = orchestrator.process_request("update my system").await;

    assert!(!response.success);
    assert_eq!(response.response_text, CANCELLED_TEXT);
    assert_eq!(runner.call_count(), 0);
    assert_eq!(orchestrator.usage_snapshot().cancellations, 1);
}

#[tokio::test]
async fn test_scenario_c_network_check_runs_without_asking() {
    let runner = SpyRunner::scripted(vec![ok("● NetworkManager.service\n     Active: active (running)\n")]);
    let confirmer = CountingConfirmer::new(false);
    let orchestrator = orchestrator_with(test_config(), runner.clone(), confirmer.clone());

    let response = orchestrator.process_request("my internet isn't working").await;

    assert!(response.success);
    assert_eq!(confirmer.asked(), 0, "Read-only checks never ask");
    assert!(response.output.as_deref().unwrap_or("").contains("Active: active"));
    assert_eq!(runner.calls()[0].args, vec!["status", "NetworkManager"]);
}

#[tokio::test]
async fn test_scenario_d_gibberish_gets_suggestions_not_commands() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("asdkjasd").await;

    assert!(!response.success);
    assert_eq!(response.response_text, UNKNOWN_TEXT);
    assert!(!response.suggestions.is_empty());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_scenario_e_correction_is_remembered() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let first = orchestrator.process_request("that coding thing").await;
    assert!(!first.success);
    assert_eq!(runner.call_count(), 0);

    let ack = orchestrator.correct_last(IntentKind::Install, Some("VSCode"));
    assert!(ack.success, "{}", ack.response_text);
    assert!(ack.response_text.starts_with("Got it."));
    assert_eq!(orchestrator.learning_stats().accepted_corrections, 1);

    let second = orchestrator.process_request("that coding thing").await;
    assert!(second.success, "{}", second.response_text);
    assert_eq!(runner.calls()[0].args, vec!["-iA", "nixpkgs.vscode"]);
}

#[tokio::test]
async fn test_correction_needs_an_earlier_request() {
    let orchestrator = orchestrator(SpyRunner::new());
    let response = orchestrator.correct_last(IntentKind::Install, Some("vlc"));
    assert!(!response.success);
    assert_eq!(response.response_text, "There's no earlier request to correct.");
}

#[tokio::test]
async fn test_correction_refused_when_learning_is_off() {
    let config = PipelineConfig {
        learning_enabled: false,
        ..PipelineConfig::default()
    };
    let orchestrator = orchestrator_with(config, SpyRunner::new(), Arc::new(AutoConfirm(true)));
    orchestrator.process_request("that coding thing").await;

    let response = orchestrator.correct_last(IntentKind::Install, Some("vscode"));
    assert!(!response.success);
    assert!(response.response_text.starts_with("Learning is turned off"));
    assert_eq!(orchestrator.learning_stats().total_corrections, 0);
}

#[tokio::test]
async fn test_close_readings_ask_instead_of_running() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator
        .process_request("tell me what needs a fix for this problem")
        .await;

    assert!(response.needs_clarification);
    assert!(!response.success);
    assert!(response.response_text.starts_with("I want to make sure I understand."));
    assert_eq!(response.suggestions.len(), 2);
    assert_eq!(runner.call_count(), 0);
    assert_eq!(orchestrator.usage_snapshot().clarifications, 1);
}

#[tokio::test]
async fn test_missing_package_asks_a_question() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("i need a really weird thing").await;

    assert!(response.needs_clarification);
    assert_eq!(response.response_text, "What would you like to install?");
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_failure_is_explained_in_plain_language() {
    let runner = SpyRunner::scripted(vec![failed(1, "error: attribute 'nixpkgs.frobnicator' missing")]);
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("install frobnicator").await;

    assert!(!response.success);
    assert!(
        response.response_text.contains("I couldn't find frobnicator"),
        "Got: {}",
        response.response_text
    );
    assert!(response.error.as_deref().unwrap_or("").contains("missing"));
    assert!(!response.suggestions.is_empty());
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_slow_command_is_reported_as_timeout() {
    let config = PipelineConfig {
        default_timeout_ms: 50,
        kill_grace_ms: 50,
        ..test_config()
    };
    let orchestrator = orchestrator_with(config, SpyRunner::slow(Duration::from_secs(30)), Arc::new(AutoConfirm(true)));

    let response = orchestrator.process_request("show logs").await;

    assert!(!response.success);
    assert!(response.response_text.starts_with("That took too long"));
    assert_eq!(orchestrator.usage_snapshot().timeouts, 1);
}

#[tokio::test]
async fn test_undo_reverses_last_change_once() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    assert!(orchestrator.process_request("install firefox").await.success);
    let undo = orchestrator.process_request("undo").await;
    assert!(undo.success, "{}", undo.response_text);
    assert_eq!(undo.response_text, "Done. I've reversed \"install firefox\".");

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args, vec!["--rollback"]);

    let again = orchestrator.process_request("undo").await;
    assert!(!again.success);
    assert_eq!(again.response_text, "There's nothing I can undo right now.");
    assert_eq!(runner.call_count(), 2);
}

#[tokio::test]
async fn test_failed_undo_can_be_retried() {
    let runner = SpyRunner::scripted(vec![ok(""), failed(1, "error: permission denied"), ok("")]);
    let orchestrator = orchestrator(runner.clone());

    orchestrator.process_request("install firefox").await;
    let first = orchestrator.process_request("undo").await;
    assert!(!first.success);
    assert!(first.response_text.starts_with("I couldn't undo"));

    let second = orchestrator.process_request("undo").await;
    assert!(second.success, "{}", second.response_text);
    assert_eq!(runner.call_count(), 3);
}

#[tokio::test]
async fn test_meta_commands() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let help = orchestrator.process_request("What can you do?").await;
    assert!(help.success);
    assert!(help.response_text.starts_with("I can help you with:"));

    let empty = orchestrator.process_request("history").await;
    assert_eq!(empty.response_text, "No commands yet.");

    orchestrator.process_request("install firefox").await;
    let history = orchestrator.process_request("show my history").await;
    assert!(history.response_text.contains("1. [ok] install firefox"));

    let stats = orchestrator.process_request("stats").await;
    assert!(stats.response_text.starts_with("Commands: 1"));
    assert!(stats.response_text.contains("Learning:"));
    assert!(stats.response_text.contains("Most used: install (1)"));

    let cleared = orchestrator.process_request("clear history").await;
    assert_eq!(cleared.response_text, "History cleared.");
    assert_eq!(orchestrator.history_stats().total, 0);
    assert_eq!(runner.call_count(), 1, "Meta commands never spawn");
}

#[tokio::test]
async fn test_batch_runs_every_step() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator
        .process_request("install firefox and then install vlc")
        .await;

    assert!(response.success, "{}", response.response_text);
    assert!(response.response_text.starts_with("Completed 2 operations:"));
    assert!(response.response_text.contains("Successful: 2"));
    let packages: Vec<String> = runner.calls().iter().map(|c| c.args[1].clone()).collect();
    assert_eq!(packages, vec!["nixpkgs.firefox", "nixpkgs.vlc"]);
}

#[tokio::test]
async fn test_batch_continues_past_failure_by_default() {
    let runner = SpyRunner::scripted(vec![failed(1, "error: attribute 'nixpkgs.firefox' missing"), ok("")]);
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("install firefox, install vlc").await;

    assert!(!response.success);
    assert!(response.response_text.contains("Successful: 1"));
    assert!(response.response_text.contains("Failed: 1"));
    assert!(response.response_text.contains("[failed] 1. install firefox"));
    assert_eq!(runner.call_count(), 2);
}

#[tokio::test]
async fn test_batch_stops_on_error_when_asked() {
    let runner = SpyRunner::scripted(vec![failed(1, "error: attribute 'nixpkgs.firefox' missing")]);
    let config = PipelineConfig {
        stop_on_error: true,
        ..test_config()
    };
    let orchestrator = orchestrator_with(config, runner.clone(), Arc::new(AutoConfirm(true)));

    let response = orchestrator.process_request("install firefox and vlc").await;

    assert!(!response.success);
    assert!(response.response_text.contains("Skipped: 1"));
    assert!(response.response_text.contains("[skipped] 2. install vlc"));
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_dev_environment_routine_installs_toolchain() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator
        .process_request("set up a python development environment")
        .await;

    assert!(response.success, "{}", response.response_text);
    let packages: Vec<String> = runner.calls().iter().map(|c| c.args[1].clone()).collect();
    assert_eq!(
        packages,
        vec!["nixpkgs.python3", "nixpkgs.python3-pip", "nixpkgs.python3-venv", "nixpkgs.ipython"]
    );
}

#[tokio::test]
async fn test_explain_never_runs_anything() {
    let runner = SpyRunner::new();
    let confirmer = CountingConfirmer::new(true);
    let orchestrator = orchestrator_with(test_config(), runner.clone(), confirmer.clone());

    let response = orchestrator.process_request("explain: update my system").await;

    assert!(response.success);
    assert_eq!(
        response.command_run.as_deref(),
        Some("sudo nixos-rebuild switch --upgrade")
    );
    assert!(response.response_text.contains("administrator"));
    assert_eq!(runner.call_count(), 0);
    assert_eq!(confirmer.asked(), 0);
}

#[tokio::test]
async fn test_preview_uses_dry_run() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("Preview: install firefox").await;
    assert!(response.success);
    assert!(response.response_text.starts_with("Preview only"));
    assert_eq!(runner.calls()[0].args.last().map(String::as_str), Some("--dry-run"));

    let logs = orchestrator.process_request("preview: show logs").await;
    assert!(logs.success);
    assert_eq!(runner.call_count(), 1, "Commands without a preview mode are not run");

    let undo = orchestrator.process_request("undo").await;
    assert!(!undo.success, "Previews leave nothing to undo");
}

#[tokio::test]
async fn test_suggestions_come_from_history() {
    let orchestrator = orchestrator(SpyRunner::new());
    orchestrator.process_request("install firefox").await;

    let suggestions = orchestrator.get_suggestions("inst");
    assert!(suggestions.contains(&"install firefox".to_string()));
    assert!(orchestrator.get_suggestions("zzz").is_empty());
}

#[tokio::test]
async fn test_empty_input_offers_starters() {
    let runner = SpyRunner::new();
    let orchestrator = orchestrator(runner.clone());

    let response = orchestrator.process_request("   ").await;
    assert!(!response.success);
    assert!(!response.suggestions.is_empty());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_running_stops_the_command() {
    let runner = SpyRunner::slow(Duration::from_secs(10));
    let orchestrator = orchestrator(runner.clone());

    let pending = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.process_request("show logs").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.cancel_running(), 1);

    let response = pending.await.expect("request task");
    assert!(!response.success);
    assert_eq!(response.response_text, CANCELLED_TEXT);
    assert_eq!(orchestrator.cancel_running(), 0, "Finished requests leave no tokens behind");
}

#[tokio::test]
async fn test_internal_fault_becomes_generic_reply() {
    let runner = PanicOnceRunner::new();
    let orchestrator = Orchestrator::new(
        test_config(),
        Arc::new(LearningStore::in_memory()),
        runner.clone(),
        Arc::new(AutoConfirm(true)),
    );

    let broken = orchestrator.process_request("install firefox").await;
    assert!(!broken.success);
    assert_eq!(broken.response_text, INTERNAL_ERROR_TEXT);
    assert_eq!(orchestrator.cancel_running(), 0, "The failed request left no live token");

    let next = orchestrator.process_request("install firefox").await;
    assert!(next.success, "{}", next.response_text);
    assert_eq!(runner.call_count(), 2);
}

#[tokio::test]
async fn test_info_logs_never_carry_request_text() {
    let capture = LogCapture::default();
    let _subscriber = capture.install();
    let orchestrator = orchestrator(SpyRunner::new());

    assert!(orchestrator.process_request("I need a web browser").await.success);
    assert!(orchestrator.process_request("undo").await.success);

    let logs = capture.contents();
    assert!(logs.contains("Rolled back history entry"), "Capture saw nothing: {}", logs);
    assert!(!logs.contains("web browser"), "Request text leaked into logs: {}", logs);
}
