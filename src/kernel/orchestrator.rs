use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::batch::{format_batch_result, parse_batch, BatchResult, BatchStep, StepStatus};
use super::cancel::CancellationRegistry;
use super::errors::{explain_failure, format_failure};
use super::history::{CommandHistory, HistoryEntry, HistoryStats};
use super::meta::{MetaCommand, HELP_TEXT};
use super::response::{success_text, Response, CANCELLED_TEXT, INTERNAL_ERROR_TEXT, UNKNOWN_TEXT};
use super::telemetry::{ConfidenceBucket, FailureReason, TelemetryEvent, TelemetryRecorder, UsageSnapshot};
use crate::command::{build, classify, explain_command, CommandSpec, RiskTier};
use crate::config::PipelineConfig;
use crate::error::BuildError;
use crate::executor::types::elapsed_ms;
use crate::executor::{
    Confirmer, ExecuteOptions, ExecutionResult, Executor, ExecutorLimits, ProcessRunner, ProgressCallback,
    TokioProcessRunner,
};
use crate::intent::types::{Entity, EntityKind, Intent, IntentKind};
use crate::intent::IntentRecognizer;
use crate::memory::{FileKeyValueStore, LearningStats, LearningStore};

const EXPLAIN_PREFIX: &str = "explain:";
const PREVIEW_PREFIX: &str = "preview:";
const HISTORY_SHOWN: usize = 10;
const MAX_SUGGESTIONS: usize = 5;

/// Fallback suggestions so an unrecognized request always gets somewhere to go.
const STARTER_REQUESTS: &[&str] = &["install firefox", "update my system", "my internet isn't working", "help"];

/// The request currently eligible for `correct_last`.
#[derive(Debug, Clone)]
struct LastRequest {
    input: String,
    recognized: Intent,
}

/// Sequences recognize -> build -> classify -> execute for every message,
/// and owns the per-session state around it (history, usage, corrections).
///
/// Cheap to clone; every clone shares the same state.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<PipelineConfig>,
    learning: Arc<LearningStore>,
    recognizer: IntentRecognizer,
    executor: Executor,
    history: Arc<Mutex<CommandHistory>>,
    telemetry: Arc<Mutex<TelemetryRecorder>>,
    cancellations: CancellationRegistry,
    last_request: Arc<Mutex<Option<LastRequest>>>,
    progress: Option<ProgressCallback>,
}

impl Orchestrator {
    pub fn new(
        config: PipelineConfig,
        learning: Arc<LearningStore>,
        runner: Arc<dyn ProcessRunner>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        let recognizer = IntentRecognizer::new(Arc::clone(&learning)).with_ambiguity_margin(config.ambiguity_margin);
        let executor = Executor::new(runner, confirmer, ExecutorLimits::from_config(&config));
        Self {
            history: Arc::new(Mutex::new(CommandHistory::new(config.history_limit))),
            telemetry: Arc::new(Mutex::new(TelemetryRecorder::new())),
            cancellations: CancellationRegistry::new(),
            last_request: Arc::new(Mutex::new(None)),
            progress: None,
            config: Arc::new(config),
            learning,
            recognizer,
            executor,
        }
    }

    /// Real processes, and a learning store on disk unless learning is off.
    pub fn from_config(config: PipelineConfig, confirmer: Arc<dyn Confirmer>) -> Self {
        let learning = if config.learning_enabled {
            Arc::new(LearningStore::open(Arc::new(FileKeyValueStore::new(config.store_dir.clone()))))
        } else {
            Arc::new(LearningStore::in_memory())
        };
        Self::new(config, learning, Arc::new(TokioProcessRunner), confirmer)
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Single entry point for front ends. Never panics into the caller:
    /// a fault inside the pipeline becomes a generic apology.
    pub async fn process_request(&self, text: &str) -> Response {
        let started = Instant::now();
        let this = self.clone();
        let input = text.to_string();
        let handled = tokio::spawn(async move { this.dispatch(&input).await }).await;
        match handled {
            Ok(response) => response.took(elapsed_ms(started)),
            Err(e) => {
                error!("Request handling aborted: {}", e);
                Response::fail(INTERNAL_ERROR_TEXT)
                    .with_error(Some(e.to_string()))
                    .took(elapsed_ms(started))
            }
        }
    }

    async fn dispatch(&self, text: &str) -> Response {
        let text = text.trim();
        if text.is_empty() {
            return Response::fail("Tell me what you'd like to do.").with_suggestions(starter_requests());
        }

        if let Some(meta) = MetaCommand::parse(text) {
            debug!("Meta command {:?}", meta);
            return self.handle_meta(meta).await;
        }

        if let Some(rest) = strip_prefix_ci(text, EXPLAIN_PREFIX) {
            return self.explain(rest);
        }
        if let Some(rest) = strip_prefix_ci(text, PREVIEW_PREFIX) {
            return self.run_single(rest, true).await.0;
        }

        if let Some(steps) = parse_batch(text) {
            info!("Running batch of {} request(s)", steps.len());
            return self.run_batch(steps).await;
        }

        self.run_single(text, self.config.dry_run).await.0
    }

    /// Recognize and build, or the response that stops the request early.
    fn plan(&self, text: &str) -> Result<(Intent, CommandSpec), Response> {
        let recognition = self.recognizer.resolve(text);
        let intent = recognition.intent;
        *self.last_request.lock() = Some(LastRequest {
            input: text.to_string(),
            recognized: intent.clone(),
        });
        info!("Recognized {} ({:.2})", intent.kind.as_str(), intent.confidence);
        self.record(TelemetryEvent::IntentRecognized {
            kind: intent.kind,
            confidence: ConfidenceBucket::from_confidence(intent.confidence),
        });

        if let Some(clarification) = recognition.clarification {
            self.record(TelemetryEvent::ClarificationRequested {
                candidates: clarification.options.len(),
            });
            let examples = clarification.options.iter().map(|o| o.example.clone()).collect();
            return Err(Response::fail(clarification.render())
                .clarifying()
                .with_suggestions(examples));
        }

        if intent.is_unknown() {
            self.record(TelemetryEvent::Unsupported { kind: intent.kind });
            return Err(Response::fail(UNKNOWN_TEXT).with_suggestions(self.unknown_suggestions(text, &intent)));
        }

        match build(&intent) {
            Ok(spec) => Ok((intent, spec)),
            Err(e) => {
                info!("No command for {}: {}", intent.kind.as_str(), e);
                let response = Response::fail(e.question()).with_suggestions(vec![intent.kind.example().to_string()]);
                Err(match e {
                    BuildError::MissingEntity { .. } => {
                        self.record(TelemetryEvent::ClarificationRequested { candidates: 1 });
                        response.clarifying()
                    }
                    BuildError::Unsupported { .. } => {
                        self.record(TelemetryEvent::Unsupported { kind: intent.kind });
                        response
                    }
                })
            }
        }
    }

    fn explain(&self, text: &str) -> Response {
        match self.plan(text) {
            Ok((_, spec)) => Response::ok(explain_command(&spec)).with_command(Some(spec.command_line())),
            Err(response) => response,
        }
    }

    async fn run_single(&self, text: &str, dry_run: bool) -> (Response, StepStatus) {
        let (intent, spec) = match self.plan(text) {
            Ok(planned) => planned,
            Err(response) => return (response, StepStatus::Failed),
        };

        let tier = classify(&spec);
        info!("{} is {}", spec.description, tier.as_str());

        let registration = self.cancellations.register();
        let mut options = ExecuteOptions::default()
            .dry_run(dry_run)
            .require_confirmation(tier == RiskTier::Dangerous || spec.requires_confirmation)
            .cancel_token(registration.token());
        if let Some(callback) = &self.progress {
            options = options.on_progress(Arc::clone(callback));
        }
        let result = self.executor.execute(&spec, options).await;
        drop(registration);

        let rollback = if result.rollback_available {
            spec.rollback.clone()
        } else {
            None
        };
        self.history.lock().add(
            HistoryEntry::new(text, intent.kind, Some(spec.command_line()), result.success, result.duration_ms)
                .with_rollback(rollback),
        );

        let status = self.record_outcome(intent.kind, &result);
        (self.respond(&intent, &spec, &result), status)
    }

    fn record_outcome(&self, kind: IntentKind, result: &ExecutionResult) -> StepStatus {
        let (event, status) = if result.success {
            (
                TelemetryEvent::CommandSucceeded {
                    kind,
                    duration_ms: result.duration_ms,
                    dry_run: result.dry_run,
                },
                StepStatus::Succeeded,
            )
        } else if result.was_cancelled {
            (TelemetryEvent::Cancelled { kind }, StepStatus::Skipped)
        } else {
            let reason = if result.timed_out {
                FailureReason::Timeout
            } else if result.auto_rolled_back {
                FailureReason::RolledBack
            } else if result.exit_code.is_none() {
                FailureReason::Rejected
            } else {
                FailureReason::NonZeroExit
            };
            (TelemetryEvent::CommandFailed { kind, reason }, StepStatus::Failed)
        };
        self.record(event);
        status
    }

    fn respond(&self, intent: &Intent, spec: &CommandSpec, result: &ExecutionResult) -> Response {
        let command = Some(spec.command_line());

        if result.success {
            let mut text = success_text(intent, spec, result);
            if result.rollback_available {
                text.push_str(" Say \"undo\" if you want to reverse this.");
            }
            return Response::ok(text).with_command(command).with_output(&result.output);
        }

        if result.was_cancelled {
            return Response::fail(CANCELLED_TEXT).with_command(command);
        }

        let (mut text, suggestion) = if result.timed_out {
            (
                format!(
                    "That took too long, so I stopped it after {} seconds.",
                    self.config.timeout().as_secs()
                ),
                None,
            )
        } else {
            let stderr = result.error.as_deref().unwrap_or("");
            let subject = spec.args.last().map(|a| a.trim_start_matches("nixpkgs."));
            let explanation = explain_failure(stderr, subject);
            (format_failure(&explanation), Some(explanation.suggestion))
        };
        if result.auto_rolled_back {
            text.push_str(" I've restored the previous state automatically.");
        } else if result.rollback_available {
            text.push_str(" Say \"undo\" to restore the previous state.");
        }

        Response::fail(text)
            .with_command(command)
            .with_output(&result.output)
            .with_error(result.error.clone())
            .with_suggestions(suggestion.into_iter().collect())
    }

    async fn run_batch(&self, steps: Vec<String>) -> Response {
        let started = Instant::now();
        let mut batch = BatchResult::default();

        for input in steps {
            if self.config.stop_on_error && batch.failed > 0 {
                batch.push(BatchStep {
                    input,
                    status: StepStatus::Skipped,
                    detail: Some("skipped after an earlier failure".to_string()),
                });
                continue;
            }
            let (response, status) = self.run_single(&input, self.config.dry_run).await;
            let detail = match status {
                StepStatus::Succeeded => response.output.as_deref().and_then(|o| o.lines().next()).map(str::to_string),
                StepStatus::Failed | StepStatus::Skipped => {
                    response.response_text.lines().next().map(str::to_string)
                }
            };
            batch.push(BatchStep { input, status, detail });
        }
        batch.duration_ms = elapsed_ms(started);

        let text = format_batch_result(&batch);
        if batch.failed == 0 && batch.successful > 0 {
            Response::ok(text)
        } else {
            Response::fail(text)
        }
    }

    async fn handle_meta(&self, meta: MetaCommand) -> Response {
        match meta {
            MetaCommand::Help => Response::ok(HELP_TEXT),
            MetaCommand::History => Response::ok(self.render_history()),
            MetaCommand::Undo => self.undo().await,
            MetaCommand::Stats => Response::ok(self.render_stats()),
            MetaCommand::Clear => {
                self.history.lock().clear();
                Response::ok("History cleared.")
            }
        }
    }

    /// Reverse the newest change that still has a rollback.
    async fn undo(&self) -> Response {
        let taken = self.history.lock().take_rollback();
        let Some((id, input, rollback)) = taken else {
            return Response::fail("There's nothing I can undo right now.");
        };

        let spec = rollback.to_spec();
        let result = self.executor.rollback(&rollback).await;
        if result.success {
            info!("Rolled back history entry {}", id);
            return Response::ok(format!("Done. I've reversed \"{}\".", input))
                .with_command(Some(spec.command_line()))
                .with_output(&result.output);
        }

        warn!("Undo failed: {:?}", result.error);
        self.history.lock().restore_rollback(id, rollback);
        let explanation = explain_failure(result.error.as_deref().unwrap_or(""), None);
        Response::fail(format!("I couldn't undo \"{}\". {}", input, format_failure(&explanation)))
            .with_command(Some(spec.command_line()))
            .with_error(result.error)
    }

    fn render_history(&self) -> String {
        let history = self.history.lock();
        let recent = history.recent(HISTORY_SHOWN);
        if recent.is_empty() {
            return "No commands yet.".to_string();
        }
        let mut lines = vec!["Recent commands:".to_string()];
        for (i, entry) in recent.iter().enumerate() {
            let mark = if entry.success { "ok" } else { "failed" };
            match &entry.command {
                Some(command) => lines.push(format!("{}. [{}] {} ({})", i + 1, mark, entry.input, command)),
                None => lines.push(format!("{}. [{}] {}", i + 1, mark, entry.input)),
            }
        }
        lines.join("\n")
    }

    fn render_stats(&self) -> String {
        let learning = self.learning.stats();
        let usage = self.usage_snapshot();
        let history = self.history_stats();

        let mut lines = vec![
            format!(
                "Commands: {} ({:.0}% successful, {:.0} ms on average)",
                history.total,
                history.success_rate * 100.0,
                history.average_duration_ms
            ),
            format!(
                "Requests: {} clarifications, {} not understood, {} cancelled, {} timed out",
                usage.clarifications, usage.unsupported, usage.cancellations, usage.timeouts
            ),
            format!(
                "Learning: {} corrections ({} accepted), {} learned phrases, {} synonym pairs",
                learning.total_corrections,
                learning.accepted_corrections,
                learning.learned_patterns,
                learning.synonym_pairs
            ),
        ];
        if !history.most_common.is_empty() {
            let common: Vec<String> = history
                .most_common
                .iter()
                .map(|(kind, count)| format!("{} ({})", kind.as_str(), count))
                .collect();
            lines.push(format!("Most used: {}", common.join(", ")));
        }
        if !self.learning.is_persistent() {
            lines.push("Learned phrases are kept in memory only for this session.".to_string());
        }
        lines.join("\n")
    }

    fn unknown_suggestions(&self, text: &str, intent: &Intent) -> Vec<String> {
        let mut out = self.get_suggestions(text);
        if let Some(best) = intent
            .alternatives
            .iter()
            .find(|alt| !alt.is_unknown() && alt.confidence > 0.0)
        {
            out.push(format!("Did you mean something like \"{}\"?", best.kind.example()));
        }
        for starter in STARTER_REQUESTS {
            if out.len() >= MAX_SUGGESTIONS {
                break;
            }
            push_unique(&mut out, starter.to_string());
        }
        out.truncate(MAX_SUGGESTIONS);
        out
    }

    /// Autocomplete: learned phrases first, then earlier successful requests.
    pub fn get_suggestions(&self, partial: &str) -> Vec<String> {
        let mut out = self.learning.get_suggestions(partial);
        for earlier in self.history.lock().suggestions(partial) {
            push_unique(&mut out, earlier);
        }
        out.truncate(MAX_SUGGESTIONS);
        out
    }

    /// Feed a correction for the most recent request into the learning store.
    /// Returns false when there is nothing to correct or learning is off.
    pub fn record_correction(&self, corrected: Intent, accepted: bool) -> bool {
        if !self.config.learning_enabled {
            return false;
        }
        let Some(last) = self.last_request.lock().clone() else {
            return false;
        };
        self.learning
            .record_correction(&last.input, &last.recognized, &corrected, accepted);
        true
    }

    /// Teach the previous request's meaning: `kind`, with `value` as its main entity.
    pub fn correct_last(&self, kind: IntentKind, value: Option<&str>) -> Response {
        let Some(last) = self.last_request.lock().clone() else {
            return Response::fail("There's no earlier request to correct.");
        };
        let entities = match (EntityKind::primary_for(kind), value) {
            (Some(entity), Some(value)) => vec![Entity::new(entity, value.trim().to_lowercase(), 1.0)],
            _ => Vec::new(),
        };
        let corrected = Intent::new(kind, 1.0, entities, &last.input);
        if !self.record_correction(corrected, true) {
            return Response::fail("Learning is turned off, so I can't remember that.");
        }
        Response::ok(format!(
            "Got it. Next time \"{}\" means: {}.",
            last.input,
            kind.label().to_lowercase()
        ))
    }

    /// Cancel every confirmation wait and running command. Returns how many.
    pub fn cancel_running(&self) -> usize {
        self.cancellations.cancel_all()
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.learning.stats()
    }

    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.telemetry.lock().snapshot()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history.lock().stats()
    }

    pub fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.lock().recent(n).into_iter().cloned().collect()
    }

    fn record(&self, event: TelemetryEvent) {
        self.telemetry.lock().record(event);
    }
}

fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| text[prefix.len()..].trim())
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn starter_requests() -> Vec<String> {
    STARTER_REQUESTS.iter().map(|s| s.to_string()).collect()
}
