use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use humanix::executor::{Confirmer, Progress};
use humanix::intent::IntentKind;
use humanix::{Orchestrator, PipelineConfig, Response};

#[derive(Parser, Debug)]
#[command(name = "humanix", version, about = "Talk to your NixOS system in plain language")]
struct Cli {
    /// JSON config file, applied before HUMANIX_* variables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for the learning store.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Preview commands instead of running them.
    #[arg(long)]
    dry_run: bool,
    /// Stop a batch at the first failing step.
    #[arg(long)]
    stop_on_error: bool,
    /// Don't learn from corrections.
    #[arg(long)]
    no_learning: bool,
}

type SharedLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Asks on the terminal. Anything but y/yes is a no, and so is EOF.
struct StdinConfirmer {
    lines: SharedLines,
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn ask(&self, description: &str) -> bool {
        print!("{}. Proceed? [y/N] ", description);
        let _ = std::io::stdout().flush();
        match self.lines.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("humanix=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(store) = cli.store {
        config.store_dir = store;
    }
    config.dry_run |= cli.dry_run;
    config.stop_on_error |= cli.stop_on_error;
    if cli.no_learning {
        config.learning_enabled = false;
    }

    let lines: SharedLines = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let confirmer = Arc::new(StdinConfirmer {
        lines: Arc::clone(&lines),
    });
    let orchestrator = Orchestrator::from_config(config, confirmer).with_progress(Arc::new(|p: Progress| {
        eprintln!("  [{:>3}%] {}", p.percent, p.message);
    }));

    let interrupt = orchestrator.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt.cancel_running() == 0 {
                std::process::exit(130);
            }
        }
    });

    tracing::info!("humanix ready");
    println!("Hi! Tell me what you'd like to do, or say \"help\". Type \"exit\" to quit.");

    loop {
        print!("> ");
        std::io::stdout().flush().context("writing prompt")?;
        let line = lines.lock().await.next_line().await.context("reading input")?;
        let Some(line) = line else { break };
        let input = line.trim();
        if matches!(input, "exit" | "quit") {
            break;
        }

        let response = match input.strip_prefix("correct:") {
            Some(rest) => correct(&orchestrator, rest),
            None => orchestrator.process_request(input).await,
        };
        print_response(&response);
    }
    Ok(())
}

/// `correct: <intent> [value]`, e.g. `correct: install vscode`.
fn correct(orchestrator: &Orchestrator, rest: &str) -> Response {
    let mut words = rest.split_whitespace();
    let kind = words.next().and_then(IntentKind::parse);
    let value: Vec<&str> = words.collect();
    match kind {
        Some(kind) => orchestrator.correct_last(kind, (!value.is_empty()).then(|| value.join(" ")).as_deref()),
        None => {
            let kinds: Vec<&str> = IntentKind::ALL.iter().map(|k| k.as_str()).collect();
            Response::fail(format!("Usage: correct: <{}> [value]", kinds.join("|")))
        }
    }
}

fn print_response(response: &Response) {
    println!("{}", response.response_text);
    if let Some(output) = &response.output {
        println!("{}", output.trim_end());
    }
    if !response.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &response.suggestions {
            println!("  - {}", suggestion);
        }
    }
}
