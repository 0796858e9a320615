use clap::{Args, Parser, Subcommand};
use proposal_score::config::AppConfig;
use proposal_score::error::AppError;
use proposal_score::scoring::{
    load_historical_csv_path, PayloadError, ScoreOutcome, ScoreRequest, ScoringOrchestrator,
};
use proposal_score::{server, telemetry};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "proposal-score",
    about = "Score the likelihood that a sales proposal closes",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one score request and print one score result (default command)
    Score(InputArgs),
    /// Print the heuristic and learned scores for the same request side by side
    Compare(InputArgs),
    /// Start the HTTP scoring service
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Read the request from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,
    /// Load historical proposals from a CSV export, replacing `historical_data`
    #[arg(long)]
    historical_csv: Option<PathBuf>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

/// How the process should exit once output has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    Normal,
    Abnormal,
}

pub(crate) async fn run() -> Result<Termination, AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Score(InputArgs::default()));

    match command {
        Command::Score(args) => Ok(run_score(&args)),
        Command::Compare(args) => Ok(run_compare(&args)),
        Command::Serve(args) => run_server(args).await.map(|()| Termination::Normal),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;
    server::run(config).await
}

fn run_score(args: &InputArgs) -> Termination {
    let orchestrator = match orchestrator() {
        Ok(orchestrator) => orchestrator,
        Err(err) => return emit_failure(&err, args.pretty),
    };

    let outcome = match load_request(args) {
        Ok(request) => ScoreOutcome::Scored(orchestrator.score(&request)),
        Err(err) => {
            tracing::warn!(error = %err, "rejecting score request");
            ScoreOutcome::rejected(err)
        }
    };

    let termination = if outcome.is_abnormal() {
        Termination::Abnormal
    } else {
        Termination::Normal
    };
    finish(emit(&outcome.into_result(), args.pretty), termination)
}

fn run_compare(args: &InputArgs) -> Termination {
    let orchestrator = match orchestrator() {
        Ok(orchestrator) => orchestrator,
        Err(err) => return emit_failure(&err, args.pretty),
    };

    match load_request(args) {
        Ok(request) => finish(
            emit(&orchestrator.compare(&request), args.pretty),
            Termination::Normal,
        ),
        Err(err) => emit_failure(&AppError::from(err), args.pretty),
    }
}

/// Load configuration and logging for a one-shot invocation.
fn orchestrator() -> Result<ScoringOrchestrator, AppError> {
    let config = AppConfig::load()?;
    if let Err(err) = telemetry::init(&config.telemetry) {
        eprintln!("warning: {err}; continuing without structured logs");
    }
    Ok(ScoringOrchestrator::from_config(&config.scoring))
}

fn load_request(args: &InputArgs) -> Result<ScoreRequest, PayloadError> {
    let raw = read_input(args.input.as_deref())?;
    let mut request = ScoringOrchestrator::parse_request(&raw)?;

    if let Some(path) = &args.historical_csv {
        let dataset = load_historical_csv_path(path)?;
        tracing::debug!(records = dataset.len(), path = %path.display(), "loaded historical csv");
        request.historical_data = Some(dataset);
    }

    Ok(request)
}

fn read_input(path: Option<&Path>) -> Result<String, std::io::Error> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

fn emit_failure(err: &AppError, pretty: bool) -> Termination {
    let result = ScoringOrchestrator::error_result(&err.to_string());
    finish(emit(&result, pretty), Termination::Abnormal)
}

fn emit<T: Serialize>(payload: &T, pretty: bool) -> Result<(), serde_json::Error> {
    let rendered = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    println!("{rendered}");
    Ok(())
}

fn finish(emitted: Result<(), serde_json::Error>, termination: Termination) -> Termination {
    match emitted {
        Ok(()) => termination,
        Err(err) => {
            eprintln!("failed to render result: {err}");
            Termination::Abnormal
        }
    }
}
