//! patchmend - self-healing code patch pipeline
//!
//! ## Commands
//!
//! - `run`: generative rewrite, validated, with deterministic fallback
//! - `fallback`: deterministic patch only
//! - `probe-models`: find the first model the credential can use
//! - `report`: summarise an event log

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use patchmend_core::{
    EventLog, FsSourceFile, GenerativePatchClient, JsonlEventLog, Orchestrator, PatchOutcome,
    PatchRun, PatchService, PipelineConfig, ServiceError, ServiceHandle, SourceFile,
};
use patchmend_llm::{AnthropicClient, AnthropicConfig, CompletionApi, ProbeStatus};

const EXIT_OK: u8 = 0;
const EXIT_FAILED: u8 = 1;
/// Degraded fallback under `--strict`.
const EXIT_DEGRADED: u8 = 3;

#[derive(Parser)]
#[command(name = "patchmend")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Self-healing code patch pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON command output
    #[arg(long, global = true)]
    json: bool,

    /// Pipeline configuration file (TOML)
    #[arg(long, global = true, env = "PATCHMEND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// File to patch
    #[arg(long)]
    target: Option<PathBuf>,

    /// Event log path
    #[arg(long, env = "PATCHMEND_EVENT_LOG")]
    event_log: Option<PathBuf>,

    /// Exit non-zero when the fallback could only partially apply
    #[arg(long)]
    strict: bool,

    /// Run the configured syntax checker on the target afterwards
    #[arg(long)]
    syntax_check: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Attempt a generative rewrite, falling back to the deterministic patch
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Task description sent to the service
        #[arg(long)]
        task: Option<String>,

        /// Model identifier
        #[arg(long, env = "PATCHMEND_MODEL")]
        model: Option<String>,
    },

    /// Apply the deterministic patch without calling the service
    Fallback {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Probe candidate models in order and report the first available one
    ProbeModels {
        /// Candidate model (repeatable; defaults to the built-in list)
        #[arg(long = "candidate")]
        candidates: Vec<String>,
    },

    /// Summarise an event log
    Report {
        /// Event log to read (default: configured path)
        #[arg(long)]
        event_log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    patchmend_core::init_tracing(cli.json, level);

    let mut config = PipelineConfig::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load configuration {:?}", cli.config))?;

    let code = match cli.command {
        Commands::Run {
            target,
            task,
            model,
        } => {
            if let Some(task) = task {
                config.task = task;
            }
            if let Some(model) = model {
                config.service.model = model;
            }
            apply_target_args(&mut config, &target);
            let service = build_service(&config);
            cmd_patch(&config, service, &target, cli.json).await
        }
        Commands::Fallback { target } => {
            apply_target_args(&mut config, &target);
            cmd_patch(&config, Err(ServiceError::Disabled), &target, cli.json).await
        }
        Commands::ProbeModels { candidates } => cmd_probe_models(&config, candidates, cli.json).await,
        Commands::Report { event_log } => {
            let path = event_log.unwrap_or_else(|| config.event_log_path.clone());
            cmd_report(&path, cli.json)
        }
    }?;
    Ok(ExitCode::from(code))
}

fn apply_target_args(config: &mut PipelineConfig, args: &TargetArgs) {
    if let Some(target) = &args.target {
        config.target_path = target.clone();
    }
    if let Some(event_log) = &args.event_log {
        config.event_log_path = event_log.clone();
    }
}

fn completion_api(config: &PipelineConfig) -> patchmend_llm::Result<AnthropicClient> {
    let api_config = AnthropicConfig::from_env(&config.service.api_key_env)?
        .with_timeout(config.service.timeout_secs);
    info!(key = %api_config.masked_key(), "using credential from {}", config.service.api_key_env);
    AnthropicClient::new(api_config)
}

/// Build the service, or the reason there is none. Never fatal: the run
/// falls back instead.
fn build_service(config: &PipelineConfig) -> ServiceHandle {
    let api: Arc<dyn CompletionApi> = Arc::new(completion_api(config)?);
    let service: Arc<dyn PatchService> =
        Arc::new(GenerativePatchClient::new(api, config.service.clone()));
    Ok(service)
}

async fn cmd_patch(
    config: &PipelineConfig,
    service: ServiceHandle,
    args: &TargetArgs,
    json: bool,
) -> Result<u8> {
    let events: Arc<dyn EventLog> = Arc::new(
        JsonlEventLog::open(&config.event_log_path)
            .with_context(|| format!("Failed to open event log {:?}", config.event_log_path))?,
    );
    let file: Arc<dyn SourceFile> = Arc::new(FsSourceFile::new(&config.target_path));
    let orchestrator =
        Orchestrator::new(config, file, events).context("Invalid pipeline configuration")?;

    let run = orchestrator.run(service).await;

    if args.syntax_check && run.outcome.is_applied() {
        syntax_check(&config.syntax_check, &config.target_path).await;
    }

    print_run(&run, json)?;
    Ok(exit_code(&run.outcome, args.strict))
}

fn exit_code(outcome: &PatchOutcome, strict: bool) -> u8 {
    match outcome {
        PatchOutcome::Failed { .. } => EXIT_FAILED,
        o if strict && o.is_degraded() => EXIT_DEGRADED,
        _ => EXIT_OK,
    }
}

fn print_run(run: &PatchRun, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }

    println!("run {}", run.run_id);
    match &run.outcome {
        PatchOutcome::AppliedByService => println!("Applied by service"),
        PatchOutcome::AppliedByFallback { degradation: None } => println!("Applied by fallback"),
        PatchOutcome::AppliedByFallback {
            degradation: Some(d),
        } => println!("Applied by fallback (degraded: {:?})", d),
        PatchOutcome::Failed { reason } => println!("Failed: {}", reason),
    }
    Ok(())
}

/// Run the external syntax checker. The result is logged only.
async fn syntax_check(argv: &[String], target: &Path) {
    let Some((program, args)) = argv.split_first() else {
        warn!("syntax check requested but no checker is configured");
        return;
    };

    let output = tokio::process::Command::new(program)
        .args(args)
        .arg(target)
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            info!(event = "syntax_check.passed", target = %target.display());
        }
        Ok(out) => {
            warn!(
                event = "syntax_check.failed",
                target = %target.display(),
                status = ?out.status.code(),
                stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            );
        }
        Err(e) => {
            warn!(event = "syntax_check.unavailable", program = %program, error = %e);
        }
    }
}

async fn cmd_probe_models(
    config: &PipelineConfig,
    candidates: Vec<String>,
    json: bool,
) -> Result<u8> {
    let api = completion_api(config).context("Cannot probe models without a credential")?;
    let candidates = if candidates.is_empty() {
        patchmend_llm::DEFAULT_CANDIDATES
            .iter()
            .map(|c| c.to_string())
            .collect()
    } else {
        candidates
    };

    let report = patchmend_llm::probe_models(&api, candidates.as_slice()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for probe in &report.probes {
            let status = match &probe.status {
                ProbeStatus::Available => "available".to_string(),
                ProbeStatus::NotFound => "not found".to_string(),
                ProbeStatus::BadRequest(detail) => format!("bad request: {}", detail),
                ProbeStatus::Error(detail) => format!("error: {}", detail),
            };
            println!("{:<40} {}", probe.model, status);
        }
        match &report.winner {
            Some(model) => println!("\nWinner: {}", model),
            None => println!("\nNo candidate model is available"),
        }
    }

    Ok(if report.winner.is_some() {
        EXIT_OK
    } else {
        EXIT_FAILED
    })
}

fn cmd_report(path: &Path, json: bool) -> Result<u8> {
    let summary = patchmend_core::summarize_file(path)
        .with_context(|| format!("Failed to read event log {:?}", path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", patchmend_core::render_summary(&summary));
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use patchmend_core::Degradation;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "patchmend",
            "--json",
            "run",
            "--target",
            "imports.py",
            "--model",
            "claude-3-5-sonnet-latest",
            "--strict",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Run { target, model, .. } => {
                assert_eq!(target.target, Some(PathBuf::from("imports.py")));
                assert_eq!(model.as_deref(), Some("claude-3-5-sonnet-latest"));
                assert!(target.strict);
                assert!(!target.syntax_check);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_probe_candidates_repeat() {
        let cli = Cli::try_parse_from([
            "patchmend",
            "probe-models",
            "--candidate",
            "a",
            "--candidate",
            "b",
        ])
        .unwrap();
        match cli.command {
            Commands::ProbeModels { candidates } => assert_eq!(candidates, ["a", "b"]),
            _ => panic!("expected probe-models"),
        }
    }

    #[test]
    fn test_exit_codes() {
        let degraded = PatchOutcome::AppliedByFallback {
            degradation: Some(Degradation::ClassAnchorMissing),
        };
        assert_eq!(exit_code(&degraded, false), 0);
        assert_eq!(exit_code(&degraded, true), 3);
        assert_eq!(exit_code(&PatchOutcome::AppliedByService, true), 0);
        assert_eq!(
            exit_code(
                &PatchOutcome::Failed {
                    reason: "denied".to_string()
                },
                false
            ),
            1
        );
    }

    #[tokio::test]
    async fn test_fallback_command_patches_file_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("imports.py");
        std::fs::write(&target, "class ImportItem:\n    pass\n").unwrap();
        let mut config = PipelineConfig::default();
        config.target_path = target.clone();
        config.event_log_path = dir.path().join("agent.log");
        let args = TargetArgs {
            target: None,
            event_log: None,
            strict: true,
            syntax_check: false,
        };

        let code = cmd_patch(&config, Err(ServiceError::Disabled), &args, true)
            .await
            .unwrap();

        assert_eq!(code, EXIT_OK);
        let patched = std::fs::read_to_string(&target).unwrap();
        assert!(patched.contains("def find_staged_or_pending("));
        let summary = patchmend_core::summarize_file(&config.event_log_path).unwrap();
        assert_eq!(summary.runs.len(), 1);
        assert_eq!(summary.runs[0].final_mode.as_deref(), Some("fallback"));
    }
}
