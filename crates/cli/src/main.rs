//! gramtest CLI - Main Entry Point
//!
//! Compiles a grammar into a JavaScript recognizer, runs it against one
//! input on the chosen backend, and reports what it printed.
//!
//! Exit codes: 0 clean run, 1 compile errors / stderr output / mismatch,
//! 2 harness fault, 3 environment unavailable.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod commands;
mod output;

use commands::{lex, parse, render, Status};
use gramtest_common::{BackendKind, HarnessConfig};

const EXIT_FAILED: u8 = 1;
const EXIT_FAULT: u8 = 2;
const EXIT_SKIPPED: u8 = 3;

/// gramtest - run generated JavaScript recognizers
#[derive(Parser)]
#[command(name = "gramtest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Harness configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Execution backend: process or browser
    #[arg(long, default_value = "process", global = true)]
    backend: BackendKind,

    /// Output format
    #[arg(long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a lexer grammar and dump the tokens of an input
    Lex(lex::LexArgs),

    /// Compile a combined grammar and parse an input
    Parse(parse::ParseArgs),

    /// Print the driver that would be run
    Render(render::RenderArgs),
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    let config = match path {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
            HarnessConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => HarnessConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn run(cli: Cli) -> anyhow::Result<Status> {
    match cli.command {
        Commands::Lex(args) => {
            let config = load_config(cli.config.as_deref())?;
            lex::execute(args, config, cli.backend, cli.format).await
        }
        Commands::Parse(args) => {
            let config = load_config(cli.config.as_deref())?;
            parse::execute(args, config, cli.backend, cli.format).await
        }
        Commands::Render(args) => render::execute(args, cli.backend, cli.format),
    }
}

/// Map a run's result onto the process exit code
fn exit_code(result: &anyhow::Result<Status>) -> u8 {
    match result {
        Ok(Status::Passed) => 0,
        Ok(Status::Failed) => EXIT_FAILED,
        Err(e) => match e.downcast_ref::<gramtest_common::Error>() {
            Some(err) if err.is_skip() => EXIT_SKIPPED,
            _ => EXIT_FAULT,
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging; stdout carries recognizer output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("gramtest {}", gramtest_common::VERSION);

    let result = run(cli).await;
    let code = exit_code(&result);
    if let Err(e) = &result {
        if code == EXIT_SKIPPED {
            output::print_skipped(&e.to_string());
        } else {
            output::print_error(&format!("{:#}", e));
        }
    }
    ExitCode::from(code)
}
