//! Lexer runs

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use gramtest_common::{BackendKind, HarnessConfig};
use gramtest_harness::{Harness, LexerCase};

use super::{read_grammar, InputArgs, Status};
use crate::output::{print_report, CaseReport, OutputFormat};

#[derive(Args, Debug)]
pub struct LexArgs {
    /// Lexer grammar file
    #[arg(long, value_name = "FILE")]
    pub grammar: PathBuf,

    /// Generated lexer name (defaults to the grammar name)
    #[arg(long)]
    pub lexer: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,

    /// Print the lexer's DFA after the tokens
    #[arg(long)]
    pub show_dfa: bool,

    /// Expected token dump; a mismatch fails the run
    #[arg(long)]
    pub expect: Option<String>,
}

pub async fn execute(
    args: LexArgs,
    config: HarnessConfig,
    backend: BackendKind,
    format: OutputFormat,
) -> Result<Status> {
    let grammar = read_grammar(&args.grammar)?;
    let case = LexerCase {
        lexer_name: args.lexer.unwrap_or_else(|| grammar.name.clone()),
        grammar_file_name: grammar.file_name,
        grammar_text: grammar.text,
        input: args.input.read()?,
        show_dfa: args.show_dfa,
    };
    debug!("Running lexer {} on the {} backend", case.lexer_name, backend);

    let mut harness = Harness::from_config(config, backend)?;
    let outcome = harness.exec_lexer(&case).await?;

    let report = CaseReport::new(backend, outcome, args.expect);
    print_report(&report, format);
    Ok(Status::of(&report))
}
