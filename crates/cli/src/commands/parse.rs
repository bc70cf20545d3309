//! Parser runs

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::debug;

use gramtest_common::{BackendKind, HarnessConfig};
use gramtest_harness::{Harness, ParserCase};

use super::{read_grammar, InputArgs, Status};
use crate::output::{print_report, CaseReport, OutputFormat};

/// Generated names default to `<Grammar>Lexer`, `<Grammar>Parser` and so on,
/// which is what the tool emits for a combined grammar.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Combined grammar file
    #[arg(long, value_name = "FILE")]
    pub grammar: PathBuf,

    #[arg(long)]
    pub lexer: Option<String>,

    #[arg(long)]
    pub parser: Option<String>,

    #[arg(long)]
    pub listener: Option<String>,

    #[arg(long)]
    pub visitor: Option<String>,

    /// Rule to start parsing from
    #[arg(long)]
    pub start_rule: String,

    #[command(flatten)]
    pub input: InputArgs,

    /// Report ambiguities while parsing
    #[arg(long)]
    pub debug: bool,

    /// Expected parser output; a mismatch fails the run
    #[arg(long)]
    pub expect: Option<String>,
}

impl ParseArgs {
    fn case(self) -> Result<(ParserCase, Option<String>)> {
        let grammar = read_grammar(&self.grammar)?;
        let named = |explicit: Option<String>, suffix: &str| {
            explicit.unwrap_or_else(|| format!("{}{}", grammar.name, suffix))
        };

        let case = ParserCase {
            parser_name: named(self.parser, "Parser"),
            lexer_name: named(self.lexer, "Lexer"),
            listener_name: named(self.listener, "Listener"),
            visitor_name: named(self.visitor, "Visitor"),
            start_rule_name: self.start_rule,
            input: self.input.read()?,
            debug: self.debug,
            grammar_file_name: grammar.file_name,
            grammar_text: grammar.text,
        };
        Ok((case, self.expect))
    }
}

pub async fn execute(
    args: ParseArgs,
    config: HarnessConfig,
    backend: BackendKind,
    format: OutputFormat,
) -> Result<Status> {
    let (case, expect) = args.case()?;
    debug!(
        "Running {}.{} on the {} backend",
        case.parser_name, case.start_rule_name, backend
    );

    let mut harness = Harness::from_config(config, backend)?;
    let outcome = harness.exec_parser(&case).await?;

    let report = CaseReport::new(backend, outcome, expect);
    print_report(&report, format);
    Ok(Status::of(&report))
}
