//! Print a synthesized driver without running anything

use anyhow::Result;
use clap::Args;

use gramtest_common::BackendKind;
use gramtest_harness::driver::{self, DriverSpec};

use super::Status;
use crate::output::{print_text, OutputFormat};

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Generated lexer name
    #[arg(long)]
    pub lexer: String,

    /// Generated parser name; renders a parser driver when given
    #[arg(long, requires = "start_rule")]
    pub parser: Option<String>,

    #[arg(long, requires = "parser")]
    pub listener: Option<String>,

    #[arg(long, requires = "parser")]
    pub visitor: Option<String>,

    #[arg(long, requires = "parser")]
    pub start_rule: Option<String>,

    #[arg(long, requires = "parser")]
    pub debug: bool,

    #[arg(long, conflicts_with = "parser")]
    pub show_dfa: bool,
}

impl RenderArgs {
    fn spec(&self) -> DriverSpec {
        match (&self.parser, &self.start_rule) {
            (Some(parser), Some(start_rule)) => {
                let prefix = parser.strip_suffix("Parser").unwrap_or(parser);
                let listener = self
                    .listener
                    .clone()
                    .unwrap_or_else(|| format!("{}Listener", prefix));
                let visitor = self
                    .visitor
                    .clone()
                    .unwrap_or_else(|| format!("{}Visitor", prefix));
                DriverSpec::parser(parser, &self.lexer, listener, visitor, start_rule).with_debug(self.debug)
            }
            _ => DriverSpec::lexer(&self.lexer).with_show_dfa(self.show_dfa),
        }
    }
}

pub fn execute(args: RenderArgs, backend: BackendKind, format: OutputFormat) -> Result<Status> {
    let text = driver::render(&args.spec(), backend)?;
    print_text(&text, format);
    Ok(Status::Passed)
}
