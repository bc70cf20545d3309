//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use gramtest_common::{BackendKind, Diagnostic, RunOutcome, Severity};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Recognizer output on stdout, diagnostics on stderr
    #[default]
    Text,
    /// One JSON report on stdout
    Json,
}

/// Everything one lexer or parser run produced
#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub backend: BackendKind,
    pub compiled: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub output: Option<String>,
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl CaseReport {
    pub fn new(backend: BackendKind, outcome: RunOutcome, expected: Option<String>) -> Self {
        let compiled = outcome.compiled();
        let (output, stderr) = match outcome.result {
            Some(result) => (Some(result.stdout), result.stderr),
            None => (None, None),
        };
        Self {
            backend,
            compiled,
            diagnostics: outcome.diagnostics.all().to_vec(),
            output,
            stderr,
            expected,
        }
    }

    /// `None` when no expectation was given
    pub fn matched(&self) -> Option<bool> {
        self.expected
            .as_deref()
            .map(|expected| self.output.as_deref() == Some(expected))
    }

    /// A clean run: compiled, silent on the error channel, and as expected
    pub fn passed(&self) -> bool {
        self.compiled && self.stderr.is_none() && self.matched() != Some(false)
    }
}

/// Print a case report
pub fn print_report(report: &CaseReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Text => {
            for diagnostic in &report.diagnostics {
                print_diagnostic(diagnostic);
            }
            if !report.compiled {
                print_error("grammar did not compile; recognizer not run");
                return;
            }
            if let Some(output) = &report.output {
                print!("{}", output);
            }
            if let Some(stderr) = &report.stderr {
                eprintln!("{}", "stderr during parse:".yellow().bold());
                eprint!("{}", stderr);
            }
            if report.matched() == Some(false) {
                print_mismatch(report.expected.as_deref().unwrap_or_default(), report.output.as_deref());
            }
        }
    }
}

fn print_diagnostic(diagnostic: &Diagnostic) {
    let line = diagnostic.to_string();
    match diagnostic.severity {
        Severity::Error => eprintln!("{}", line.red()),
        Severity::Warning => eprintln!("{}", line.yellow()),
        Severity::Info => eprintln!("{}", line.dimmed()),
    }
}

fn print_mismatch(expected: &str, actual: Option<&str>) {
    eprintln!("{}", "output mismatch".red().bold());
    eprintln!("{}", "expected:".bold());
    eprintln!("{}", expected);
    eprintln!("{}", "actual:".bold());
    eprintln!("{}", actual.unwrap_or_default());
}

/// Print a driver or other generated text verbatim
pub fn print_text(text: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "text": text }));
        }
        OutputFormat::Text => print!("{}", text),
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

/// Print skip notice
pub fn print_skipped(reason: &str) {
    eprintln!("{} {}", "Skipped:".yellow().bold(), reason);
}
