//! CLI command implementations

pub mod lex;
pub mod parse;
pub mod render;

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::output::CaseReport;

/// How a command finished, when it finished at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn of(report: &CaseReport) -> Self {
        if report.passed() {
            Status::Passed
        } else {
            Status::Failed
        }
    }
}

/// Recognizer input, inline or from a file
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Input text
    #[arg(long)]
    pub input: Option<String>,

    /// Read the input from a file
    #[arg(long, value_name = "FILE")]
    pub input_file: Option<PathBuf>,
}

impl InputArgs {
    pub fn read(&self) -> Result<String> {
        match (&self.input, &self.input_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path.display())),
            (None, None) => anyhow::bail!("no input given"),
        }
    }
}

/// A grammar file as the tool will see it
#[derive(Debug)]
pub struct GrammarFile {
    pub file_name: String,
    pub name: String,
    pub text: String,
}

pub fn read_grammar(path: &Path) -> Result<GrammarFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read grammar {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Not a grammar file: {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    Ok(GrammarFile { file_name, name, text })
}
