//! Grammar tool diagnostics
//!
//! The tool reports problems as lines of the form
//! `error(50): T.g4:1:4: syntax error: ...` or `warning(125): T.g4:3:0: ...`.
//! The harness never interprets them beyond severity; they are collected in
//! emission order and handed back to the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static MESSAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(error|warning)\((\d+)\):\s*(?:(.+?):(\d+):(\d+):\s*)?(.*)$")
        .expect("diagnostic pattern is valid")
});

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single message emitted by the grammar tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<u32>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: None,
            file: None,
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::error(message)
        }
    }

    /// Parse one line of tool output. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }

        let Some(caps) = MESSAGE_RE.captures(line) else {
            return Some(Self::info(line));
        };

        let severity = match &caps[1] {
            "error" => Severity::Error,
            _ => Severity::Warning,
        };

        Some(Self {
            severity,
            code: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            file: caps.get(3).map(|m| m.as_str().to_string()),
            line: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            column: caps.get(5).and_then(|m| m.as_str().parse().ok()),
            message: caps[6].to_string(),
        })
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => return f.write_str(&self.message),
        };
        write!(f, "{}", label)?;
        if let Some(code) = self.code {
            write!(f, "({})", code)?;
        }
        f.write_str(": ")?;
        if let (Some(file), Some(line), Some(column)) = (&self.file, self.line, self.column) {
            write!(f, "{}:{}:{}: ", file, line, column)?;
        }
        f.write_str(&self.message)
    }
}

/// Ordered diagnostics collected during one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticQueue {
    all: Vec<Diagnostic>,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.all.push(diagnostic);
    }

    /// Every diagnostic in emission order
    pub fn all(&self) -> &[Diagnostic] {
        &self.all
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.all.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.all.iter().filter(|d| d.is_warning())
    }

    pub fn has_errors(&self) -> bool {
        self.all.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }
}

impl Extend<Diagnostic> for DiagnosticQueue {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.all.extend(iter);
    }
}
