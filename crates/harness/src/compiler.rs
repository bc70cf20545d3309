//! Grammar tool invocation
//!
//! The grammar tool is an external collaborator. The harness writes the
//! grammar into the staging area, assembles the option list, runs the tool
//! and hands back everything it reported. A grammar that fails to compile is
//! not an error at this layer: some cases assert on the diagnostics
//! themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use gramtest_common::{
    BackendKind, Diagnostic, DiagnosticQueue, Error, HarnessConfig, Result, Severity, StagingArea,
};

use crate::driver::PAGE_GRAMMAR_DIR;

/// Option selecting the code generation target
pub const TARGET_LANGUAGE_OPTION: &str = "-Dlanguage=JavaScript";
/// Generate a parse tree visitor
pub const VISITOR_OPTION: &str = "-visitor";
/// Suppress parse tree listener generation
pub const NO_LISTENER_OPTION: &str = "-no-listener";

/// A grammar compiler driven through its command-line interface
#[async_trait]
pub trait GrammarTool: Send + Sync {
    /// Process the grammars named on `options`, appending every message to `queue`
    async fn process(&self, options: &[String], queue: &mut DiagnosticQueue) -> Result<()>;
}

/// Everything needed for one compile call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileRequest {
    pub grammar_file_name: String,
    pub grammar_text: String,
    /// Caller flags, placed ahead of the fixed flags
    #[serde(default)]
    pub extra_options: Vec<String>,
    /// Let the tool's console listener report messages as they are emitted
    #[serde(default)]
    pub default_listener: bool,
}

impl CompileRequest {
    pub fn new(grammar_file_name: impl Into<String>, grammar_text: impl Into<String>) -> Self {
        Self {
            grammar_file_name: grammar_file_name.into(),
            grammar_text: grammar_text.into(),
            extra_options: Vec::new(),
            default_listener: false,
        }
    }

    pub fn option(mut self, flag: impl Into<String>) -> Self {
        self.extra_options.push(flag.into());
        self
    }

    pub fn options<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_options.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn with_default_listener(mut self, default_listener: bool) -> Self {
        self.default_listener = default_listener;
        self
    }
}

/// Directory receiving the grammar and generated artifacts for a backend
pub fn output_dir(staging: &StagingArea, backend: BackendKind) -> Result<PathBuf> {
    match backend {
        BackendKind::Process => Ok(staging.path().to_path_buf()),
        BackendKind::Browser => staging.subdir(PAGE_GRAMMAR_DIR),
    }
}

/// Assemble the tool command line.
///
/// Order matters to the tool: caller flags, target language, output
/// directory, library directory, grammar path.
pub fn build_options(request: &CompileRequest, out_dir: &Path) -> Vec<String> {
    let dir = out_dir.display().to_string();
    let mut options = request.extra_options.clone();
    options.push(TARGET_LANGUAGE_OPTION.to_string());
    options.push("-o".to_string());
    options.push(dir.clone());
    options.push("-lib".to_string());
    options.push(dir);
    options.push(out_dir.join(&request.grammar_file_name).display().to_string());
    options
}

/// Write the grammar into `out_dir` and run the tool on it.
///
/// Only I/O faults and failure to launch the tool are errors; grammar
/// problems come back in the queue.
pub async fn compile(
    tool: &dyn GrammarTool,
    out_dir: &Path,
    request: &CompileRequest,
) -> Result<DiagnosticQueue> {
    info!("dir {}", out_dir.display());
    std::fs::create_dir_all(out_dir)?;
    std::fs::write(out_dir.join(&request.grammar_file_name), &request.grammar_text)?;

    let options = build_options(request, out_dir);
    debug!("grammar tool options: {:?}", options);

    let mut queue = DiagnosticQueue::new();
    tool.process(&options, &mut queue).await?;

    if request.default_listener {
        for diagnostic in queue.all() {
            match diagnostic.severity {
                Severity::Error => error!("{}", diagnostic),
                Severity::Warning => warn!("{}", diagnostic),
                Severity::Info => info!("{}", diagnostic),
            }
        }
    } else {
        report(&options, request, &queue);
    }

    Ok(queue)
}

fn report(options: &[String], request: &CompileRequest, queue: &DiagnosticQueue) {
    if queue.has_errors() {
        error!("grammar tool reports errors from {:?}", options);
        for diagnostic in queue.errors() {
            error!("{}", diagnostic);
        }
        error!("!!!\ngrammar:\n{}\n###", request.grammar_text);
    }
    if queue.warning_count() > 0 {
        warn!("grammar tool reports warnings from {:?}", options);
        for diagnostic in queue.warnings() {
            warn!("{}", diagnostic);
        }
    }
}

/// Runs the grammar tool as an external command
#[derive(Debug, Clone)]
pub struct CommandTool {
    program: String,
    args: Vec<String>,
}

impl CommandTool {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `tool_command`, e.g. `java -jar antlr-complete.jar`
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let (program, args) = config.tool()?;
        Ok(Self::new(program, args.to_vec()))
    }
}

#[async_trait]
impl GrammarTool for CommandTool {
    /// Messages are queued in the order their lines arrive, whichever
    /// channel carries them.
    async fn process(&self, options: &[String], queue: &mut DiagnosticQueue) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(options)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("grammar tool stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("grammar tool stderr not captured".into()))?;
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            tokio::select! {
                line = err_lines.next_line(), if err_open => match line? {
                    Some(line) => queue.extend(Diagnostic::parse_line(&line)),
                    None => err_open = false,
                },
                line = out_lines.next_line(), if out_open => match line? {
                    Some(line) => queue.extend(Diagnostic::parse_line(&line)),
                    None => out_open = false,
                },
            }
        }

        let status = child.wait().await?;
        if !status.success() && !queue.has_errors() {
            queue.push(Diagnostic::error(format!("{} exited with {}", self.program, status)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the options it was called with and replays canned messages
    #[derive(Default)]
    struct RecordingTool {
        seen: Mutex<Vec<String>>,
        replies: Vec<Diagnostic>,
    }

    #[async_trait]
    impl GrammarTool for RecordingTool {
        async fn process(&self, options: &[String], queue: &mut DiagnosticQueue) -> Result<()> {
            *self.seen.lock().unwrap() = options.to_vec();
            queue.extend(self.replies.iter().cloned());
            Ok(())
        }
    }

    #[test]
    fn test_option_order() {
        let request = CompileRequest::new("T.g4", "grammar T;").options(["-visitor", "-Werror"]);
        let options = build_options(&request, Path::new("/tmp/stage"));
        assert_eq!(
            options,
            [
                "-visitor",
                "-Werror",
                "-Dlanguage=JavaScript",
                "-o",
                "/tmp/stage",
                "-lib",
                "/tmp/stage",
                "/tmp/stage/T.g4",
            ]
        );
    }

    #[tokio::test]
    async fn test_compile_writes_grammar_and_returns_queue() {
        let root = tempfile::tempdir().unwrap();
        let out_dir = root.path().join("nested");
        let tool = RecordingTool {
            replies: vec![
                Diagnostic::parse_line("error(50): T.g4:1:0: syntax error").unwrap(),
                Diagnostic::warning("something odd"),
            ],
            ..Default::default()
        };

        let request = CompileRequest::new("T.g4", "lexer grammar T;\nA : 'a' ;\n");
        let queue = compile(&tool, &out_dir, &request).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(out_dir.join("T.g4")).unwrap(),
            "lexer grammar T;\nA : 'a' ;\n"
        );
        assert_eq!(queue.error_count(), 1);
        assert_eq!(queue.warning_count(), 1);
        let seen = tool.seen.lock().unwrap();
        assert_eq!(seen.last().unwrap(), &out_dir.join("T.g4").display().to_string());
    }

    #[tokio::test]
    async fn test_clean_compile_has_no_errors() {
        let root = tempfile::tempdir().unwrap();
        let tool = RecordingTool::default();
        let request = CompileRequest::new("T.g4", "lexer grammar T;\nID : [a-z]+ ;\n");
        let queue = compile(&tool, root.path(), &request).await.unwrap();
        assert!(!queue.has_errors());
    }

    #[test]
    fn test_output_dir_per_backend() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingArea::create_in(root.path(), false).unwrap();
        assert_eq!(output_dir(&staging, BackendKind::Process).unwrap(), staging.path());
        let page_dir = output_dir(&staging, BackendKind::Browser).unwrap();
        assert_eq!(page_dir, staging.path().join("parser"));
        assert!(page_dir.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_tool_parses_stderr() {
        let tool = CommandTool::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo 'error(50): T.g4:1:0: syntax error' 1>&2; echo 'warning(154): odd' 1>&2; exit 1"
                    .to_string(),
                "tool".to_string(),
            ],
        );
        let mut queue = DiagnosticQueue::new();
        tool.process(&["T.g4".to_string()], &mut queue).await.unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.all()[0].code, Some(50));
        assert!(queue.all()[1].is_warning());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_tool_keeps_emission_order_across_channels() {
        let tool = CommandTool::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo 'error(50): T.g4:1:0: first' 1>&2; sleep 0.2; echo 'banner'; sleep 0.2; echo 'warning(154): last' 1>&2"
                    .to_string(),
                "tool".to_string(),
            ],
        );
        let mut queue = DiagnosticQueue::new();
        tool.process(&[], &mut queue).await.unwrap();

        let severities: Vec<Severity> = queue.all().iter().map(|d| d.severity).collect();
        assert_eq!(severities, [Severity::Error, Severity::Info, Severity::Warning]);
        assert_eq!(queue.all()[1].message, "banner");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_tool_failure_without_messages() {
        let tool = CommandTool::new("sh", vec!["-c".to_string(), "exit 2".to_string()]);
        let mut queue = DiagnosticQueue::new();
        tool.process(&[], &mut queue).await.unwrap();
        assert!(queue.has_errors());
    }

    #[tokio::test]
    async fn test_command_tool_missing_binary() {
        let tool = CommandTool::new("/nonexistent/grammar-tool", Vec::new());
        let mut queue = DiagnosticQueue::new();
        let err = tool.process(&[], &mut queue).await.unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
