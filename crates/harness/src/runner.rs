//! Harness orchestration: compile, synthesize, execute, capture

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use gramtest_common::{
    BackendKind, DiagnosticQueue, ExecutionResult, HarnessConfig, Result, RunOutcome, StagingArea,
};

use crate::backend::{self, ExecutionBackend};
use crate::compiler::{self, CommandTool, CompileRequest, GrammarTool, NO_LISTENER_OPTION, VISITOR_OPTION};
use crate::driver::{self, DriverSpec};

/// A lexer-only case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexerCase {
    pub grammar_file_name: String,
    pub grammar_text: String,
    pub lexer_name: String,
    pub input: String,
    #[serde(default)]
    pub show_dfa: bool,
}

/// A parser case with tree-shape validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserCase {
    pub grammar_file_name: String,
    pub grammar_text: String,
    pub parser_name: String,
    pub lexer_name: String,
    pub listener_name: String,
    pub visitor_name: String,
    pub start_rule_name: String,
    pub input: String,
    #[serde(default)]
    pub debug: bool,
}

impl ParserCase {
    fn driver_spec(&self) -> DriverSpec {
        DriverSpec::parser(
            &self.parser_name,
            &self.lexer_name,
            &self.listener_name,
            &self.visitor_name,
            &self.start_rule_name,
        )
        .with_debug(self.debug)
    }
}

/// Drives one grammar tool and one backend
pub struct Harness {
    config: HarnessConfig,
    tool: Box<dyn GrammarTool>,
    backend: Box<dyn ExecutionBackend>,
    stderr_during_parse: Option<String>,
}

impl Harness {
    pub fn new(config: HarnessConfig, tool: Box<dyn GrammarTool>, backend: Box<dyn ExecutionBackend>) -> Self {
        Self {
            config,
            tool,
            backend,
            stderr_during_parse: None,
        }
    }

    /// Harness with the configured tool command and the backend of `kind`
    pub fn from_config(config: HarnessConfig, kind: BackendKind) -> Result<Self> {
        let tool = Box::new(CommandTool::from_config(&config)?);
        let backend = backend::for_kind(kind, &config)?;
        Ok(Self::new(config, tool, backend))
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Error output of the last executed driver, if it wrote any
    pub fn stderr_during_parse(&self) -> Option<&str> {
        self.stderr_during_parse.as_deref()
    }

    /// Compile a grammar into `staging` for this harness's backend
    pub async fn generate(
        &self,
        staging: &StagingArea,
        grammar_file_name: &str,
        grammar_text: &str,
        extra_options: &[&str],
    ) -> Result<DiagnosticQueue> {
        let out_dir = compiler::output_dir(staging, self.backend.kind())?;
        let request = CompileRequest::new(grammar_file_name, grammar_text).options(extra_options.iter().copied());
        compiler::compile(self.tool.as_ref(), &out_dir, &request).await
    }

    /// Compile a lexer grammar, run the token-dumping driver on `input`
    pub async fn exec_lexer(&mut self, case: &LexerCase) -> Result<RunOutcome> {
        let staging = StagingArea::create(&self.config)?;
        let diagnostics = self
            .generate(&staging, &case.grammar_file_name, &case.grammar_text, &[NO_LISTENER_OPTION])
            .await?;
        if diagnostics.has_errors() {
            warn!("{} did not compile; lexer driver not run", case.grammar_file_name);
            return Ok(RunOutcome {
                diagnostics,
                result: None,
            });
        }

        let spec = DriverSpec::lexer(&case.lexer_name).with_show_dfa(case.show_dfa);
        let result = self.run_driver(&staging, &spec, &case.input).await?;
        Ok(RunOutcome {
            diagnostics,
            result: Some(result),
        })
    }

    /// Compile a combined grammar, run the parser driver on `input`
    pub async fn exec_parser(&mut self, case: &ParserCase) -> Result<RunOutcome> {
        let staging = StagingArea::create(&self.config)?;
        let diagnostics = self
            .generate(&staging, &case.grammar_file_name, &case.grammar_text, &[VISITOR_OPTION])
            .await?;
        if diagnostics.has_errors() {
            warn!("{} did not compile; parser driver not run", case.grammar_file_name);
            return Ok(RunOutcome {
                diagnostics,
                result: None,
            });
        }

        let result = self.run_driver(&staging, &case.driver_spec(), &case.input).await?;
        Ok(RunOutcome {
            diagnostics,
            result: Some(result),
        })
    }

    /// Synthesize the driver for `spec` into `staging` and execute it
    pub async fn run_driver(
        &mut self,
        staging: &StagingArea,
        spec: &DriverSpec,
        input: &str,
    ) -> Result<ExecutionResult> {
        self.stderr_during_parse = None;
        let kind = self.backend.kind();

        driver::stage_input(staging, input)?;
        let entry = driver::write_driver(staging, spec, kind)?;
        debug!("Executing {} on the {} backend", entry.display(), kind);

        let result = match self.backend.execute(staging, &entry, input).await {
            Ok(result) => result,
            Err(e) if e.is_skip() => {
                info!("Skipping: {}", e);
                return Err(e);
            }
            Err(e) => {
                error!("can't exec recognizer: {}", e);
                return Err(e);
            }
        };

        self.stderr_during_parse = result.stderr.clone();
        Ok(result)
    }
}
