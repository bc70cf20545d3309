//! Driver synthesis
//!
//! A driver is a tiny program that loads the generated recognizer and runs it
//! over the staged input. Drivers are rendered by literal substitution of
//! recognizer names into fixed skeletons; names are checked to be plain
//! identifiers first, so substitution can never change the program's shape.
//!
//! Template family is chosen by whether a parser is named. Packaging is
//! chosen by the backend: a runnable script for the process backend, a page
//! with `input`/`submit`/`output`/`errors` elements for the browser backend.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use gramtest_common::staging::INPUT_FILE;
use gramtest_common::{BackendKind, Error, Result, StagingArea};

/// Entry file of the process backend
pub const SCRIPT_DRIVER: &str = "Test.js";
/// Entry file of the browser backend
pub const PAGE_DRIVER: &str = "Test.html";
/// Subdirectory holding the grammar and generated artifacts for pages
pub const PAGE_GRAMMAR_DIR: &str = "parser";

/// Message thrown by the tree-shape listener
pub const TREE_SHAPE_ERROR: &str = "Invalid parse tree shape detected.";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid"));

/// Names of the generated artifacts a driver exercises
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverSpec {
    pub lexer_name: String,
    /// `None` selects lexer-only mode
    pub parser_name: Option<String>,
    pub listener_name: Option<String>,
    pub visitor_name: Option<String>,
    pub start_rule_name: Option<String>,
    /// Attach a diagnostic error listener to the parser
    #[serde(default)]
    pub debug: bool,
    /// Print the lexer's default-mode DFA after the tokens
    #[serde(default)]
    pub show_dfa: bool,
}

impl DriverSpec {
    /// Lexer-only driver
    pub fn lexer(lexer_name: impl Into<String>) -> Self {
        Self {
            lexer_name: lexer_name.into(),
            ..Default::default()
        }
    }

    /// Parser driver with tree-shape validation
    pub fn parser(
        parser_name: impl Into<String>,
        lexer_name: impl Into<String>,
        listener_name: impl Into<String>,
        visitor_name: impl Into<String>,
        start_rule_name: impl Into<String>,
    ) -> Self {
        Self {
            lexer_name: lexer_name.into(),
            parser_name: Some(parser_name.into()),
            listener_name: Some(listener_name.into()),
            visitor_name: Some(visitor_name.into()),
            start_rule_name: Some(start_rule_name.into()),
            debug: false,
            show_dfa: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_show_dfa(mut self, show_dfa: bool) -> Self {
        self.show_dfa = show_dfa;
        self
    }

    pub fn is_lexer_only(&self) -> bool {
        self.parser_name.is_none()
    }
}

/// Driver skeletons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    LexerScript,
    LexerPage,
    ParserScript,
    ParserPage,
}

impl Template {
    pub fn select(spec: &DriverSpec, backend: BackendKind) -> Self {
        match (spec.is_lexer_only(), backend) {
            (true, BackendKind::Process) => Template::LexerScript,
            (true, BackendKind::Browser) => Template::LexerPage,
            (false, BackendKind::Process) => Template::ParserScript,
            (false, BackendKind::Browser) => Template::ParserPage,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Template::LexerScript | Template::ParserScript => SCRIPT_DRIVER,
            Template::LexerPage | Template::ParserPage => PAGE_DRIVER,
        }
    }

    fn family(&self) -> &'static str {
        match self {
            Template::LexerScript | Template::LexerPage => "lexer",
            Template::ParserScript | Template::ParserPage => "parser",
        }
    }
}

/// Recognizer names validated for one template
struct Names<'a> {
    lexer: &'a str,
    parser: &'a str,
    listener: &'a str,
    visitor: &'a str,
    start_rule: &'a str,
}

fn required<'a>(value: Option<&'a str>, what: &str, template: Template) -> Result<&'a str> {
    let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
        Error::Synthesis(format!(
            "{} name is required by the {} template",
            what,
            template.family()
        ))
    })?;
    if !IDENTIFIER_RE.is_match(value) {
        return Err(Error::Synthesis(format!(
            "{} name {:?} is not a plain identifier",
            what, value
        )));
    }
    Ok(value)
}

fn validate(spec: &DriverSpec, template: Template) -> Result<Names<'_>> {
    let lexer = required(Some(spec.lexer_name.as_str()), "lexer", template)?;
    if spec.is_lexer_only() {
        return Ok(Names {
            lexer,
            parser: "",
            listener: "",
            visitor: "",
            start_rule: "",
        });
    }
    Ok(Names {
        lexer,
        parser: required(spec.parser_name.as_deref(), "parser", template)?,
        listener: required(spec.listener_name.as_deref(), "listener", template)?,
        visitor: required(spec.visitor_name.as_deref(), "visitor", template)?,
        start_rule: required(spec.start_rule_name.as_deref(), "start rule", template)?,
    })
}

/// Render the driver for `spec` packaged for `backend`
pub fn render(spec: &DriverSpec, backend: BackendKind) -> Result<String> {
    let template = Template::select(spec, backend);
    let names = validate(spec, template)?;
    let source = match template {
        Template::LexerScript => lexer_script(names.lexer, spec.show_dfa),
        Template::LexerPage => lexer_page(names.lexer, spec.show_dfa),
        Template::ParserScript => parser_script(&names, spec.debug),
        Template::ParserPage => parser_page(&names, spec.debug),
    };
    Ok(source)
}

/// Render and write the driver into the staging area, returning its path
pub fn write_driver(staging: &StagingArea, spec: &DriverSpec, backend: BackendKind) -> Result<PathBuf> {
    let template = Template::select(spec, backend);
    let source = render(spec, backend)?;
    debug!("Writing {:?} driver for {}", template, spec.lexer_name);
    staging.write_file(template.file_name(), &source)
}

/// Write the literal input payload into the staging area
pub fn stage_input(staging: &StagingArea, input: &str) -> Result<PathBuf> {
    staging.write_file(INPUT_FILE, input)
}

fn lexer_script(lexer: &str, show_dfa: bool) -> String {
    let dfa = if show_dfa {
        "    process.stdout.write(lexer._interp.decisionToDFA[antlr4.Lexer.DEFAULT_MODE].toLexerString());\n"
    } else {
        ""
    };
    format!(
        r#"var antlr4 = require('antlr4');
var {lexer} = require('./{lexer}');

function main(argv) {{
    var input = new antlr4.FileStream(argv[2]);
    var lexer = new {lexer}.{lexer}(input);
    var stream = new antlr4.CommonTokenStream(lexer);
    stream.fill();
    for(var i=0; i<stream.tokens.length; i++) {{
        console.log(stream.tokens[i].toString());
    }}
{dfa}}}

main(process.argv);
"#
    )
}

fn parser_script(names: &Names<'_>, debug: bool) -> String {
    let Names {
        lexer,
        parser,
        listener,
        visitor,
        start_rule,
    } = names;
    let diagnostics = if debug {
        "    parser.addErrorListener(new antlr4.error.DiagnosticErrorListener());\n"
    } else {
        ""
    };
    format!(
        r#"var antlr4 = require('antlr4');
var {lexer} = require('./{lexer}');
var {parser} = require('./{parser}');
var {listener} = require('./{listener}').{listener};
var {visitor} = require('./{visitor}').{visitor};

function TreeShapeListener() {{
    antlr4.tree.ParseTreeListener.call(this);
    return this;
}}

TreeShapeListener.prototype = Object.create(antlr4.tree.ParseTreeListener.prototype);
TreeShapeListener.prototype.constructor = TreeShapeListener;

TreeShapeListener.prototype.enterEveryRule = function(ctx) {{
    for(var i=0; i<ctx.getChildCount(); i++) {{
        var child = ctx.getChild(i);
        var parent = child.parentCtx;
        if(parent.getRuleContext() !== ctx || !(parent instanceof antlr4.tree.RuleNode)) {{
            throw "{TREE_SHAPE_ERROR}";
        }}
    }}
}};

function main(argv) {{
    var input = new antlr4.FileStream(argv[2]);
    var lexer = new {lexer}.{lexer}(input);
    var stream = new antlr4.CommonTokenStream(lexer);
    var parser = new {parser}.{parser}(stream);
{diagnostics}    parser.buildParseTrees = true;
    var tree = parser.{start_rule}();
    antlr4.tree.ParseTreeWalker.DEFAULT.walk(new TreeShapeListener(), tree);
}}

main(process.argv);
"#
    )
}

/// Shared page shell: loader script, trigger, and the four fixed elements.
/// `globals` declares the module slots, `load` fills them, `run` is the
/// trigger body operating on `input`.
fn page(globals: &str, load: &str, run: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
	<head>
		<script src='lib/require.js'></script>
		<script>
			antlr4 = null;
{globals}
			loadParser = function() {{
				try {{
					antlr4 = require('antlr4/index');
{load}				}} catch (ex) {{
					document.getElementById('errors').value = ex.toString();
				}}
			}};

			test = function() {{
				var lines = [];
				var problems = [];
				var log = console.log;
				var error = console.error;
				console.log = function() {{ lines.push(Array.prototype.join.call(arguments, ' ')); }};
				console.error = function() {{ problems.push(Array.prototype.join.call(arguments, ' ')); }};
				document.getElementById('output').value = '';
				try {{
					var input = document.getElementById('input').value;
{run}				}} catch (ex) {{
					problems.push(ex.toString());
				}} finally {{
					console.log = log;
					console.error = error;
				}}
				document.getElementById('output').value = lines.length > 0 ? lines.join('\n') + '\n' : '';
				if (problems.length > 0) {{
					document.getElementById('errors').value = problems.join('\n') + '\n';
				}}
			}};
		</script>
	</head>
	<body>
		<textarea id='input'></textarea><br>
		<button id='submit' type='button' onclick='test()'>Test</button><br>
		<textarea id='output'></textarea><br>
		<textarea id='errors'></textarea><br>
		<script>loadParser();</script>
	</body>
</html>
"#
    )
}

fn lexer_page(lexer: &str, show_dfa: bool) -> String {
    let globals = format!("\t\t\t{lexer} = null;\n");
    let load = format!("\t\t\t\t\t{lexer} = require('./{PAGE_GRAMMAR_DIR}/{lexer}');\n");
    let mut run = format!(
        r#"					var chars = new antlr4.InputStream(input);
					var lexer = new {lexer}.{lexer}(chars);
					var stream = new antlr4.CommonTokenStream(lexer);
					stream.fill();
					for(var i=0; i<stream.tokens.length; i++) {{
						console.log(stream.tokens[i].toString());
					}}
"#
    );
    if show_dfa {
        run.push_str(
            "\t\t\t\t\tlines.push(lexer._interp.decisionToDFA[antlr4.Lexer.DEFAULT_MODE].toLexerString());\n",
        );
    }
    page(&globals, &load, &run)
}

fn parser_page(names: &Names<'_>, debug: bool) -> String {
    let Names {
        lexer,
        parser,
        listener,
        visitor,
        start_rule,
    } = names;
    let globals = format!(
        "\t\t\tTreeShapeListener = null;\n\t\t\t{lexer} = null;\n\t\t\t{parser} = null;\n\t\t\t{listener} = null;\n\t\t\t{visitor} = null;\n"
    );
    let load = format!(
        r#"					{lexer} = require('./{PAGE_GRAMMAR_DIR}/{lexer}');
					{parser} = require('./{PAGE_GRAMMAR_DIR}/{parser}');
					{listener} = require('./{PAGE_GRAMMAR_DIR}/{listener}');
					{visitor} = require('./{PAGE_GRAMMAR_DIR}/{visitor}');

					TreeShapeListener = function() {{
						antlr4.tree.ParseTreeListener.call(this);
						return this;
					}};

					TreeShapeListener.prototype = Object.create(antlr4.tree.ParseTreeListener.prototype);
					TreeShapeListener.prototype.constructor = TreeShapeListener;

					TreeShapeListener.prototype.enterEveryRule = function(ctx) {{
						for(var i=0; i<ctx.getChildCount(); i++) {{
							var child = ctx.getChild(i);
							var parent = child.parentCtx;
							if(parent.getRuleContext() !== ctx || !(parent instanceof antlr4.tree.RuleNode)) {{
								throw '{TREE_SHAPE_ERROR}';
							}}
						}}
					}};
"#
    );
    let diagnostics = if debug {
        "\t\t\t\t\tparser.addErrorListener(new antlr4.error.DiagnosticErrorListener());\n"
    } else {
        ""
    };
    let run = format!(
        r#"					var chars = new antlr4.InputStream(input);
					var lexer = new {lexer}.{lexer}(chars);
					var tokens = new antlr4.CommonTokenStream(lexer);
					var parser = new {parser}.{parser}(tokens);
{diagnostics}					parser.buildParseTrees = true;
					var tree = parser.{start_rule}();
					antlr4.tree.ParseTreeWalker.DEFAULT.walk(new TreeShapeListener(), tree);
"#
    );
    page(&globals, &load, &run)
}
