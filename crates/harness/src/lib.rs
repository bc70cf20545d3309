//! gramtest harness
//!
//! Turns a (grammar, input) pair into a captured recognizer run:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Harness                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  compiler::compile(tool, dir, request) -> DiagnosticQueue   │
//! │  driver::write_driver(staging, spec, kind) -> entry path    │
//! │  ExecutionBackend::execute(staging, entry, input)           │
//! │    ├── ProcessBackend  node <entry> <input>, drained pipes  │
//! │    └── BrowserBackend  static server + WebDriver session    │
//! │  -> ExecutionResult { stdout, stderr }                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod capture;
pub mod compiler;
pub mod driver;
pub mod runner;
pub mod server;
pub mod webdriver;

pub use backend::{BrowserBackend, ExecutionBackend, ProcessBackend};
pub use compiler::{CommandTool, CompileRequest, GrammarTool};
pub use driver::DriverSpec;
pub use runner::{Harness, LexerCase, ParserCase};
