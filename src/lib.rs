//! Core library for the improv live-coding language: an indentation
//! sensitive lexer and tolerant parser, a tree-walking interpreter with
//! closures, the native function bridge, and the recording sketch host.

pub mod ast;
pub mod diagnostics;
pub mod ffi;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod scope;
pub mod session;
pub mod sketch;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, ImprovError, Position, RuntimeError};
pub use interpreter::{CallContext, Interpreter, RunResult};
pub use parser::{ParseOptions, ParseResult, parse};
pub use repl::Repl;
pub use scope::{Scope, ScopeRef};
pub use session::{Session, SessionConfig};
pub use sketch::{DrawCommand, Sketch};
pub use value::{Value, ValueKind};
