use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A 1-based line/character position within a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub const fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Lexical,
    Indentation,
    Syntax,
    Runtime,
}

/// A positioned message for inline display in an editor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: usize,
    pub character: usize,
    pub length: usize,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
            character: 0,
            length: 0,
        }
    }

    pub fn at(mut self, position: Position, length: usize) -> Self {
        self.line = position.line;
        self.character = position.character;
        self.length = length;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if self.line > 0 {
            write!(f, " ({}:{})", self.line, self.character)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// What went wrong while evaluating a program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined Variable: {0}")]
    UndefinedVariable(String),
    #[error("{0} is not a function")]
    NotAFunction(String),
    #[error("Expected {expected} but found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0} is an unknown operator")]
    UnknownOperator(String),
    #[error("Loop count should be a number but found {0}")]
    BadLoopCount(&'static str),
    #[error("Can only index a list but found {0}")]
    IndexTarget(&'static str),
    #[error("{0} recursed deeper than {max} calls", max = crate::interpreter::MAX_CALL_DEPTH)]
    RecursionLimit(String),
    #[error("{0}")]
    Native(String),
}

/// A runtime failure, positioned at the node that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub position: Option<Position>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, position: Option<Position>) -> Self {
        Self { kind, position }
    }

    pub fn line(&self) -> usize {
        self.position.map(|p| p.line).unwrap_or(0)
    }

    pub fn character(&self) -> usize {
        self.position.map(|p| p.character).unwrap_or(0)
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        let diagnostic = Diagnostic::new(DiagnosticKind::Runtime, err.kind.to_string());
        match err.position {
            Some(position) => diagnostic.at(position, 1),
            None => diagnostic,
        }
    }
}

/// Unified error type for the improv toolchain.
#[derive(Debug, Error)]
pub enum ImprovError {
    #[error("{}", render_all(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("{}", Diagnostic::from(.0))]
    Runtime(#[from] RuntimeError),
    #[error("standard library snippet `{name}` failed to load: {}", render_all(.errors))]
    Bootstrap {
        name: String,
        errors: Vec<Diagnostic>,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_all(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, ImprovError>;
