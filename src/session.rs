use std::rc::Rc;

use crate::{
    ast::Program,
    diagnostics::{Diagnostic, Result, RuntimeError},
    interpreter::Interpreter,
    parser::{self, ParseOptions},
    scope::{Scope, ScopeRef},
    sketch::{self, Sketch},
    stdlib,
    value::Value,
};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Consecutive clean frames before the running program is kept as the
    /// fallback for later runtime errors.
    pub promote_after: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { promote_after: 10 }
    }
}

/// A live-coding session: the program currently drawing each frame, and the
/// last one that was seen to run cleanly.
pub struct Session {
    interpreter: Interpreter,
    scope: ScopeRef,
    config: SessionConfig,
    current_program: Rc<Program>,
    current_code: String,
    last_working_program: Rc<Program>,
    last_working_code: String,
    working_count: u32,
    runtime_errors: Vec<RuntimeError>,
}

impl Session {
    pub fn new(scope: ScopeRef, config: SessionConfig) -> Self {
        Self {
            interpreter: Interpreter::new(),
            scope,
            config,
            current_program: Rc::default(),
            current_code: String::new(),
            last_working_program: Rc::default(),
            last_working_code: String::new(),
            working_count: 0,
            runtime_errors: Vec::new(),
        }
    }

    /// A session over a fresh scope holding the standard library and the
    /// drawing builtins.
    pub fn with_stdlib(config: SessionConfig) -> Result<Self> {
        let scope = Scope::new();
        stdlib::install(&scope)?;
        sketch::install(&scope)?;
        Ok(Self::new(scope, config))
    }

    /// Parses `source`. A clean parse replaces the running program; otherwise
    /// the running program is left alone and the diagnostics are returned.
    pub fn evaluate(&mut self, source: &str) -> Vec<Diagnostic> {
        self.runtime_errors.clear();
        let parsed = parser::parse(source, ParseOptions::default());
        if parsed.is_clean() {
            self.current_program = Rc::new(parsed.ast);
            self.current_code = source.to_string();
            self.working_count = 0;
        }
        parsed.errors
    }

    /// Runs one frame at `time`, drawing into `sketch`.
    pub fn tick(&mut self, time: f64, sketch: &mut Sketch) -> &[RuntimeError] {
        sketch.begin_frame();
        self.scope.borrow_mut().define("time", Value::num(time));
        let program = Rc::clone(&self.current_program);
        let result = self.interpreter.run_with_host(&program, &self.scope, sketch);
        if result.is_success() {
            self.working_count += 1;
            if self.working_count == self.config.promote_after {
                self.last_working_program = Rc::clone(&self.current_program);
                self.last_working_code = self.current_code.clone();
            }
        } else {
            self.reset_to_last_working_program();
            self.runtime_errors = result.errors;
        }
        &self.runtime_errors
    }

    pub fn reset_to_last_working_program(&mut self) {
        self.current_program = Rc::clone(&self.last_working_program);
        self.current_code = self.last_working_code.clone();
        self.working_count = 0;
    }

    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    pub fn current_code(&self) -> &str {
        &self.current_code
    }

    pub fn last_working_code(&self) -> &str {
        &self.last_working_code
    }

    pub fn working_count(&self) -> u32 {
        self.working_count
    }

    pub fn runtime_errors(&self) -> &[RuntimeError] {
        &self.runtime_errors
    }
}
