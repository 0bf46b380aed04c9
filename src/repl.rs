use rustyline::{DefaultEditor, error::ReadlineError};

use crate::{
    diagnostics::{ImprovError, Result},
    interpreter::Interpreter,
    parser::{self, ParseOptions},
    scope::{Scope, ScopeRef},
    sketch::{self, Sketch},
    stdlib,
    value::Value,
};

pub struct Repl {
    interpreter: Interpreter,
    scope: ScopeRef,
    sketch: Sketch,
}

impl Repl {
    pub fn new() -> Result<Self> {
        let scope = Scope::new();
        stdlib::install(&scope)?;
        sketch::install(&scope)?;
        scope.borrow_mut().define("time", Value::num(0.0));
        Ok(Self {
            interpreter: Interpreter::new(),
            scope,
            sketch: Sketch::new(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().map_err(readline_error)?;
        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { ">> " } else { ".. " };
            match editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if buffer.is_empty() {
                        if trimmed == ":quit" || trimmed == ":exit" {
                            break;
                        }
                        if trimmed.is_empty() {
                            continue;
                        }
                    }
                    if !trimmed.is_empty() {
                        editor.add_history_entry(line.as_str()).ok();
                        buffer.push_str(&line);
                        buffer.push('\n');
                        if opens_block(&buffer) {
                            continue;
                        }
                    }
                    let source = std::mem::take(&mut buffer);
                    match self.eval(&source) {
                        Ok(value) => {
                            if !value.is_null() {
                                println!("{value}");
                            }
                            for command in self.sketch.commands() {
                                println!("  {command}");
                            }
                        }
                        Err(err) => eprintln!("{err}"),
                    }
                }
                Err(ReadlineError::Interrupted) => buffer.clear(),
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_error(err)),
            }
        }
        Ok(())
    }

    /// Evaluates `source` against the session scope, so definitions persist
    /// between inputs. Draw commands from this input stay in [`Repl::sketch`].
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let parsed = parser::parse(source, ParseOptions::default());
        if !parsed.is_clean() {
            return Err(ImprovError::Diagnostics(parsed.errors));
        }
        self.sketch.begin_frame();
        let value = self
            .interpreter
            .load(&parsed.ast, &self.scope, &mut self.sketch)?;
        Ok(value)
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }
}

/// Whether more lines are needed before `buffer` can be evaluated: the first
/// line starts a block and the user has not yet entered an empty line.
fn opens_block(buffer: &str) -> bool {
    let mut lines = buffer.lines();
    let Some(first) = lines.next() else {
        return false;
    };
    let first = first.trim();
    let header = first.starts_with("if ")
        || first.starts_with("loop ")
        || (first.starts_with("func ") && !first.contains("=>"))
        || first.ends_with('|');
    header || lines.next().is_some()
}

fn readline_error(err: ReadlineError) -> ImprovError {
    ImprovError::from(std::io::Error::other(err))
}
