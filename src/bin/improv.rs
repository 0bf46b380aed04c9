use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};

use improv::{
    ImprovError, ParseOptions, Repl, Session, SessionConfig, Sketch, diagnostics::Result, parse,
};

#[derive(Parser)]
#[command(author, version, about = "improv live-coding language")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script for a number of frames and print the last frame's drawing
    Run {
        script: PathBuf,
        /// Number of frames to run
        #[arg(long, default_value_t = 1)]
        frames: u32,
        /// Seconds between frames, as seen through `time`
        #[arg(long, default_value_t = 1.0 / 60.0)]
        time_step: f64,
        /// Print draw commands as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a script and report its diagnostics
    Check {
        script: PathBuf,
        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a snippet of code
    Eval { source: String },
    /// Start an interactive REPL session
    Repl,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match dispatch(args.command.unwrap_or(Command::Repl)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run {
            script,
            frames,
            time_step,
            json,
        } => run_script(script, frames, time_step, json),
        Command::Check { script, json } => check_script(script, json),
        Command::Eval { source } => {
            let mut repl = Repl::new()?;
            let value = repl.eval(&source)?;
            if !value.is_null() {
                println!("{value}");
            }
            for command in repl.sketch().commands() {
                println!("{command}");
            }
            Ok(())
        }
        Command::Repl => Repl::new()?.run(),
    }
}

fn run_script(path: PathBuf, frames: u32, time_step: f64, json: bool) -> Result<()> {
    let source = fs::read_to_string(&path)?;
    let mut session = Session::with_stdlib(SessionConfig::default())?;
    let diagnostics = session.evaluate(&source);
    if !diagnostics.is_empty() {
        return Err(ImprovError::Diagnostics(diagnostics));
    }

    let mut sketch = Sketch::new();
    for frame in 0..frames.max(1) {
        let errors = session.tick(f64::from(frame) * time_step, &mut sketch);
        if let Some(err) = errors.first() {
            return Err(ImprovError::Runtime(err.clone()));
        }
    }

    if json {
        println!("{}", to_json(sketch.commands())?);
    } else {
        for command in sketch.commands() {
            println!("{command}");
        }
    }
    Ok(())
}

fn check_script(path: PathBuf, json: bool) -> Result<()> {
    let source = fs::read_to_string(&path)?;
    let parsed = parse(&source, ParseOptions::default());
    if json {
        println!("{}", to_json(&parsed.errors)?);
    }
    if parsed.is_clean() {
        if !json {
            println!("{}: ok", path.display());
        }
        Ok(())
    } else {
        Err(ImprovError::Diagnostics(parsed.errors))
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
