//! A drawing host that records what a program draws instead of rasterizing
//! it. One [`Sketch`] is handed to every tick as the interpreter's host.

use std::fmt;

use serde::Serialize;

use crate::{
    diagnostics::{Result, RuntimeError},
    ffi::{num_arg, symbol_arg},
    interpreter::{CallContext, Interpreter},
    scope::ScopeRef,
    stdlib::{Snippet, bootstrap, define_natives},
    value::{NativeFn, NativeResult, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    Rotate,
    Move,
    Scale,
}

impl TransformKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransformKind::Rotate => "rotate",
            TransformKind::Move => "move",
            TransformKind::Scale => "scale",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum DrawCommand {
    Shape { name: String, size: [f64; 3] },
    Transform { kind: TransformKind, x: f64, y: f64, z: f64 },
    Fill { r: f64, g: f64, b: f64 },
    Background { r: f64, g: f64, b: f64 },
    Push,
    Pop,
}

impl fmt::Display for DrawCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawCommand::Shape { name, size } => {
                write!(f, "shape {name} {} {} {}", size[0], size[1], size[2])
            }
            DrawCommand::Transform { kind, x, y, z } => {
                write!(f, "{} {x} {y} {z}", kind.as_str())
            }
            DrawCommand::Fill { r, g, b } => write!(f, "fill {r} {g} {b}"),
            DrawCommand::Background { r, g, b } => write!(f, "background {r} {g} {b}"),
            DrawCommand::Push => write!(f, "push"),
            DrawCommand::Pop => write!(f, "pop"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Sketch {
    commands: Vec<DrawCommand>,
    frame: u64,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the previous frame's commands.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
        self.frame += 1;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn record(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

pub const SHAPES: &[Snippet] = &[
    Snippet {
        name: "box",
        source: "func box(x, y, z)\n  x := 1\n  y := x\n  z := y\n  shape(:cube, x, y, z)\n",
    },
    Snippet {
        name: "ball",
        source: "func ball(x, y, z)\n  x := 1\n  y := x\n  z := y\n  shape(:sphere, x, y, z)\n",
    },
    Snippet {
        name: "cylinder",
        source: "func cylinder(x, y, z)\n  x := 1\n  y := x\n  z := y\n  shape(:cylinder, x, y, z)\n",
    },
    Snippet {
        name: "rectangle",
        source: "func rectangle(x, y)\n  x := 1\n  y := x\n  shape(:rectangle, x, y, 1)\n",
    },
    Snippet {
        name: "line",
        source: "func line(length)\n  length := 1\n  shape(:line, length, 1, 1)\n",
    },
];

const NATIVES: &[(&str, NativeFn)] = &[
    ("shape", draw_shape),
    ("rotate", rotate),
    ("move", translate),
    ("scale", scale),
    ("fill", fill),
    ("background", background),
    ("pushSnapshot", push_snapshot),
    ("popSnapshot", pop_snapshot),
];

/// Defines the drawing builtins and the shape functions built on them.
pub fn install(scope: &ScopeRef) -> Result<()> {
    define_natives(scope, NATIVES);
    bootstrap(&Interpreter::new(), scope, SHAPES)
}

fn draw_shape(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let name = symbol_arg(ctx, args, 0)?;
    let size = [num_arg(ctx, args, 1)?, num_arg(ctx, args, 2)?, num_arg(ctx, args, 3)?];
    ctx.host::<Sketch>()?.record(DrawCommand::Shape { name, size });
    Ok(Value::null())
}

fn rotate(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    transform(ctx, args, TransformKind::Rotate)
}

fn translate(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    transform(ctx, args, TransformKind::Move)
}

fn scale(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    transform(ctx, args, TransformKind::Scale)
}

fn transform(ctx: &mut CallContext<'_, '_>, args: &[Value], kind: TransformKind) -> NativeResult {
    let (x, y, z) = triple(ctx, args)?;
    scoped(ctx, DrawCommand::Transform { kind, x, y, z })
}

fn fill(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let (r, g, b) = triple(ctx, args)?;
    scoped(ctx, DrawCommand::Fill { r, g, b })
}

fn background(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let (r, g, b) = triple(ctx, args)?;
    ctx.host::<Sketch>()?.record(DrawCommand::Background { r, g, b });
    Ok(Value::null())
}

fn push_snapshot(ctx: &mut CallContext<'_, '_>, _args: &[Value]) -> NativeResult {
    ctx.host::<Sketch>()?.record(DrawCommand::Push);
    Ok(Value::null())
}

fn pop_snapshot(ctx: &mut CallContext<'_, '_>, _args: &[Value]) -> NativeResult {
    ctx.host::<Sketch>()?.record(DrawCommand::Pop);
    Ok(Value::null())
}

fn triple(
    ctx: &CallContext<'_, '_>,
    args: &[Value],
) -> std::result::Result<(f64, f64, f64), RuntimeError> {
    Ok((num_arg(ctx, args, 0)?, num_arg(ctx, args, 1)?, num_arg(ctx, args, 2)?))
}

/// Records `command`; with a trailing block it only holds for that block.
fn scoped(ctx: &mut CallContext<'_, '_>, command: DrawCommand) -> NativeResult {
    if ctx.block().is_none() {
        ctx.host::<Sketch>()?.record(command);
        return Ok(Value::null());
    }
    {
        let sketch = ctx.host::<Sketch>()?;
        sketch.record(DrawCommand::Push);
        sketch.record(command);
    }
    let result = ctx.call_block()?;
    ctx.host::<Sketch>()?.record(DrawCommand::Pop);
    Ok(result)
}
