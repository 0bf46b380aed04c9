use std::f64::consts::PI;

use crate::{
    diagnostics::{ImprovError, Result},
    ffi::{is_null, make_func, make_num, num_arg},
    interpreter::{CallContext, Interpreter},
    parser::{self, ParseOptions},
    scope::ScopeRef,
    value::{NativeFn, NativeResult, Value, ValueKind},
};

/// A named piece of standard library written in the language itself.
pub struct Snippet {
    pub name: &'static str,
    pub source: &'static str,
}

pub const SNIPPETS: &[Snippet] = &[
    Snippet {
        name: "clamp",
        source: "func clamp(x, low, high) => max(low, min(x, high))\n",
    },
    Snippet {
        name: "lerp",
        source: "func lerp(from, to, amount) => from + (to - from) * amount\n",
    },
    Snippet {
        name: "wave",
        source: "func wave(period)\n  period := 1\n  sin(360 * time / period)\n",
    },
];

const NATIVES: &[(&str, NativeFn)] = &[
    ("sin", maths_sin),
    ("cos", maths_cos),
    ("tan", maths_tan),
    ("abs", maths_abs),
    ("ceil", maths_ceil),
    ("floor", maths_floor),
    ("round", maths_round),
    ("log", maths_log),
    ("sqrt", maths_sqrt),
    ("max", maths_max),
    ("min", maths_min),
    ("isNull", util_is_null),
    ("length", util_length),
];

/// Defines the native builtins and then loads [`SNIPPETS`] on top of them.
pub fn install(scope: &ScopeRef) -> Result<()> {
    define_natives(scope, NATIVES);
    bootstrap(&Interpreter::new(), scope, SNIPPETS)
}

pub fn define_natives(scope: &ScopeRef, natives: &[(&'static str, NativeFn)]) {
    let mut frame = scope.borrow_mut();
    for &(name, callback) in natives {
        frame.define(name, make_func(name, callback));
    }
}

/// Parses and loads each snippet into `scope`. Any diagnostic is fatal.
pub fn bootstrap(
    interpreter: &Interpreter,
    scope: &ScopeRef,
    snippets: &[Snippet],
) -> Result<()> {
    for snippet in snippets {
        let parsed = parser::parse(snippet.source, ParseOptions::default());
        if !parsed.is_clean() {
            return Err(ImprovError::Bootstrap {
                name: snippet.name.to_string(),
                errors: parsed.errors,
            });
        }
        interpreter
            .load(&parsed.ast, scope, &mut ())
            .map_err(|err| ImprovError::Bootstrap {
                name: snippet.name.to_string(),
                errors: vec![(&err).into()],
            })?;
    }
    Ok(())
}

const TO_RADIANS: f64 = PI / 180.0;

fn maths_sin(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num((num_arg(ctx, args, 0)? * TO_RADIANS).sin()))
}

fn maths_cos(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num((num_arg(ctx, args, 0)? * TO_RADIANS).cos()))
}

fn maths_tan(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num((num_arg(ctx, args, 0)? * TO_RADIANS).tan()))
}

fn maths_abs(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num(num_arg(ctx, args, 0)?.abs()))
}

fn maths_ceil(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num(num_arg(ctx, args, 0)?.ceil()))
}

fn maths_floor(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num(num_arg(ctx, args, 0)?.floor()))
}

// halves round towards positive infinity
fn maths_round(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num((num_arg(ctx, args, 0)? + 0.5).floor()))
}

fn maths_log(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num(num_arg(ctx, args, 0)?.ln()))
}

fn maths_sqrt(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    Ok(make_num(num_arg(ctx, args, 0)?.sqrt()))
}

fn maths_max(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let (a, b) = (num_arg(ctx, args, 0)?, num_arg(ctx, args, 1)?);
    Ok(make_num(if a > b { a } else { b }))
}

fn maths_min(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let (a, b) = (num_arg(ctx, args, 0)?, num_arg(ctx, args, 1)?);
    Ok(make_num(if a < b { a } else { b }))
}

fn util_is_null(_ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let null = args.first().is_none_or(is_null);
    Ok(Value::bool(null))
}

fn util_length(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    match args.first().map(Value::kind) {
        Some(ValueKind::List(values)) => Ok(make_num(values.len() as f64)),
        _ => Err(ctx.error("length expected a List")),
    }
}
