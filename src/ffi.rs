//! Bridge between native Rust functions and the interpreter's value space.
//!
//! Natives are plain `fn` pointers; anything they need from the embedding
//! runtime comes through [`CallContext::host`] rather than captured state.

use crate::{
    diagnostics::RuntimeError,
    interpreter::CallContext,
    value::{NativeFn, NativeFunction, Value, ValueKind},
};

pub fn make_func(name: &'static str, callback: NativeFn) -> Value {
    Value::new(ValueKind::BuiltIn(NativeFunction { name, callback }))
}

pub fn make_num(value: f64) -> Value {
    Value::num(value)
}

pub fn make_symbol(value: impl Into<String>) -> Value {
    Value::symbol(value)
}

pub fn make_list(values: Vec<Value>) -> Value {
    Value::list(values)
}

pub fn is_num(value: &Value) -> bool {
    matches!(value.kind(), ValueKind::Num(_))
}

pub fn is_symbol(value: &Value) -> bool {
    matches!(value.kind(), ValueKind::Symbol(_))
}

pub fn is_null(value: &Value) -> bool {
    value.is_null()
}

pub fn is_list(value: &Value) -> bool {
    matches!(value.kind(), ValueKind::List(_))
}

/// The `idx`th argument as a number, or a positioned error.
pub fn num_arg(ctx: &CallContext<'_, '_>, args: &[Value], idx: usize) -> Result<f64, RuntimeError> {
    let value = args.get(idx).cloned().unwrap_or_else(Value::null);
    value.as_num().ok_or_else(|| {
        ctx.error(format!(
            "{} expected Number for argument {} but found {}",
            ctx.name(),
            idx + 1,
            value.type_name()
        ))
    })
}

/// Like [`num_arg`], but a missing or Null argument yields `default`.
pub fn optional_num_arg(
    ctx: &CallContext<'_, '_>,
    args: &[Value],
    idx: usize,
    default: f64,
) -> Result<f64, RuntimeError> {
    match args.get(idx) {
        None => Ok(default),
        Some(value) if value.is_null() => Ok(default),
        Some(_) => num_arg(ctx, args, idx),
    }
}

pub fn symbol_arg(
    ctx: &CallContext<'_, '_>,
    args: &[Value],
    idx: usize,
) -> Result<String, RuntimeError> {
    let value = args.get(idx).cloned().unwrap_or_else(Value::null);
    match value.kind() {
        ValueKind::Symbol(name) => Ok(name.clone()),
        _ => Err(ctx.error(format!(
            "{} expected Symbol for argument {} but found {}",
            ctx.name(),
            idx + 1,
            value.type_name()
        ))),
    }
}
