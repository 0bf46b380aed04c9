use std::{fmt, rc::Rc};

use crate::{
    ast::{Block, FuncArg},
    diagnostics::RuntimeError,
    interpreter::CallContext,
    scope::ScopeRef,
};

#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn num(value: f64) -> Self {
        Self::new(ValueKind::Num(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::num(if value { 1.0 } else { 0.0 })
    }

    pub fn symbol(value: impl Into<String>) -> Self {
        Self::new(ValueKind::Symbol(value.into()))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::new(ValueKind::List(values))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        matches!(&*self.0, ValueKind::Null)
    }

    pub fn as_num(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Only Null and Num(0) are falsy.
    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Null => false,
            ValueKind::Num(n) => *n != 0.0,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Num(_) => "Number",
            ValueKind::Symbol(_) => "Symbol",
            ValueKind::Null => "Null",
            ValueKind::List(_) => "List",
            ValueKind::Lambda(_) => "Lambda",
            ValueKind::BuiltIn(_) => "BuiltIn",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::Num(a), ValueKind::Num(b)) => a == b,
            (ValueKind::Symbol(a), ValueKind::Symbol(b)) => a == b,
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::List(a), ValueKind::List(b)) => a == b,
            (ValueKind::Lambda(_), ValueKind::Lambda(_))
            | (ValueKind::BuiltIn(_), ValueKind::BuiltIn(_)) => Rc::ptr_eq(&self.0, &other.0),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Num(n) => write!(f, "Num({n})"),
            ValueKind::Symbol(s) => write!(f, "Symbol({s})"),
            ValueKind::Null => write!(f, "Null"),
            ValueKind::List(values) => f.debug_list().entries(values.iter()).finish(),
            ValueKind::Lambda(closure) => write!(
                f,
                "<lambda {}>",
                closure.name.as_deref().unwrap_or("anonymous")
            ),
            ValueKind::BuiltIn(fun) => write!(f, "<builtin {}>", fun.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            ValueKind::Num(n) => write!(f, "{n}"),
            ValueKind::Symbol(s) => write!(f, ":{s}"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::List(values) => {
                write!(f, "[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            ValueKind::Lambda(closure) => write!(
                f,
                "<func {}>",
                closure.name.as_deref().unwrap_or("anonymous")
            ),
            ValueKind::BuiltIn(fun) => write!(f, "<builtin {}>", fun.name),
        }
    }
}

pub enum ValueKind {
    Num(f64),
    Symbol(String),
    Null,
    List(Vec<Value>),
    Lambda(Closure),
    BuiltIn(NativeFunction),
}

/// A function value: parameters, the scope it was defined in, and its body.
pub struct Closure {
    pub name: Option<String>,
    pub args: Vec<FuncArg>,
    pub scope: ScopeRef,
    pub body: Block,
}

pub type NativeResult = Result<Value, RuntimeError>;

pub type NativeFn = fn(&mut CallContext<'_, '_>, &[Value]) -> NativeResult;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub callback: NativeFn,
}
