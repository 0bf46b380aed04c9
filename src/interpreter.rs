use std::{any::Any, rc::Rc};

use crate::{
    ast::{Block, FuncArg, Lambda, Node, NodeKind, Program},
    diagnostics::{Position, RuntimeError, RuntimeErrorKind},
    lexer::Operator,
    scope::{Scope, ScopeRef},
    value::{Closure, Value, ValueKind},
};

/// Nested calls to language functions allowed before a run fails. Kept low
/// enough that the evaluator's own recursion fits a 2 MiB thread stack.
pub const MAX_CALL_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub exit_code: i32,
    pub errors: Vec<RuntimeError>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Tree-walking evaluator. Holds no state between runs: everything that
/// persists lives in the scope handed to [`Interpreter::run`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Self
    }

    pub fn run(&self, program: &Program, scope: &ScopeRef) -> RunResult {
        self.run_with_host(program, scope, &mut ())
    }

    /// Runs `program` in a fresh child of `scope`. Native functions reach
    /// `host` through their [`CallContext`].
    pub fn run_with_host(
        &self,
        program: &Program,
        scope: &ScopeRef,
        host: &mut dyn Any,
    ) -> RunResult {
        let mut evaluator = Evaluator::new(host);
        let frame = Scope::with_parent(Rc::clone(scope));
        let outcome = program
            .statements
            .iter()
            .try_for_each(|statement| evaluator.evaluate(statement, &frame).map(|_| ()));
        Scope::release(&frame);
        match outcome {
            Ok(()) => RunResult {
                exit_code: 0,
                errors: Vec::new(),
            },
            Err(err) => RunResult {
                exit_code: 1,
                errors: vec![err],
            },
        }
    }

    /// Evaluates top-level statements directly into `scope`, so definitions
    /// stay visible afterwards. Returns the value of the last statement.
    pub fn load(
        &self,
        program: &Program,
        scope: &ScopeRef,
        host: &mut dyn Any,
    ) -> Result<Value, RuntimeError> {
        let mut evaluator = Evaluator::new(host);
        let mut last = Value::null();
        for statement in &program.statements {
            last = evaluator.evaluate(statement, scope)?;
        }
        Ok(last)
    }
}

struct Evaluator<'h> {
    host: &'h mut dyn Any,
    depth: usize,
}

impl<'h> Evaluator<'h> {
    fn new(host: &'h mut dyn Any) -> Self {
        Self { host, depth: 0 }
    }

    fn evaluate(&mut self, node: &Node, scope: &ScopeRef) -> Result<Value, RuntimeError> {
        match &node.kind {
            NodeKind::Loop {
                count,
                block,
                loop_var,
            } => self.evaluate_loop(count, block, loop_var.as_deref(), scope),
            NodeKind::Assignment {
                identifier,
                expression,
            } => {
                let value = self.evaluate(expression, scope)?;
                scope.borrow_mut().define(identifier.clone(), value.clone());
                Ok(value)
            }
            NodeKind::ConditionalAssignment {
                identifier,
                expression,
            } => {
                let value = self.evaluate(expression, scope)?;
                if !Scope::is_bound(scope, identifier) {
                    scope.borrow_mut().define(identifier.clone(), value.clone());
                }
                Ok(value)
            }
            NodeKind::If { conditionals } => {
                for conditional in conditionals {
                    if self.evaluate(&conditional.predicate, scope)?.is_truthy() {
                        return self.evaluate_block(&conditional.block, scope);
                    }
                }
                Ok(Value::null())
            }
            NodeKind::Lambda(lambda) => Ok(closure(None, lambda, scope)),
            NodeKind::Func { name, args, body } => {
                let function = Closure {
                    name: Some(name.clone()),
                    args: args.clone(),
                    scope: Rc::clone(scope),
                    body: body.clone(),
                };
                scope
                    .borrow_mut()
                    .define(name.clone(), Value::new(ValueKind::Lambda(function)));
                Ok(Value::null())
            }
            NodeKind::Application { name, args, lambda } => {
                self.evaluate_application(node, name, args, lambda.as_ref(), scope)
            }
            NodeKind::BinaryOp {
                operator,
                left,
                right,
            } => {
                let lhs = self.number(left, node.position, scope)?;
                let rhs = self.number(right, node.position, scope)?;
                Ok(binary(*operator, lhs, rhs))
            }
            NodeKind::UnaryOp { operator, expr } => {
                let value = self.number(expr, node.position, scope)?;
                match operator {
                    Operator::Subtract => Ok(Value::num(-value)),
                    other => Err(RuntimeError::new(
                        RuntimeErrorKind::UnknownOperator(other.to_string()),
                        node.position,
                    )),
                }
            }
            NodeKind::Variable(identifier) => match Scope::lookup(scope, identifier) {
                Some(value) if !value.is_null() => Ok(value),
                _ => Err(RuntimeError::new(
                    RuntimeErrorKind::UndefinedVariable(identifier.clone()),
                    node.position,
                )),
            },
            NodeKind::Index { collection, index } => {
                let target = self.evaluate(collection, scope)?;
                let ValueKind::List(values) = target.kind() else {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::IndexTarget(target.type_name()),
                        node.position,
                    ));
                };
                let idx = self.number(index, node.position, scope)?;
                let in_range = idx >= 0.0 && idx.fract() == 0.0 && (idx as usize) < values.len();
                Ok(if in_range {
                    values[idx as usize].clone()
                } else {
                    Value::null()
                })
            }
            NodeKind::Num(value) => Ok(Value::num(*value)),
            NodeKind::Null => Ok(Value::null()),
            NodeKind::Symbol(value) => Ok(Value::symbol(value.clone())),
            NodeKind::List(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element, scope)?);
                }
                Ok(Value::list(values))
            }
        }
    }

    fn evaluate_block(&mut self, block: &Block, scope: &ScopeRef) -> Result<Value, RuntimeError> {
        let frame = Scope::with_parent(Rc::clone(scope));
        let outcome = block
            .elements
            .iter()
            .try_fold(Value::null(), |_, element| self.evaluate(element, &frame));
        Scope::release(&frame);
        outcome
    }

    fn evaluate_loop(
        &mut self,
        count: &Node,
        block: &Block,
        loop_var: Option<&str>,
        scope: &ScopeRef,
    ) -> Result<Value, RuntimeError> {
        let count_value = self.evaluate(count, scope)?;
        let Some(times) = count_value.as_num() else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::BadLoopCount(count_value.type_name()),
                count.position,
            ));
        };
        let iterations = if times > 0.0 { times.floor() as u64 } else { 0 };
        // one frame for every iteration, so body assignments carry over
        let frame = Scope::with_parent(Rc::clone(scope));
        let outcome = (0..iterations).try_for_each(|i| {
            if let Some(name) = loop_var {
                frame.borrow_mut().define(name, Value::num(i as f64));
            }
            block
                .elements
                .iter()
                .try_for_each(|element| self.evaluate(element, &frame).map(|_| ()))
        });
        Scope::release(&frame);
        outcome.map(|()| Value::null())
    }

    fn evaluate_application(
        &mut self,
        node: &Node,
        name: &str,
        args: &[Node],
        lambda: Option<&Lambda>,
        scope: &ScopeRef,
    ) -> Result<Value, RuntimeError> {
        let callee = match Scope::lookup(scope, name) {
            Some(value) if matches!(value.kind(), ValueKind::Lambda(_) | ValueKind::BuiltIn(_)) => {
                value
            }
            _ => {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::NotAFunction(name.to_string()),
                    node.position,
                ));
            }
        };
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg, scope)?);
        }
        let block = lambda.map(|lambda| closure(None, lambda, scope));
        self.call(&callee, arg_values, block, name, node.position)
    }

    fn call(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        block: Option<Value>,
        name: &str,
        position: Option<Position>,
    ) -> Result<Value, RuntimeError> {
        match callee.kind() {
            ValueKind::Lambda(function) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(RuntimeError::new(
                        RuntimeErrorKind::RecursionLimit(name.to_string()),
                        position,
                    ));
                }
                let frame = Scope::with_parent(Rc::clone(&function.scope));
                {
                    let mut locals = frame.borrow_mut();
                    for (idx, arg) in function.args.iter().enumerate() {
                        let value = match arg {
                            FuncArg::Var(_) => args.get(idx).cloned(),
                            FuncArg::Block(_) => block.clone(),
                        };
                        locals.define(arg.name(), value.unwrap_or_else(Value::null));
                    }
                }
                self.depth += 1;
                let result = self.evaluate_block(&function.body, &frame);
                self.depth -= 1;
                result
            }
            ValueKind::BuiltIn(native) => {
                let mut context = CallContext {
                    evaluator: self,
                    name,
                    position,
                    block,
                };
                (native.callback)(&mut context, &args)
            }
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::NotAFunction(name.to_string()),
                position,
            )),
        }
    }

    fn number(
        &mut self,
        node: &Node,
        fallback: Option<Position>,
        scope: &ScopeRef,
    ) -> Result<f64, RuntimeError> {
        let value = self.evaluate(node, scope)?;
        value.as_num().ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::TypeMismatch {
                    expected: "Number",
                    found: value.type_name(),
                },
                node.position.or(fallback),
            )
        })
    }
}

fn closure(name: Option<String>, lambda: &Lambda, scope: &ScopeRef) -> Value {
    Value::new(ValueKind::Lambda(Closure {
        name,
        args: lambda.args.clone(),
        scope: Rc::clone(scope),
        body: lambda.body.clone(),
    }))
}

fn binary(operator: Operator, lhs: f64, rhs: f64) -> Value {
    use Operator::*;
    match operator {
        Add => Value::num(lhs + rhs),
        Subtract => Value::num(lhs - rhs),
        Multiply => Value::num(lhs * rhs),
        Divide => Value::num(lhs / rhs),
        Modulo => Value::num(lhs % rhs),
        Power => Value::num(lhs.powf(rhs)),
        Less => Value::bool(lhs < rhs),
        LessEqual => Value::bool(lhs <= rhs),
        Greater => Value::bool(lhs > rhs),
        GreaterEqual => Value::bool(lhs >= rhs),
        Equal => Value::bool(lhs == rhs),
        NotEqual => Value::bool(lhs != rhs),
        And => Value::bool(lhs != 0.0 && rhs != 0.0),
        Or => Value::bool(lhs != 0.0 || rhs != 0.0),
    }
}

/// What a native function sees of the call that invoked it.
pub struct CallContext<'e, 'h> {
    evaluator: &'e mut Evaluator<'h>,
    name: &'e str,
    position: Option<Position>,
    block: Option<Value>,
}

impl CallContext<'_, '_> {
    pub fn name(&self) -> &str {
        self.name
    }

    /// The call's trailing block, not yet invoked.
    pub fn block(&self) -> Option<&Value> {
        self.block.as_ref()
    }

    /// Runs the trailing block as a zero-argument call; Null when absent.
    pub fn call_block(&mut self) -> Result<Value, RuntimeError> {
        match self.block.clone() {
            Some(block) => self.call(&block, Vec::new()),
            None => Ok(Value::null()),
        }
    }

    pub fn call(&mut self, function: &Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let name = self.name;
        let position = self.position;
        self.evaluator.call(function, args, None, name, position)
    }

    /// Downcasts the host handed to [`Interpreter::run_with_host`].
    pub fn host<T: Any>(&mut self) -> Result<&mut T, RuntimeError> {
        let position = self.position;
        let name = self.name;
        self.evaluator.host.downcast_mut::<T>().ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::Native(format!("{name} is not available in this runtime")),
                position,
            )
        })
    }

    pub fn error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Native(message.into()), self.position)
    }
}
