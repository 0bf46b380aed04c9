use std::rc::Rc;

use improv::{
    CallContext, ImprovError, Interpreter, ParseOptions, RunResult, Scope, ScopeRef, Value,
    ast::{Block, FuncArg, Node, Program},
    diagnostics::RuntimeErrorKind,
    ffi::{
        is_list, is_null, is_num, is_symbol, make_func, make_list, make_num, make_symbol,
        num_arg, optional_num_arg,
    },
    lexer::Operator,
    parse,
    stdlib::{self, Snippet},
    value::NativeResult,
};

fn record(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let value = args.first().cloned().unwrap_or_else(Value::null);
    ctx.host::<Vec<Value>>()?.push(value);
    Ok(Value::null())
}

fn scaled(ctx: &mut CallContext<'_, '_>, args: &[Value]) -> NativeResult {
    let factor = optional_num_arg(ctx, args, 1, 2.0)?;
    Ok(make_num(num_arg(ctx, args, 0)? * factor))
}

fn keep(ctx: &mut CallContext<'_, '_>, _args: &[Value]) -> NativeResult {
    Ok(ctx.host::<Value>()?.clone())
}

fn scope_with_result() -> ScopeRef {
    let scope = Scope::new();
    stdlib::install(&scope).expect("stdlib loads");
    {
        let mut frame = scope.borrow_mut();
        frame.define("result", make_func("result", record));
        frame.define("scaled", make_func("scaled", scaled));
    }
    scope
}

fn run(source: &str) -> (RunResult, Vec<Value>) {
    let parsed = parse(source, ParseOptions::default());
    assert!(
        parsed.is_clean(),
        "unexpected diagnostics for {source:?}: {:?}",
        parsed.errors
    );
    let scope = scope_with_result();
    let mut recorded: Vec<Value> = Vec::new();
    let outcome = Interpreter::new().run_with_host(&parsed.ast, &scope, &mut recorded);
    (outcome, recorded)
}

fn recorded(source: &str) -> Vec<Value> {
    let (outcome, values) = run(source);
    assert!(
        outcome.is_success(),
        "run failed for {source:?}: {:?}",
        outcome.errors
    );
    values
}

fn nums(values: &[f64]) -> Vec<Value> {
    values.iter().copied().map(Value::num).collect()
}

fn run_error(source: &str) -> (RuntimeErrorKind, usize, usize) {
    let (outcome, _) = run(source);
    assert_eq!(outcome.exit_code, 1, "expected {source:?} to fail");
    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    (error.kind.clone(), error.line(), error.character())
}

#[test]
fn result_builtin_receives_assigned_value() {
    let program = Program::new(vec![
        Node::assignment("a", Node::num(3.0)),
        Node::application("result", vec![Node::variable("a")]),
    ]);
    let scope = scope_with_result();
    let mut values: Vec<Value> = Vec::new();
    let outcome = Interpreter::new().run_with_host(&program, &scope, &mut values);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(values, nums(&[3.0]));
}

#[test]
fn lambda_nodes_evaluate_to_closures() {
    let double = Node::lambda(
        vec![FuncArg::var("x")],
        Block::new(vec![Node::binary_op(
            Operator::Multiply,
            Node::variable("x"),
            Node::num(2.0),
        )]),
    );
    let program = Program::new(vec![
        Node::assignment("double", double),
        Node::application(
            "result",
            vec![Node::application("double", vec![Node::num(4.0)])],
        ),
    ]);
    let scope = scope_with_result();
    let mut values: Vec<Value> = Vec::new();
    let outcome = Interpreter::new().run_with_host(&program, &scope, &mut values);
    assert!(outcome.is_success(), "{:?}", outcome.errors);
    assert_eq!(values, nums(&[8.0]));
}

#[test]
fn loop_variable_counts_from_zero_and_body_accumulates() {
    let values = recorded("a = 0\nloop 5 times with i\n  a = a + i\n  result(a)\n");
    assert_eq!(values, nums(&[0.0, 1.0, 3.0, 6.0, 10.0]));
}

#[test]
fn loop_count_is_floored_and_never_negative() {
    assert_eq!(recorded("loop 2.7 times\n  result(1)\n").len(), 2);
    assert!(recorded("loop -3 times\n  result(1)\n").is_empty());
}

#[test]
fn loop_count_must_be_a_number() {
    let (kind, line, character) = run_error("loop :many times\n  result(1)\n");
    assert_eq!(kind, RuntimeErrorKind::BadLoopCount("Symbol"));
    assert_eq!((line, character), (1, 6));
}

#[test]
fn conditional_assignment_only_binds_unbound_names() {
    assert_eq!(recorded("a := 1\na := 2\nresult(a)\n"), nums(&[1.0]));
    assert_eq!(recorded("a = null\na := 3\nresult(a)\n"), nums(&[3.0]));
}

#[test]
fn only_null_and_zero_are_falsy() {
    let source = "if :foo\n  result(1)\nif 0\n  result(2)\nif null\n  result(3)\nif 0.5\n  result(4)\nif [0]\n  result(5)\n";
    assert_eq!(recorded(source), nums(&[1.0, 4.0, 5.0]));
    assert!(Value::symbol("a").is_truthy());
    assert!(!Value::num(0.0).is_truthy());
    assert!(!Value::null().is_truthy());
}

#[test]
fn first_truthy_clause_wins() {
    let source = "a = 2\nif a == 1\n  result(1)\nelif a == 2\n  result(2)\nelse\n  result(3)\n";
    assert_eq!(recorded(source), nums(&[2.0]));
    assert_eq!(recorded("if 0\n  result(1)\nelse\n  result(9)\n"), nums(&[9.0]));
}

#[test]
fn unmatched_if_is_a_silent_no_op() {
    let (outcome, values) = run("if 0\n  result(1)\nelif null\n  result(2)\n");
    assert!(outcome.is_success());
    assert!(values.is_empty());
}

#[test]
fn functions_resolve_free_names_in_their_defining_scope() {
    let source = "x = 1\nfunc f() => x\nfunc g()\n  x = 5\n  f()\nresult(g())\nresult(x)\n";
    assert_eq!(recorded(source), nums(&[1.0, 1.0]));
}

#[test]
fn writes_inside_a_function_stay_local() {
    let source = "a = 1\nfunc bump()\n  a = a + 1\nresult(bump())\nresult(a)\n";
    assert_eq!(recorded(source), nums(&[2.0, 1.0]));
}

#[test]
fn missing_arguments_bind_null_for_defaults() {
    let source = "func f(x)\n  x := 4\n  y = x * 2\nresult(f())\nresult(f(1))\n";
    assert_eq!(recorded(source), nums(&[8.0, 2.0]));
}

#[test]
fn block_arguments_are_callable() {
    let source = "func twice(&body)\n  body()\n  body()\ntwice()\n  result(7)\n";
    assert_eq!(recorded(source), nums(&[7.0, 7.0]));
}

#[test]
fn trailing_blocks_take_arguments() {
    let source = "func each(list, &fn)\n  loop length(list) times with i\n    fn(list[i])\neach([1, 2, 3])\n  |x|\n  result(x * 2)\n";
    assert_eq!(recorded(source), nums(&[2.0, 4.0, 6.0]));
}

#[test]
fn absent_block_argument_is_null() {
    let (kind, line, _) = run_error("func run(&body)\n  body()\nrun()\n");
    assert_eq!(kind, RuntimeErrorKind::NotAFunction("body".to_string()));
    assert_eq!(line, 2);
}

#[test]
fn calling_an_undefined_name_fails_with_position() {
    let (kind, line, character) = run_error("a = 1\nfoo(a)\n");
    assert_eq!(kind, RuntimeErrorKind::NotAFunction("foo".to_string()));
    assert_eq!((line, character), (2, 1));
}

#[test]
fn calling_a_non_callable_fails_before_evaluating_arguments() {
    let (outcome, values) = run("a = 1\na(result(5))\n");
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(
        outcome.errors[0].kind,
        RuntimeErrorKind::NotAFunction("a".to_string())
    );
    assert_eq!((outcome.errors[0].line(), outcome.errors[0].character()), (2, 1));
    assert!(values.is_empty());
}

#[test]
fn reading_an_undefined_variable_fails_with_position() {
    let (kind, line, character) = run_error("result(b)\n");
    assert_eq!(kind, RuntimeErrorKind::UndefinedVariable("b".to_string()));
    assert_eq!((line, character), (1, 8));
}

#[test]
fn execution_stops_at_first_error() {
    let (outcome, values) = run("result(1)\nresult(missing)\nresult(2)\n");
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(values, nums(&[1.0]));
}

#[test]
fn arithmetic_requires_numbers() {
    let (kind, line, character) = run_error("a = :foo + 1\n");
    assert_eq!(
        kind,
        RuntimeErrorKind::TypeMismatch {
            expected: "Number",
            found: "Symbol"
        }
    );
    assert_eq!((line, character), (1, 5));
}

#[test]
fn evaluates_operators() {
    let source = "result(-3 + 1)\nresult(2 ^ 3)\nresult(7 % 4)\nresult(2 != 3)\nresult(2 <= 1)\nresult(1 && 0)\nresult(0 || 5)\n";
    assert_eq!(recorded(source), nums(&[-2.0, 8.0, 3.0, 1.0, 0.0, 0.0, 1.0]));
}

#[test]
fn only_minus_is_a_unary_operator() {
    let (kind, _, _) = run_error("a = *2\n");
    assert_eq!(kind, RuntimeErrorKind::UnknownOperator("*".to_string()));
}

#[test]
fn indexes_lists() {
    let source = "l = [1, 2, 3]\nresult(l[1])\nresult(l[5])\nresult(l[-1])\nresult(l[0.5])\n";
    assert_eq!(
        recorded(source),
        vec![Value::num(2.0), Value::null(), Value::null(), Value::null()]
    );
}

#[test]
fn indexing_a_number_fails() {
    let (kind, _, _) = run_error("a = 1\nresult(a[0])\n");
    assert_eq!(kind, RuntimeErrorKind::IndexTarget("Number"));
}

#[test]
fn maths_builtins_use_degrees() {
    let source = "result(sin(90))\nresult(cos(0))\nresult(max(2, 7))\nresult(min(2, 7))\nresult(round(2.5))\nresult(floor(-1.5))\nresult(sqrt(16))\nresult(abs(-4))\n";
    assert_eq!(
        recorded(source),
        nums(&[1.0, 1.0, 7.0, 2.0, 3.0, -2.0, 4.0, 4.0])
    );
}

#[test]
fn utility_builtins_and_snippets() {
    let source = "result(isNull(null))\nresult(isNull(0))\nresult(length([1, 2]))\nresult(clamp(12, 0, 10))\nresult(lerp(0, 10, 0.5))\n";
    assert_eq!(recorded(source), nums(&[1.0, 0.0, 2.0, 10.0, 5.0]));
}

#[test]
fn native_argument_errors_name_the_builtin() {
    let (kind, line, character) = run_error("a = 1\nresult(sqrt(:a))\n");
    assert_eq!(
        kind,
        RuntimeErrorKind::Native("sqrt expected Number for argument 1 but found Symbol".to_string())
    );
    assert_eq!((line, character), (2, 8));
}

#[test]
fn optional_native_arguments_fall_back_to_defaults() {
    let source = "result(scaled(3))\nresult(scaled(3, null))\nresult(scaled(3, 4))\n";
    assert_eq!(recorded(source), nums(&[6.0, 6.0, 12.0]));
}

#[test]
fn ffi_classifies_values() {
    assert!(is_num(&make_num(1.0)));
    assert!(is_symbol(&make_symbol("cube")));
    assert!(is_list(&make_list(vec![make_num(1.0)])));
    assert!(is_null(&Value::null()));
    assert!(!is_num(&make_symbol("cube")));
    assert!(!is_list(&Value::null()));
}

#[test]
fn natives_without_their_host_report_an_error() {
    let parsed = parse("result(1)\n", ParseOptions::default());
    let scope = scope_with_result();
    let outcome = Interpreter::new().run(&parsed.ast, &scope);
    assert_eq!(outcome.exit_code, 1);
    assert_eq!(
        outcome.errors[0].kind,
        RuntimeErrorKind::Native("result is not available in this runtime".to_string())
    );
}

#[test]
fn run_keeps_definitions_out_of_the_given_scope() {
    let parsed = parse("a = 1\n", ParseOptions::default());
    let scope = Scope::new();
    assert!(Interpreter::new().run(&parsed.ast, &scope).is_success());
    assert!(scope.borrow().get_local("a").is_none());

    let value = Interpreter::new()
        .load(&parsed.ast, &scope, &mut ())
        .expect("load succeeds");
    assert_eq!(value, Value::num(1.0));
    assert_eq!(scope.borrow().get_local("a"), Some(Value::num(1.0)));
}

#[test]
fn broken_snippets_fail_the_bootstrap() {
    let scope = Scope::new();
    let snippets = [Snippet {
        name: "broken",
        source: "func broken(\n",
    }];
    match stdlib::bootstrap(&Interpreter::new(), &scope, &snippets) {
        Err(ImprovError::Bootstrap { name, errors }) => {
            assert_eq!(name, "broken");
            assert!(!errors.is_empty());
        }
        other => panic!("expected bootstrap error, found {other:?}"),
    }

    let failing = [Snippet {
        name: "failing",
        source: "a = missing\n",
    }];
    assert!(matches!(
        stdlib::bootstrap(&Interpreter::new(), &scope, &failing),
        Err(ImprovError::Bootstrap { .. })
    ));
}

#[test]
fn runaway_recursion_fails_the_run() {
    let (kind, line, _) = run_error("func f(n) => f(n + 1)\nf(0)\n");
    assert_eq!(kind, RuntimeErrorKind::RecursionLimit("f".to_string()));
    assert_eq!(line, 1);
}

#[test]
fn bounded_recursion_releases_its_depth() {
    let values = recorded(
        "func down(n)\n  if n > 0\n    down(n - 1)\nloop 3 times\n  down(100)\nresult(1)\n",
    );
    assert_eq!(values, nums(&[1.0]));
}

#[test]
fn finished_runs_free_their_frames() {
    let parsed = parse(
        "func twice(x) => x * 2\nloop 2 times\n  func again() => 1\n  y = keep()\nx = keep()\nz = twice(3)\n",
        ParseOptions::default(),
    );
    assert!(parsed.is_clean());
    let scope = scope_with_result();
    scope.borrow_mut().define("keep", make_func("keep", keep));

    let mut marker = make_list(vec![make_num(1.0)]);
    for _ in 0..3 {
        let outcome = Interpreter::new().run_with_host(&parsed.ast, &scope, &mut marker);
        assert!(outcome.is_success(), "run failed: {:?}", outcome.errors);
    }
    assert_eq!(Rc::strong_count(&marker.0), 1);
}

#[test]
fn json_failures_convert_into_the_crate_error() {
    let err = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated JSON");
    let err: ImprovError = err.into();
    assert!(matches!(err, ImprovError::Json(_)));
    assert!(err.to_string().starts_with("JSON error: "));
}
