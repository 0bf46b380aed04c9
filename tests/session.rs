use improv::{
    DrawCommand, Scope, Session, SessionConfig, Sketch, Value,
    diagnostics::RuntimeErrorKind,
    sketch::TransformKind,
};

const SPINNER: &str = "rotate(time, 0, 0)\n  box()\n";

fn session() -> Session {
    Session::with_stdlib(SessionConfig::default()).expect("session bootstraps")
}

fn cube(size: f64) -> DrawCommand {
    DrawCommand::Shape {
        name: "cube".to_string(),
        size: [size, size, size],
    }
}

#[test]
fn draws_with_the_live_time_binding() {
    let mut session = session();
    let mut sketch = Sketch::new();
    assert!(session.evaluate(SPINNER).is_empty());
    assert!(session.tick(2.5, &mut sketch).is_empty());
    assert_eq!(Scope::lookup(session.scope(), "time"), Some(Value::num(2.5)));
    assert_eq!(
        sketch.commands(),
        &[
            DrawCommand::Push,
            DrawCommand::Transform {
                kind: TransformKind::Rotate,
                x: 2.5,
                y: 0.0,
                z: 0.0
            },
            cube(1.0),
            DrawCommand::Pop,
        ]
    );
}

#[test]
fn each_tick_starts_a_fresh_frame() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("box(2)\nfill(255, 0, 0)\n");
    session.tick(0.0, &mut sketch);
    session.tick(1.0, &mut sketch);
    assert_eq!(sketch.frame(), 2);
    assert_eq!(
        sketch.commands(),
        &[
            cube(2.0),
            DrawCommand::Fill {
                r: 255.0,
                g: 0.0,
                b: 0.0
            },
        ]
    );
}

#[test]
fn shape_defaults_cascade_through_conditional_assignment() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("ball(2, 3)\nrectangle()\nline(4)\n");
    assert!(session.tick(0.0, &mut sketch).is_empty());
    assert_eq!(
        sketch.commands(),
        &[
            DrawCommand::Shape {
                name: "sphere".to_string(),
                size: [2.0, 3.0, 3.0]
            },
            DrawCommand::Shape {
                name: "rectangle".to_string(),
                size: [1.0, 1.0, 1.0]
            },
            DrawCommand::Shape {
                name: "line".to_string(),
                size: [4.0, 1.0, 1.0]
            },
        ]
    );
}

#[test]
fn promotes_after_ten_clean_frames() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate(SPINNER);
    for frame in 0..9 {
        session.tick(f64::from(frame), &mut sketch);
    }
    assert_eq!(session.working_count(), 9);
    assert_eq!(session.last_working_code(), "");

    session.tick(9.0, &mut sketch);
    assert_eq!(session.last_working_code(), SPINNER);
}

#[test]
fn custom_promotion_threshold() {
    let config = SessionConfig { promote_after: 2 };
    let mut session = Session::with_stdlib(config).expect("session bootstraps");
    let mut sketch = Sketch::new();
    session.evaluate("box()\n");
    session.tick(0.0, &mut sketch);
    assert_eq!(session.last_working_code(), "");
    session.tick(0.1, &mut sketch);
    assert_eq!(session.last_working_code(), "box()\n");
}

#[test]
fn runtime_error_rolls_back_to_last_working_program() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate(SPINNER);
    for frame in 0..10 {
        session.tick(f64::from(frame), &mut sketch);
    }

    assert!(session.evaluate("box()\nexplode()\n").is_empty());
    let errors = session.tick(10.0, &mut sketch).to_vec();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].kind,
        RuntimeErrorKind::NotAFunction("explode".to_string())
    );
    assert_eq!((errors[0].line(), errors[0].character()), (2, 1));
    assert_eq!(session.current_code(), SPINNER);
    assert_eq!(session.working_count(), 0);

    session.tick(11.0, &mut sketch);
    assert_eq!(sketch.commands().len(), 4);
}

#[test]
fn parse_errors_keep_the_running_program() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate(SPINNER);
    session.tick(0.0, &mut sketch);

    let diagnostics = session.evaluate("3 times\n  box()\n");
    assert!(!diagnostics.is_empty());
    assert_eq!(session.current_code(), SPINNER);
    assert_eq!(session.working_count(), 1);
}

#[test]
fn evaluating_clears_stored_runtime_errors() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("missing()\n");
    assert_eq!(session.tick(0.0, &mut sketch).len(), 1);
    assert_eq!(session.runtime_errors().len(), 1);

    session.evaluate("box()\n");
    assert!(session.runtime_errors().is_empty());
    assert!(session.tick(1.0, &mut sketch).is_empty());
}

#[test]
fn reset_restores_last_working_program() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("box()\n");
    for frame in 0..10 {
        session.tick(f64::from(frame), &mut sketch);
    }
    session.evaluate("ball()\n");
    session.tick(10.0, &mut sketch);
    session.reset_to_last_working_program();
    assert_eq!(session.current_code(), "box()\n");
    assert_eq!(session.working_count(), 0);
}

#[test]
fn transforms_without_a_block_apply_to_the_rest_of_the_frame() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("move(1, 2, 3)\nscale(2, 2, 2)\n  cylinder()\nbackground(0, 0, 0)\n");
    assert!(session.tick(0.0, &mut sketch).is_empty());
    assert_eq!(
        sketch.commands(),
        &[
            DrawCommand::Transform {
                kind: TransformKind::Move,
                x: 1.0,
                y: 2.0,
                z: 3.0
            },
            DrawCommand::Push,
            DrawCommand::Transform {
                kind: TransformKind::Scale,
                x: 2.0,
                y: 2.0,
                z: 2.0
            },
            DrawCommand::Shape {
                name: "cylinder".to_string(),
                size: [1.0, 1.0, 1.0]
            },
            DrawCommand::Pop,
            DrawCommand::Background {
                r: 0.0,
                g: 0.0,
                b: 0.0
            },
        ]
    );
}

#[test]
fn drawing_builtins_check_their_arguments() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("shape(3, 1, 1, 1)\n");
    let errors = session.tick(0.0, &mut sketch);
    assert_eq!(
        errors[0].kind,
        RuntimeErrorKind::Native("shape expected Symbol for argument 1 but found Number".to_string())
    );
}

#[test]
fn runaway_recursion_rolls_back_instead_of_crashing() {
    let mut session = session();
    let mut sketch = Sketch::new();
    session.evaluate("box()\n");
    for frame in 0..10 {
        session.tick(f64::from(frame), &mut sketch);
    }

    session.evaluate("func spin(n) => spin(n + 1)\nspin(0)\n");
    let errors = session.tick(10.0, &mut sketch).to_vec();
    assert_eq!(
        errors[0].kind,
        RuntimeErrorKind::RecursionLimit("spin".to_string())
    );
    assert_eq!(session.current_code(), "box()\n");
}
