use std::{cell::RefCell, rc::Rc};

use indexmap::IndexMap;

use crate::value::{Value, ValueKind};

pub type ScopeRef = Rc<RefCell<Scope>>;

/// One frame of bindings. Reads fall through to the parent chain; writes
/// always land in this frame.
#[derive(Default)]
pub struct Scope {
    parent: Option<ScopeRef>,
    bindings: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> ScopeRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            bindings: IndexMap::new(),
        }))
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        let frame = scope.borrow();
        if let Some(value) = frame.bindings.get(name) {
            return Some(value.clone());
        }
        let parent = frame.parent.clone()?;
        drop(frame);
        Scope::lookup(&parent, name)
    }

    /// Drops the bindings of a finished frame that hold closures over the
    /// frame itself. Otherwise the frame and those closures keep each other
    /// alive forever.
    pub fn release(scope: &ScopeRef) {
        let captured: Vec<String> = scope
            .borrow()
            .bindings
            .iter()
            .filter(|(_, value)| captures(value, scope))
            .map(|(name, _)| name.clone())
            .collect();
        let mut frame = scope.borrow_mut();
        for name in captured {
            frame.bindings.shift_remove(&name);
        }
    }

    /// True when `name` resolves to something other than Null.
    pub fn is_bound(scope: &ScopeRef, name: &str) -> bool {
        Scope::lookup(scope, name).is_some_and(|value| !value.is_null())
    }
}

fn captures(value: &Value, scope: &ScopeRef) -> bool {
    match value.kind() {
        ValueKind::Lambda(closure) => {
            let mut current = Some(Rc::clone(&closure.scope));
            while let Some(frame) = current {
                if Rc::ptr_eq(&frame, scope) {
                    return true;
                }
                current = frame.borrow().parent.clone();
            }
            false
        }
        ValueKind::List(values) => values.iter().any(|value| captures(value, scope)),
        _ => false,
    }
}
