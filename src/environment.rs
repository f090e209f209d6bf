use crate::primitives;
use crate::source::Span;
use crate::types::{PrimitiveFunc, Procedure, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("UnboundSymbolError: '{0}' is not defined")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
}

// --- Environment Definition ---

/// One lexical scope. Frames are shared through `Rc<RefCell<...>>` so that
/// closures created in the same scope see the same bindings.
#[derive(Debug, Default)]
pub struct Environment {
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a global environment holding the standard primitives and constants.
    pub fn new_global_populated() -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::new();
        {
            let mut env = env_ptr.borrow_mut();
            env.add_primitive("+", primitives::prim_add);
            env.add_primitive("-", primitives::prim_sub);
            env.add_primitive("*", primitives::prim_mul);
            env.add_primitive("/", primitives::prim_div);
            env.add_primitive("<", primitives::prim_less_than);
            env.add_primitive("<=", primitives::prim_less_than_or_equals);
            env.add_primitive(">", primitives::prim_greater_than);
            env.add_primitive(">=", primitives::prim_greater_than_or_equals);

            env.add_primitive("begin", primitives::prim_begin);
            env.add_primitive("car", primitives::prim_car);
            env.add_primitive("cdr", primitives::prim_cdr);
            env.add_primitive("print", primitives::prim_print);

            env.define("pi".to_string(), Value::Number(primitives::PI));
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            bindings: HashMap::new(),
        }))
    }

    /// Defines a variable in the *current* environment frame.
    /// Replaces the value if the variable already exists in this frame.
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    /// Looks up a variable's value.
    /// Checks the current environment first, then walks up the outer environment chain.
    /// `lookup_span` is the location where the variable was referenced, used for error reporting.
    pub fn get(&self, name: &str, lookup_span: Span) -> Result<Value, EnvError> {
        if let Some(value) = self.bindings.get(name) {
            Ok(value.clone())
        } else {
            match &self.outer {
                Some(outer_env_ptr) => outer_env_ptr.borrow().get(name, lookup_span),
                None => Err(EnvError::UnboundVariable(name.to_string(), lookup_span)),
            }
        }
    }

    fn add_primitive(&mut self, name: &str, func: PrimitiveFunc) {
        let value = Value::Procedure(Procedure::Primitive(func, name.to_string()));
        self.define(name.to_string(), value);
    }

    /// Gets every identifier visible from this frame
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env_ptr) = &self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn sym(s: &str) -> Value {
        Value::Symbol(s.to_string())
    }

    #[test]
    fn test_define_and_get_global() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num(10.0));

        let result = env.borrow().get("x", Span::default());
        assert_eq!(result, Ok(num(10.0)));
    }

    #[test]
    fn test_define_overwrites_in_same_frame() {
        let env = Environment::new();
        env.borrow_mut().define("x".to_string(), num(1.0));
        env.borrow_mut().define("x".to_string(), num(2.0));
        assert_eq!(env.borrow().get("x", Span::default()), Ok(num(2.0)));
    }

    #[test]
    fn test_get_unbound_global() {
        let env = Environment::new();
        let result = env.borrow().get("y", Span::default());
        assert!(matches!(result, Err(EnvError::UnboundVariable(s, _)) if s == "y"));
    }

    #[test]
    fn test_define_and_get_enclosed() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num(10.0));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().define("y".to_string(), num(20.0));

        assert_eq!(local_env.borrow().get("y", Span::default()), Ok(num(20.0)));
        assert_eq!(local_env.borrow().get("x", Span::default()), Ok(num(10.0)));

        // Local definitions don't leak outward
        assert!(global_env.borrow().get("y", Span::default()).is_err());
    }

    #[test]
    fn test_get_unbound_enclosed() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env);

        let span = Span::new(11, 12);
        let result = local_env.borrow().get("z", span);
        assert_eq!(
            result,
            Err(EnvError::UnboundVariable("z".to_string(), span))
        );
    }

    #[test]
    fn test_shadowing() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("x".to_string(), num(10.0));

        let local_env = Environment::new_enclosed(global_env.clone());
        local_env.borrow_mut().define("x".to_string(), num(50.0)); // Shadow global x

        let inner_local_env = Environment::new_enclosed(local_env.clone());
        inner_local_env
            .borrow_mut()
            .define("y".to_string(), sym("y-value"));

        assert_eq!(
            inner_local_env.borrow().get("x", Span::default()),
            Ok(num(50.0))
        );
        assert_eq!(
            inner_local_env.borrow().get("y", Span::default()),
            Ok(sym("y-value"))
        );
        assert_eq!(global_env.borrow().get("x", Span::default()), Ok(num(10.0)));
    }

    #[test]
    fn test_outer_changes_are_visible_to_inner_frames() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env.clone());
        global_env.borrow_mut().define("late".to_string(), num(7.0));
        assert_eq!(local_env.borrow().get("late", Span::default()), Ok(num(7.0)));
    }

    #[test]
    fn test_global_populated() {
        let env = Environment::new_global_populated();
        let identifiers = env.borrow().get_identifiers();
        for name in [
            "+", "-", "*", "/", "<", "<=", ">", ">=", "begin", "car", "cdr", "print", "pi",
        ] {
            assert!(identifiers.contains(name), "missing '{}'", name);
        }
        assert_eq!(
            env.borrow().get("pi", Span::default()),
            Ok(num(3.141592654))
        );
    }

    #[test]
    fn test_get_identifiers_includes_outer_frames() {
        let global_env = Environment::new();
        global_env.borrow_mut().define("a".to_string(), num(1.0));
        let local_env = Environment::new_enclosed(global_env);
        local_env.borrow_mut().define("b".to_string(), num(2.0));

        let identifiers = local_env.borrow().get_identifiers();
        assert_eq!(
            identifiers,
            HashSet::from(["a".to_string(), "b".to_string()])
        );
    }
}
