//! Lexically scoped environments: an ordered chain of scopes where `get`
//! walks outward, `set_local` binds in the innermost scope, and `set`
//! mutates the nearest existing binding or defines locally if none exists.

use crate::object::Object;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<Environment>;

pub struct Environment {
    bindings: RefCell<HashMap<String, Object>>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// A fresh universe scope: no parent, holds predeclared identifiers and
    /// built-ins once populated by the evaluator at setup.
    pub fn universe() -> EnvRef {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    /// A new scope enclosed by `parent` — used for package envs (enclosed
    /// by the universe scope) and for every call-frame/block scope nested
    /// under it.
    pub fn enclosed(parent: &EnvRef) -> EnvRef {
        Rc::new(Environment {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// Walks outward through the scope chain looking for `name`.
    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(obj) = self.bindings.borrow().get(name) {
            return Some(obj.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Binds `name` in this (innermost) scope, shadowing any outer binding.
    pub fn set_local(&self, name: impl Into<String>, value: Object) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Mutates the nearest existing binding for `name`; defines it locally
    /// if no enclosing scope already binds it (Go's `=` vs `:=` semantics
    /// reduce to this one operation once the evaluator has classified the
    /// assignment shape).
    pub fn set(&self, name: &str, value: Object) {
        if self.bindings.borrow().contains_key(name) {
            self.bindings.borrow_mut().insert(name.to_string(), value);
            return;
        }
        match &self.parent {
            Some(p) if p.contains(name) => p.set(name, value),
            _ => self.set_local(name.to_string(), value),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_outward_through_the_chain() {
        let universe = Environment::universe();
        universe.set_local("x", Object::Integer(1));

        let pkg = Environment::enclosed(&universe);
        let frame = Environment::enclosed(&pkg);

        assert!(matches!(frame.get("x"), Some(Object::Integer(1))));
        assert!(frame.get("missing").is_none());
    }

    #[test]
    fn set_local_shadows_without_mutating_outer() {
        let universe = Environment::universe();
        universe.set_local("x", Object::Integer(1));
        let frame = Environment::enclosed(&universe);
        frame.set_local("x", Object::Integer(2));

        assert!(matches!(frame.get("x"), Some(Object::Integer(2))));
        assert!(matches!(universe.get("x"), Some(Object::Integer(1))));
    }

    #[test]
    fn set_mutates_nearest_existing_binding() {
        let universe = Environment::universe();
        universe.set_local("x", Object::Integer(1));
        let frame = Environment::enclosed(&universe);

        frame.set("x", Object::Integer(42));

        assert!(matches!(frame.get("x"), Some(Object::Integer(42))));
        assert!(matches!(universe.get("x"), Some(Object::Integer(42))));
    }

    #[test]
    fn set_defines_locally_when_absent_everywhere() {
        let universe = Environment::universe();
        let frame = Environment::enclosed(&universe);
        frame.set("y", Object::Integer(7));

        assert!(matches!(frame.get("y"), Some(Object::Integer(7))));
        assert!(universe.get("y").is_none());
    }
}
