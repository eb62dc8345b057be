//! Memoization: an optional per-`(function, abstract-argument-signature)`
//! result cache. Disabled by default; when enabled it bounds exponential
//! blow-up in repeated symbolic calls. Functions whose arguments are
//! always placeholders converge after one evaluation, since the signature
//! collapses to the same key every time.

use crate::object::{FunctionObj, Object};
use std::collections::HashMap;
use std::rc::Rc;

/// A string key summarizing argument *types* and, where available,
/// *literal values* — the thing that keeps the cache from growing
/// unboundedly, since the key only varies when literals actually differ.
pub fn abstract_signature(args: &[Object]) -> String {
    args.iter().map(describe_arg).collect::<Vec<_>>().join("|")
}

fn describe_arg(obj: &Object) -> String {
    match obj {
        Object::Integer(v) => format!("int:{v}"),
        Object::Float(v) => format!("float:{v}"),
        Object::Str(s) => format!("string:{s:?}"),
        Object::Boolean(b) => format!("bool:{b}"),
        Object::Nil => "nil".to_string(),
        Object::Variable(v) => describe_arg(&v.borrow().value),
        other => format!("{}:placeholder", other.type_name()),
    }
}

fn function_identity(f: &Rc<FunctionObj>) -> usize {
    Rc::as_ptr(f) as usize
}

#[derive(Default)]
pub struct MemoCache {
    enabled: bool,
    entries: HashMap<(usize, String), Object>,
}

impl MemoCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, f: &Rc<FunctionObj>, args: &[Object]) -> Option<Object> {
        if !self.enabled {
            return None;
        }
        self.entries
            .get(&(function_identity(f), abstract_signature(args)))
            .cloned()
    }

    pub fn insert(&mut self, f: &Rc<FunctionObj>, args: &[Object], result: Object) {
        if !self.enabled {
            return;
        }
        self.entries
            .insert((function_identity(f), abstract_signature(args)), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_literal_signatures_collapse_to_one_key() {
        let a = abstract_signature(&[Object::Integer(1), Object::Str("x".into())]);
        let b = abstract_signature(&[Object::Integer(1), Object::Str("x".into())]);
        assert_eq!(a, b);

        let c = abstract_signature(&[Object::Integer(2), Object::Str("x".into())]);
        assert_ne!(a, c);
    }

    #[test]
    fn placeholder_arguments_converge_regardless_of_identity() {
        let p1 = Object::placeholder("a", None);
        let p2 = Object::placeholder("b", None);
        assert_eq!(abstract_signature(&[p1]), abstract_signature(&[p2]));
    }
}
