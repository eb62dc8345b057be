//! Intrinsic registry: a stack of name→handler maps for built-ins and
//! user-supplied models of external functions, with push/pop for scoped
//! overrides, plus a single default intrinsic invoked on every call for
//! side-channel recording (e.g. used-function tracking).

use crate::object::{IntrinsicHandler, Object};
use std::collections::HashMap;

pub struct IntrinsicRegistry {
    layers: Vec<HashMap<String, IntrinsicHandler>>,
    default_intrinsic: Option<IntrinsicHandler>,
}

impl Default for IntrinsicRegistry {
    fn default() -> Self {
        Self {
            layers: vec![HashMap::new()],
            default_intrinsic: None,
        }
    }
}

impl IntrinsicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"<import path>.<name>"` for a package-level function.
    pub fn package_fn_key(import_path: &str, name: &str) -> String {
        format!("{import_path}.{name}")
    }

    /// `"(<full type name>).<method>"` for a value-receiver method.
    pub fn value_method_key(type_name: &str, method: &str) -> String {
        format!("({type_name}).{method}")
    }

    /// `"(*<full type name>).<method>"` for a pointer-receiver method.
    pub fn pointer_method_key(type_name: &str, method: &str) -> String {
        format!("(*{type_name}).{method}")
    }

    pub fn register(&mut self, key: impl Into<String>, handler: IntrinsicHandler) {
        self.layers
            .last_mut()
            .expect("registry always has at least one layer")
            .insert(key.into(), handler);
    }

    pub fn register_default(&mut self, handler: IntrinsicHandler) {
        self.default_intrinsic = Some(handler);
    }

    pub fn default_intrinsic(&self) -> Option<IntrinsicHandler> {
        self.default_intrinsic.clone()
    }

    /// Probes layers top-down (most recently pushed first), so a scoped
    /// override shadows whatever was registered at setup time.
    pub fn lookup(&self, key: &str) -> Option<IntrinsicHandler> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.get(key).cloned())
    }

    pub fn push(&mut self) {
        self.layers.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        if self.layers.len() > 1 {
            self.layers.pop();
        }
    }
}

/// Evaluates a Go built-in given already-evaluated arguments. Built-ins
/// that only need to trace side effects (e.g. `println`) fall to the
/// generic placeholder path; the ones with observable symbolic behavior
/// (`len`, `make`, `append`, `new`, `recover`) are modeled explicitly.
pub fn call_builtin(name: &str, args: &[Object]) -> Option<Object> {
    use crate::object::{MapObj, Object as O, SliceObj, SymLen};
    use crate::resolver::FieldType;
    use std::cell::RefCell;
    use std::rc::Rc;

    match name {
        "len" => Some(match args.first() {
            Some(O::Slice(s)) => match s.len {
                SymLen::Concrete(n) => O::Integer(n),
                SymLen::Symbolic => O::placeholder("len of symbolic slice", Some(FieldType::builtin("int"))),
            },
            Some(O::Str(s)) => O::Integer(s.len() as i64),
            Some(O::Map(m)) => match &*m.pairs.borrow() {
                Some(pairs) => O::Integer(pairs.len() as i64),
                None => O::placeholder("len of symbolic map", Some(FieldType::builtin("int"))),
            },
            _ => O::placeholder("len of unknown value", Some(FieldType::builtin("int"))),
        }),
        "cap" => Some(match args.first() {
            Some(O::Slice(s)) => match s.cap {
                SymLen::Concrete(n) => O::Integer(n),
                SymLen::Symbolic => O::placeholder("cap of symbolic slice", Some(FieldType::builtin("int"))),
            },
            _ => O::placeholder("cap of unknown value", Some(FieldType::builtin("int"))),
        }),
        "new" => Some(O::Pointer(Rc::new(crate::object::Pointer {
            pointee: RefCell::new(O::placeholder("zero value from new()", None)),
            pointee_type: None,
        }))),
        "make" => Some(O::Slice(Rc::new(SliceObj {
            elem_type: FieldType::named("any"),
            len: SymLen::Symbolic,
            cap: SymLen::Symbolic,
            elements: RefCell::new(None),
        }))),
        "append" => Some(match args.first() {
            Some(O::Slice(s)) => O::Slice(Rc::new(SliceObj {
                elem_type: s.elem_type.clone(),
                len: SymLen::Symbolic,
                cap: SymLen::Symbolic,
                elements: RefCell::new(None),
            })),
            _ => O::placeholder("append to unknown value", None),
        }),
        "copy" => Some(O::placeholder("copy count", Some(FieldType::builtin("int")))),
        "delete" => Some(O::Nil),
        "panic" => {
            let value = args.first().cloned().unwrap_or(O::Nil);
            Some(O::PanicError(Rc::new(crate::object::PanicObj {
                value,
                stack: Vec::new(),
            })))
        }
        // `recover` always returns nil symbolically, which conservatively
        // explores the non-panicking path.
        "recover" => Some(O::Nil),
        "close" => Some(O::Nil),
        "clear" => Some(O::Nil),
        "complex" => Some(match (args.first(), args.get(1)) {
            (Some(O::Float(re)), Some(O::Float(im))) => O::Complex(*re, *im),
            (Some(O::Integer(re)), Some(O::Integer(im))) => O::Complex(*re as f64, *im as f64),
            _ => O::placeholder("complex()", Some(FieldType::builtin("complex128"))),
        }),
        "real" => Some(match args.first() {
            Some(O::Complex(re, _)) => O::Float(*re),
            _ => O::placeholder("real()", Some(FieldType::builtin("float64"))),
        }),
        "imag" => Some(match args.first() {
            Some(O::Complex(_, im)) => O::Float(*im),
            _ => O::placeholder("imag()", Some(FieldType::builtin("float64"))),
        }),
        "min" | "max" => Some(args.first().cloned().unwrap_or(O::Nil)),
        "print" | "println" => Some(O::Nil),
        _ => None,
    }
}

pub const BUILTIN_NAMES: &[&str] = &[
    "len", "make", "append", "new", "copy", "delete", "panic", "recover", "close", "clear",
    "complex", "real", "imag", "min", "max", "print", "println",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_probes_layers_top_down() {
        let mut reg = IntrinsicRegistry::new();
        reg.register("fmt.Println", nil_handler());
        reg.push();
        reg.register("fmt.Println", bool_handler());
        assert!(reg.lookup("fmt.Println").is_some());
        reg.pop();
        assert!(reg.lookup("fmt.Println").is_some());
    }

    fn nil_handler() -> IntrinsicHandler {
        std::rc::Rc::new(|_, _, _| Object::Nil)
    }

    fn bool_handler() -> IntrinsicHandler {
        std::rc::Rc::new(|_, _, _| Object::Boolean(true))
    }
}
