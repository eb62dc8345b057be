//! The object model: a tagged value universe the evaluator produces and
//! consumes. Single-threaded by design — one evaluator instance runs one
//! analysis sequentially — so the graph uses `Rc`/`RefCell` rather than
//! `Arc`/`Mutex`, the way tree-walking interpreters typically represent
//! mutable bindings.

use crate::error::{EvalError, Frame};
use crate::resolver::{FieldType, FunctionBody, FunctionInfo};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Shared metadata every variant carries: the static Go type, when known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeMeta {
    pub static_type: Option<FieldType>,
}

#[derive(Clone)]
pub enum Object {
    Integer(i64),
    Float(f64),
    Complex(f64, f64),
    Str(Rc<str>),
    Boolean(bool),
    Nil,

    Pointer(Rc<Pointer>),
    Instance(Rc<Instance>),
    Slice(Rc<SliceObj>),
    Map(Rc<MapObj>),
    Channel(Rc<ChannelObj>),

    Function(Rc<FunctionObj>),
    Intrinsic(Rc<IntrinsicObj>),
    Package(Rc<PackageObj>),

    Variable(Rc<RefCell<VariableObj>>),
    SymbolicPlaceholder(Rc<PlaceholderObj>),

    UnresolvedType(Rc<UnresolvedType>),
    UnresolvedFunction(Rc<UnresolvedFunction>),

    ReturnValue(Box<Object>),
    MultiReturn(Rc<Vec<Object>>),
    Break(Option<Rc<str>>),
    Continue(Option<Rc<str>>),
    Error(Rc<EvalError>),
    PanicError(Rc<PanicObj>),
    Variadic(Rc<Vec<Object>>),
}

pub struct Pointer {
    /// Never a bare absence — an unknown pointee is a placeholder, never nil.
    pub pointee: RefCell<Object>,
    pub pointee_type: Option<FieldType>,
}

pub struct Instance {
    pub type_name: String,
    pub type_info: Option<FieldType>,
    pub state: RefCell<std::collections::HashMap<String, Object>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymLen {
    Concrete(i64),
    Symbolic,
}

pub struct SliceObj {
    pub elem_type: FieldType,
    pub len: SymLen,
    pub cap: SymLen,
    /// Concrete elements, when known (e.g. a composite literal); `None`
    /// means the elements are not individually tracked.
    pub elements: RefCell<Option<Vec<Object>>>,
}

pub struct MapObj {
    pub key_type: FieldType,
    pub value_type: FieldType,
    /// `None` when the pair set is unknown.
    pub pairs: RefCell<Option<Vec<(Object, Object)>>>,
}

pub struct ChannelObj {
    pub elem_type: FieldType,
}

pub struct FunctionObj {
    pub info: FunctionInfo,
    pub body: Option<FunctionBody>,
    pub defining_package: String,
    pub env: crate::env::EnvRef,
    /// Bound receiver for a method value obtained via selector
    /// (`instance.Method`), `None` for a package-level function reference.
    pub receiver: Option<Object>,
    /// Concrete type arguments substituted at a generic instantiation site.
    pub type_args: Vec<FieldType>,
}

pub struct IntrinsicObj {
    pub name: String,
    pub handler: IntrinsicHandler,
}

pub type IntrinsicHandler =
    Rc<dyn Fn(&crate::eval::Evaluator, &crate::context::Context, &[Object]) -> Object>;

pub struct PackageObj {
    pub import_path: String,
    pub name: String,
    pub env: crate::env::EnvRef,
}

pub struct VariableObj {
    pub name: String,
    pub value: Object,
    pub static_type: Option<FieldType>,
    /// Union of every dynamic type assigned to this variable on any
    /// explored path. Interface-typed variables never lose entries here —
    /// this only ever grows.
    pub possible_concrete_types: HashSet<String>,
}

impl VariableObj {
    pub fn record_concrete_type(&mut self, type_name: impl Into<String>) {
        self.possible_concrete_types.insert(type_name.into());
    }
}

pub struct PlaceholderObj {
    pub reason: String,
    pub static_type: Option<FieldType>,
    pub underlying_func: Option<Rc<FunctionObj>>,
    pub underlying_method: Option<MethodRef>,
    pub possible_concrete_types: RefCell<HashSet<String>>,
}

/// A method resolved only by name+signature, because its receiver's
/// concrete type is not statically known (interface dispatch through an
/// unresolved value). Finalization fans this out to every implementer.
#[derive(Clone)]
pub struct MethodRef {
    pub interface_name: Option<String>,
    pub method_name: String,
    pub signature: FunctionInfo,
}

pub struct UnresolvedType {
    pub import_path: String,
    pub name: String,
}

pub struct UnresolvedFunction {
    pub import_path: String,
    pub name: String,
    pub signature: Option<FunctionInfo>,
}

pub struct PanicObj {
    pub value: Object,
    pub stack: Vec<Frame>,
}

impl Object {
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "int",
            Object::Float(_) => "float64",
            Object::Complex(..) => "complex128",
            Object::Str(_) => "string",
            Object::Boolean(_) => "bool",
            Object::Nil => "nil",
            Object::Pointer(_) => "pointer",
            Object::Instance(_) => "instance",
            Object::Slice(_) => "slice",
            Object::Map(_) => "map",
            Object::Channel(_) => "chan",
            Object::Function(_) => "func",
            Object::Intrinsic(_) => "intrinsic",
            Object::Package(_) => "package",
            Object::Variable(_) => "variable",
            Object::SymbolicPlaceholder(_) => "placeholder",
            Object::UnresolvedType(_) => "unresolved-type",
            Object::UnresolvedFunction(_) => "unresolved-func",
            Object::ReturnValue(_) => "return",
            Object::MultiReturn(_) => "multi-return",
            Object::Break(_) => "break",
            Object::Continue(_) => "continue",
            Object::Error(_) => "error",
            Object::PanicError(_) => "panic",
            Object::Variadic(_) => "variadic",
        }
    }

    /// Unwraps a `Variable` binding to its current value, leaving every
    /// other variant untouched.
    pub fn unwrap_variable(self) -> Object {
        match self {
            Object::Variable(v) => v.borrow().value.clone(),
            other => other,
        }
    }

    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Object::ReturnValue(_)
                | Object::MultiReturn(_)
                | Object::Break(_)
                | Object::Continue(_)
                | Object::Error(_)
                | Object::PanicError(_)
        )
    }

    pub fn placeholder(reason: impl Into<String>, static_type: Option<FieldType>) -> Object {
        Object::SymbolicPlaceholder(Rc::new(PlaceholderObj {
            reason: reason.into(),
            static_type,
            underlying_func: None,
            underlying_method: None,
            possible_concrete_types: RefCell::new(HashSet::new()),
        }))
    }

    pub fn static_type(&self) -> Option<FieldType> {
        match self {
            Object::Variable(v) => v.borrow().static_type.clone(),
            Object::SymbolicPlaceholder(p) => p.static_type.clone(),
            Object::Instance(i) => i.type_info.clone(),
            Object::Pointer(p) => p.pointee_type.clone(),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(v) => write!(f, "Integer({v})"),
            Object::Float(v) => write!(f, "Float({v})"),
            Object::Complex(re, im) => write!(f, "Complex({re}, {im})"),
            Object::Str(s) => write!(f, "Str({s:?})"),
            Object::Boolean(b) => write!(f, "Boolean({b})"),
            Object::Nil => write!(f, "Nil"),
            Object::Pointer(_) => write!(f, "Pointer"),
            Object::Instance(i) => write!(f, "Instance({})", i.type_name),
            Object::Slice(s) => write!(f, "Slice(len={:?})", s.len),
            Object::Map(_) => write!(f, "Map"),
            Object::Channel(c) => write!(f, "Channel({})", c.elem_type.name),
            Object::Function(fun) => write!(f, "Function({})", fun.info.name),
            Object::Intrinsic(i) => write!(f, "Intrinsic({})", i.name),
            Object::Package(p) => write!(f, "Package({})", p.import_path),
            Object::Variable(v) => write!(f, "Variable({})", v.borrow().name),
            Object::SymbolicPlaceholder(p) => write!(f, "Placeholder({})", p.reason),
            Object::UnresolvedType(t) => write!(f, "UnresolvedType({})", t.name),
            Object::UnresolvedFunction(u) => write!(f, "UnresolvedFunction({})", u.name),
            Object::ReturnValue(v) => write!(f, "ReturnValue({v:?})"),
            Object::MultiReturn(v) => write!(f, "MultiReturn({v:?})"),
            Object::Break(label) => write!(f, "Break({label:?})"),
            Object::Continue(label) => write!(f, "Continue({label:?})"),
            Object::Error(e) => write!(f, "Error({e})"),
            Object::PanicError(p) => write!(f, "PanicError({:?})", p.value),
            Object::Variadic(v) => write!(f, "Variadic(len={})", v.len()),
        }
    }
}
