//! Selector evaluation and method lookup: `x.Name` is a package-member
//! reference, a struct field read, or a method value, depending on what
//! `x` evaluates to. Method lookup itself walks the receiver type's own
//! methods first, then recurses into embedded fields — the same promotion
//! rule Go's method sets follow.

use super::Evaluator;
use crate::context::Context;
use crate::error::EvalError;
use crate::object::{FunctionObj, MethodRef, Object, PackageObj};
use crate::resolver::FunctionInfo;
use crate::types::SourceFile;
use std::rc::Rc;
use std::sync::Arc;
use tree_sitter::Node;

pub(crate) fn eval_selector(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let src = file.source.as_bytes();
    let (Some(operand_node), Some(field_node)) = (
        node.child_by_field_name("operand"),
        node.child_by_field_name("field"),
    ) else {
        return Object::Error(Rc::new(EvalError::Unsupported {
            node_kind: "selector_expression".to_string(),
        }));
    };
    let field = field_node.utf8_text(src).unwrap_or("").to_string();

    // `pkg.Name` where `pkg` is an unbound identifier: treat the operand's
    // text as a (possibly aliased) import path fragment — this is the
    // same key shape intrinsics are registered under.
    if operand_node.kind() == "identifier" {
        let operand_name = operand_node.utf8_text(src).unwrap_or("");
        if env.get(operand_name).is_none() && pkg.env.get(operand_name).is_none() {
            let key = format!("{operand_name}.{field}");
            if let Some(handler) = ev.intrinsic_lookup(&key) {
                return Object::Intrinsic(Rc::new(crate::object::IntrinsicObj { name: key, handler }));
            }
            return Object::UnresolvedFunction(Rc::new(crate::object::UnresolvedFunction {
                import_path: operand_name.to_string(),
                name: field,
                signature: None,
            }));
        }
    }

    let operand = ev.eval(ctx, operand_node, env, pkg, file);
    select_field_or_method(ev, operand, &field)
}

fn select_field_or_method(ev: &Evaluator, operand: Object, field: &str) -> Object {
    match operand {
        Object::Variable(v) => {
            let (value, static_type, concrete_types) = {
                let v = v.borrow();
                (v.value.clone(), v.static_type.clone(), v.possible_concrete_types.clone())
            };
            resolve_dynamic(ev, value, static_type, field, concrete_types)
        }
        Object::SymbolicPlaceholder(p) => {
            if let Some(func) = &p.underlying_func {
                return Object::Function(func.clone());
            }
            resolve_dynamic(
                ev,
                Object::SymbolicPlaceholder(p.clone()),
                p.static_type.clone(),
                field,
                p.possible_concrete_types.borrow().clone(),
            )
        }
        Object::Pointer(ptr) => select_field_or_method(ev, ptr.pointee.borrow().clone(), field),
        Object::Instance(inst) => {
            if let Some(value) = inst.state.borrow().get(field).cloned() {
                return value;
            }
            let type_name = inst.type_name.clone();
            bind_method_value(ev, &type_name, field, Object::Instance(inst))
                .unwrap_or_else(|| Object::placeholder(format!("field {field} on {type_name}"), None))
        }
        Object::Package(p) => p.env.get(field).unwrap_or_else(|| {
            Object::UnresolvedFunction(Rc::new(crate::object::UnresolvedFunction {
                import_path: p.import_path.clone(),
                name: field.to_string(),
                signature: None,
            }))
        }),
        other => Object::placeholder(format!("selector .{field} on {}", other.type_name()), other.static_type()),
    }
}

/// A value whose concrete type is not (fully) known: fan out to a
/// `MethodRef` placeholder finalization resolves later, narrowed by
/// whatever concrete types have already been observed on this binding.
fn resolve_dynamic(
    ev: &Evaluator,
    value: Object,
    static_type: Option<crate::resolver::FieldType>,
    field: &str,
    possible_concrete_types: std::collections::HashSet<String>,
) -> Object {
    // A single known concrete type is as good as a resolved receiver.
    if possible_concrete_types.len() == 1 {
        let concrete = possible_concrete_types.iter().next().unwrap();
        if let Some(resolved) = bind_method_value(ev, concrete, field, value.clone()) {
            return resolved;
        }
    }

    if let Object::Instance(_) = &value {
        return select_field_or_method_non_recursive(value, field);
    }

    let _ = ev;
    let interface_name = static_type.as_ref().map(|t| t.base_name().to_string());
    Object::SymbolicPlaceholder(Rc::new(crate::object::PlaceholderObj {
        reason: format!("method value {field} on dynamically-typed receiver"),
        static_type,
        underlying_func: None,
        underlying_method: Some(MethodRef {
            interface_name,
            method_name: field.to_string(),
            signature: unknown_signature(field),
        }),
        possible_concrete_types: std::cell::RefCell::new(possible_concrete_types),
    }))
}

fn select_field_or_method_non_recursive(value: Object, field: &str) -> Object {
    if let Object::Instance(inst) = &value {
        if let Some(v) = inst.state.borrow().get(field).cloned() {
            return v;
        }
    }
    Object::placeholder(format!("field or method {field}"), None)
}

fn unknown_signature(name: &str) -> FunctionInfo {
    FunctionInfo {
        name: name.to_string(),
        import_path: String::new(),
        receiver: None,
        params: Vec::new(),
        results: Vec::new(),
        generic_params: Vec::new(),
        visibility: crate::resolver::Visibility::Public,
        doc_comment: None,
        body: None,
    }
}

/// Looks up `method` on `type_name`, checking every known package's own
/// methods first, then recursing one level into embedded fields — mirrors
/// Go's method-set promotion without claiming full correctness for deeply
/// nested embedding chains.
pub(crate) fn lookup_method(ev: &Evaluator, type_name: &str, method: &str) -> Option<FunctionInfo> {
    lookup_method_depth(ev, type_name, method, 4)
}

fn lookup_method_depth(ev: &Evaluator, type_name: &str, method: &str, depth: usize) -> Option<FunctionInfo> {
    for info in ev.known_packages_snapshot() {
        if let Some(f) = info.methods_on(type_name).find(|f| f.name == method) {
            return Some(f.clone());
        }
    }

    if depth == 0 {
        return None;
    }

    for info in ev.known_packages_snapshot() {
        if let Some(type_info) = info.type_info(type_name) {
            for (_, field_type) in &type_info.fields {
                // An embedded field's synthesized name equals its type's
                // base name; that's the only signal we have without
                // tracking "embedded: bool" on `FieldType` explicitly.
                if field_type.base_name() == type_name {
                    continue;
                }
                if let Some(found) = lookup_method_depth(ev, field_type.base_name(), method, depth - 1) {
                    return Some(found);
                }
            }
        }
    }
    None
}

fn bind_method_value(ev: &Evaluator, type_name: &str, method: &str, receiver: Object) -> Option<Object> {
    if let Some(handler) = ev
        .intrinsic_lookup(&crate::intrinsics::IntrinsicRegistry::value_method_key(type_name, method))
        .or_else(|| ev.intrinsic_lookup(&crate::intrinsics::IntrinsicRegistry::pointer_method_key(type_name, method)))
    {
        return Some(Object::Intrinsic(Rc::new(crate::object::IntrinsicObj {
            name: format!("({type_name}).{method}"),
            handler,
        })));
    }

    let info = lookup_method(ev, type_name, method)?;
    let defining_env = ev
        .known_package(&info.import_path)
        .map(|pkg_info| ev.load_package(pkg_info).env.clone())
        .unwrap_or_else(|| ev.universe().clone());

    let body = info.body.clone();
    Some(Object::Function(Rc::new(FunctionObj {
        info,
        body,
        defining_package: type_name.to_string(),
        env: defining_env,
        receiver: Some(receiver),
        type_args: Vec::new(),
    })))
}
