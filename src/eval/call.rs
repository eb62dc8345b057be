//! Call evaluation: turns a `call_expression` node into evaluated
//! arguments plus a callee object, then symbolically executes that
//! callee — a user function body, an intrinsic, or (for an unresolved
//! interface dispatch) a placeholder that also records the call site for
//! finalization.

use super::Evaluator;
use crate::context::Context;
use crate::error::{EvalError, Frame};
use crate::finalize::InterfaceCallSite;
use crate::memo::abstract_signature;
use crate::object::{FunctionObj, Object, PackageObj};
use crate::resolver::FieldType;
use crate::types::{Range, SourceFile};
use std::rc::Rc;
use std::sync::Arc;
use tree_sitter::Node;

pub(crate) fn eval_call_expr(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let Some(function_node) = node.child_by_field_name("function") else {
        return Object::Error(Rc::new(EvalError::Unsupported {
            node_kind: "call_expression".to_string(),
        }));
    };

    let args = eval_arguments(ev, ctx, node, env, pkg, file);
    if let Some(propagated) = args.iter().find(|a| a.is_control_flow()) {
        return propagated.clone();
    }

    if let Some(converted) = try_type_conversion(ev, function_node, env, pkg, file, &args) {
        return converted;
    }

    let callee = ev.eval(ctx, function_node, env, pkg, file);
    if callee.is_control_flow() {
        return callee;
    }

    apply(ev, ctx, &callee, args)
}

fn eval_arguments(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Vec<Object> {
    let Some(args_node) = node.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = args_node.walk();
    args_node
        .named_children(&mut cursor)
        .map(|arg| eval_argument(ev, ctx, arg, env, pkg, file))
        .collect()
}

/// Evaluates one call argument. A trailing spread (`variadic_argument`,
/// Go's `xs...` call-site ellipsis) evaluates its operand and folds the
/// result into a single `Object::Variadic`, so `sum(args...)` forwards
/// `args` as the callee's variadic backing slice instead of appending one
/// more positional value.
fn eval_argument(
    ev: &Evaluator,
    ctx: &Context,
    arg: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    if arg.kind() != "variadic_argument" {
        return ev.eval(ctx, arg, env, pkg, file);
    }
    let Some(operand) = arg.named_child(0) else {
        return ev.eval(ctx, arg, env, pkg, file);
    };
    let value = ev.eval(ctx, operand, env, pkg, file);
    if value.is_control_flow() {
        return value;
    }
    spread_to_variadic(value)
}

/// Folds a spread operand's value into `Object::Variadic`. Forwarding an
/// already-variadic parameter (`Collect(args...)`) passes it through
/// unchanged; spreading a slice with known elements unpacks them; anything
/// else degrades to a single-element variadic rather than losing the
/// value.
fn spread_to_variadic(value: Object) -> Object {
    match value {
        Object::Variadic(_) => value,
        Object::Slice(s) => match &*s.elements.borrow() {
            Some(elements) => Object::Variadic(Rc::new(elements.clone())),
            None => Object::Variadic(Rc::new(vec![Object::Slice(s.clone())])),
        },
        other => Object::Variadic(Rc::new(vec![other])),
    }
}

/// `T(x)` where `T` names a type rather than a bound function: Go's type
/// conversion syntax. Modeled by passing the argument through — precise
/// re-typing would need full constant folding this engine doesn't attempt.
fn try_type_conversion(
    ev: &Evaluator,
    function_node: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
    args: &[Object],
) -> Option<Object> {
    if !matches!(function_node.kind(), "identifier" | "qualified_type") {
        return None;
    }
    let src = file.source.as_bytes();
    let name = function_node.utf8_text(src).unwrap_or("");
    if env.get(name).is_some() || pkg.env.get(name).is_some() {
        return None; // a real bound function/variable shadows any type of the same name
    }

    let field_type = FieldType::named(name);
    let is_known_type =
        field_type.is_builtin || ev.known_packages_snapshot().iter().any(|p| p.type_info(name).is_some());
    if !is_known_type {
        return None;
    }

    Some(
        args.first()
            .cloned()
            .unwrap_or_else(|| Object::placeholder(format!("{name}() zero value"), Some(field_type))),
    )
}

/// The `Apply` entry point: dispatches on what kind of callable `callee`
/// evaluated to.
pub fn apply(ev: &Evaluator, ctx: &Context, callee: &Object, args: Vec<Object>) -> Object {
    match callee.clone().unwrap_variable() {
        Object::Intrinsic(intrinsic) => {
            ev.record_call(&intrinsic.name, &args, None, Range::new(0, 0, 0, 0));
            (intrinsic.handler)(ev, ctx, &args)
        }

        Object::Function(f) => {
            ev.record_call(&f.info.name, &args, None, Range::new(0, 0, 0, 0));
            apply_function(ev, ctx, &f, args)
        }

        Object::SymbolicPlaceholder(p) if p.underlying_func.is_some() => {
            apply_function(ev, ctx, p.underlying_func.as_ref().unwrap(), args)
        }

        Object::SymbolicPlaceholder(p) if p.underlying_method.is_some() => {
            let method = p.underlying_method.as_ref().unwrap();
            ev.record_interface_call(InterfaceCallSite {
                interface_name: method.interface_name.clone(),
                method_name: method.method_name.clone(),
                possible_concrete_types: p.possible_concrete_types.borrow().clone(),
            });
            Object::placeholder(
                format!("result of interface dispatch to {}", method.method_name),
                method.signature.results.first().cloned(),
            )
        }

        Object::UnresolvedFunction(u) => {
            ev.record_call(
                &format!("{}.{}", u.import_path, u.name),
                &args,
                None,
                Range::new(0, 0, 0, 0),
            );
            Object::placeholder(
                format!("result of unresolved function {}", u.name),
                u.signature.as_ref().and_then(|s| s.results.first().cloned()),
            )
        }

        other @ (Object::Error(_) | Object::PanicError(_)) => other,

        other => Object::Error(Rc::new(EvalError::NotAFunction {
            type_name: other.type_name().to_string(),
        })),
    }
}

fn apply_function(ev: &Evaluator, ctx: &Context, f: &Rc<FunctionObj>, args: Vec<Object>) -> Object {
    if let Some(cached) = ev.memo_get(f, &args) {
        return cached;
    }

    let signature = abstract_signature(&args);
    let identity = Rc::as_ptr(f) as usize;
    let (file_id, range) = match f.body.as_ref().and_then(|b| b.node().map(|n| (b.file.id, Range::from_ts(&n)))) {
        Some((file_id, range)) => (Some(file_id), range),
        None => (None, Range::new(0, 0, 0, 0)),
    };

    let is_cycle = ev.enter_call(
        identity,
        signature.clone(),
        Frame {
            function: f.info.name.clone(),
            file: file_id,
            range,
        },
    );

    if is_cycle {
        ev.exit_call();
        return result_placeholder(f, "recursive call short-circuited");
    }

    if ev.call_depth() > ev.recursion_cap() {
        ev.exit_call();
        return result_placeholder(f, "call stack depth exceeded recursion cap");
    }

    let Some(body) = f.body.clone() else {
        ev.exit_call();
        return result_placeholder(f, "function has no body available");
    };
    let Some(node) = body.node() else {
        ev.exit_call();
        return result_placeholder(f, "function body could not be re-derived from its source range");
    };

    let owning_pkg = owning_package(ev, f);
    let call_env = crate::env::Environment::enclosed(&f.env);

    if let Some((name, _)) = &f.info.receiver {
        if let Some(receiver) = &f.receiver {
            call_env.set_local(name.clone(), receiver.clone());
        }
    }
    bind_parameters(&call_env, &f.info.params, &args);

    let result = ev.eval(ctx, node, &call_env, &owning_pkg, &body.file);
    ev.exit_call();

    let unwrapped = unwrap_return(result);
    ev.memo_insert(f, &args, unwrapped.clone());
    unwrapped
}

fn bind_parameters(call_env: &crate::env::EnvRef, params: &[(String, FieldType)], args: &[Object]) {
    for (i, (name, ty)) in params.iter().enumerate() {
        if ty.is_variadic {
            // A spread call site (`f(xs...)`) already collapsed the whole
            // tail into one `Object::Variadic` — bind it directly instead
            // of wrapping it a second time.
            if let Some([single @ Object::Variadic(_)]) = args.get(i..) {
                call_env.set_local(name.clone(), single.clone());
                return;
            }
            let rest: Vec<Object> = args.get(i..).map(|s| s.to_vec()).unwrap_or_default();
            call_env.set_local(name.clone(), Object::Variadic(Rc::new(rest)));
            return;
        }
        let value = args
            .get(i)
            .cloned()
            .unwrap_or_else(|| Object::placeholder(format!("missing argument {name}"), Some(ty.clone())));
        call_env.set_local(name.clone(), value);
    }
}

fn owning_package(ev: &Evaluator, f: &Rc<FunctionObj>) -> Rc<PackageObj> {
    match ev.known_package(&f.defining_package) {
        Some(info) => ev.load_package(info),
        None => Rc::new(PackageObj {
            import_path: f.defining_package.clone(),
            name: f.defining_package.clone(),
            env: f.env.clone(),
        }),
    }
}

fn unwrap_return(result: Object) -> Object {
    match result {
        Object::ReturnValue(v) => *v,
        Object::Break(_) | Object::Continue(_) => Object::Nil,
        other => other,
    }
}

fn result_placeholder(f: &Rc<FunctionObj>, reason: &str) -> Object {
    match f.info.results.len() {
        0 => Object::Nil,
        1 => Object::placeholder(reason.to_string(), f.info.results.first().cloned()),
        _ => Object::MultiReturn(Rc::new(
            f.info
                .results
                .iter()
                .map(|t| Object::placeholder(reason.to_string(), Some(t.clone())))
                .collect(),
        )),
    }
}
