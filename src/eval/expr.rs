//! Expression evaluation. Each arm mirrors one tree-sitter-go node kind;
//! the set of kinds handled here is exactly the set `is_expr_kind`
//! recognizes as an expression rather than a statement.

use super::Evaluator;
use crate::context::Context;
use crate::env::{EnvRef, Environment};
use crate::error::EvalError;
use crate::object::{FunctionObj, Instance, Object, PackageObj, Pointer, SliceObj, SymLen};
use crate::resolver::FieldType;
use crate::types::{Range, SourceFile};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tree_sitter::Node;

pub(crate) fn is_expr_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "int_literal"
            | "float_literal"
            | "imaginary_literal"
            | "rune_literal"
            | "interpreted_string_literal"
            | "raw_string_literal"
            | "call_expression"
            | "selector_expression"
            | "index_expression"
            | "index_list_expression"
            | "slice_expression"
            | "type_assertion_expression"
            | "unary_expression"
            | "binary_expression"
            | "star_expression"
            | "parenthesized_expression"
            | "composite_literal"
            | "func_literal"
            | "qualified_type"
    )
}

pub(crate) fn eval_expr(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let src = file.source.as_bytes();
    match node.kind() {
        "int_literal" => text(&node, src)
            .trim_start_matches("0x")
            .parse::<i64>()
            .ok()
            .map(Object::Integer)
            .unwrap_or_else(|| Object::placeholder("unparseable int literal", Some(FieldType::builtin("int")))),

        "float_literal" => text(&node, src)
            .parse::<f64>()
            .ok()
            .map(Object::Float)
            .unwrap_or_else(|| Object::placeholder("unparseable float literal", Some(FieldType::builtin("float64")))),

        "imaginary_literal" => Object::placeholder("imaginary literal", Some(FieldType::builtin("complex128"))),

        "rune_literal" => {
            let raw = text(&node, src);
            raw.trim_matches('\'')
                .chars()
                .next()
                .map(|c| Object::Integer(c as i64))
                .unwrap_or_else(|| Object::placeholder("rune literal", Some(FieldType::builtin("rune"))))
        }

        "interpreted_string_literal" | "raw_string_literal" => {
            let raw = text(&node, src);
            let trimmed = raw.trim_matches(|c| c == '"' || c == '`');
            Object::Str(trimmed.into())
        }

        "identifier" => eval_identifier(ev, node, env, pkg, file, src),

        "qualified_type" => eval_identifier(ev, node, env, pkg, file, src),

        "parenthesized_expression" => {
            let inner = node.named_child(0);
            match inner {
                Some(inner) => ev.eval(ctx, inner, env, pkg, file),
                None => Object::Error(Rc::new(EvalError::Unsupported {
                    node_kind: "empty parenthesized expression".to_string(),
                })),
            }
        }

        "unary_expression" => eval_unary(ev, ctx, node, env, pkg, file),

        "binary_expression" => eval_binary(ev, ctx, node, env, pkg, file),

        "star_expression" => {
            let Some(operand) = node.named_child(0) else {
                return unsupported(node.kind());
            };
            let value = ev.eval(ctx, operand, env, pkg, file);
            match value.unwrap_variable() {
                Object::Pointer(p) => p.pointee.borrow().clone(),
                other if other.static_type().is_some() => {
                    // Dereferencing a type name (`*T`) rather than a value
                    // means this is a type expression, not a value read;
                    // callers that need a type use `static_type()` upstream.
                    other
                }
                other => Object::Error(Rc::new(EvalError::InvalidIndirect {
                    type_name: other.type_name().to_string(),
                })),
            }
        }

        "selector_expression" => super::methods::eval_selector(ev, ctx, node, env, pkg, file),

        "index_expression" => eval_index(ev, ctx, node, env, pkg, file),

        "index_list_expression" => super::generics::eval_index_list(ev, ctx, node, env, pkg, file),

        "slice_expression" => eval_slice(ev, ctx, node, env, pkg, file),

        "type_assertion_expression" => eval_type_assertion(ev, ctx, node, env, pkg, file),

        "call_expression" => super::call::eval_call_expr(ev, ctx, node, env, pkg, file),

        "composite_literal" => eval_composite_literal(ev, ctx, node, env, pkg, file),

        "func_literal" => eval_func_literal(node, env, pkg, file),

        other => unsupported(other),
    }
}

fn text<'a>(node: &Node, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

fn unsupported(kind: &str) -> Object {
    Object::Error(Rc::new(EvalError::Unsupported {
        node_kind: kind.to_string(),
    }))
}

fn eval_identifier(
    ev: &Evaluator,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
    src: &[u8],
) -> Object {
    let name = text(&node, src);
    match name {
        "true" => return Object::Boolean(true),
        "false" => return Object::Boolean(false),
        "nil" => return Object::Nil,
        "iota" => return Object::placeholder("iota", Some(FieldType::builtin("int"))),
        _ => {}
    }

    if let Some(obj) = env.get(name) {
        return obj;
    }
    if let Some(obj) = pkg.env.get(name) {
        return obj;
    }
    if crate::intrinsics::BUILTIN_NAMES.contains(&name) {
        return Object::Intrinsic(Rc::new(crate::object::IntrinsicObj {
            name: name.to_string(),
            handler: Rc::new(move |_, _, args| {
                crate::intrinsics::call_builtin(name, args)
                    .unwrap_or_else(|| Object::placeholder("builtin call", None))
            }),
        }));
    }
    ev.trace(Some(file.id), "identifier-miss", Range::from_ts(&node));
    Object::Error(Rc::new(EvalError::IdentifierNotFound {
        name: name.to_string(),
    }))
}

fn eval_unary(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let src = file.source.as_bytes();
    let operator = node
        .child_by_field_name("operator")
        .map(|n| text(&n, src))
        .unwrap_or("");
    let Some(operand_node) = node.child_by_field_name("operand") else {
        return unsupported("unary_expression");
    };

    if operator == "&" {
        let value = ev.eval(ctx, operand_node, env, pkg, file);
        let static_type = value.static_type();
        return Object::Pointer(Rc::new(Pointer {
            pointee: RefCell::new(value),
            pointee_type: static_type,
        }));
    }

    let value = ev.eval(ctx, operand_node, env, pkg, file).unwrap_variable();
    match (operator, &value) {
        ("-", Object::Integer(i)) => Object::Integer(-i),
        ("-", Object::Float(f)) => Object::Float(-f),
        ("!", Object::Boolean(b)) => Object::Boolean(!b),
        ("^", Object::Integer(i)) => Object::Integer(!i),
        ("+", _) => value,
        _ => Object::placeholder("unary expression result", value.static_type()),
    }
}

fn eval_binary(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let src = file.source.as_bytes();
    let operator = node
        .child_by_field_name("operator")
        .map(|n| text(&n, src))
        .unwrap_or("")
        .to_string();
    let (Some(left_node), Some(right_node)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return unsupported("binary_expression");
    };

    let left = ev.eval(ctx, left_node, env, pkg, file).unwrap_variable();
    if left.is_control_flow() {
        return left;
    }
    let right = ev.eval(ctx, right_node, env, pkg, file).unwrap_variable();
    if right.is_control_flow() {
        return right;
    }

    use Object::*;
    match (operator.as_str(), &left, &right) {
        ("+", Integer(a), Integer(b)) => Integer(a + b),
        ("-", Integer(a), Integer(b)) => Integer(a - b),
        ("*", Integer(a), Integer(b)) => Integer(a * b),
        ("/", Integer(a), Integer(b)) if *b != 0 => Integer(a / b),
        ("%", Integer(a), Integer(b)) if *b != 0 => Integer(a % b),
        ("+", Float(a), Float(b)) => Float(a + b),
        ("-", Float(a), Float(b)) => Float(a - b),
        ("*", Float(a), Float(b)) => Float(a * b),
        ("/", Float(a), Float(b)) => Float(a / b),
        ("+", Str(a), Str(b)) => Str(format!("{a}{b}").into()),
        ("==", a, b) => Boolean(structurally_equal(a, b)),
        ("!=", a, b) => Boolean(!structurally_equal(a, b)),
        ("<", Integer(a), Integer(b)) => Boolean(a < b),
        ("<=", Integer(a), Integer(b)) => Boolean(a <= b),
        (">", Integer(a), Integer(b)) => Boolean(a > b),
        (">=", Integer(a), Integer(b)) => Boolean(a >= b),
        ("&&", Boolean(a), Boolean(b)) => Boolean(*a && *b),
        ("||", Boolean(a), Boolean(b)) => Boolean(*a || *b),
        _ => Object::placeholder(
            format!("binary expression '{operator}' over non-concrete operands"),
            left.static_type().or_else(|| right.static_type()),
        ),
    }
}

fn structurally_equal(a: &Object, b: &Object) -> bool {
    use Object::*;
    match (a, b) {
        (Integer(x), Integer(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Str(x), Str(y)) => x == y,
        (Boolean(x), Boolean(y)) => x == y,
        (Nil, Nil) => true,
        (Nil, Pointer(_)) | (Pointer(_), Nil) => false,
        _ => false,
    }
}

fn eval_index(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let Some(operand_node) = node.child_by_field_name("operand") else {
        return unsupported("index_expression");
    };
    let operand = ev.eval(ctx, operand_node, env, pkg, file).unwrap_variable();
    let index_node = node.child_by_field_name("index");
    let index = index_node.map(|n| ev.eval(ctx, n, env, pkg, file).unwrap_variable());

    match operand {
        Object::Slice(s) => match (&index, &*s.elements.borrow()) {
            (Some(Object::Integer(i)), Some(elements)) => elements
                .get(*i as usize)
                .cloned()
                .unwrap_or_else(|| Object::placeholder("out-of-bounds index", Some(s.elem_type.clone()))),
            _ => Object::placeholder("symbolic slice index", Some(s.elem_type.clone())),
        },
        Object::Map(m) => {
            let value_type = m.value_type.clone();
            match (&index, &*m.pairs.borrow()) {
                (Some(key), Some(pairs)) => pairs
                    .iter()
                    .find(|(k, _)| structurally_equal(k, key))
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| Object::placeholder("map miss", Some(value_type.clone()))),
                _ => Object::placeholder("symbolic map index", Some(value_type)),
            }
        }
        Object::Function(f) => super::generics::instantiate(ev, &f, &[index.and_then(|i| i.static_type())].into_iter().flatten().collect()),
        other => Object::placeholder("index of unknown value", other.static_type()),
    }
}

fn eval_slice(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let Some(operand_node) = node.child_by_field_name("operand") else {
        return unsupported("slice_expression");
    };
    let operand = ev.eval(ctx, operand_node, env, pkg, file).unwrap_variable();
    match operand {
        Object::Slice(s) => Object::Slice(Rc::new(SliceObj {
            elem_type: s.elem_type.clone(),
            len: SymLen::Symbolic,
            cap: SymLen::Symbolic,
            elements: RefCell::new(None),
        })),
        Object::Str(_) => Object::Str("".into()),
        other => Object::placeholder("slice of unknown value", other.static_type()),
    }
}

fn eval_type_assertion(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let Some(operand_node) = node.child_by_field_name("operand") else {
        return unsupported("type_assertion_expression");
    };
    let src = file.source.as_bytes();
    let asserted_type = node
        .child_by_field_name("type")
        .map(|n| text(&n, src).to_string());

    let value = ev.eval(ctx, operand_node, env, pkg, file);
    let concrete = match &value {
        Object::Variable(v) => v.borrow().static_type.clone(),
        other => other.static_type(),
    };

    // A two-value assertion (`v, ok := x.(T)`) is reconstructed by the
    // caller (assignment handling) from this `MultiReturn`; a single-value
    // context just takes the first element.
    Object::MultiReturn(Rc::new(vec![
        value,
        Object::Boolean(concrete.map(|t| Some(t.name) == asserted_type).unwrap_or(true)),
    ]))
}

fn eval_composite_literal(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let src = file.source.as_bytes();
    let type_name = node
        .child_by_field_name("type")
        .map(|n| text(&n, src).to_string())
        .unwrap_or_default();

    if type_name.starts_with('[') || type_name.starts_with("map[") {
        return Object::placeholder(format!("composite literal of {type_name}"), None);
    }

    let mut state = HashMap::new();
    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        for element in body.named_children(&mut cursor) {
            if element.kind() == "keyed_element" {
                let (Some(key_node), Some(value_node)) =
                    (element.child_by_field_name("key"), element.child_by_field_name("value"))
                else {
                    continue;
                };
                let key = text(&key_node, src).to_string();
                let value = ev.eval(ctx, value_node, env, pkg, file);
                state.insert(key, value);
            }
        }
    }

    Object::Instance(Rc::new(Instance {
        type_name: type_name.clone(),
        type_info: Some(FieldType::named(type_name)),
        state: RefCell::new(state),
    }))
}

fn eval_func_literal(node: Node, env: &EnvRef, pkg: &Rc<PackageObj>, file: &Arc<SourceFile>) -> Object {
    let closure_env = Environment::enclosed(env);
    let body = crate::resolver::FunctionBody {
        file: file.clone(),
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    };
    let info = crate::resolver::FunctionInfo {
        name: "func literal".to_string(),
        import_path: pkg.import_path.clone(),
        receiver: None,
        params: Vec::new(),
        results: Vec::new(),
        generic_params: Vec::new(),
        visibility: crate::resolver::Visibility::Private,
        doc_comment: None,
        body: Some(body.clone()),
    };
    Object::Function(Rc::new(FunctionObj {
        info,
        body: Some(body),
        defining_package: pkg.import_path.clone(),
        env: closure_env,
        receiver: None,
        type_args: Vec::new(),
    }))
}

