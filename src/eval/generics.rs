//! Generic instantiation: `F[T]` / `F[T1, T2]` binds concrete type
//! arguments onto a fresh `FunctionObj`, without re-evaluating the body —
//! substitution happens lazily wherever the body references a type
//! parameter, rather than through template expansion.

use super::Evaluator;
use crate::context::Context;
use crate::object::{FunctionObj, Object, PackageObj};
use crate::resolver::FieldType;
use crate::types::SourceFile;
use std::rc::Rc;
use std::sync::Arc;
use tree_sitter::Node;

pub(crate) fn eval_index_list(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &crate::env::EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let Some(operand_node) = node.child_by_field_name("operand") else {
        return Object::Error(Rc::new(crate::error::EvalError::Unsupported {
            node_kind: "index_list_expression".to_string(),
        }));
    };
    let operand = ev.eval(ctx, operand_node, env, pkg, file).unwrap_variable();

    let src = file.source.as_bytes();
    let mut cursor = node.walk();
    let type_args: Vec<FieldType> = node
        .children_by_field_name("indices", &mut cursor)
        .map(|n| FieldType::named(n.utf8_text(src).unwrap_or("").to_string()))
        .collect();

    match operand {
        Object::Function(f) => instantiate(ev, &f, &type_args),
        other => Object::placeholder("generic instantiation of non-function", other.static_type()),
    }
}

/// Also used by `index_expression` for the single-type-argument shorthand
/// `F[T]`, which tree-sitter-go still parses as `index_expression` rather
/// than `index_list_expression` when there is exactly one type argument.
pub(crate) fn instantiate(ev: &Evaluator, f: &Rc<FunctionObj>, type_args: &[FieldType]) -> Object {
    let _ = ev;
    Object::Function(Rc::new(FunctionObj {
        info: f.info.clone(),
        body: f.body.clone(),
        defining_package: f.defining_package.clone(),
        env: f.env.clone(),
        receiver: f.receiver.clone(),
        type_args: type_args.to_vec(),
    }))
}
