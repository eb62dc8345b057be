//! Statement evaluation. Branches are never statically selected: `IfStmt`
//! explores both arms, `ForStmt` and `RangeStmt` unroll their body
//! `loop_unroll_depth` times (default once), and every `switch`/`select`
//! case body runs once — the union of everything reachable is what this
//! engine is sound over.

use super::Evaluator;
use crate::context::Context;
use crate::env::{EnvRef, Environment};
use crate::error::EvalError;
use crate::object::{Object, PackageObj, VariableObj};
use crate::resolver::FieldType;
use crate::types::SourceFile;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use tree_sitter::Node;

pub(crate) fn eval_stmt(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    match node.kind() {
        "block" => eval_block(ev, ctx, node, env, pkg, file),
        "expression_statement" => match node.named_child(0) {
            Some(inner) => ev.eval(ctx, inner, env, pkg, file),
            None => Object::Nil,
        },
        "labeled_statement" => match node.child_by_field_name("statement") {
            Some(inner) => ev.eval(ctx, inner, env, pkg, file),
            None => Object::Nil,
        },
        "short_var_declaration" => eval_short_var_decl(ev, ctx, node, env, pkg, file),
        "assignment_statement" => eval_assignment(ev, ctx, node, env, pkg, file),
        "var_declaration" => eval_decl(ev, ctx, node, env, pkg, file, "var_spec"),
        "const_declaration" => eval_decl(ev, ctx, node, env, pkg, file, "const_spec"),
        "if_statement" => eval_if(ev, ctx, node, env, pkg, file),
        "for_statement" => eval_for(ev, ctx, node, env, pkg, file),
        "switch_statement" | "expression_switch_statement" => eval_switch(ev, ctx, node, env, pkg, file, false),
        "type_switch_statement" => eval_switch(ev, ctx, node, env, pkg, file, true),
        "select_statement" => eval_select(ev, ctx, node, env, pkg, file),
        "return_statement" => eval_return(ev, ctx, node, env, pkg, file),
        "defer_statement" | "go_statement" => eval_deferred_call(ev, ctx, node, env, pkg, file),
        "inc_statement" => eval_incdec(ev, ctx, node, env, pkg, file, 1),
        "dec_statement" => eval_incdec(ev, ctx, node, env, pkg, file, -1),
        "break_statement" => Object::Break(label_of(node, file)),
        "continue_statement" => Object::Continue(label_of(node, file)),
        "empty_statement" | "fallthrough_statement" => Object::Nil,
        other => {
            ev.trace(Some(file.id), other, crate::types::Range::from_ts(&node));
            Object::Nil
        }
    }
}

fn label_of(node: Node, file: &Arc<SourceFile>) -> Option<Rc<str>> {
    node.named_child(0)
        .and_then(|n| n.utf8_text(file.source.as_bytes()).ok())
        .map(Into::into)
}

fn eval_block(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let scope = Environment::enclosed(env);
    let mut cursor = node.walk();
    for stmt in node.named_children(&mut cursor) {
        let result = ev.eval(ctx, stmt, &scope, pkg, file);
        if result.is_control_flow() {
            return result;
        }
    }
    Object::Nil
}

fn eval_short_var_decl(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right")) else {
        return Object::Error(Rc::new(EvalError::Unsupported {
            node_kind: "short_var_declaration".to_string(),
        }));
    };
    let names = expr_list_names(left, file);
    let values = eval_expr_list(ev, ctx, right, env, pkg, file);
    if let Some(propagated) = values.iter().find(|v| v.is_control_flow()) {
        return propagated.clone();
    }
    bind_names(env, &names, &values, true);
    Object::Nil
}

fn eval_assignment(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let (Some(left), Some(right)) = (node.child_by_field_name("left"), node.child_by_field_name("right")) else {
        return Object::Error(Rc::new(EvalError::Unsupported {
            node_kind: "assignment_statement".to_string(),
        }));
    };
    let names = expr_list_names(left, file);
    let values = eval_expr_list(ev, ctx, right, env, pkg, file);
    if let Some(propagated) = values.iter().find(|v| v.is_control_flow()) {
        return propagated.clone();
    }

    // `_` discards; every other left-hand identifier gets assigned through
    // `Environment::set`, which mutates the nearest existing binding — the
    // correct semantics for plain `=`.
    bind_names(env, &names, &values, false);
    Object::Nil
}

fn expr_list_names(node: Node, file: &Arc<SourceFile>) -> Vec<Option<String>> {
    let src = file.source.as_bytes();
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .map(|n| {
            if n.kind() == "identifier" {
                n.utf8_text(src).ok().map(str::to_string)
            } else {
                None
            }
        })
        .collect()
}

fn eval_expr_list(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Vec<Object> {
    let mut cursor = node.walk();
    let raw: Vec<Object> = node
        .named_children(&mut cursor)
        .map(|n| ev.eval(ctx, n, env, pkg, file))
        .collect();

    // A single right-hand expression that itself yields a `MultiReturn`
    // (a multi-value call, or a two-value type assertion/map read) fans out
    // to however many names the left-hand side names.
    if raw.len() == 1 {
        if let Object::MultiReturn(values) = &raw[0] {
            return values.as_ref().clone();
        }
    }
    raw
}

fn bind_names(env: &EnvRef, names: &[Option<String>], values: &[Object], declare_local: bool) {
    for (i, name) in names.iter().enumerate() {
        let Some(name) = name else { continue };
        if name == "_" {
            continue;
        }
        let value = values
            .get(i)
            .cloned()
            .unwrap_or_else(|| Object::placeholder("unassigned value", None));

        let variable = Object::Variable(Rc::new(RefCell::new(VariableObj {
            name: name.clone(),
            static_type: value.static_type(),
            possible_concrete_types: concrete_types_of(&value),
            value,
        })));

        if declare_local {
            env.set_local(name.clone(), variable);
        } else if let Some(Object::Variable(existing)) = env.get(name) {
            let mut existing = existing.borrow_mut();
            if let Object::Variable(new_var) = &variable {
                let new_var = new_var.borrow();
                existing.possible_concrete_types.extend(new_var.possible_concrete_types.iter().cloned());
                existing.value = new_var.value.clone();
            }
        } else {
            env.set(name, variable);
        }
    }
}

fn concrete_types_of(value: &Object) -> HashSet<String> {
    match value {
        Object::Instance(i) => HashSet::from([i.type_name.clone()]),
        Object::Pointer(p) => concrete_types_of(&p.pointee.borrow()),
        _ => HashSet::new(),
    }
}

fn eval_decl(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
    spec_kind: &str,
) -> Object {
    let src = file.source.as_bytes();
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != spec_kind {
            continue;
        }
        let mut name_cursor = spec.walk();
        let names: Vec<String> = spec
            .children_by_field_name("name", &mut name_cursor)
            .filter_map(|n| n.utf8_text(src).ok().map(str::to_string))
            .collect();
        let declared_type = spec
            .child_by_field_name("type")
            .map(|n| FieldType::named(n.utf8_text(src).unwrap_or("").to_string()));

        let mut value_cursor = spec.walk();
        let values: Vec<Object> = spec
            .children_by_field_name("value", &mut value_cursor)
            .map(|n| ev.eval(ctx, n, env, pkg, file))
            .collect();

        for (i, name) in names.iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or_else(|| {
                Object::placeholder(format!("zero value of {name}"), declared_type.clone())
            });
            let variable = Object::Variable(Rc::new(RefCell::new(VariableObj {
                name: name.clone(),
                static_type: declared_type.clone().or_else(|| value.static_type()),
                possible_concrete_types: concrete_types_of(&value),
                value,
            })));
            env.set_local(name.clone(), variable);
        }
    }
    Object::Nil
}

fn eval_if(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let scope = Environment::enclosed(env);
    if let Some(init) = node.child_by_field_name("initializer") {
        let result = ev.eval(ctx, init, &scope, pkg, file);
        if result.is_control_flow() {
            return result;
        }
    }
    if let Some(condition) = node.child_by_field_name("condition") {
        let result = ev.eval(ctx, condition, &scope, pkg, file);
        if result.is_control_flow() {
            return result;
        }
    }

    let consequence = node
        .child_by_field_name("consequence")
        .map(|n| ev.eval(ctx, n, &scope, pkg, file));
    let alternative = node
        .child_by_field_name("alternative")
        .map(|n| ev.eval(ctx, n, &scope, pkg, file));

    match (consequence, alternative) {
        (Some(c), _) if c.is_control_flow() => c,
        (_, Some(a)) if a.is_control_flow() => a,
        _ => Object::Nil,
    }
}

fn eval_for(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let scope = Environment::enclosed(env);

    if let Some(range_clause) = find_child_kind(node, "range_clause") {
        bind_range_vars(ev, ctx, range_clause, &scope, pkg, file);
    } else if let Some(init) = node.child_by_field_name("initializer") {
        let result = ev.eval(ctx, init, &scope, pkg, file);
        if result.is_control_flow() {
            return result;
        }
    }

    let Some(body) = node.child_by_field_name("body") else {
        return Object::Nil;
    };

    let unroll = ev.config().loop_unroll_depth.max(1);
    for _ in 0..unroll {
        let result = ev.eval(ctx, body, &scope, pkg, file);
        match result {
            Object::Break(_) => break,
            Object::Continue(_) => continue,
            other if other.is_control_flow() => return other,
            _ => {}
        }
    }
    Object::Nil
}

fn find_child_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

fn bind_range_vars(
    ev: &Evaluator,
    ctx: &Context,
    range_clause: Node,
    scope: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) {
    let src = file.source.as_bytes();
    let Some(ranged_node) = range_clause.child_by_field_name("right") else {
        return;
    };
    let ranged = ev.eval(ctx, ranged_node, scope, pkg, file);
    let (key_type, value_type) = match ranged.unwrap_variable() {
        Object::Slice(s) => (FieldType::builtin("int"), s.elem_type.clone()),
        Object::Map(m) => (m.key_type.clone(), m.value_type.clone()),
        Object::Str(_) => (FieldType::builtin("int"), FieldType::builtin("rune")),
        _ => (FieldType::builtin("int"), FieldType::named("any")),
    };

    let mut names = Vec::new();
    let mut cursor = range_clause.walk();
    for n in range_clause.children_by_field_name("left", &mut cursor) {
        if n.kind() == "identifier" {
            if let Ok(text) = n.utf8_text(src) {
                names.push(text.to_string());
            }
        }
    }

    let types = [key_type, value_type];
    for (i, name) in names.iter().enumerate() {
        if name == "_" {
            continue;
        }
        scope.set_local(
            name.clone(),
            Object::placeholder(format!("range variable {name}"), types.get(i).cloned()),
        );
    }
}

fn eval_switch(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
    is_type_switch: bool,
) -> Object {
    let scope = Environment::enclosed(env);
    if let Some(init) = node.child_by_field_name("initializer") {
        let result = ev.eval(ctx, init, &scope, pkg, file);
        if result.is_control_flow() {
            return result;
        }
    }

    let bind_name = if is_type_switch {
        node.child_by_field_name("value")
            .and_then(|n| n.utf8_text(file.source.as_bytes()).ok())
            .map(str::to_string)
    } else {
        None
    };

    let mut cursor = node.walk();
    let mut result = Object::Nil;
    for case in node.named_children(&mut cursor) {
        if !matches!(case.kind(), "expression_case" | "type_case" | "default_case") {
            continue;
        }
        let case_scope = Environment::enclosed(&scope);
        if let Some(name) = &bind_name {
            let ty = case
                .child_by_field_name("type")
                .and_then(|n| n.utf8_text(file.source.as_bytes()).ok())
                .map(FieldType::named);
            case_scope.set_local(name.clone(), Object::placeholder(format!("type switch case for {name}"), ty));
        }
        let mut value_cursor = case.walk();
        let matched_ids: HashSet<usize> = case
            .children_by_field_name("value", &mut value_cursor)
            .map(|n| n.id())
            .collect();

        let mut body_cursor = case.walk();
        for stmt in case.named_children(&mut body_cursor) {
            if matched_ids.contains(&stmt.id()) {
                continue; // the matched expression/type list, not a body statement
            }
            let r = ev.eval(ctx, stmt, &case_scope, pkg, file);
            if r.is_control_flow() && !matches!(r, Object::Break(_)) {
                result = r;
            }
        }
    }
    result
}

fn eval_select(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let scope = Environment::enclosed(env);
    let mut cursor = node.walk();
    let mut result = Object::Nil;
    for case in node.named_children(&mut cursor) {
        if !matches!(case.kind(), "communication_case" | "default_case") {
            continue;
        }
        let case_scope = Environment::enclosed(&scope);
        let mut body_cursor = case.walk();
        for stmt in case.named_children(&mut body_cursor) {
            let r = ev.eval(ctx, stmt, &case_scope, pkg, file);
            if r.is_control_flow() && !matches!(r, Object::Break(_)) {
                result = r;
            }
        }
    }
    result
}

fn eval_return(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    let mut cursor = node.walk();
    let values: Vec<Object> = node
        .named_children(&mut cursor)
        .map(|n| ev.eval(ctx, n, env, pkg, file))
        .collect();

    match values.len() {
        0 => Object::ReturnValue(Box::new(Object::Nil)),
        1 => Object::ReturnValue(Box::new(values.into_iter().next().unwrap())),
        _ => Object::ReturnValue(Box::new(Object::MultiReturn(Rc::new(values)))),
    }
}

fn eval_deferred_call(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
) -> Object {
    // `defer`/`go` both collapse to an immediate call, since this engine
    // models reachability, not runtime ordering or concurrency.
    match node.named_child(0) {
        Some(call) => {
            let result = ev.eval(ctx, call, env, pkg, file);
            if result.is_control_flow() { result } else { Object::Nil }
        }
        None => Object::Nil,
    }
}

fn eval_incdec(
    ev: &Evaluator,
    ctx: &Context,
    node: Node,
    env: &EnvRef,
    pkg: &Rc<PackageObj>,
    file: &Arc<SourceFile>,
    delta: i64,
) -> Object {
    let Some(operand) = node.named_child(0) else {
        return Object::Nil;
    };
    if operand.kind() != "identifier" {
        return Object::Nil;
    }
    let Ok(name) = operand.utf8_text(file.source.as_bytes()) else {
        return Object::Nil;
    };
    let current = ev.eval(ctx, operand, env, pkg, file).unwrap_variable();
    let updated = match current {
        Object::Integer(i) => Object::Integer(i + delta),
        Object::Float(f) => Object::Float(f + delta as f64),
        other => other,
    };
    env.set(name, updated);
    Object::Nil
}
