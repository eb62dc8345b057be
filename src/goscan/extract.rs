//! Node-walking extraction from a parsed `tree-sitter-go` tree into
//! `PackageInfo`/`TypeInfo`/`FunctionInfo`/`ConstantInfo`. Dispatch-by-`kind()`
//! and `child_by_field_name` lookups turn declarations into structural
//! signatures rather than a symbol-search index.

use crate::resolver::{ConstantInfo, FieldType, FunctionBody, FunctionInfo, PackageInfo, TypeCategory, TypeInfo, Visibility};
use crate::types::SourceFile;
use std::sync::Arc;
use tree_sitter::Node;

pub(super) fn build_package_info(import_path: &str, files: &[Arc<SourceFile>]) -> PackageInfo {
    let mut name = import_path.rsplit('/').next().unwrap_or(import_path).to_string();
    let mut types = Vec::new();
    let mut functions = Vec::new();
    let mut constants = Vec::new();

    for file in files {
        let src = file.source.as_ref();
        let root = file.tree.root_node();
        let mut cursor = root.walk();
        for node in root.named_children(&mut cursor) {
            match node.kind() {
                "package_clause" => {
                    if let Some(id) = node.named_child(0) {
                        name = text_of(id, src).to_string();
                    }
                }
                "function_declaration" => functions.extend(extract_function(node, src, import_path, file)),
                "method_declaration" => functions.extend(extract_method(node, src, import_path, file)),
                "type_declaration" => extract_type_decl(node, src, import_path, &mut types),
                "var_declaration" => extract_const_or_var(node, src, import_path, &mut constants),
                "const_declaration" => extract_const_or_var(node, src, import_path, &mut constants),
                _ => {}
            }
        }
    }

    let id = if name == "main" {
        format!("{import_path}.main")
    } else {
        import_path.to_string()
    };

    PackageInfo {
        name,
        import_path: import_path.to_string(),
        id,
        module_path: import_path.to_string(),
        files: files.to_vec(),
        types,
        functions,
        constants,
    }
}

fn extract_function(node: Node, src: &str, import_path: &str, file: &Arc<SourceFile>) -> Option<FunctionInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = text_of(name_node, src).to_string();
    Some(FunctionInfo {
        name: name.clone(),
        import_path: import_path.to_string(),
        receiver: None,
        params: node
            .child_by_field_name("parameters")
            .map(|n| extract_params(n, src))
            .unwrap_or_default(),
        results: extract_results(node, src),
        generic_params: extract_generic_params(node, src),
        visibility: visibility_of(&name),
        doc_comment: doc_comment_of(node, src),
        body: function_body_of(node, file),
    })
}

fn extract_method(node: Node, src: &str, import_path: &str, file: &Arc<SourceFile>) -> Option<FunctionInfo> {
    let name_node = node.child_by_field_name("name")?;
    let name = text_of(name_node, src).to_string();
    Some(FunctionInfo {
        name: name.clone(),
        import_path: import_path.to_string(),
        receiver: extract_receiver(node, src),
        params: node
            .child_by_field_name("parameters")
            .map(|n| extract_params(n, src))
            .unwrap_or_default(),
        results: extract_results(node, src),
        generic_params: extract_generic_params(node, src),
        visibility: visibility_of(&name),
        doc_comment: doc_comment_of(node, src),
        body: function_body_of(node, file),
    })
}

fn function_body_of(node: Node, file: &Arc<SourceFile>) -> Option<FunctionBody> {
    node.child_by_field_name("body").map(|b| FunctionBody {
        file: file.clone(),
        start_byte: b.start_byte(),
        end_byte: b.end_byte(),
    })
}

fn extract_receiver(node: Node, src: &str) -> Option<(String, FieldType)> {
    let recv_node = node.child_by_field_name("receiver")?;
    let mut cursor = recv_node.walk();
    let decl = recv_node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "parameter_declaration")?;
    let name = decl
        .child_by_field_name("name")
        .map(|n| text_of(n, src).to_string())
        .unwrap_or_else(|| "_".to_string());
    let ty = decl
        .child_by_field_name("type")
        .map(|n| field_type_from_node(n, src))
        .unwrap_or_else(|| FieldType::named(""));
    Some((name, ty))
}

fn extract_params(params_node: Node, src: &str) -> Vec<(String, FieldType)> {
    let mut result = Vec::new();
    let mut cursor = params_node.walk();
    for child in params_node.named_children(&mut cursor) {
        match child.kind() {
            "parameter_declaration" => {
                let mut name_cursor = child.walk();
                let names: Vec<String> = child
                    .children_by_field_name("name", &mut name_cursor)
                    .map(|n| text_of(n, src).to_string())
                    .collect();
                let ty = child
                    .child_by_field_name("type")
                    .map(|n| field_type_from_node(n, src))
                    .unwrap_or_else(|| FieldType::named(""));
                if names.is_empty() {
                    // An unnamed parameter, e.g. a bare type in a signature.
                    result.push((format!("_{}", result.len()), ty));
                } else {
                    for name in names {
                        result.push((name, ty.clone()));
                    }
                }
            }
            "variadic_parameter_declaration" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text_of(n, src).to_string())
                    .unwrap_or_else(|| format!("_{}", result.len()));
                let mut ty = child
                    .child_by_field_name("type")
                    .map(|n| field_type_from_node(n, src))
                    .unwrap_or_else(|| FieldType::named(""));
                ty.is_variadic = true;
                result.push((name, ty));
            }
            _ => {}
        }
    }
    result
}

fn extract_results(node: Node, src: &str) -> Vec<FieldType> {
    let Some(result_node) = node.child_by_field_name("result") else {
        return Vec::new();
    };
    if result_node.kind() == "parameter_list" {
        extract_params(result_node, src).into_iter().map(|(_, t)| t).collect()
    } else {
        vec![field_type_from_node(result_node, src)]
    }
}

fn extract_generic_params(node: Node, src: &str) -> Vec<String> {
    let Some(tp) = node.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    names_of_type_parameters(tp, src)
}

fn names_of_type_parameters(tp: Node, src: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = tp.walk();
    for decl in tp.named_children(&mut cursor) {
        if decl.kind() != "type_parameter_declaration" {
            continue;
        }
        let mut name_cursor = decl.walk();
        for n in decl.children_by_field_name("name", &mut name_cursor) {
            names.push(text_of(n, src).to_string());
        }
    }
    names
}

fn extract_type_decl(node: Node, src: &str, import_path: &str, out: &mut Vec<TypeInfo>) {
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != "type_spec" {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let name = text_of(name_node, src).to_string();
        let Some(type_node) = spec.child_by_field_name("type") else {
            continue;
        };
        let generic_params = spec
            .child_by_field_name("type_parameters")
            .map(|tp| names_of_type_parameters(tp, src))
            .unwrap_or_default();
        let visibility = visibility_of(&name);

        let type_info = match type_node.kind() {
            "struct_type" => TypeInfo {
                name: name.clone(),
                import_path: import_path.to_string(),
                category: TypeCategory::Struct,
                visibility,
                generic_params,
                fields: extract_struct_fields(type_node, src),
                interface_methods: Vec::new(),
                alias_of: None,
            },
            "interface_type" => TypeInfo {
                name: name.clone(),
                import_path: import_path.to_string(),
                category: TypeCategory::Interface,
                visibility,
                generic_params,
                fields: Vec::new(),
                interface_methods: extract_interface_methods(type_node, src, import_path),
                alias_of: None,
            },
            _ => TypeInfo {
                name: name.clone(),
                import_path: import_path.to_string(),
                category: TypeCategory::Alias,
                visibility,
                generic_params,
                fields: Vec::new(),
                interface_methods: Vec::new(),
                alias_of: Some(field_type_from_node(type_node, src)),
            },
        };
        out.push(type_info);
    }
}

/// Struct fields in declaration order. An embedded field has no
/// `field_identifier`; Go synthesizes its name as the embedded type's own
/// base name, which is exactly what method-set promotion (`eval::methods`)
/// keys its embedded-field recursion on.
fn extract_struct_fields(struct_node: Node, src: &str) -> Vec<(String, FieldType)> {
    let mut fields = Vec::new();
    let mut cursor = struct_node.walk();
    for list in struct_node.children(&mut cursor) {
        if list.kind() != "field_declaration_list" {
            continue;
        }
        let mut list_cursor = list.walk();
        for field in list.named_children(&mut list_cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let mut name_cursor = field.walk();
            let names: Vec<String> = field
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| text_of(n, src).to_string())
                .collect();
            let Some(type_node) = field.child_by_field_name("type") else {
                continue;
            };
            let ty = field_type_from_node(type_node, src);
            if names.is_empty() {
                fields.push((ty.base_name().to_string(), ty));
            } else {
                for name in names {
                    fields.push((name, ty.clone()));
                }
            }
        }
    }
    fields
}

fn extract_interface_methods(interface_node: Node, src: &str, import_path: &str) -> Vec<FunctionInfo> {
    let mut methods = Vec::new();
    let mut cursor = interface_node.walk();
    for child in interface_node.named_children(&mut cursor) {
        if child.kind() != "method_elem" {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let name = text_of(name_node, src).to_string();
        methods.push(FunctionInfo {
            name: name.clone(),
            import_path: import_path.to_string(),
            receiver: None,
            params: child
                .child_by_field_name("parameters")
                .map(|n| extract_params(n, src))
                .unwrap_or_default(),
            results: extract_results(child, src),
            generic_params: Vec::new(),
            visibility: visibility_of(&name),
            doc_comment: None,
            body: None,
        });
    }
    methods
}

fn extract_const_or_var(node: Node, src: &str, import_path: &str, out: &mut Vec<ConstantInfo>) {
    let spec_kind = if node.kind() == "const_declaration" { "const_spec" } else { "var_spec" };
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != spec_kind {
            continue;
        }
        let mut name_cursor = spec.walk();
        let names: Vec<String> = spec
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| text_of(n, src).to_string())
            .collect();
        let type_hint = spec.child_by_field_name("type").map(|n| field_type_from_node(n, src));
        let values: Vec<String> = spec
            .child_by_field_name("value")
            .map(|value_list| {
                let mut vcursor = value_list.walk();
                value_list
                    .named_children(&mut vcursor)
                    .map(|v| text_of(v, src).to_string())
                    .collect()
            })
            .unwrap_or_default();

        for (i, name) in names.iter().enumerate() {
            out.push(ConstantInfo {
                name: name.clone(),
                import_path: import_path.to_string(),
                type_hint: type_hint.clone(),
                raw_value: values.get(i).cloned(),
                visibility: visibility_of(name),
            });
        }
    }
}

fn field_type_from_node(node: Node, src: &str) -> FieldType {
    match node.kind() {
        "pointer_type" => match node.named_child(0) {
            Some(inner) => FieldType::pointer_to(field_type_from_node(inner, src)),
            None => FieldType::pointer_to(FieldType::named("")),
        },
        "slice_type" => {
            let elem = node
                .child_by_field_name("element")
                .map(|n| field_type_from_node(n, src))
                .unwrap_or_else(|| FieldType::named(""));
            FieldType::slice_of(elem)
        }
        "array_type" => {
            let elem = node
                .child_by_field_name("element")
                .map(|n| field_type_from_node(n, src))
                .unwrap_or_else(|| FieldType::named(""));
            let mut ft = FieldType::slice_of(elem);
            ft.is_slice = false;
            ft.is_array = true;
            ft
        }
        "map_type" => {
            let key = node.child_by_field_name("key").map(|n| field_type_from_node(n, src));
            let value = node.child_by_field_name("value").map(|n| field_type_from_node(n, src));
            FieldType {
                name: String::new(),
                is_pointer: false,
                is_slice: false,
                is_array: false,
                is_map: true,
                is_chan: false,
                is_builtin: false,
                is_type_param: false,
                is_variadic: false,
                elem: value.map(Box::new),
                key: key.map(Box::new),
                type_args: Vec::new(),
                import_path: None,
            }
        }
        "channel_type" => {
            let value = node.child_by_field_name("value").map(|n| field_type_from_node(n, src));
            FieldType {
                name: String::new(),
                is_pointer: false,
                is_slice: false,
                is_array: false,
                is_map: false,
                is_chan: true,
                is_builtin: false,
                is_type_param: false,
                is_variadic: false,
                elem: value.map(Box::new),
                key: None,
                type_args: Vec::new(),
                import_path: None,
            }
        }
        "qualified_type" => {
            let pkg = node.child_by_field_name("package").map(|n| text_of(n, src).to_string());
            let name = node
                .child_by_field_name("name")
                .map(|n| text_of(n, src).to_string())
                .unwrap_or_else(|| text_of(node, src).to_string());
            let mut ft = FieldType::named(name);
            ft.import_path = pkg;
            ft
        }
        "generic_type" => {
            let mut ft = node
                .child_by_field_name("type")
                .map(|n| field_type_from_node(n, src))
                .unwrap_or_else(|| FieldType::named(text_of(node, src)));
            if let Some(args) = node.child_by_field_name("type_arguments") {
                let mut cursor = args.walk();
                ft.type_args = args
                    .named_children(&mut cursor)
                    .map(|n| field_type_from_node(n, src))
                    .collect();
            }
            ft
        }
        "type_identifier" | "identifier" => FieldType::named(text_of(node, src)),
        "struct_type" => FieldType::named("struct"),
        "interface_type" => FieldType::named("interface"),
        "function_type" => FieldType::named("func"),
        _ => FieldType::named(text_of(node, src)),
    }
}

fn visibility_of(name: &str) -> Visibility {
    match name.chars().next() {
        Some(c) if c.is_uppercase() => Visibility::Public,
        _ => Visibility::Private,
    }
}

/// Walks backwards through consecutive `//` line comments immediately
/// preceding `node` — the same doc-comment-collection technique as the
/// teacher's `extract_doc_comment`.
fn doc_comment_of(node: Node, src: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        if sibling.kind() != "comment" {
            break;
        }
        let text = text_of(sibling, src);
        if !text.starts_with("//") {
            break;
        }
        lines.insert(0, text.trim_start_matches("//").trim().to_string());
        current = sibling.prev_sibling();
    }
    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

fn text_of<'a>(node: Node, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileId;
    use std::path::PathBuf;
    use tree_sitter::Parser;

    fn parse_file(id: u32, src: &str) -> Arc<SourceFile> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(src, None).unwrap();
        Arc::new(SourceFile {
            id: FileId::new(id).unwrap(),
            path: PathBuf::from("test.go"),
            source: Arc::from(src),
            tree: Arc::new(tree),
        })
    }

    #[test]
    fn extracts_struct_fields_and_embedded_promotion() {
        let src = "package shapes\n\ntype Base struct {\n\tID int\n}\n\ntype Circle struct {\n\tBase\n\tRadius float64\n}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/shapes", &[file]);
        let circle = info.type_info("Circle").expect("Circle struct present");
        assert!(circle.fields.iter().any(|(n, t)| n == "Base" && t.base_name() == "Base"));
        assert!(circle.fields.iter().any(|(n, _)| n == "Radius"));
    }

    #[test]
    fn extracts_interface_methods() {
        let src = "package shapes\n\ntype Shape interface {\n\tArea() float64\n\tPerimeter() float64\n}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/shapes", &[file]);
        let shape = info.type_info("Shape").unwrap();
        assert_eq!(shape.interface_methods.len(), 2);
        assert!(shape.interface_methods.iter().any(|m| m.name == "Area"));
    }

    #[test]
    fn extracts_function_signature_with_variadic_and_results() {
        let src = "package util\n\nfunc Sum(label string, nums ...int) (int, error) {\n\treturn 0, nil\n}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/util", &[file]);
        let f = info.function("Sum").expect("Sum present");
        assert_eq!(f.params.len(), 2);
        assert!(f.params[1].1.is_variadic);
        assert_eq!(f.results.len(), 2);
        assert!(f.body.is_some());
    }

    #[test]
    fn extracts_method_receiver() {
        let src = "package shapes\n\ntype Circle struct {\n\tRadius float64\n}\n\nfunc (c *Circle) Area() float64 {\n\treturn 3.14 * c.Radius * c.Radius\n}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/shapes", &[file]);
        let method = info.methods_on("Circle").next().expect("Area method present");
        assert_eq!(method.name, "Area");
        let (recv_name, recv_type) = method.receiver.as_ref().unwrap();
        assert_eq!(recv_name, "c");
        assert!(recv_type.is_pointer);
        assert_eq!(recv_type.base_name(), "Circle");
    }

    #[test]
    fn main_package_id_is_suffixed() {
        let src = "package main\n\nfunc main() {}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/cmd/tool", &[file]);
        assert!(info.is_main());
        assert_eq!(info.id, "example.com/cmd/tool.main");
    }

    #[test]
    fn generic_function_captures_type_parameters() {
        let src = "package util\n\nfunc Map[T any, U any](items []T, f func(T) U) []U {\n\treturn nil\n}\n";
        let file = parse_file(1, src);
        let info = build_package_info("example.com/util", &[file]);
        let f = info.function("Map").expect("Map present");
        assert_eq!(f.generic_params, vec!["T".to_string(), "U".to_string()]);
    }
}
