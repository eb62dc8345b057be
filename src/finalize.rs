//! Finalization: a post-pass over everything recorded during evaluation
//! that resolves interface method calls to the concrete (type, method)
//! pairs they could have dispatched to.
//!
//! Two disjoint sources feed a call site's resolution:
//! - if the receiving variable accumulated concrete types on some explored
//!   path (`PossibleConcreteTypes`), only those are marked used;
//! - otherwise the receiver's type was never narrowed (e.g. it arrived from
//!   an out-of-policy call), and every in-policy struct that structurally
//!   implements the interface is marked used for that method — a
//!   conservative over-approximation, biased toward more candidates rather
//!   than missed ones.

use crate::resolver::{FunctionInfo, PackageInfo, TypeCategory};
use crate::types::{FileId, Range};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InterfaceCallSite {
    pub interface_name: Option<String>,
    pub method_name: String,
    pub possible_concrete_types: HashSet<String>,
}

#[derive(Default)]
pub struct FinalizeState {
    pub sites: Vec<InterfaceCallSite>,
    pub direct_calls: Vec<(String, Option<FileId>, Range)>,
}

#[derive(Debug, Default)]
pub struct FinalizeReport {
    /// `(type name, method name)` pairs discovered reachable through
    /// interface dispatch.
    pub used_methods: HashSet<(String, String)>,
    /// Interface name → structurally-implementing type names, across every
    /// package the evaluator has seen.
    pub implementers: HashMap<String, Vec<String>>,
    /// Package-level functions called directly (not through an interface),
    /// by qualified name.
    pub called_functions: HashSet<String>,
}

pub fn run(
    state: &FinalizeState,
    known_packages: &HashMap<String, Arc<PackageInfo>>,
) -> FinalizeReport {
    let mut report = FinalizeReport::default();

    for (name, _, _) in &state.direct_calls {
        report.called_functions.insert(name.clone());
    }

    let all_structs: Vec<&String> = known_packages
        .values()
        .flat_map(|pkg| pkg.types.iter())
        .filter(|t| t.category == TypeCategory::Struct)
        .map(|t| &t.name)
        .collect();

    for interface in known_packages.values().flat_map(|pkg| pkg.types.iter()) {
        if interface.category != TypeCategory::Interface {
            continue;
        }
        let implementers: Vec<String> = all_structs
            .iter()
            .filter(|struct_name| implements_interface(known_packages, struct_name, interface))
            .map(|s| (*s).clone())
            .collect();
        if !implementers.is_empty() {
            report.implementers.insert(interface.name.clone(), implementers);
        }
    }

    for site in &state.sites {
        if !site.possible_concrete_types.is_empty() {
            for concrete in &site.possible_concrete_types {
                report
                    .used_methods
                    .insert((concrete.clone(), site.method_name.clone()));
            }
            continue;
        }

        let candidates: Vec<String> = match site
            .interface_name
            .as_ref()
            .and_then(|name| report.implementers.get(name))
        {
            Some(implementers) => implementers.clone(),
            None => all_structs.iter().map(|s| (*s).clone()).collect(),
        };

        for candidate in candidates {
            if has_method(known_packages, &candidate, &site.method_name) {
                report
                    .used_methods
                    .insert((candidate, site.method_name.clone()));
            }
        }
    }

    report
}

fn implements_interface(
    known_packages: &HashMap<String, Arc<PackageInfo>>,
    struct_name: &str,
    interface: &crate::resolver::TypeInfo,
) -> bool {
    interface
        .interface_methods
        .iter()
        .all(|m| has_matching_method(known_packages, struct_name, m))
}

/// Whether `struct_name` has a method matching `wanted`'s full signature —
/// name, parameter types, and result types, in order — not just its name.
/// A `Speak(loud bool)` on the struct does not satisfy an interface's
/// `Speak()`.
fn has_matching_method(
    known_packages: &HashMap<String, Arc<PackageInfo>>,
    struct_name: &str,
    wanted: &FunctionInfo,
) -> bool {
    known_packages
        .values()
        .any(|pkg| pkg.methods_on(struct_name).any(|f| signatures_match(f, wanted)))
}

fn signatures_match(f: &FunctionInfo, wanted: &FunctionInfo) -> bool {
    f.name == wanted.name
        && f.params.len() == wanted.params.len()
        && f.params.iter().zip(&wanted.params).all(|((_, a), (_, b))| a == b)
        && f.results == wanted.results
}

fn has_method(known_packages: &HashMap<String, Arc<PackageInfo>>, struct_name: &str, method: &str) -> bool {
    known_packages
        .values()
        .any(|pkg| pkg.methods_on(struct_name).any(|f| f.name == method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{FunctionInfo, TypeInfo, Visibility};

    fn struct_type(name: &str) -> TypeInfo {
        TypeInfo {
            name: name.to_string(),
            import_path: "example.com/app".to_string(),
            category: TypeCategory::Struct,
            visibility: Visibility::Public,
            generic_params: Vec::new(),
            fields: Vec::new(),
            interface_methods: Vec::new(),
            alias_of: None,
        }
    }

    fn interface_type(name: &str, methods: &[&str]) -> TypeInfo {
        TypeInfo {
            name: name.to_string(),
            import_path: "example.com/app".to_string(),
            category: TypeCategory::Interface,
            visibility: Visibility::Public,
            generic_params: Vec::new(),
            fields: Vec::new(),
            interface_methods: methods
                .iter()
                .map(|m| FunctionInfo {
                    name: m.to_string(),
                    import_path: "example.com/app".to_string(),
                    receiver: None,
                    params: Vec::new(),
                    results: Vec::new(),
                    generic_params: Vec::new(),
                    visibility: Visibility::Public,
                    doc_comment: None,
                    body: None,
                })
                .collect(),
            alias_of: None,
        }
    }

    fn method(receiver: &str, name: &str) -> FunctionInfo {
        FunctionInfo {
            name: name.to_string(),
            import_path: "example.com/app".to_string(),
            receiver: Some((
                "r".to_string(),
                crate::resolver::FieldType::named(receiver),
            )),
            params: Vec::new(),
            results: Vec::new(),
            generic_params: Vec::new(),
            visibility: Visibility::Public,
            doc_comment: None,
            body: None,
        }
    }

    fn pkg_with(types: Vec<TypeInfo>, functions: Vec<FunctionInfo>) -> Arc<PackageInfo> {
        Arc::new(PackageInfo {
            name: "app".to_string(),
            import_path: "example.com/app".to_string(),
            id: "example.com/app".to_string(),
            module_path: "example.com/app".to_string(),
            files: Vec::new(),
            types,
            functions,
            constants: Vec::new(),
        })
    }

    #[test]
    fn narrowed_site_marks_only_its_concrete_types() {
        let pkg = pkg_with(
            vec![struct_type("Dog"), struct_type("Cat")],
            vec![method("Dog", "Speak"), method("Cat", "Speak")],
        );
        let mut known = HashMap::new();
        known.insert(pkg.import_path.clone(), pkg);

        let state = FinalizeState {
            sites: vec![InterfaceCallSite {
                interface_name: Some("Speaker".to_string()),
                method_name: "Speak".to_string(),
                possible_concrete_types: HashSet::from(["Dog".to_string()]),
            }],
            direct_calls: Vec::new(),
        };

        let report = run(&state, &known);
        assert!(report.used_methods.contains(&("Dog".to_string(), "Speak".to_string())));
        assert!(!report.used_methods.contains(&("Cat".to_string(), "Speak".to_string())));
    }

    #[test]
    fn struct_with_mismatched_signature_is_not_an_implementer() {
        let mut mismatched = method("Dog", "Speak");
        mismatched.params.push(("loud".to_string(), crate::resolver::FieldType::named("bool")));
        let pkg = pkg_with(
            vec![struct_type("Dog"), interface_type("Speaker", &["Speak"])],
            vec![mismatched],
        );
        let mut known = HashMap::new();
        known.insert(pkg.import_path.clone(), pkg);

        let state = FinalizeState {
            sites: Vec::new(),
            direct_calls: Vec::new(),
        };
        let report = run(&state, &known);
        assert!(!report.implementers.get("Speaker").is_some_and(|v| v.contains(&"Dog".to_string())));
    }

    #[test]
    fn unnarrowed_site_fans_out_to_every_implementer() {
        let pkg = pkg_with(
            vec![struct_type("Dog"), struct_type("Cat"), interface_type("Speaker", &["Speak"])],
            vec![method("Dog", "Speak"), method("Cat", "Speak")],
        );
        let mut known = HashMap::new();
        known.insert(pkg.import_path.clone(), pkg);

        let state = FinalizeState {
            sites: vec![InterfaceCallSite {
                interface_name: Some("Speaker".to_string()),
                method_name: "Speak".to_string(),
                possible_concrete_types: HashSet::new(),
            }],
            direct_calls: Vec::new(),
        };

        let report = run(&state, &known);
        assert!(report.used_methods.contains(&("Dog".to_string(), "Speak".to_string())));
        assert!(report.used_methods.contains(&("Cat".to_string(), "Speak".to_string())));
    }
}
