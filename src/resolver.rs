//! The resolver contract the evaluator consumes. The engine never parses
//! Go source itself beyond what the resolver hands back as `PackageInfo`
//! — the line-level parser and the module/workspace locator are external
//! collaborators. A reference implementation lives in [`crate::goscan`].

use crate::context::Context;
use crate::error::ResolverResult;
use crate::types::{FileId, SourceFile, SourceMap};
use std::sync::Arc;

pub trait Resolver: Send + Sync {
    /// Returns cached or freshly parsed package info for `import_path`.
    /// Must be idempotent and safe to call during `Eval`/`Apply`.
    fn scan_package_by_import(
        &self,
        ctx: &Context,
        import_path: &str,
    ) -> ResolverResult<Arc<PackageInfo>>;

    /// The shared position table used for error rendering.
    fn fset(&self) -> Arc<SourceMap>;
}

pub type SharedResolver = Arc<dyn Resolver>;

/// A structural type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    /// Bare name for named types (`int`, `error`, `User`); empty for
    /// anonymous composite types (slices, maps, pointers carry their name
    /// in `elem`/`key` instead).
    pub name: String,
    pub is_pointer: bool,
    pub is_slice: bool,
    pub is_array: bool,
    pub is_map: bool,
    pub is_chan: bool,
    pub is_builtin: bool,
    pub is_type_param: bool,
    pub is_variadic: bool,
    pub elem: Option<Box<FieldType>>,
    pub key: Option<Box<FieldType>>,
    pub type_args: Vec<FieldType>,
    /// Import path the name resolves against, for lazy cross-package
    /// lookups; `None` for builtins and type parameters.
    pub import_path: Option<String>,
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let is_builtin = is_builtin_name(&name);
        Self {
            name,
            is_pointer: false,
            is_slice: false,
            is_array: false,
            is_map: false,
            is_chan: false,
            is_builtin,
            is_type_param: false,
            is_variadic: false,
            elem: None,
            key: None,
            type_args: Vec::new(),
            import_path: None,
        }
    }

    pub fn builtin(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name,
            is_pointer: false,
            is_slice: false,
            is_array: false,
            is_map: false,
            is_chan: false,
            is_builtin: true,
            is_type_param: false,
            is_variadic: false,
            elem: None,
            key: None,
            type_args: Vec::new(),
            import_path: None,
        }
    }

    pub fn pointer_to(elem: FieldType) -> Self {
        Self {
            name: String::new(),
            is_pointer: true,
            is_slice: false,
            is_array: false,
            is_map: false,
            is_chan: false,
            is_builtin: false,
            is_type_param: false,
            is_variadic: false,
            elem: Some(Box::new(elem)),
            key: None,
            type_args: Vec::new(),
            import_path: None,
        }
    }

    pub fn slice_of(elem: FieldType) -> Self {
        Self {
            name: String::new(),
            is_pointer: false,
            is_slice: true,
            is_array: false,
            is_map: false,
            is_chan: false,
            is_builtin: false,
            is_type_param: false,
            is_variadic: false,
            elem: Some(Box::new(elem)),
            key: None,
            type_args: Vec::new(),
            import_path: None,
        }
    }

    /// The display name a method-lookup/finalization key can use, stripping
    /// pointer indirection (`*T` and `T` share a method-set key by base
    /// name, receivers differ only in pointer-ness).
    pub fn base_name(&self) -> &str {
        if self.is_pointer {
            self.elem.as_deref().map(|e| e.base_name()).unwrap_or("")
        } else {
            &self.name
        }
    }

}

fn is_builtin_name(s: &str) -> bool {
    matches!(
        s,
        "bool"
            | "string"
            | "error"
            | "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "uintptr"
            | "byte"
            | "rune"
            | "float32"
            | "float64"
            | "complex64"
            | "complex128"
            | "any"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Struct,
    Interface,
    Alias,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub import_path: String,
    pub category: TypeCategory,
    pub visibility: Visibility,
    pub generic_params: Vec<String>,
    /// Struct fields, in declaration order. Empty for interfaces/aliases.
    pub fields: Vec<(String, FieldType)>,
    /// Interface method set: name + signature, no body. Empty for structs.
    pub interface_methods: Vec<FunctionInfo>,
    /// For `TypeCategory::Alias`, the underlying type.
    pub alias_of: Option<FieldType>,
}

/// A function or method's static signature, plus (when the body was
/// scanned from in-policy source) enough to re-walk it.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub import_path: String,
    /// `(receiver name, receiver type)` for methods; `None` for plain
    /// functions.
    pub receiver: Option<(String, FieldType)>,
    pub params: Vec<(String, FieldType)>,
    pub results: Vec<FieldType>,
    pub generic_params: Vec<String>,
    pub visibility: Visibility,
    pub doc_comment: Option<String>,
    /// Source location of the body, for re-deriving the node at `Apply`
    /// time. `None` for interface method elements and unresolved
    /// functions, which have no body to evaluate.
    pub body: Option<FunctionBody>,
}

#[derive(Debug, Clone)]
pub struct FunctionBody {
    pub file: Arc<SourceFile>,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl FunctionBody {
    pub fn node(&self) -> Option<tree_sitter::Node<'_>> {
        self.file.node_for_range(self.start_byte, self.end_byte)
    }
}

#[derive(Debug, Clone)]
pub struct ConstantInfo {
    pub name: String,
    pub import_path: String,
    pub type_hint: Option<FieldType>,
    pub raw_value: Option<String>,
    pub visibility: Visibility,
}

/// Everything the evaluator needs about one scanned package.
pub struct PackageInfo {
    pub name: String,
    pub import_path: String,
    /// Import path, suffixed `.main` for `package main`.
    pub id: String,
    pub module_path: String,
    pub files: Vec<Arc<SourceFile>>,
    pub types: Vec<TypeInfo>,
    pub functions: Vec<FunctionInfo>,
    pub constants: Vec<ConstantInfo>,
}

impl PackageInfo {
    pub fn is_main(&self) -> bool {
        self.name == "main"
    }

    pub fn function(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.receiver.is_none())
    }

    pub fn methods_on(&self, type_name: &str) -> impl Iterator<Item = &FunctionInfo> {
        self.functions.iter().filter(move |f| {
            f.receiver
                .as_ref()
                .is_some_and(|(_, rt)| rt.base_name() == type_name)
        })
    }

    pub fn type_info(&self, name: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.name == name)
    }

    /// `FileId`s for an ad-hoc `_ = file_id` usage the resolver records.
    pub fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.files.iter().map(|f| f.id)
    }
}
