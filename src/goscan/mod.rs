//! Reference `Resolver` implementation.
//!
//! Walks a directory tree with `tree-sitter-go` and extracts the
//! `PackageInfo` the evaluator needs. Import paths resolve to on-disk
//! directories through a caller-supplied map rather than a real
//! `go.mod`/`go.work` locator — this exists to make the engine
//! demonstrable end-to-end, not as a full module system.

mod extract;

use crate::context::Context;
use crate::error::{ErrorContext, ResolverError, ResolverResult};
use crate::resolver::{PackageInfo, Resolver};
use crate::types::{FileId, SourceFile, SourceMap};
use dashmap::DashMap;
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tree_sitter::Parser;

pub struct GoModuleResolver {
    roots: HashMap<String, PathBuf>,
    cache: DashMap<String, Arc<PackageInfo>>,
    fset: Arc<SourceMap>,
    next_file_id: AtomicU32,
}

impl GoModuleResolver {
    pub fn new(roots: HashMap<String, PathBuf>) -> Self {
        Self {
            roots,
            cache: DashMap::new(),
            fset: Arc::new(SourceMap::new()),
            next_file_id: AtomicU32::new(1),
        }
    }

    fn alloc_file_id(&self) -> FileId {
        let value = self.next_file_id.fetch_add(1, Ordering::Relaxed);
        FileId::new(value).expect("file id counter starts at 1 and only increases")
    }

    /// A single directory's `.go` files, non-recursive — one resolver entry
    /// is one package, the same granularity `go build` uses.
    fn discover_go_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut builder = WalkBuilder::new(dir);
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false)
            .max_depth(Some(1))
            .require_git(false);

        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "go"))
            .filter(|path| {
                !path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().ends_with("_test.go"))
            })
            .collect();
        files.sort();
        files
    }

    fn parse_file(&self, path: &Path) -> ResolverResult<Arc<SourceFile>> {
        let source = std::fs::read_to_string(path).context(&path.display().to_string())?;

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| ResolverError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| ResolverError::Parse {
                path: path.display().to_string(),
                reason: "tree-sitter produced no parse tree".to_string(),
            })?;

        let file = Arc::new(SourceFile {
            id: self.alloc_file_id(),
            path: path.to_path_buf(),
            source: Arc::from(source.as_str()),
            tree: Arc::new(tree),
        });
        self.fset.insert(file.clone());
        Ok(file)
    }
}

impl Resolver for GoModuleResolver {
    fn scan_package_by_import(&self, ctx: &Context, import_path: &str) -> ResolverResult<Arc<PackageInfo>> {
        if ctx.is_cancelled() {
            return Err(ResolverError::Cancelled);
        }
        if let Some(cached) = self.cache.get(import_path) {
            return Ok(cached.clone());
        }

        let dir = self
            .roots
            .get(import_path)
            .ok_or_else(|| ResolverError::NotFound {
                import_path: import_path.to_string(),
            })?;

        let mut files = Vec::new();
        for path in self.discover_go_files(dir) {
            if ctx.is_cancelled() {
                return Err(ResolverError::Cancelled);
            }
            files.push(self.parse_file(&path)?);
        }
        if files.is_empty() {
            return Err(ResolverError::NotFound {
                import_path: import_path.to_string(),
            });
        }

        let info = Arc::new(extract::build_package_info(import_path, &files));
        self.cache.insert(import_path.to_string(), info.clone());
        Ok(info)
    }

    fn fset(&self) -> Arc<SourceMap> {
        self.fset.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_go_file(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn scans_a_package_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_go_file(
            dir.path(),
            "shapes.go",
            "package shapes\n\ntype Circle struct {\n\tRadius float64\n}\n\nfunc (c *Circle) Area() float64 {\n\treturn 3.14 * c.Radius * c.Radius\n}\n",
        );

        let mut roots = HashMap::new();
        roots.insert("example.com/shapes".to_string(), dir.path().to_path_buf());
        let resolver = GoModuleResolver::new(roots);
        let ctx = Context::new();

        let info = resolver
            .scan_package_by_import(&ctx, "example.com/shapes")
            .expect("package scans");
        assert_eq!(info.name, "shapes");
        assert!(info.type_info("Circle").is_some());
        assert!(info.methods_on("Circle").any(|f| f.name == "Area"));
    }

    #[test]
    fn unknown_import_path_is_not_found() {
        let resolver = GoModuleResolver::new(HashMap::new());
        let ctx = Context::new();
        let err = resolver
            .scan_package_by_import(&ctx, "example.com/missing")
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound { .. }));
    }

    #[test]
    fn scan_is_idempotent_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        write_go_file(dir.path(), "util.go", "package util\n\nfunc Noop() {}\n");

        let mut roots = HashMap::new();
        roots.insert("example.com/util".to_string(), dir.path().to_path_buf());
        let resolver = GoModuleResolver::new(roots);
        let ctx = Context::new();

        let first = resolver.scan_package_by_import(&ctx, "example.com/util").unwrap();
        let second = resolver.scan_package_by_import(&ctx, "example.com/util").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
