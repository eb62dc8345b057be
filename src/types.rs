//! Shared identifiers and source-position types.
//!
//! `FileId` and `Range` are small newtypes over `u32`: cheap to copy, cheap
//! to hash, and the zero value is never valid so `Option<FileId>`
//! niche-optimizes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u16,
}

impl Position {
    pub fn new(line: u32, column: u16) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start: Position::new(start_line, start_column),
            end: Position::new(end_line, end_column),
        }
    }

    pub fn from_ts(node: &tree_sitter::Node) -> Self {
        Self::new(
            node.start_position().row as u32,
            node.start_position().column as u16,
            node.end_position().row as u32,
            node.end_position().column as u16,
        )
    }
}

/// One parsed Go source file, shared by every `Object`/`PackageInfo` that
/// needs to point back into it. Kept as a plain struct rather than behind
/// a cache trait — the lazy loading/caching is the resolver's job (§6), not
/// this struct's.
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub source: Arc<str>,
    pub tree: Arc<tree_sitter::Tree>,
}

impl SourceFile {
    /// Re-derive a live `Node` for a byte range recorded earlier against
    /// this file's tree. `Object::Function` stores byte ranges rather than
    /// borrowed `Node`s so it can outlive a single parse call; this is the
    /// other half of that trick.
    pub fn node_for_range(&self, start_byte: usize, end_byte: usize) -> Option<tree_sitter::Node<'_>> {
        self.tree
            .root_node()
            .descendant_for_byte_range(start_byte, end_byte)
    }
}

/// The shared position table the tracer/diagnostics layer renders against,
/// analogous to the resolver contract's `Fset()`.
#[derive(Default)]
pub struct SourceMap {
    files: parking_lot::RwLock<std::collections::HashMap<FileId, Arc<SourceFile>>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: Arc<SourceFile>) {
        self.files.write().insert(file.id, file);
    }

    pub fn get(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files.read().get(&id).cloned()
    }

    /// Render the single source line a position points at, for diagnostics.
    pub fn line_text(&self, id: FileId, line: u32) -> Option<String> {
        let file = self.get(id)?;
        file.source.lines().nth(line as usize).map(str::to_string)
    }
}
