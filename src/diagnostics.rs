//! Diagnostics rendering: `Error.Inspect()` renders a multi-line
//! "runtime error: ..." message followed by the offending source line and
//! a reversed call stack.

use crate::error::{EvalError, Frame};
use crate::types::SourceMap;

pub struct Diagnostic {
    pub error: EvalError,
    pub file: Option<crate::types::FileId>,
    pub range: crate::types::Range,
    pub stack: Vec<Frame>,
}

impl Diagnostic {
    pub fn new(error: EvalError, file: Option<crate::types::FileId>, range: crate::types::Range) -> Self {
        Self {
            error,
            file,
            range,
            stack: Vec::new(),
        }
    }

    pub fn with_stack(mut self, stack: Vec<Frame>) -> Self {
        self.stack = stack;
        self
    }

    /// Renders a "runtime error: ..." line, the pointed-to source line,
    /// then the stack unwound most-recent-first as
    /// `<file>:<line>:<col>: in <function>`.
    pub fn inspect(&self, source_map: &SourceMap) -> String {
        let mut out = String::new();
        out.push_str(&format!("runtime error: {}\n", self.error));

        if let Some(file) = self.file {
            if let Some(line) = source_map.line_text(file, self.range.start.line) {
                out.push_str(&line);
                out.push('\n');
            }
        }

        for frame in self.stack.iter().rev() {
            out.push_str(&format!(
                "{}:{}:{}: in {}\n",
                frame
                    .file
                    .map(|f| f.value().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                frame.range.start.line + 1,
                frame.range.start.column + 1,
                frame.function
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileId, Range};
    use std::sync::Arc;

    #[test]
    fn inspect_renders_runtime_error_header_and_stack() {
        let sm = SourceMap::new();
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("go grammar loads");
        let source = "package main\nfunc main() {}\n";
        let tree = parser.parse(source, None).expect("source parses");

        let file = Arc::new(crate::types::SourceFile {
            id: FileId::new(1).unwrap(),
            path: "main.go".into(),
            source: source.into(),
            tree: Arc::new(tree),
        });
        sm.insert(file.clone());

        let diag = Diagnostic::new(
            EvalError::IdentifierNotFound {
                name: "x".to_string(),
            },
            Some(file.id),
            Range::new(1, 0, 1, 1),
        )
        .with_stack(vec![Frame {
            function: "main".to_string(),
            file: Some(file.id),
            range: Range::new(1, 0, 1, 1),
        }]);

        let rendered = diag.inspect(&sm);
        assert!(rendered.starts_with("runtime error: identifier not found: x"));
        assert!(rendered.contains("in main"));
    }
}
