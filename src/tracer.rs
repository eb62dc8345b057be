//! Tracer hook: an optional single-method interface invoked with each
//! visited AST node, used by downstream tools that want a raw visitation
//! feed independent of the intrinsic/finalization machinery.

use crate::types::{FileId, Range};

pub trait Tracer {
    fn visit(&mut self, file: Option<FileId>, node_kind: &str, range: Range);
}

/// Default no-op tracer.
pub struct NullTracer;

impl Tracer for NullTracer {
    fn visit(&mut self, _file: Option<FileId>, _node_kind: &str, _range: Range) {}
}

/// Records every visit, for tests and tools that want a full trail.
#[derive(Default)]
pub struct RecordingTracer {
    pub visits: Vec<(Option<FileId>, String, Range)>,
}

impl Tracer for RecordingTracer {
    fn visit(&mut self, file: Option<FileId>, node_kind: &str, range: Range) {
        self.visits.push((file, node_kind.to_string(), range));
    }
}
