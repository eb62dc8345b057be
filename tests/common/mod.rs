//! Shared fixture plumbing for the black-box scenario tests in
//! `tests/scenarios.rs`: write a throwaway Go package to a temp directory,
//! wire up a `GoModuleResolver` + `Evaluator` pair over it, and hand back
//! whatever a scenario needs to drive the public `Evaluator`/`Resolver` API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use symgo::goscan::GoModuleResolver;
use symgo::object::PackageObj;
use symgo::policy::AllowAllPolicy;
use symgo::tracer::NullTracer;
use symgo::{Context, Evaluator, Resolver, Settings};

pub fn write_package(dir: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents).expect("fixture file writes");
    }
}

/// An evaluator over a single resolver root, scanning everything
/// (`AllowAllPolicy`) — the shape most scenarios want.
pub fn harness(import_path: &str, dir: &Path) -> (Arc<dyn Resolver>, Evaluator, Context) {
    let mut roots = HashMap::new();
    roots.insert(import_path.to_string(), dir.to_path_buf());
    harness_with_roots(roots)
}

pub fn harness_with_roots(roots: HashMap<String, PathBuf>) -> (Arc<dyn Resolver>, Evaluator, Context) {
    let resolver: Arc<dyn Resolver> = Arc::new(GoModuleResolver::new(roots));
    let evaluator = Evaluator::new(
        resolver.clone(),
        Box::new(NullTracer),
        Arc::new(AllowAllPolicy),
        Settings::default().eval,
    );
    (resolver, evaluator, Context::new())
}

pub fn load(resolver: &Arc<dyn Resolver>, evaluator: &Evaluator, ctx: &Context, import_path: &str) -> Rc<PackageObj> {
    let info = resolver
        .scan_package_by_import(ctx, import_path)
        .expect("package scans");
    evaluator.load_package(info)
}
