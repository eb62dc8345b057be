//! symgo: a symbolic execution engine for whole-program Go analysis.
//!
//! The engine evaluates Go source at the AST level to build a sound
//! over-approximation of program behavior, for tools that need call
//! graphs, reachability, or interface-implementation facts rather than
//! a faithful runtime.

// Thin wrapper so call sites read like the rest of the corpus while
// actually emitting structured tracing events.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*);
    };
}

/// Installs a default `tracing` subscriber honoring `RUST_LOG`, for
/// binaries embedding this crate that haven't set up their own. Safe to
/// call more than once; only the first call takes effect.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    });
}

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod eval;
pub mod finalize;
pub mod goscan;
pub mod intrinsics;
pub mod memo;
pub mod object;
pub mod policy;
pub mod resolver;
pub mod tracer;
pub mod types;

pub use config::Settings;
pub use context::Context;
pub use error::{ConfigError, EvalError, ResolverError};
pub use eval::Evaluator;
pub use object::Object;
pub use policy::ScanPolicy;
pub use resolver::{ConstantInfo, FieldType, FunctionInfo, PackageInfo, Resolver, TypeInfo};
pub use types::{FileId, Position, Range};
