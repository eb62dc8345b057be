//! Error taxonomy for the engine.
//!
//! Structured with `thiserror`, split by failure domain: one enum per
//! concern, a `kind()` discriminant for callers that want a stable tag
//! instead of matching on message text, and a blanket `ErrorContext`
//! extension trait for wrapping foreign errors. Analysis-time failures are
//! modeled as `Object::Error`/`Object::PanicError` variants, not as Rust
//! `Result::Err` — `EvalError` is what those objects carry, rendered
//! through `diagnostics::Diagnostic`.

use crate::types::{FileId, Range};
use thiserror::Error;

/// A failure produced while evaluating in-policy code. Carried inside
/// `Object::Error`, never panicked.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("identifier not found: {name}")]
    IdentifierNotFound { name: String },

    #[error("invalid indirect of {type_name} (not a pointer)")]
    InvalidIndirect { type_name: String },

    #[error("not a function: {type_name}")]
    NotAFunction { type_name: String },

    #[error("unsupported construct: {node_kind}")]
    Unsupported { node_kind: String },

    #[error("wrong number of arguments: {function} expects {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("receiver type mismatch calling {method}: expected {expected}")]
    ReceiverMismatch { method: String, expected: String },

    #[error("resolver failure: {0}")]
    Resolver(String),
}

impl EvalError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentifierNotFound { .. } => "IDENTIFIER_NOT_FOUND",
            Self::InvalidIndirect { .. } => "INVALID_INDIRECT",
            Self::NotAFunction { .. } => "NOT_A_FUNCTION",
            Self::Unsupported { .. } => "UNSUPPORTED_CONSTRUCT",
            Self::ArgumentCount { .. } => "ARGUMENT_COUNT",
            Self::ReceiverMismatch { .. } => "RECEIVER_MISMATCH",
            Self::Resolver(_) => "RESOLVER_FAILURE",
        }
    }
}

/// A single frame in a captured call stack, used by both `EvalError`
/// diagnostics and `Object::PanicError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: Option<FileId>,
    pub range: Range,
}

/// Errors from the resolver contract.
#[derive(Error, Debug, Clone)]
pub enum ResolverError {
    #[error("package not found for import path '{import_path}'")]
    NotFound { import_path: String },

    #[error("failed to parse '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("io error reading '{path}': {reason}")]
    Io { path: String, reason: String },
}

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

pub type EvalResult<T> = Result<T, EvalError>;
pub type ResolverResult<T> = Result<T, ResolverError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Attach a message to any foreign error on its way into our taxonomy.
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T, ResolverError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn context(self, msg: &str) -> Result<T, ResolverError> {
        self.map_err(|e| ResolverError::Io {
            path: msg.to_string(),
            reason: e.to_string(),
        })
    }
}
