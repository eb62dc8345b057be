//! Scan policy: a pure predicate on import paths deciding whether the
//! evaluator may ask the resolver to parse that package from source
//! ("deep") or must stop at a placeholder ("shallow").

use std::sync::Arc;

pub trait ScanPolicy: Send + Sync {
    /// Whether `import_path` may be scanned deeply.
    fn is_in_policy(&self, import_path: &str) -> bool;
}

/// Accepts only import paths under the given module prefixes; rejects
/// everything else, including the standard library and external
/// dependencies. This is the default policy workspace tooling uses.
pub struct PrefixPolicy {
    roots: Vec<String>,
}

impl PrefixPolicy {
    pub fn new(roots: Vec<String>) -> Self {
        Self { roots }
    }
}

impl ScanPolicy for PrefixPolicy {
    fn is_in_policy(&self, import_path: &str) -> bool {
        self.roots
            .iter()
            .any(|root| import_path == root || import_path.starts_with(&format!("{root}/")))
    }
}

/// Scans every import path. Useful for tests and for analyses that
/// explicitly want no shallow boundary.
pub struct AllowAllPolicy;

impl ScanPolicy for AllowAllPolicy {
    fn is_in_policy(&self, _import_path: &str) -> bool {
        true
    }
}

/// Scans nothing; every cross-package reference degrades to a placeholder.
pub struct DenyAllPolicy;

impl ScanPolicy for DenyAllPolicy {
    fn is_in_policy(&self, _import_path: &str) -> bool {
        false
    }
}

pub type SharedPolicy = Arc<dyn ScanPolicy>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_policy_matches_root_and_subpackages() {
        let policy = PrefixPolicy::new(vec!["example.com/app".to_string()]);
        assert!(policy.is_in_policy("example.com/app"));
        assert!(policy.is_in_policy("example.com/app/internal/foo"));
        assert!(!policy.is_in_policy("example.com/appendix"));
        assert!(!policy.is_in_policy("example.com/foreign"));
        assert!(!policy.is_in_policy("fmt"));
    }
}
