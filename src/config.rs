//! Layered configuration via `figment`: defaults → an optional TOML file →
//! `SYMGO_`-prefixed environment variables, with double underscores
//! separating nested keys (`SYMGO_EVAL__MEMOIZE=true`).

use crate::error::{ConfigError, ConfigResult};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Global debug/tracing verbosity toggle.
    #[serde(default)]
    pub debug: bool,

    /// Scan-policy and evaluator knobs.
    #[serde(default)]
    pub eval: EvalConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvalConfig {
    /// Import-path prefixes considered "in policy" for deep scanning. An
    /// empty list means "scan nothing from source", which is a legitimate
    /// (if unusual) configuration.
    #[serde(default = "default_policy_roots")]
    pub policy_roots: Vec<String>,

    /// Enable the per-(function, abstract-argument-signature) memoization
    /// cache. Off by default.
    #[serde(default)]
    pub memoize: bool,

    /// How many times `ForStmt`/`RangeStmt` bodies are unrolled. Default
    /// is once; kept configurable for experiments with deeper unrolling.
    #[serde(default = "default_loop_unroll")]
    pub loop_unroll_depth: usize,

    /// Call-stack depth at which a repeated `(function, signature)` pair is
    /// treated as a cycle and short-circuited to a placeholder.
    #[serde(default = "default_recursion_cap")]
    pub recursion_cap: usize,
}

fn default_policy_roots() -> Vec<String> {
    Vec::new()
}

fn default_loop_unroll() -> usize {
    1
}

fn default_recursion_cap() -> usize {
    64
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            policy_roots: default_policy_roots(),
            memoize: false,
            loop_unroll_depth: default_loop_unroll(),
            recursion_cap: default_recursion_cap(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            eval: EvalConfig::default(),
        }
    }
}

impl Settings {
    /// Load defaults, then an optional TOML file, then `SYMGO_` env vars.
    pub fn load(toml_path: Option<&PathBuf>) -> ConfigResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = toml_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("SYMGO_").split("__"));

        figment.extract().map_err(|e| ConfigError::Invalid {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let settings = Settings::load(None).expect("defaults must always load");
        assert!(!settings.debug);
        assert_eq!(settings.eval.loop_unroll_depth, 1);
        assert_eq!(settings.eval.recursion_cap, 64);
        assert!(!settings.eval.memoize);
    }

    #[test]
    fn env_override_is_applied() {
        // SAFETY: test runs single-threaded within this process's test
        // harness; no other test reads SYMGO_DEBUG.
        unsafe {
            std::env::set_var("SYMGO_DEBUG", "true");
        }
        let settings = Settings::load(None).expect("settings must load");
        unsafe {
            std::env::remove_var("SYMGO_DEBUG");
        }
        assert!(settings.debug);
    }
}
