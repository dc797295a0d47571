//! Configuration types.
//!
//! The engine has no global state: everything the scanner, the directive
//! evaluator and the injector consult lives in a [`FileContext`] built fresh
//! for every file from the batch-level [`Config`], so `#define`s and skip
//! sentinels seen in one file never leak into the next.

use std::collections::HashSet;

/// Symbol the rewriter itself always treats as defined, so sources can
/// adapt with `#ifdef TRACEWEAVE`.
pub const BUILTIN_DEFINE: &str = "TRACEWEAVE";

/// Runtime wrapper macros stripped from the output (together with a
/// directly following argument list) before re-injection.
pub const DEFAULT_ELIDE: &[&str] =
    &["TW_NATIVE_BEGIN", "TW_NATIVE_END", "TW_TRY_MAIN", "TW_EXCEPT_MAIN"];

/// Batch-level configuration, shared (read-only) by every file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Function given the program begin/end treatment.
    pub entry_point: String,
    /// Extra symbols treated as defined from the start.
    pub defines: Vec<String>,
    /// Extra identifiers elided from the output.
    pub elide: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            entry_point: "main".to_string(),
            defines: Vec::new(),
            elide: Vec::new(),
        }
    }
}

/// Per-file rewrite state: the file's identity in the emitted calls plus
/// the mutable sets and flags the scanner updates as it goes.
#[derive(Debug, Clone)]
pub struct FileContext {
    /// Dotted package string derived from the file's directory.
    pub package: String,
    /// Class string derived from the file's base name.
    pub class: String,
    pub entry_point: String,
    /// Defined preprocessor symbols; grows on enabled `#define`s.
    pub defines: HashSet<String>,
    /// Identifiers dropped from the output.
    pub elide: HashSet<String>,
    /// Set by the skip-function sentinel, cleared by the next function.
    pub skip_next: bool,
    /// Set by the skip-file sentinel, sticky to end of file.
    pub skip_all: bool,
}

impl FileContext {
    pub fn new(config: &Config, package: &str, class: &str) -> Self {
        let mut defines: HashSet<String> = config.defines.iter().cloned().collect();
        defines.insert(BUILTIN_DEFINE.to_string());

        let mut elide: HashSet<String> =
            DEFAULT_ELIDE.iter().map(|s| (*s).to_string()).collect();
        elide.extend(config.elide.iter().cloned());

        FileContext {
            package: package.to_string(),
            class: class.to_string(),
            entry_point: config.entry_point.clone(),
            defines,
            elide,
            skip_next: false,
            skip_all: false,
        }
    }
}
