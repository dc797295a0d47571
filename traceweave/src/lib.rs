//! # traceweave - C/C++ source instrumentation for scope tracing
//!
//! traceweave rewrites C/C++-family sources so that every function and
//! method body is bracketed by trace-entry/trace-exit calls for a
//! scope-based tracing runtime. It is a single-pass, preprocessor-aware
//! structural scanner: just enough C/C++ is understood (block nesting,
//! argument lists, qualified names, conditional compilation) to find
//! function bodies and their true closing brace, with no grammar and no
//! symbol table.
//!
//! ## Pipeline
//!
//! ```text
//! project walk ──► per-file Translator ──► rewritten file + .orig backup
//!                      │
//!                      ├── scan          span classification & terminators
//!                      ├── preprocessor  #if/#ifdef/#else/#endif bookkeeping
//!                      ├── block         nesting stack & signature candidates
//!                      └── inject        entry/exit call text
//! ```
//!
//! Input is consumed in bounded chunks; a comment, literal or directive
//! whose end lies in a later chunk is carried across the boundary, so the
//! output never depends on how the input was split.
//!
//! ## What gets rewritten
//!
//! - `#include "traceweave.h"` is prepended to every file.
//! - A function or method's opening `{` becomes `TW_FN_ENTER( package,
//!   class, name, "signature", params... )`; the matching `}` becomes
//!   `TW_FN_LEAVE()`. The runtime relies on scope-exit semantics, so one
//!   exit call covers every return path.
//! - The program entry function gets `TW_MAIN_BEGIN`/`TW_MAIN_END` and a
//!   trailing include of the runtime implementation.
//! - The sentinel comments `/*TRACEWEAVE_SKIP_FUNCTION*/` and
//!   `/*TRACEWEAVE_SKIP_FILE*/` suppress instrumentation.
//!
//! Everything else, including comments, literals and disabled preprocessor
//! branches, is copied through byte for byte. Braces inside a disabled
//! conditional branch are invisible to the scope stack; exactly one branch
//! of every conditional group is structurally interpreted.
//!
//! ## Module structure
//!
//! - [`scan`]: lexical classification and span terminator search
//! - [`preprocessor`]: the recognized directive subset and conditional state
//! - [`block`]: the nesting stack data model
//! - [`translate`]: the per-file rewrite engine
//! - [`inject`]: injected call text and runtime file names
//! - [`project`]: batch driver (walk, backups, runtime install)
//! - [`cli`], [`domain`]: arguments, configuration and error types

pub mod block;
pub mod cli;
pub mod domain;
pub mod inject;
pub mod preprocessor;
pub mod project;
pub mod scan;
pub mod translate;
