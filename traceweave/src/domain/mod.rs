//! Domain model for traceweave
//!
//! Configuration and error types shared across the pipeline:
//! - Batch-level [`Config`] and per-file [`FileContext`]
//! - Structured engine errors ([`TranslateError`])

pub mod errors;
pub mod types;

pub use errors::TranslateError;
pub use types::{Config, FileContext};
