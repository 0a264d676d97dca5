//! Translate the comments and string literals of a source tree from one
//! natural language to another, leaving every byte of code untouched.
//!
//! The building blocks, leaves first:
//!
//! - [`scanner`] splits a file into code and translatable spans
//! - [`mt`] masks placeholders and talks to the translation backend, with a
//!   run-scoped cache
//! - [`rewriter`] translates the spans of one file and reassembles it
//! - [`pipeline`] resumes, rewrites or copies files across a worker pool
//! - [`qa`] compares code skeletons and gates a run on fixture checks

pub mod config;
pub mod error;
pub mod logging;
pub mod mt;
pub mod pipeline;
pub mod qa;
pub mod rewriter;
pub mod scanner;

pub use config::{BackendConfig, RunConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{RunSummary, run_project};
pub use rewriter::{RewriteOutcome, SourceRewriter};
pub use scanner::{Span, SpanKind, reassemble, scan};
