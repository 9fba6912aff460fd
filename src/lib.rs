//! Analysis core of a Lua language server.
//!
//! Source text is parsed into a lossless syntax tree, bound into per-document
//! declaration trees and folded into a [`WorkspaceIndex`](index::WorkspaceIndex).
//! Types are inferred on demand through a
//! [`SearchContext`](semantic::SearchContext); [`Compilation`](compilation::Compilation)
//! owns the document lifecycle and [`Analysis`](analysis::Analysis) shares it
//! between concurrent tasks.

pub mod analysis;
pub mod cancel;
pub mod compilation;
pub mod config;
pub mod decl;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod index;
pub mod line_index;
pub mod semantic;
pub mod stdlib;
pub mod syntax;
pub mod types;
pub mod vfs;

pub use analysis::Analysis;
pub use compilation::Compilation;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, Result};
