//! Core types for the pargen parser generator: source loading, spans, and
//! diagnostics.
//!
//! Grammar text is handled as validated UTF-8 with byte-offset spans; the
//! compiler crates attach [`span::Span`]s to everything they produce and use
//! [`diagnostics::Diagnostics`] to report warnings and render errors.

pub mod diagnostics;
pub mod source;
pub mod span;

pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity};
pub use source::{LineCol, LineMap, SourceError, SourceFile};
pub use span::Span;
