//! templint: a lint engine for templated configuration documents.
//!
//! The document walker pulls structural events from a host-format
//! document and hands every string value to the snippet engine, which
//! runs the embedded template language's parser and lexer, re-anchors the
//! tokens into document coordinates, and applies the scope tracker's
//! heuristics. Cross-document state (anchors, aliases, free variables,
//! tags) accumulates in an explicit run context and is reconciled once
//! after all inputs are walked.

pub use crate::diagnostics::{to_error_source, ErrorContext, LintError, RelatedLabel, Span};
pub use crate::registry::Registries;

pub mod cli;
pub mod diagnostics;
pub mod engine;
pub mod registry;
pub mod render;
pub mod scope;
pub mod shell;
pub mod suggest;
pub mod template;
pub mod token;
pub mod walker;
pub mod xref;
