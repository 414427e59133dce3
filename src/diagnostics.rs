//! Unified, `miette`-based diagnostics for the lint engine.
//!
//! Every structural finding (snippet syntax errors surfaced to the CLI,
//! sibling-key conflicts, dangling aliases, host-scanner failures) is a
//! [`LintError`]. The variant carries an [`ErrorContext`]: the source the
//! spans point into, a primary span, optional help text, and additional
//! related labels for multi-span diagnostics — annotations that reference
//! other tokens render their related tokens through those labels.

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceCode};
use thiserror::Error;

pub type SourceArc = Arc<NamedSource<String>>;

/// A byte range into the error's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }
}

/// A single additional label for multi-span diagnostics.
#[derive(Debug, Clone)]
pub struct RelatedLabel {
    pub span: Span,
    pub label: String,
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The source the spans point into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
    /// Additional labeled spans.
    pub related: Vec<RelatedLabel>,
}

impl ErrorContext {
    /// An empty context: no source, span, or help.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        ErrorContext {
            source: Some(source),
            span: Some(span),
            help: None,
            related: vec![],
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related.push(RelatedLabel {
            span,
            label: label.into(),
        });
        self
    }
}

/// Unified error type for every lint failure mode.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("template syntax error: {message}")]
    Syntax { message: String, ctx: ErrorContext },

    #[error("host document error: {message}")]
    Scan { message: String, ctx: ErrorContext },

    #[error("internal error: {message}")]
    Internal { message: String, ctx: ErrorContext },

    #[error("conflicting action keys: {keys}")]
    Conflict { keys: String, ctx: ErrorContext },

    #[error("alias '*{label}' references an undefined anchor")]
    DanglingAlias { label: String, ctx: ErrorContext },

    #[error("{message}")]
    Heuristic { message: String, ctx: ErrorContext },
}

impl LintError {
    fn ctx(&self) -> &ErrorContext {
        match self {
            LintError::Syntax { ctx, .. }
            | LintError::Scan { ctx, .. }
            | LintError::Internal { ctx, .. }
            | LintError::Conflict { ctx, .. }
            | LintError::DanglingAlias { ctx, .. }
            | LintError::Heuristic { ctx, .. } => ctx,
        }
    }

    /// Hard errors are always fatal to the run's exit status; the rest
    /// only fail the run when heuristics are configured to.
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            LintError::Syntax { .. } | LintError::Scan { .. } | LintError::Internal { .. }
        )
    }
}

impl Diagnostic for LintError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            LintError::Syntax { .. } => "templint::syntax",
            LintError::Scan { .. } => "templint::scan",
            LintError::Internal { .. } => "templint::internal",
            LintError::Conflict { .. } => "templint::conflict",
            LintError::DanglingAlias { .. } => "templint::dangling_alias",
            LintError::Heuristic { .. } => "templint::heuristic",
        };
        Some(Box::new(code))
    }

    fn severity(&self) -> Option<Severity> {
        if self.is_hard() {
            Some(Severity::Error)
        } else {
            Some(Severity::Warning)
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.ctx()
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.ctx()
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let ctx = self.ctx();
        let mut labels = Vec::new();
        if let Some(span) = ctx.span {
            let len = if span.end > span.start {
                span.end - span.start
            } else {
                1
            };
            labels.push(LabeledSpan::new(None, span.start, len));
        }
        for rel in &ctx.related {
            let len = if rel.span.end > rel.span.start {
                rel.span.end - rel.span.start
            } else {
                1
            };
            labels.push(LabeledSpan::new(
                Some(rel.label.clone()),
                rel.span.start,
                len,
            ));
        }
        if labels.is_empty() {
            None
        } else {
            Some(Box::new(labels.into_iter()))
        }
    }
}

/// Wraps file content into the `Arc<NamedSource>` the error contexts
/// expect.
pub fn to_error_source(name: &str, source: &str) -> SourceArc {
    Arc::new(NamedSource::new(name, source.to_string()))
}

#[cfg(test)]
mod tests {
    use miette::Report;

    use super::*;

    #[test]
    fn related_labels_render_alongside_the_primary() {
        let src = to_error_source("play.yml", "abc def ghi");
        let ctx = ErrorContext::with_source_and_span(src, Span::new(0, 3))
            .help("close the block")
            .related(Span::new(4, 7), "opened here");
        let err = LintError::Heuristic {
            message: "Unclosed block?".to_string(),
            ctx,
        };
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("opened here"));
        assert!(output.contains("close the block"));
    }

    #[test]
    fn hardness_follows_the_error_taxonomy() {
        let syntax = LintError::Syntax {
            message: "bad".into(),
            ctx: ErrorContext::none(),
        };
        let conflict = LintError::Conflict {
            keys: "copy, template".into(),
            ctx: ErrorContext::none(),
        };
        assert!(syntax.is_hard());
        assert!(!conflict.is_hard());
    }

    #[test]
    fn contextless_errors_still_render() {
        let err = LintError::DanglingAlias {
            label: "b".into(),
            ctx: ErrorContext::none(),
        };
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("undefined anchor"));
    }
}
