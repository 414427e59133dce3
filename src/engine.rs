//! Per-snippet checking pipeline.
//!
//! One call of [`check_snippet`] runs a string value through the embedded
//! language's parser and lexer, re-anchors every token into host-document
//! coordinates, synthesizes the unconsumed-remainder token when the lexer
//! stopped short, and hands the sequence to the scope tracker. The result
//! carries everything the renderers and the exit-status logic need.

use crate::registry::Registries;
use crate::scope::{self, Annotation};
use crate::template::{self, SymbolUsage};
use crate::token::{PosTranslator, Token, TokenKind};

/// Where a snippet sits in the host document. Coordinates are 0-based, as
/// the host scanner reports them.
#[derive(Debug, Clone, Default)]
pub struct SnippetOrigin {
    pub start_line: usize,
    pub start_col: usize,
    pub node_path: String,
    /// The snippet is an entire standalone template file, not a scalar
    /// below an indicator line; line 1 of the snippet is line 1 of the
    /// document.
    pub standalone: bool,
}

/// A parse or lex error translated to absolute document coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedError {
    pub message: String,
    pub line: usize,
}

/// Everything one snippet check produced.
#[derive(Debug, Default)]
pub struct SnippetReport {
    pub node_path: String,
    pub tokens: Vec<Token>,
    pub annotations: Vec<Annotation>,
    pub parse_error: Option<PositionedError>,
    pub lex_error: Option<PositionedError>,
    /// Present only when the snippet parsed successfully.
    pub symbols: Option<SymbolUsage>,
}

impl SnippetReport {
    /// A hard syntax error, always fatal to this snippet's lint result.
    pub fn is_hard_error(&self) -> bool {
        self.parse_error.is_some() || self.lex_error.is_some()
    }

    /// Heuristic findings, including the unconsumed remainder.
    pub fn has_findings(&self) -> bool {
        !self.annotations.is_empty()
            || self.tokens.iter().any(|t| t.kind == TokenKind::NotConsumed)
    }

    /// Nothing but literal data: not worth displaying.
    pub fn is_plain(&self) -> bool {
        self.tokens.iter().all(|t| t.kind == TokenKind::Data)
    }
}

/// Check one string value from the host document.
pub fn check_snippet(source: &str, origin: &SnippetOrigin, reg: &Registries) -> SnippetReport {
    let parse_result = template::parse(source, &origin.node_path);
    let multiline = !origin.standalone && source.contains('\n');
    let mut xlat = PosTranslator::new(origin.start_line, origin.start_col, multiline);

    let (raw, lex_err) = template::lex(source);
    let mut consumed = 0usize;
    let mut tokens = Vec::with_capacity(raw.len());
    for rt in raw {
        consumed += rt.text.len();
        tokens.push(Token {
            kind: rt.kind,
            fragments: xlat.fragments(&rt.text),
        });
    }

    let (parse_error, symbols) = match parse_result {
        Ok(usage) => (None, Some(usage)),
        Err(e) => (
            Some(PositionedError {
                line: xlat.absolute_line(e.line),
                message: e.message,
            }),
            None,
        ),
    };

    // A lexer error that merely repeats the parse error adds nothing.
    let lex_error = lex_err.and_then(|e| {
        let positioned = PositionedError {
            line: xlat.absolute_line(e.line),
            message: e.message,
        };
        match &parse_error {
            Some(p) if *p == positioned => None,
            _ => Some(positioned),
        }
    });

    if consumed + 1 == source.len() && source.ends_with('\n') {
        // A sole trailing newline the lexer declined to own.
    } else if consumed < source.len() {
        tokens.push(Token {
            kind: TokenKind::NotConsumed,
            fragments: xlat.fragments(&source[consumed..]),
        });
    }

    let annotations = scope::analyze(&tokens, reg);
    SnippetReport {
        node_path: origin.node_path.clone(),
        tokens,
        annotations,
        parse_error,
        lex_error,
        symbols,
    }
}
