//! The embedded template expression language.
//!
//! This module is a collaborator of the lint core, consumed through a
//! deliberately narrow contract: [`lex`] turns snippet text into a flat
//! sequence of `(category, text)` tokens (stopping at the first lexical
//! error, like a generator that raises mid-stream), and [`parse`] either
//! accepts the snippet and summarizes its symbol usage or rejects it with
//! a message and a 1-based line number relative to the snippet. The core
//! never looks past this contract.

use std::fmt;

pub mod lexer;
pub mod parser;

pub use lexer::{lex, RawToken};
pub use parser::{parse, SymbolUsage};

/// A lexical or syntactic error in a snippet. `line` is 1-based and
/// relative to the snippet's own first line; the snippet engine translates
/// it into host-document coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        SyntaxError {
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}

impl std::error::Error for SyntaxError {}
