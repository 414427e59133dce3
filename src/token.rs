//! Lexical token model shared by the snippet engine, the scope tracker,
//! and the renderers.
//!
//! The embedded-language lexer produces flat `(category, text)` pairs with
//! no notion of the host document. The snippet engine re-anchors each of
//! them by splitting the text across physical lines, so a token owns an
//! ordered list of line fragments and its literal text is the
//! concatenation of the fragment texts. Token categories are a closed
//! enumeration; every consumer matches exhaustively so a new category
//! cannot be silently mishandled.

use std::fmt;

/// Lexical category of a token.
///
/// `NotConsumed` is never produced by the lexer itself; the snippet engine
/// appends it when the lexer stops before exhausting a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Data,
    VariableBegin,
    VariableEnd,
    BlockBegin,
    BlockEnd,
    CommentBegin,
    Comment,
    CommentEnd,
    Operator,
    Name,
    Str,
    Integer,
    Float,
    Whitespace,
    NotConsumed,
}

impl TokenKind {
    /// Display name, matching the lexer's own vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Data => "data",
            TokenKind::VariableBegin => "variable_begin",
            TokenKind::VariableEnd => "variable_end",
            TokenKind::BlockBegin => "block_begin",
            TokenKind::BlockEnd => "block_end",
            TokenKind::CommentBegin => "comment_begin",
            TokenKind::Comment => "comment",
            TokenKind::CommentEnd => "comment_end",
            TokenKind::Operator => "operator",
            TokenKind::Name => "name",
            TokenKind::Str => "string",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::Whitespace => "whitespace",
            TokenKind::NotConsumed => "NOT_CONSUMED",
        }
    }

    /// Generic open marker: the begin form of a paired category.
    pub fn is_begin(&self) -> bool {
        matches!(
            self,
            TokenKind::VariableBegin | TokenKind::BlockBegin | TokenKind::CommentBegin
        )
    }

    /// Generic close marker: the end form of a paired category.
    pub fn is_end(&self) -> bool {
        matches!(
            self,
            TokenKind::VariableEnd | TokenKind::BlockEnd | TokenKind::CommentEnd
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One physical-line slice of a token's text.
///
/// `line` and `col` are 1-based absolute coordinates in the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub line: usize,
    pub col: usize,
    pub text: String,
}

/// A lexical token re-anchored into host-document coordinates.
///
/// Invariant: `fragments` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub fragments: Vec<Fragment>,
}

impl Token {
    /// The token's literal text: the concatenation of its fragments.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    pub fn first(&self) -> &Fragment {
        &self.fragments[0]
    }

    pub fn last(&self) -> &Fragment {
        &self.fragments[self.fragments.len() - 1]
    }

    /// Human-readable location: `line 3:7`, `line 3:7-12`, or `lines 3-5`.
    pub fn location(&self) -> String {
        let fst = self.first();
        let lst = self.last();
        if self.fragments.len() == 1 {
            format!("line {}:{}", fst.line, fst.col)
        } else if fst.line == lst.line {
            format!("line {}:{}-{}", fst.line, fst.col, lst.col)
        } else {
            format!("lines {}-{}", fst.line, lst.line)
        }
    }

    /// Whether this token opens a scope: a generic begin marker, or an
    /// opening bracket operator.
    pub fn is_scope_open(&self) -> bool {
        if self.kind.is_begin() {
            return true;
        }
        self.kind == TokenKind::Operator && matches!(self.text().as_str(), "[" | "(" | "{")
    }

    /// Whether this token closes a scope: a generic end marker, or a
    /// closing bracket operator.
    pub fn is_scope_close(&self) -> bool {
        if self.kind.is_end() {
            return true;
        }
        self.kind == TokenKind::Operator && matches!(self.text().as_str(), "]" | ")" | "}")
    }
}

/// Maps snippet-local lexer coordinates onto absolute document
/// coordinates.
///
/// The embedded-language lexer counts lines 1-based from the start of the
/// snippet. If the snippet spans multiple physical lines its content
/// begins on the line *below* the host scalar's indicator, so the host
/// start line is bumped by one. The column restarts at the snippet's own
/// start column on the first line and at the host indentation column on
/// every subsequent line change; both are the scalar's start column here,
/// which is the closest the host scanner lets us get.
///
/// Every later diagnostic's line number depends on this mapping, including
/// the one-past-end position used for the unconsumed remainder.
#[derive(Debug)]
pub struct PosTranslator {
    base_line: usize,
    cont_col: usize,
    local_line: usize,
    col: usize,
}

impl PosTranslator {
    /// `start_line` and `start_col` are the scalar's 0-based coordinates
    /// as the host scanner reports them.
    pub fn new(start_line: usize, start_col: usize, multiline: bool) -> Self {
        let base_line = if multiline { start_line + 1 } else { start_line };
        PosTranslator {
            base_line,
            cont_col: start_col + 1,
            local_line: 1,
            col: start_col + 1,
        }
    }

    /// Absolute 1-based line for a snippet-local 1-based line number.
    pub fn absolute_line(&self, local: usize) -> usize {
        self.base_line + local
    }

    /// Splits `text` into positioned fragments, advancing the translator
    /// past it. Newlines stay attached to the fragment they terminate.
    pub fn fragments(&mut self, text: &str) -> Vec<Fragment> {
        let mut out = Vec::new();
        for piece in split_keep_newlines(text) {
            out.push(Fragment {
                line: self.base_line + self.local_line,
                col: self.col,
                text: piece.to_string(),
            });
            if piece.ends_with('\n') {
                self.local_line += 1;
                self.col = self.cont_col;
            } else {
                self.col += piece.len();
            }
        }
        out
    }

    /// Current absolute position: one past the last translated fragment.
    pub fn mark(&self) -> (usize, usize) {
        (self.base_line + self.local_line, self.col)
    }
}

/// Like `str::split_inclusive('\n')`, named for what the token model
/// needs from it.
fn split_keep_newlines(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive('\n')
}
