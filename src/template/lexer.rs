//! Modal lexer for template source.
//!
//! Two modes: literal data between delimiters, and expression mode inside
//! `{{ }}` print statements, `{% %}` tags, and `{# #}` comments. The mode
//! switch carries full context (bracket depth, whitespace-control affixes,
//! `raw` blocks), so a `}}` inside a dict literal is an operator while the
//! same two characters at depth zero end the print statement.
//!
//! Invariant relied on by the snippet engine: the concatenation of the
//! emitted token texts is byte-for-byte the consumed prefix of the source.
//! On a lexical error the lexer stops and hands back whatever it had,
//! leaving the remainder for the engine's unconsumed-token synthesis.

use crate::token::TokenKind;

use super::SyntaxError;

/// A flat `(category, text)` token, not yet anchored to the host document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: TokenKind,
    pub text: String,
}

/// Tokenize `source`, stopping at the first lexical error.
pub fn lex(source: &str) -> (Vec<RawToken>, Option<SyntaxError>) {
    Lexer::new(source).run()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Variable,
    Block,
    Comment,
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    tokens: Vec<RawToken>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> (Vec<RawToken>, Option<SyntaxError>) {
        loop {
            if self.pos >= self.src.len() {
                return (self.tokens, None);
            }
            let rest = &self.src[self.pos..];
            let Some((off, delim)) = find_delim(rest) else {
                self.emit(TokenKind::Data, self.pos, self.src.len());
                return (self.tokens, None);
            };
            if off > 0 {
                self.emit(TokenKind::Data, self.pos, self.pos + off);
            }
            let step = match delim {
                Delim::Comment => self.lex_comment(),
                Delim::Variable => self.lex_expression(Delim::Variable).map(|_| ()),
                Delim::Block => self.lex_block(),
            };
            if let Err(e) = step {
                return (self.tokens, Some(e));
            }
        }
    }

    // === Mode switches ===

    /// `{# … #}`, with optional whitespace-control affixes.
    fn lex_comment(&mut self) -> Result<(), SyntaxError> {
        let begin_line = self.line;
        let mut end = self.pos + 2;
        if matches!(self.src.as_bytes().get(end), Some(b'-') | Some(b'+')) {
            end += 1;
        }
        self.emit(TokenKind::CommentBegin, self.pos, end);
        let content_start = self.pos;
        let Some(idx) = self.src[content_start..].find("#}") else {
            return Err(SyntaxError::new("missing end of comment tag", begin_line));
        };
        let close_end = content_start + idx + 2;
        let mut close = content_start + idx;
        if close > content_start && matches!(self.src.as_bytes()[close - 1], b'-' | b'+') {
            close -= 1;
        }
        if close > content_start {
            self.emit(TokenKind::Comment, content_start, close);
        }
        self.emit(TokenKind::CommentEnd, close, close_end);
        Ok(())
    }

    /// `{% … %}`; a `raw` tag swallows everything up to its `endraw`.
    fn lex_block(&mut self) -> Result<(), SyntaxError> {
        let raw_line = self.line;
        let tag = self.lex_expression(Delim::Block)?;
        if tag.as_deref() == Some("raw") {
            self.skip_raw(raw_line)?;
        }
        Ok(())
    }

    /// Expression mode. Returns the first name token seen, which is the
    /// tag name for `{% %}` blocks.
    fn lex_expression(&mut self, delim: Delim) -> Result<Option<String>, SyntaxError> {
        let begin_kind = match delim {
            Delim::Variable => TokenKind::VariableBegin,
            Delim::Block => TokenKind::BlockBegin,
            Delim::Comment => unreachable!("comments are handled by lex_comment"),
        };
        let mut end = self.pos + 2;
        if matches!(self.src.as_bytes().get(end), Some(b'-') | Some(b'+')) {
            end += 1;
        }
        self.emit(begin_kind, self.pos, end);

        let closer = match delim {
            Delim::Variable => "}}",
            _ => "%}",
        };
        let mut depth = 0usize;
        let mut first_name: Option<String> = None;

        loop {
            let Some(c) = self.peek_char() else {
                return Err(SyntaxError::new("unexpected end of template", self.line));
            };
            let rest = &self.src[self.pos..];

            // Terminators, only outside of brackets.
            if depth == 0 {
                if rest.starts_with(closer) {
                    let kind = end_kind(delim);
                    self.emit(kind, self.pos, self.pos + 2);
                    return Ok(first_name);
                }
                if (c == '-' || c == '+') && rest[1..].starts_with(closer) {
                    let kind = end_kind(delim);
                    self.emit(kind, self.pos, self.pos + 3);
                    return Ok(first_name);
                }
            }

            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    let end = self.scan_while(|ch| matches!(ch, ' ' | '\t' | '\r' | '\n'));
                    self.emit(TokenKind::Whitespace, self.pos, end);
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    self.emit(TokenKind::Operator, self.pos, self.pos + 1);
                }
                ')' | ']' | '}' => {
                    depth = depth.saturating_sub(1);
                    self.emit(TokenKind::Operator, self.pos, self.pos + 1);
                }
                '\'' | '"' => self.lex_string(c)?,
                '0'..='9' => self.lex_number(),
                c if c.is_alphabetic() || c == '_' => {
                    let end = self.scan_while(|ch| ch.is_alphanumeric() || ch == '_');
                    let text = self.src[self.pos..end].to_string();
                    self.emit(TokenKind::Name, self.pos, end);
                    if first_name.is_none() {
                        first_name = Some(text);
                    }
                }
                _ => {
                    if let Some(op) = ["==", "!=", ">=", "<=", "//", "**"]
                        .iter()
                        .find(|op| rest.starts_with(**op))
                    {
                        self.emit(TokenKind::Operator, self.pos, self.pos + op.len());
                    } else if matches!(
                        c,
                        '+' | '-' | '*' | '/' | '%' | '~' | '.' | ':' | ',' | '|' | '=' | '<' | '>'
                    ) {
                        self.emit(TokenKind::Operator, self.pos, self.pos + 1);
                    } else {
                        return Err(SyntaxError::new(
                            format!("unexpected char '{c}'"),
                            self.line,
                        ));
                    }
                }
            }
        }
    }

    /// Literal text up to the matching `{% endraw %}` tag, emitted as data.
    fn skip_raw(&mut self, raw_line: usize) -> Result<(), SyntaxError> {
        let mut search = self.pos;
        loop {
            let Some(off) = self.src[search..].find("{%") else {
                return Err(SyntaxError::new("missing end of raw directive", raw_line));
            };
            let tag_start = search + off;
            let mut j = tag_start + 2;
            if matches!(self.src.as_bytes().get(j), Some(b'-') | Some(b'+')) {
                j += 1;
            }
            while matches!(self.src.as_bytes().get(j), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                j += 1;
            }
            let word_end = j + self.src[j..]
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(self.src.len() - j);
            if &self.src[j..word_end] == "endraw" {
                if tag_start > self.pos {
                    self.emit(TokenKind::Data, self.pos, tag_start);
                }
                return self.lex_expression(Delim::Block).map(|_| ());
            }
            search = tag_start + 2;
        }
    }

    // === Scanners ===

    fn lex_string(&mut self, quote: char) -> Result<(), SyntaxError> {
        let start_line = self.line;
        let mut chars = self.src[self.pos..].char_indices().skip(1);
        let mut escaped = false;
        for (i, ch) in &mut chars {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                c if c == quote => {
                    self.emit(TokenKind::Str, self.pos, self.pos + i + c.len_utf8());
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(SyntaxError::new("unterminated string literal", start_line))
    }

    fn lex_number(&mut self) {
        let mut end = self.scan_while(|ch| ch.is_ascii_digit() || ch == '_');
        let mut kind = TokenKind::Integer;
        let bytes = self.src.as_bytes();
        if bytes.get(end) == Some(&b'.')
            && bytes.get(end + 1).is_some_and(|b| b.is_ascii_digit())
        {
            end = self.scan_from_while(end + 1, |ch| ch.is_ascii_digit() || ch == '_');
            kind = TokenKind::Float;
        }
        if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
            let mut exp = end + 1;
            if matches!(bytes.get(exp), Some(b'+') | Some(b'-')) {
                exp += 1;
            }
            if bytes.get(exp).is_some_and(|b| b.is_ascii_digit()) {
                end = self.scan_from_while(exp, |ch| ch.is_ascii_digit());
                kind = TokenKind::Float;
            }
        }
        self.emit(kind, self.pos, end);
    }

    // === Helpers ===

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn scan_while(&self, pred: impl Fn(char) -> bool) -> usize {
        self.scan_from_while(self.pos, pred)
    }

    fn scan_from_while(&self, from: usize, pred: impl Fn(char) -> bool) -> usize {
        match self.src[from..].find(|ch: char| !pred(ch)) {
            Some(off) => from + off,
            None => self.src.len(),
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        let text = &self.src[start..end];
        self.line += text.bytes().filter(|b| *b == b'\n').count();
        self.tokens.push(RawToken {
            kind,
            text: text.to_string(),
        });
        self.pos = end;
    }
}

fn end_kind(delim: Delim) -> TokenKind {
    match delim {
        Delim::Variable => TokenKind::VariableEnd,
        _ => TokenKind::BlockEnd,
    }
}

/// Offset and kind of the next template delimiter in `rest`, if any.
fn find_delim(rest: &str) -> Option<(usize, Delim)> {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' {
            match bytes[i + 1] {
                b'{' => return Some((i, Delim::Variable)),
                b'%' => return Some((i, Delim::Block)),
                b'#' => return Some((i, Delim::Comment)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind as K;

    fn kinds(tokens: &[RawToken]) -> Vec<K> {
        tokens.iter().map(|t| t.kind).collect()
    }

    fn consumed(tokens: &[RawToken]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn plain_text_is_a_single_data_token() {
        let (toks, err) = lex("hello world\n");
        assert!(err.is_none());
        assert_eq!(kinds(&toks), vec![K::Data]);
        assert_eq!(consumed(&toks), "hello world\n");
    }

    #[test]
    fn print_statement_round_trips() {
        let src = "a {{ item.path | upper }} b";
        let (toks, err) = lex(src);
        assert!(err.is_none());
        assert_eq!(consumed(&toks), src);
        assert_eq!(
            kinds(&toks),
            vec![
                K::Data,
                K::VariableBegin,
                K::Whitespace,
                K::Name,
                K::Operator,
                K::Name,
                K::Whitespace,
                K::Operator,
                K::Whitespace,
                K::Name,
                K::Whitespace,
                K::VariableEnd,
                K::Data,
            ]
        );
    }

    #[test]
    fn whitespace_control_affixes_stay_on_the_delimiters() {
        let (toks, err) = lex("{%- if x -%}y{% endif %}");
        assert!(err.is_none());
        assert_eq!(toks[0].text, "{%-");
        let close = toks
            .iter()
            .find(|t| t.kind == K::BlockEnd)
            .map(|t| t.text.clone());
        assert_eq!(close.as_deref(), Some("-%}"));
    }

    #[test]
    fn braces_nest_inside_print_statements() {
        let src = "{{ {'a': 1}['a'] }}";
        let (toks, err) = lex(src);
        assert!(err.is_none());
        assert_eq!(consumed(&toks), src);
        assert_eq!(toks.last().map(|t| t.kind), Some(K::VariableEnd));
    }

    #[test]
    fn alien_characters_stop_the_lexer_midway() {
        let (toks, err) = lex("{{ a && b }}");
        let err = err.expect("lexical error");
        assert!(err.message.contains("unexpected char '&'"));
        // Everything up to the bad character was still handed back.
        assert_eq!(consumed(&toks), "{{ a ");
    }

    #[test]
    fn unterminated_comment_reports_its_own_line() {
        let (_, err) = lex("x\n{# never closed");
        let err = err.expect("lexical error");
        assert!(err.message.contains("comment"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn raw_blocks_pass_broken_syntax_through_as_data() {
        let src = "{% raw %}{{ not closed {%{% endraw %}";
        let (toks, err) = lex(src);
        assert!(err.is_none());
        assert_eq!(consumed(&toks), src);
        assert!(toks.iter().any(|t| t.kind == K::Data && t.text.contains("not closed")));
    }

    #[test]
    fn numbers_split_into_integer_and_float() {
        let (toks, err) = lex("{{ 10 + 2.5 }}");
        assert!(err.is_none());
        assert!(toks.iter().any(|t| t.kind == K::Integer && t.text == "10"));
        assert!(toks.iter().any(|t| t.kind == K::Float && t.text == "2.5"));
    }

    #[test]
    fn strings_keep_their_quotes_and_escapes() {
        let (toks, err) = lex(r#"{{ "a\"b" }}"#);
        assert!(err.is_none());
        let s = toks.iter().find(|t| t.kind == K::Str).expect("string token");
        assert_eq!(s.text, r#""a\"b""#);
    }
}
