//! Statement and expression parser for the template language.
//!
//! Purely syntactic: it validates tag nesting and expression shape, and
//! summarizes symbol usage. Nothing is evaluated. The free-variable set is
//! a flat approximation — a name bound anywhere in the snippet (a `for`
//! target, a `set` target, a macro parameter) is not reported as free,
//! regardless of scope depth or ordering.

use std::collections::BTreeSet;

use crate::token::TokenKind;

use super::lexer::{lex, RawToken};
use super::SyntaxError;

/// What a successfully parsed snippet refers to.
///
/// `free` holds every identifier the snippet would need to resolve from an
/// external context at evaluation time. `filters` and `tests` record the
/// builtin names the snippet applies, dotted paths reassembled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolUsage {
    pub free: BTreeSet<String>,
    pub filters: BTreeSet<String>,
    pub tests: BTreeSet<String>,
}

/// Names the runtime always provides; never free variables.
const RESERVED: &[&str] = &[
    "loop", "self", "super", "varargs", "kwargs", "namespace", "range", "dict", "lipsum",
    "cycler", "joiner",
];

/// Names that act as operators or literals inside expressions.
const EXPR_KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "true", "false", "none", "True", "False",
    "None", "recursive",
];

/// Parse `source`, returning its symbol usage or the first syntax error.
pub fn parse(source: &str, _name: &str) -> Result<SymbolUsage, SyntaxError> {
    let (tokens, lex_err) = lex(source);
    if let Some(e) = lex_err {
        return Err(e);
    }
    Parser::new(tokens).run()
}

struct Parser {
    tokens: Vec<RawToken>,
    idx: usize,
    line: usize,
    blocks: Vec<(String, usize)>,
    used: BTreeSet<String>,
    defined: BTreeSet<String>,
    filters: BTreeSet<String>,
    tests: BTreeSet<String>,
}

impl Parser {
    fn new(tokens: Vec<RawToken>) -> Self {
        Parser {
            tokens,
            idx: 0,
            line: 1,
            blocks: Vec::new(),
            used: BTreeSet::new(),
            defined: BTreeSet::new(),
            filters: BTreeSet::new(),
            tests: BTreeSet::new(),
        }
    }

    fn run(mut self) -> Result<SymbolUsage, SyntaxError> {
        while let Some(kind) = self.kind() {
            match kind {
                TokenKind::Data | TokenKind::Whitespace => self.bump(),
                TokenKind::CommentBegin | TokenKind::Comment | TokenKind::CommentEnd => {
                    self.bump()
                }
                TokenKind::VariableBegin => self.variable_stmt()?,
                TokenKind::BlockBegin => self.block_stmt()?,
                _ => {
                    return Err(self.error(format!(
                        "unexpected token '{}'",
                        self.text().unwrap_or_default()
                    )))
                }
            }
        }
        if let Some((tag, line)) = self.blocks.last() {
            return Err(SyntaxError::new(
                format!("unexpected end of template, expected 'end{tag}'"),
                (*line).max(self.line),
            ));
        }
        let mut free = BTreeSet::new();
        for name in &self.used {
            if !self.defined.contains(name) && !RESERVED.contains(&name.as_str()) {
                free.insert(name.clone());
            }
        }
        Ok(SymbolUsage {
            free,
            filters: self.filters,
            tests: self.tests,
        })
    }

    // === Statements ===

    fn variable_stmt(&mut self) -> Result<(), SyntaxError> {
        self.bump();
        self.skip_ws();
        if self.kind() == Some(TokenKind::VariableEnd) {
            return Err(self.error("expected an expression, got end of print statement"));
        }
        self.expression()?;
        self.end_with(TokenKind::VariableEnd, "end of print statement")
    }

    fn block_stmt(&mut self) -> Result<(), SyntaxError> {
        self.bump();
        self.skip_ws();
        let tag_line = self.line;
        let tag = match self.kind() {
            Some(TokenKind::Name) => self.text().unwrap_or_default().to_string(),
            _ => return Err(self.error("expected a tag name")),
        };
        self.bump();
        match tag.as_str() {
            "if" => {
                self.expression()?;
                self.end_tag()?;
                self.blocks.push(("if".into(), tag_line));
            }
            "elif" => {
                if self.blocks.last().map(|b| b.0.as_str()) != Some("if") {
                    return Err(SyntaxError::new("encountered unknown tag 'elif'", tag_line));
                }
                self.expression()?;
                self.end_tag()?;
            }
            "else" => {
                if !matches!(self.blocks.last().map(|b| b.0.as_str()), Some("if" | "for")) {
                    return Err(SyntaxError::new("encountered unknown tag 'else'", tag_line));
                }
                self.end_tag()?;
            }
            "for" => {
                self.bind_targets()?;
                self.expect_name("in")?;
                self.expression()?;
                self.skip_ws();
                if self.at_name("if") {
                    self.bump();
                    self.expression()?;
                }
                self.skip_ws();
                if self.at_name("recursive") {
                    self.bump();
                }
                self.end_tag()?;
                self.blocks.push(("for".into(), tag_line));
            }
            "set" => {
                self.bind_targets()?;
                self.skip_ws();
                if self.at_op("=") {
                    self.bump();
                    self.expression()?;
                    self.end_tag()?;
                } else {
                    self.end_tag()?;
                    self.blocks.push(("set".into(), tag_line));
                }
            }
            "macro" => {
                let name = self.expect_any_name("a macro name")?;
                self.defined.insert(name);
                self.param_list()?;
                self.end_tag()?;
                self.blocks.push(("macro".into(), tag_line));
            }
            "block" => {
                self.expect_any_name("a block name")?;
                self.skip_ws();
                while self.at_name("scoped") || self.at_name("required") {
                    self.bump();
                    self.skip_ws();
                }
                self.end_tag()?;
                self.blocks.push(("block".into(), tag_line));
            }
            "filter" => {
                self.filter_spec()?;
                self.skip_ws();
                while self.at_op("|") {
                    self.bump();
                    self.filter_spec()?;
                    self.skip_ws();
                }
                self.end_tag()?;
                self.blocks.push(("filter".into(), tag_line));
            }
            "call" => {
                self.skip_ws();
                if self.at_op("(") {
                    self.param_list()?;
                }
                self.expression()?;
                self.end_tag()?;
                self.blocks.push(("call".into(), tag_line));
            }
            "with" => {
                self.skip_ws();
                while self.kind() == Some(TokenKind::Name)
                    && !EXPR_KEYWORDS.contains(&self.text().unwrap_or_default())
                {
                    let name = self.expect_any_name("an assignment target")?;
                    self.defined.insert(name);
                    self.skip_ws();
                    self.expect_op("=")?;
                    self.expression()?;
                    self.skip_ws();
                    if self.at_op(",") {
                        self.bump();
                        self.skip_ws();
                    } else {
                        break;
                    }
                }
                self.end_tag()?;
                self.blocks.push(("with".into(), tag_line));
            }
            "autoescape" => {
                self.expression()?;
                self.end_tag()?;
                self.blocks.push(("autoescape".into(), tag_line));
            }
            "raw" => {
                self.end_tag()?;
                self.blocks.push(("raw".into(), tag_line));
            }
            "include" | "extends" | "import" | "from" | "do" | "print" => {
                self.loose_tail()?;
            }
            t if t.starts_with("end") && t.len() > 3 => {
                let base = &t[3..];
                match self.blocks.pop() {
                    None => {
                        return Err(SyntaxError::new(
                            format!("encountered unknown tag '{t}'"),
                            tag_line,
                        ))
                    }
                    Some((open, _)) if open != base => {
                        return Err(SyntaxError::new(
                            format!("encountered unknown tag '{t}', expected 'end{open}'"),
                            tag_line,
                        ))
                    }
                    Some(_) => self.end_tag()?,
                }
            }
            _ => {
                return Err(SyntaxError::new(
                    format!("encountered unknown tag '{tag}'"),
                    tag_line,
                ))
            }
        }
        Ok(())
    }

    /// Lenient tail for import-like tags: expressions, `as` bindings, and
    /// the usual modifier words, up to the end of the tag.
    fn loose_tail(&mut self) -> Result<(), SyntaxError> {
        let mut binding = false;
        loop {
            self.skip_ws();
            match self.kind() {
                None => return Err(self.error("unexpected end of template")),
                Some(TokenKind::BlockEnd) => {
                    self.bump();
                    return Ok(());
                }
                Some(TokenKind::Name) => {
                    let text = self.text().unwrap_or_default().to_string();
                    match text.as_str() {
                        "as" => {
                            self.bump();
                            let name = self.expect_any_name("a name after 'as'")?;
                            self.defined.insert(name);
                        }
                        "import" => {
                            self.bump();
                            binding = true;
                        }
                        "ignore" | "missing" | "with" | "without" | "context" => self.bump(),
                        _ if binding => {
                            let name = self.expect_any_name("an import target")?;
                            self.defined.insert(name);
                        }
                        _ => self.expression()?,
                    }
                }
                Some(TokenKind::Operator) if self.at_op(",") => self.bump(),
                _ => self.expression()?,
            }
        }
    }

    /// Comma-separated assignment targets, with optional parentheses and
    /// dotted namespace attributes. Binds the base names.
    fn bind_targets(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        let parens = self.at_op("(");
        if parens {
            self.bump();
        }
        loop {
            let name = self.expect_any_name("an assignment target")?;
            self.defined.insert(name);
            self.skip_ws();
            while self.at_op(".") {
                self.bump();
                self.expect_any_name("an attribute name")?;
                self.skip_ws();
            }
            if self.at_op(",") {
                self.bump();
                self.skip_ws();
            } else {
                break;
            }
        }
        if parens {
            self.expect_op(")")?;
        }
        Ok(())
    }

    /// `(name, name=default, …)` parameter list; binds the names.
    fn param_list(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        self.expect_op("(")?;
        self.skip_ws();
        if self.at_op(")") {
            self.bump();
            return Ok(());
        }
        loop {
            let name = self.expect_any_name("a parameter name")?;
            self.defined.insert(name);
            self.skip_ws();
            if self.at_op("=") {
                self.bump();
                self.expression()?;
                self.skip_ws();
            }
            if self.at_op(",") {
                self.bump();
                self.skip_ws();
            } else {
                break;
            }
        }
        self.expect_op(")")
    }

    fn end_tag(&mut self) -> Result<(), SyntaxError> {
        self.end_with(TokenKind::BlockEnd, "end of tag")
    }

    fn end_with(&mut self, kind: TokenKind, what: &str) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.kind() == Some(kind) {
            self.bump();
            Ok(())
        } else {
            match self.text() {
                Some(text) => Err(self.error(format!("expected {what}, got '{text}'"))),
                None => Err(self.error(format!("unexpected end of template, expected {what}"))),
            }
        }
    }

    // === Expressions ===

    fn expression(&mut self) -> Result<(), SyntaxError> {
        self.or_test()?;
        self.skip_ws();
        if self.at_name("if") {
            self.bump();
            self.or_test()?;
            self.skip_ws();
            if self.at_name("else") {
                self.bump();
                self.expression()?;
            }
        }
        Ok(())
    }

    fn or_test(&mut self) -> Result<(), SyntaxError> {
        self.and_test()?;
        loop {
            self.skip_ws();
            if self.at_name("or") {
                self.bump();
                self.and_test()?;
            } else {
                return Ok(());
            }
        }
    }

    fn and_test(&mut self) -> Result<(), SyntaxError> {
        self.not_test()?;
        loop {
            self.skip_ws();
            if self.at_name("and") {
                self.bump();
                self.not_test()?;
            } else {
                return Ok(());
            }
        }
    }

    fn not_test(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_name("not") {
            self.bump();
            self.not_test()
        } else {
            self.comparison()
        }
    }

    fn comparison(&mut self) -> Result<(), SyntaxError> {
        self.filtered()?;
        loop {
            self.skip_ws();
            if self.at_op("==")
                || self.at_op("!=")
                || self.at_op("<")
                || self.at_op(">")
                || self.at_op("<=")
                || self.at_op(">=")
            {
                self.bump();
                self.filtered()?;
            } else if self.at_name("in") {
                self.bump();
                self.filtered()?;
            } else if self.at_name("not") && self.next_name_is("in") {
                self.bump();
                self.skip_ws();
                self.bump();
                self.filtered()?;
            } else if self.at_name("is") {
                self.bump();
                self.is_test()?;
            } else {
                return Ok(());
            }
        }
    }

    /// The test clause after `is`: optional `not`, the test name, then
    /// either parenthesized arguments or one bare argument.
    fn is_test(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_name("not") {
            self.bump();
            self.skip_ws();
        }
        let name = match self.kind() {
            Some(TokenKind::Name) => self.text().unwrap_or_default().to_string(),
            _ => return Err(self.error("expected a test name after 'is'")),
        };
        self.bump();
        self.tests.insert(name);
        self.skip_ws();
        if self.at_op("(") {
            self.call_args()?;
            return Ok(());
        }
        match self.kind() {
            Some(TokenKind::Str | TokenKind::Integer | TokenKind::Float) => self.filtered(),
            Some(TokenKind::Name)
                if !EXPR_KEYWORDS.contains(&self.text().unwrap_or_default()) =>
            {
                self.filtered()
            }
            _ => Ok(()),
        }
    }

    fn filtered(&mut self) -> Result<(), SyntaxError> {
        self.concat()?;
        loop {
            self.skip_ws();
            if self.at_op("|") {
                self.bump();
                self.filter_spec()?;
            } else {
                return Ok(());
            }
        }
    }

    /// A filter name (dotted path reassembled) with optional arguments.
    fn filter_spec(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.kind() != Some(TokenKind::Name) {
            return Err(self.error("expected a filter name"));
        }
        let mut path = self.text().unwrap_or_default().to_string();
        self.bump();
        loop {
            self.skip_ws();
            if self.at_op(".") {
                self.bump();
                let part = self.expect_any_name("an attribute name")?;
                path.push('.');
                path.push_str(&part);
            } else {
                break;
            }
        }
        self.filters.insert(path);
        if self.at_op("(") {
            self.call_args()?;
        }
        Ok(())
    }

    fn concat(&mut self) -> Result<(), SyntaxError> {
        self.addsub()?;
        loop {
            self.skip_ws();
            if self.at_op("~") {
                self.bump();
                self.addsub()?;
            } else {
                return Ok(());
            }
        }
    }

    fn addsub(&mut self) -> Result<(), SyntaxError> {
        self.muldiv()?;
        loop {
            self.skip_ws();
            if self.at_op("+") || self.at_op("-") {
                self.bump();
                self.muldiv()?;
            } else {
                return Ok(());
            }
        }
    }

    fn muldiv(&mut self) -> Result<(), SyntaxError> {
        self.unary()?;
        loop {
            self.skip_ws();
            if self.at_op("*") || self.at_op("/") || self.at_op("//") || self.at_op("%") {
                self.bump();
                self.unary()?;
            } else {
                return Ok(());
            }
        }
    }

    fn unary(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_op("-") || self.at_op("+") {
            self.bump();
            self.unary()
        } else {
            self.power()
        }
    }

    fn power(&mut self) -> Result<(), SyntaxError> {
        self.postfixed()?;
        self.skip_ws();
        if self.at_op("**") {
            self.bump();
            self.unary()?;
        }
        Ok(())
    }

    fn postfixed(&mut self) -> Result<(), SyntaxError> {
        self.primary()?;
        loop {
            self.skip_ws();
            if self.at_op(".") {
                self.bump();
                self.expect_any_name("an attribute name")?;
            } else if self.at_op("[") {
                self.bump();
                self.subscript()?;
            } else if self.at_op("(") {
                self.call_args()?;
            } else {
                return Ok(());
            }
        }
    }

    /// `[expr]`, or a slice with up to two `:` separators.
    fn subscript(&mut self) -> Result<(), SyntaxError> {
        loop {
            self.skip_ws();
            match self.kind() {
                None => return Err(self.error("unexpected end of template")),
                Some(TokenKind::Operator) if self.at_op("]") => {
                    self.bump();
                    return Ok(());
                }
                Some(TokenKind::Operator) if self.at_op(":") => self.bump(),
                _ => self.expression()?,
            }
        }
    }

    /// `(args)` with positional, keyword, `*`, and `**` arguments; the
    /// opening parenthesis is the current token.
    fn call_args(&mut self) -> Result<(), SyntaxError> {
        self.bump();
        loop {
            self.skip_ws();
            match self.kind() {
                None => return Err(self.error("unexpected end of template")),
                Some(TokenKind::Operator) if self.at_op(")") => {
                    self.bump();
                    return Ok(());
                }
                Some(TokenKind::Operator) if self.at_op(",") => self.bump(),
                Some(TokenKind::Operator) if self.at_op("*") || self.at_op("**") => {
                    self.bump();
                    self.expression()?;
                }
                Some(TokenKind::Name) if self.next_op_is("=") => {
                    self.bump();
                    self.skip_ws();
                    self.bump();
                    self.expression()?;
                }
                _ => self.expression()?,
            }
        }
    }

    fn primary(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        match self.kind() {
            Some(TokenKind::Name) => {
                let text = self.text().unwrap_or_default().to_string();
                match text.as_str() {
                    "true" | "false" | "none" | "True" | "False" | "None" => self.bump(),
                    t if EXPR_KEYWORDS.contains(&t) => {
                        return Err(self.error(format!("unexpected token '{t}'")))
                    }
                    t => {
                        self.used.insert(t.to_string());
                        self.bump();
                    }
                }
                Ok(())
            }
            Some(TokenKind::Str) => {
                self.bump();
                // Adjacent string literals concatenate.
                loop {
                    self.skip_ws();
                    if self.kind() == Some(TokenKind::Str) {
                        self.bump();
                    } else {
                        return Ok(());
                    }
                }
            }
            Some(TokenKind::Integer | TokenKind::Float) => {
                self.bump();
                Ok(())
            }
            Some(TokenKind::Operator) if self.at_op("(") => {
                self.bump();
                self.skip_ws();
                if self.at_op(")") {
                    self.bump();
                    return Ok(());
                }
                self.expr_list(")")
            }
            Some(TokenKind::Operator) if self.at_op("[") => {
                self.bump();
                self.skip_ws();
                if self.at_op("]") {
                    self.bump();
                    return Ok(());
                }
                self.expr_list("]")
            }
            Some(TokenKind::Operator) if self.at_op("{") => {
                self.bump();
                self.dict_body()
            }
            Some(_) => Err(self.error(format!(
                "unexpected token '{}'",
                self.text().unwrap_or_default()
            ))),
            None => Err(self.error("expected an expression")),
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn expr_list(&mut self, close: &str) -> Result<(), SyntaxError> {
        loop {
            self.expression()?;
            self.skip_ws();
            if self.at_op(",") {
                self.bump();
                self.skip_ws();
                if self.at_op(close) {
                    self.bump();
                    return Ok(());
                }
            } else if self.at_op(close) {
                self.bump();
                return Ok(());
            } else {
                return Err(self.error(format!("expected '{close}'")));
            }
        }
    }

    fn dict_body(&mut self) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_op("}") {
            self.bump();
            return Ok(());
        }
        loop {
            self.expression()?;
            self.skip_ws();
            self.expect_op(":")?;
            self.expression()?;
            self.skip_ws();
            if self.at_op(",") {
                self.bump();
                self.skip_ws();
                if self.at_op("}") {
                    self.bump();
                    return Ok(());
                }
            } else if self.at_op("}") {
                self.bump();
                return Ok(());
            } else {
                return Err(self.error("expected '}'"));
            }
        }
    }

    // === Cursor ===

    fn kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.idx).map(|t| t.kind)
    }

    fn text(&self) -> Option<&str> {
        self.tokens.get(self.idx).map(|t| t.text.as_str())
    }

    fn bump(&mut self) {
        if let Some(tok) = self.tokens.get(self.idx) {
            self.line += tok.text.bytes().filter(|b| *b == b'\n').count();
            self.idx += 1;
        }
    }

    fn skip_ws(&mut self) {
        while self.kind() == Some(TokenKind::Whitespace) {
            self.bump();
        }
    }

    fn at_op(&self, op: &str) -> bool {
        self.kind() == Some(TokenKind::Operator) && self.text() == Some(op)
    }

    fn at_name(&self, name: &str) -> bool {
        self.kind() == Some(TokenKind::Name) && self.text() == Some(name)
    }

    /// Whether the next significant token after the current one is the
    /// operator `op`.
    fn next_op_is(&self, op: &str) -> bool {
        self.peek_significant()
            .is_some_and(|t| t.kind == TokenKind::Operator && t.text == op)
    }

    /// Whether the next significant token after the current one is the
    /// name `name`.
    fn next_name_is(&self, name: &str) -> bool {
        self.peek_significant()
            .is_some_and(|t| t.kind == TokenKind::Name && t.text == name)
    }

    fn peek_significant(&self) -> Option<&RawToken> {
        self.tokens[self.idx + 1..]
            .iter()
            .find(|t| t.kind != TokenKind::Whitespace)
    }

    fn expect_op(&mut self, op: &str) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_op(op) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected '{op}'")))
        }
    }

    fn expect_name(&mut self, name: &str) -> Result<(), SyntaxError> {
        self.skip_ws();
        if self.at_name(name) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(format!("expected '{name}'")))
        }
    }

    fn expect_any_name(&mut self, what: &str) -> Result<String, SyntaxError> {
        self.skip_ws();
        match self.kind() {
            Some(TokenKind::Name) => {
                let name = self.text().unwrap_or_default().to_string();
                self.bump();
                Ok(name)
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free(source: &str) -> Vec<String> {
        parse(source, "test")
            .expect("parse")
            .free
            .into_iter()
            .collect()
    }

    #[test]
    fn plain_text_has_no_symbols() {
        let usage = parse("just text, no markers", "t").expect("parse");
        assert!(usage.free.is_empty());
        assert!(usage.filters.is_empty());
    }

    #[test]
    fn names_in_print_statements_are_free() {
        assert_eq!(free("{{ foo + bar.baz }}"), vec!["bar", "foo"]);
    }

    #[test]
    fn bound_names_are_not_free() {
        assert_eq!(
            free("{% for item in items %}{{ item.name }}{% endfor %}"),
            vec!["items"]
        );
        assert_eq!(free("{% set x = y %}{{ x }}"), vec!["y"]);
    }

    #[test]
    fn filters_and_tests_are_recorded_not_free() {
        let usage = parse("{{ a | upper }}{% if b is defined %}x{% endif %}", "t")
            .expect("parse");
        assert_eq!(usage.free.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(usage.filters.contains("upper"));
        assert!(usage.tests.contains("defined"));
    }

    #[test]
    fn reserved_runtime_names_are_not_free() {
        assert_eq!(
            free("{% for x in range(3) %}{{ loop.index }}{% endfor %}"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn mismatched_end_tag_is_a_syntax_error() {
        let err = parse("{% if x %}{% endfor %}", "t").expect_err("must fail");
        assert!(err.message.contains("endfor"));
        assert!(err.message.contains("endif"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unclosed_block_reports_at_end_of_template() {
        let err = parse("{% if x %}\n{{ y }}\n", "t").expect_err("must fail");
        assert!(err.message.contains("expected 'endif'"));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let err = parse("{% endfo %}", "t").expect_err("must fail");
        assert!(err.message.contains("unknown tag 'endfo'"));
    }

    #[test]
    fn empty_print_statement_is_rejected() {
        let err = parse("{{ }}", "t").expect_err("must fail");
        assert!(err.message.contains("expected an expression"));
    }

    #[test]
    fn error_lines_are_snippet_relative() {
        let err = parse("ok\n{{ a }}\n{% bogus %}", "t").expect_err("must fail");
        // The bogus tag sits on line 3 of the snippet.
        assert!(err.message.contains("bogus"));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn conditional_expressions_and_slices_parse() {
        assert_eq!(
            free("{{ (a if b else c)[1:2] | join(', ') }}"),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_with_bare_argument_parses() {
        let usage = parse("{% if n is divisibleby 3 %}x{% endif %}", "t").expect("parse");
        assert!(usage.tests.contains("divisibleby"));
    }
}
