//! Scope tracker and heuristic annotator.
//!
//! A single left-to-right pass over one snippet's token sequence with two
//! explicit stacks: the structural stack pairs every generic open marker
//! or opening bracket with its closer, and the keyword stack pairs
//! block-introducing keywords (`if`, `for`, …) with their `end*`
//! counterparts so that the wrong kind of closer is reported distinctly
//! from a plain delimiter mismatch. Around the stacks, a handful of
//! look-ahead heuristics catch the mistakes the parser's error messages
//! are worst at: misspelled filter and test names, `&&`/`||` carried over
//! from shell syntax, a forgotten closer in front of a nested tag, and a
//! misspelled well-known platform name.
//!
//! Annotations never abort the pass. They are appended in scan order,
//! except the end-of-sequence unclosed-block summaries, which always come
//! first.

use crate::registry::Registries;
use crate::suggest::suggest;
use crate::token::{Token, TokenKind};

/// A positioned diagnostic produced by the tracker. `token` and `related`
/// index into the snippet's token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub token: usize,
    pub message: String,
    pub related: Vec<usize>,
}

/// Keywords that open an implicit block, paired with `end<keyword>`.
const BLOCK_KEYWORDS: &[&str] = &[
    "if", "for", "macro", "block", "filter", "call", "with", "autoescape", "raw",
];

/// Keywords that transition a block without nesting, and what they may
/// transition.
fn transition_targets(keyword: &str) -> Option<&'static [&'static str]> {
    match keyword {
        "elif" => Some(&["if"]),
        "else" => Some(&["if", "for"]),
        _ => None,
    }
}

/// Valid opener/closer pairs, compared after stripping whitespace-control
/// affixes. Mirrors the delimiter table of the embedded language.
fn pair_matches(opener: &str, closer: &str) -> bool {
    let left = opener.trim().trim_end_matches(&['-', '+'][..]);
    let right = closer.trim().trim_start_matches(&['-', '+'][..]);
    matches!(
        (left, right),
        ("(", ")") | ("[", "]") | ("{", "}") | ("{{", "}}") | ("{%", "%}") | ("{#", "#}")
    )
}

#[derive(Debug)]
struct KeywordMarker {
    keyword: String,
    token: usize,
}

/// Run the tracker over one snippet's tokens.
pub fn analyze(tokens: &[Token], reg: &Registries) -> Vec<Annotation> {
    let mut delims: Vec<usize> = Vec::new();
    let mut keywords: Vec<KeywordMarker> = Vec::new();
    let mut out: Vec<Annotation> = Vec::new();

    for i in 0..tokens.len() {
        let tok = &tokens[i];
        let text = tok.text();
        // The structural entry this token closed, if it closed one.
        let mut closed: Option<usize> = None;

        if tok.is_scope_open() {
            delims.push(i);
            if tok.kind == TokenKind::BlockBegin {
                track_keyword(tokens, i, &mut keywords, &mut out);
            }
        } else if tok.is_scope_close() {
            match delims.pop() {
                Some(open) => {
                    closed = Some(open);
                    if !pair_matches(&tokens[open].text(), &text) {
                        out.push(Annotation {
                            token: open,
                            message: "Unclosed block?".to_string(),
                            related: vec![i],
                        });
                    }
                }
                None => out.push(Annotation {
                    token: i,
                    message: "Closing marker without an open block?".to_string(),
                    related: vec![],
                }),
            }
        }

        if tok.kind == TokenKind::Operator && text == "|" {
            check_filter_name(tokens, i, reg, &mut out);
        }
        if tok.kind == TokenKind::Name && text == "is" {
            check_test_name(tokens, i, reg, &mut out);
        }
        if tok.kind == TokenKind::Name && text == "ansible_distribution" {
            check_platform_name(tokens, i, reg, &mut out);
        }
        if tok.kind == TokenKind::NotConsumed && text.starts_with("&&") {
            out.push(Annotation {
                token: i,
                message: "'&&' is not an operator here; use 'and'.".to_string(),
                related: vec![],
            });
        }

        // Heuristics that need one token of look-ahead.
        if i + 1 == tokens.len() {
            continue;
        }
        if tok.kind == TokenKind::Operator
            && tokens[i + 1].kind == TokenKind::Operator
            && !delims.contains(&i)
        {
            if text == "{" && !delims.is_empty() {
                let enclosing = delims[delims.len() - 1];
                out.push(Annotation {
                    token: enclosing,
                    message: "Did you forget to close this? Nested tags found.".to_string(),
                    related: vec![i],
                });
            }
        } else if tok.kind == TokenKind::Operator && text == "}" {
            let cand = delims
                .iter()
                .rev()
                .copied()
                .find(|d| tokens[*d].text().starts_with('{'));
            let already_paired =
                closed.is_some_and(|open| pair_matches(&tokens[open].text(), &text));
            if let Some(cand) = cand {
                if !already_paired {
                    out.push(Annotation {
                        token: i,
                        message: format!(
                            "Found single \"}}\" operator at {}, did you mean to close '{}' at {}?",
                            tok.location(),
                            tokens[cand].text(),
                            tokens[cand].location()
                        ),
                        related: vec![cand],
                    });
                }
            }
        }
    }

    // Anything still open is an unclosed block, reported ahead of all
    // other findings, innermost first.
    let mut head: Vec<Annotation> = Vec::new();
    for marker in keywords.iter().rev() {
        head.push(Annotation {
            token: marker.token,
            message: format!(
                "'{}' block is never closed (missing 'end{}'?)",
                marker.keyword, marker.keyword
            ),
            related: vec![],
        });
    }
    for open in delims.iter().rev() {
        head.push(Annotation {
            token: *open,
            message: "This may be an unclosed block?".to_string(),
            related: vec![],
        });
    }
    head.extend(out);
    head
}

/// Keyword handling for a generic block-begin marker: look ahead to the
/// tag name and maintain the keyword stack.
fn track_keyword(
    tokens: &[Token],
    begin: usize,
    keywords: &mut Vec<KeywordMarker>,
    out: &mut Vec<Annotation>,
) {
    let Some(name_idx) = next_significant(tokens, begin + 1) else {
        return;
    };
    let tok = &tokens[name_idx];
    if tok.kind != TokenKind::Name {
        return;
    }
    let name = tok.text();

    if BLOCK_KEYWORDS.contains(&name.as_str()) {
        keywords.push(KeywordMarker {
            keyword: name,
            token: name_idx,
        });
        return;
    }

    if let Some(targets) = transition_targets(&name) {
        match keywords.pop() {
            None => out.push(Annotation {
                token: name_idx,
                message: format!("'{name}' without an open block to continue?"),
                related: vec![],
            }),
            Some(marker) => {
                if !targets.contains(&marker.keyword.as_str()) {
                    out.push(Annotation {
                        token: name_idx,
                        message: format!(
                            "'{}' cannot continue a '{}' block (opened at {})",
                            name,
                            marker.keyword,
                            tokens[marker.token].location()
                        ),
                        related: vec![marker.token],
                    });
                }
                // The branch keyword carries the block forward either way.
                keywords.push(KeywordMarker {
                    keyword: marker.keyword,
                    token: name_idx,
                });
            }
        }
        return;
    }

    if let Some(base) = name.strip_prefix("end") {
        if !BLOCK_KEYWORDS.contains(&base) {
            return;
        }
        match keywords.pop() {
            None => out.push(Annotation {
                token: name_idx,
                message: format!("'{name}' without an open '{base}' block?"),
                related: vec![],
            }),
            Some(marker) => {
                if marker.keyword != base {
                    out.push(Annotation {
                        token: name_idx,
                        message: format!(
                            "'{}' cannot close a '{}' block (opened at {})",
                            name,
                            marker.keyword,
                            tokens[marker.token].location()
                        ),
                        related: vec![marker.token],
                    });
                }
            }
        }
    }
}

/// The token after a pipe must be a filter name the registry knows;
/// dotted chains are reassembled before the lookup. A second pipe means
/// the author wanted a logical or.
fn check_filter_name(tokens: &[Token], pipe: usize, reg: &Registries, out: &mut Vec<Annotation>) {
    let Some(next) = next_significant(tokens, pipe + 1) else {
        return;
    };
    let tok = &tokens[next];
    match tok.kind {
        TokenKind::Operator if tok.text() == "|" => {
            out.push(Annotation {
                token: next,
                message: "Two '|' in a row? For a logical or, use 'or'.".to_string(),
                related: vec![pipe],
            });
        }
        TokenKind::Name => {
            let (path, last_idx) = dotted_path(tokens, next);
            if reg.filters.contains(&path) {
                return;
            }
            let maybe = suggest(&path, reg.filters.iter().map(String::as_str), 2, 0.1);
            let message = if maybe.is_empty() {
                "Not a builtin filter?".to_string()
            } else {
                format!("Not a builtin filter? Maybe: {}", maybe.join(", "))
            };
            out.push(Annotation {
                token: next,
                message,
                related: if last_idx == next { vec![] } else { vec![last_idx] },
            });
        }
        _ => {}
    }
}

/// `is` must be followed by a known test name, allowing one leading
/// `not`.
fn check_test_name(tokens: &[Token], is_idx: usize, reg: &Registries, out: &mut Vec<Annotation>) {
    let Some(mut next) = next_significant(tokens, is_idx + 1) else {
        return;
    };
    if tokens[next].kind == TokenKind::Name && tokens[next].text() == "not" {
        match next_significant(tokens, next + 1) {
            Some(after) => next = after,
            None => return,
        }
    }
    let tok = &tokens[next];
    if tok.kind != TokenKind::Name {
        return;
    }
    let name = tok.text();
    if reg.tests.contains(&name) {
        return;
    }
    let maybe = suggest(&name, reg.tests.iter().map(String::as_str), 2, 0.1);
    let message = if maybe.is_empty() {
        "Not a known test?".to_string()
    } else {
        format!("Not a known test? Maybe: {}", maybe.join(", "))
    };
    out.push(Annotation {
        token: next,
        message,
        related: vec![is_idx],
    });
}

/// A comparison against the well-known distribution fact should use one
/// of the known platform spellings.
fn check_platform_name(
    tokens: &[Token],
    ident: usize,
    reg: &Registries,
    out: &mut Vec<Annotation>,
) {
    let mut j = ident + 1;
    while j < tokens.len() {
        match tokens[j].kind {
            TokenKind::Whitespace | TokenKind::Operator => j += 1,
            TokenKind::Str => break,
            _ => return,
        }
    }
    if j >= tokens.len() {
        return;
    }
    let literal = tokens[j].text();
    let value = literal.trim_matches(&['\'', '"'][..]).to_string();
    if reg.platforms.contains(&value) {
        return;
    }
    let maybe = suggest(&value, reg.platforms.iter().map(String::as_str), 2, 0.4);
    let message = if maybe.is_empty() {
        format!("'{value}' is not a known distribution name?")
    } else {
        format!(
            "'{}' is not a known distribution name? Maybe: {}",
            value,
            maybe.join(", ")
        )
    };
    out.push(Annotation {
        token: j,
        message,
        related: vec![ident],
    });
}

/// Reassemble `name (. name)*` starting at a name token. Returns the
/// dotted path and the index of its last name token.
fn dotted_path(tokens: &[Token], first: usize) -> (String, usize) {
    let mut path = tokens[first].text();
    let mut last = first;
    let mut i = first;
    loop {
        let Some(dot) = next_significant(tokens, i + 1) else {
            break;
        };
        if !(tokens[dot].kind == TokenKind::Operator && tokens[dot].text() == ".") {
            break;
        }
        let Some(part) = next_significant(tokens, dot + 1) else {
            break;
        };
        if tokens[part].kind != TokenKind::Name {
            break;
        }
        path.push('.');
        path.push_str(&tokens[part].text());
        last = part;
        i = part;
    }
    (path, last)
}

/// Index of the first non-whitespace token at or after `from`.
fn next_significant(tokens: &[Token], from: usize) -> Option<usize> {
    tokens[from..]
        .iter()
        .position(|t| t.kind != TokenKind::Whitespace)
        .map(|off| from + off)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lex;
    use crate::token::PosTranslator;

    /// Lex a snippet and anchor it at the top of a synthetic document.
    fn tokens_of(source: &str) -> Vec<Token> {
        let mut xlat = PosTranslator::new(0, 0, source.contains('\n'));
        let (raw, _) = lex(source);
        raw.into_iter()
            .map(|t| Token {
                kind: t.kind,
                fragments: xlat.fragments(&t.text),
            })
            .collect()
    }

    fn builtin() -> &'static Registries {
        Registries::builtin()
    }

    #[test]
    fn balanced_known_snippets_produce_no_annotations() {
        let toks = tokens_of("{{ (a | upper) + items[0] }}");
        assert_eq!(analyze(&toks, builtin()), vec![]);
    }

    #[test]
    fn a_single_unmatched_opener_is_reported_first() {
        let toks = tokens_of("{{ a + (b ");
        let annots = analyze(&toks, builtin());
        assert!(!annots.is_empty());
        let first = &annots[0];
        assert_eq!(first.message, "This may be an unclosed block?");
        assert_eq!(toks[first.token].text(), "(");
    }

    #[test]
    fn keyword_mismatch_is_anchored_at_the_bad_closer() {
        let toks = tokens_of("{% if x %}{% endfor %}");
        let annots = analyze(&toks, builtin());
        assert_eq!(annots.len(), 1);
        let a = &annots[0];
        assert_eq!(toks[a.token].text(), "endfor");
        assert!(a.message.contains("cannot close a 'if' block"));
        assert_eq!(toks[a.related[0]].text(), "if");
    }

    #[test]
    fn else_continues_both_conditionals_and_loops() {
        let toks = tokens_of("{% for x in xs %}{% else %}{% endfor %}");
        assert_eq!(analyze(&toks, builtin()), vec![]);
        let toks = tokens_of("{% with a = 1 %}{% else %}{% endwith %}");
        let annots = analyze(&toks, builtin());
        assert!(annots
            .iter()
            .any(|a| a.message.contains("cannot continue a 'with' block")));
    }

    #[test]
    fn double_pipe_suggests_the_or_keyword() {
        let toks = tokens_of("{{ a || b }}");
        let annots = analyze(&toks, builtin());
        assert!(annots.iter().any(|a| a.message.contains("use 'or'")));
    }

    #[test]
    fn dotted_filter_paths_are_reassembled_before_lookup() {
        let reg = Registries::new(
            vec!["ns.helper".to_string()],
            Vec::new(),
            Vec::new(),
        );
        let toks = tokens_of("{{ a | ns.helper }}");
        assert_eq!(analyze(&toks, &reg), vec![]);
        let toks = tokens_of("{{ a | ns.helprr }}");
        let annots = analyze(&toks, &reg);
        assert_eq!(annots.len(), 1);
        assert!(annots[0].message.contains("ns.helper"));
    }

    #[test]
    fn known_filters_are_silent_unknown_ones_suggest() {
        let toks = tokens_of("{{ x | unique }}");
        assert_eq!(analyze(&toks, builtin()), vec![]);
        let toks = tokens_of("{{ x | uniqe }}");
        let annots = analyze(&toks, builtin());
        assert_eq!(annots.len(), 1);
        assert!(annots[0].message.contains("Not a builtin filter?"));
        assert!(annots[0].message.contains("unique"));
        assert_eq!(toks[annots[0].token].text(), "uniqe");
    }

    #[test]
    fn unknown_test_names_suggest_near_matches() {
        let toks = tokens_of("{% if x is defned %}y{% endif %}");
        let annots = analyze(&toks, builtin());
        assert_eq!(annots.len(), 1);
        assert!(annots[0].message.contains("defined"));
        assert_eq!(toks[annots[0].token].text(), "defned");
    }

    #[test]
    fn negated_tests_skip_the_not_keyword() {
        let toks = tokens_of("{% if x is not defined %}y{% endif %}");
        assert_eq!(analyze(&toks, builtin()), vec![]);
    }

    #[test]
    fn unconsumed_double_ampersand_suggests_and() {
        let mut toks = tokens_of("{{ a ");
        let mut xlat = PosTranslator::new(0, 0, false);
        let _ = xlat.fragments("{{ a ");
        toks.push(Token {
            kind: TokenKind::NotConsumed,
            fragments: xlat.fragments("&& b }}"),
        });
        let annots = analyze(&toks, builtin());
        assert!(annots.iter().any(|a| a.message.contains("use 'and'")));
    }

    #[test]
    fn platform_typos_are_fuzzed_against_known_names() {
        let toks = tokens_of("{% if ansible_distribution == 'Ubnutu' %}x{% endif %}");
        let annots = analyze(&toks, builtin());
        assert_eq!(annots.len(), 1);
        assert!(annots[0].message.contains("Ubuntu"));
        assert_eq!(toks[annots[0].token].kind, TokenKind::Str);
        assert_eq!(toks[annots[0].related[0]].text(), "ansible_distribution");
    }

    #[test]
    fn exact_platform_names_are_silent() {
        let toks = tokens_of("{% if ansible_distribution == 'Debian' %}x{% endif %}");
        assert_eq!(analyze(&toks, builtin()), vec![]);
    }

    #[test]
    fn lone_closing_brace_points_at_the_open_candidate() {
        let toks = tokens_of("{{ x[1 } }}");
        let annots = analyze(&toks, builtin());
        let hint = annots
            .iter()
            .find(|a| a.message.contains("did you mean to close"))
            .expect("lone-brace hint");
        assert!(hint.message.contains("'{{'"));
        assert_eq!(toks[hint.token].text(), "}");
    }

    #[test]
    fn stray_closer_with_empty_stack_annotates_the_closer() {
        let toks = tokens_of("{{ a ) }}");
        let annots = analyze(&toks, builtin());
        assert!(annots
            .iter()
            .any(|a| a.message.contains("without an open block")));
    }
}
