//! End-to-end checks of the snippet pipeline: lexing, position
//! translation, scope tracking, and suggestion behavior, exercised the
//! way the document walker drives them.

use templint::engine::{check_snippet, SnippetOrigin, SnippetReport};
use templint::registry::Registries;
use templint::token::TokenKind;

fn check(source: &str) -> SnippetReport {
    check_with(source, Registries::builtin())
}

fn check_with(source: &str, reg: &Registries) -> SnippetReport {
    check_snippet(
        source,
        &SnippetOrigin {
            start_line: 0,
            start_col: 0,
            node_path: "doc.yml:node".to_string(),
            standalone: false,
        },
        reg,
    )
}

#[test]
fn balanced_snippets_with_known_names_are_clean() {
    let report = check("{{ (servers | map('upper') | list)[0] }}");
    assert!(report.annotations.is_empty());
    assert!(report.parse_error.is_none());
    assert!(report.lex_error.is_none());
}

#[test]
fn one_unmatched_opener_leads_with_the_unclosed_block() {
    let report = check("{{ a ");
    assert_eq!(report.annotations.len(), 1);
    let first = &report.annotations[0];
    assert_eq!(first.message, "This may be an unclosed block?");
    assert_eq!(report.tokens[first.token].text(), "{{");
    // The truncated print statement is also a hard syntax error.
    assert!(report.is_hard_error());
}

#[test]
fn unknown_filter_with_a_near_match_suggests_it() {
    // Registry of exactly one filter, and a cutoff the typo clears.
    let reg = Registries::new(vec!["uniquefilter".to_string()], Vec::new(), Vec::new());
    let report = check_with("{{ foo | unknownfilter }}", &reg);
    assert_eq!(report.annotations.len(), 1);
    let annot = &report.annotations[0];
    assert!(annot.message.contains("uniquefilter"));
    assert_eq!(report.tokens[annot.token].text(), "unknownfilter");
}

#[test]
fn registry_members_never_annotate() {
    let reg = Registries::new(vec!["uniquefilter".to_string()], Vec::new(), Vec::new());
    let report = check_with("{{ foo | uniquefilter }}", &reg);
    assert!(report.annotations.is_empty());
}

#[test]
fn endfor_cannot_close_an_if_scope() {
    let report = check("{% if x %}{% endfor %}");
    assert_eq!(report.annotations.len(), 1);
    let annot = &report.annotations[0];
    assert_eq!(report.tokens[annot.token].text(), "endfor");
    assert!(annot.message.contains("cannot close a 'if' block"));
    // The parser independently rejects the snippet; that is the hard
    // error, the annotation is the heuristic.
    assert!(report.parse_error.is_some());
}

#[test]
fn double_ampersand_remainder_suggests_and() {
    let report = check("{{ a && b }}");
    assert!(report
        .tokens
        .iter()
        .any(|t| t.kind == TokenKind::NotConsumed));
    assert!(report
        .annotations
        .iter()
        .any(|a| a.message.contains("use 'and'")));
}

#[test]
fn multiline_snippets_anchor_to_the_host_document() {
    // A block scalar whose indicator sits at 0-based line 7, column 8.
    let report = check_snippet(
        "first\n{{ item }}\n",
        &SnippetOrigin {
            start_line: 7,
            start_col: 8,
            node_path: "doc.yml:node".to_string(),
            standalone: false,
        },
        Registries::builtin(),
    );
    let var = report
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::VariableBegin)
        .expect("variable token");
    // Content starts below the indicator: snippet line 2 is document
    // line (7 + 1) + 2.
    assert_eq!(var.first().line, 10);
    assert_eq!(var.first().col, 9);
}

#[test]
fn annotations_and_errors_coexist_per_snippet() {
    let report = check("{{ a | uniqe }}{% endif %}");
    assert!(report.parse_error.is_some());
    assert!(report
        .annotations
        .iter()
        .any(|a| a.message.contains("Not a builtin filter?")));
}
