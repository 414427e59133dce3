//! Console rendering of snippet reports.
//!
//! Two views, both line-anchored. The *inline view* reprints the snippet
//! colored by token category, restricted to the lines worth looking at:
//! annotation and error lines widened by the context radius, one-line
//! gaps filled, skipped stretches collapsed to a marker. The *trace view*
//! prints one row per token fragment with rails showing the open-scope
//! depth, and hangs each annotation under its anchor token.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::engine::SnippetReport;
use crate::token::TokenKind;

/// Presentation knobs, fed from the CLI.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Context lines shown around a marked line.
    pub context_lines: usize,
    /// 0 = only findings, 1 = node paths and full sources, 2 = trace.
    pub verbosity: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            context_lines: 3,
            verbosity: 0,
        }
    }
}

/// Which document lines are worth displaying for this report.
pub fn relevant_lines(report: &SnippetReport, radius: usize) -> BTreeSet<usize> {
    let mut marked = BTreeSet::new();
    if let Some(e) = &report.parse_error {
        marked.insert(e.line);
    }
    if let Some(e) = &report.lex_error {
        marked.insert(e.line);
    }
    for annot in &report.annotations {
        for idx in std::iter::once(annot.token).chain(annot.related.iter().copied()) {
            if let Some(tok) = report.tokens.get(idx) {
                for frag in &tok.fragments {
                    marked.insert(frag.line);
                }
            }
        }
    }
    let mut relevant = BTreeSet::new();
    for line in marked {
        for l in line.saturating_sub(radius)..=line + radius {
            relevant.insert(l);
        }
    }
    // A one-line gap reads worse than the line itself.
    let snapshot: Vec<usize> = relevant.iter().copied().collect();
    for line in snapshot {
        if relevant.contains(&(line + 2)) {
            relevant.insert(line + 1);
        }
    }
    relevant
}

/// The inline view: the snippet's own lines, colored by token kind.
pub fn print_inline(out: &mut dyn WriteColor, report: &SnippetReport, opts: &RenderOptions) {
    let annotated: BTreeSet<usize> = report.annotations.iter().map(|a| a.token).collect();
    let relevant = display_set(report, opts);

    // Group fragments by physical line.
    let mut lines: BTreeMap<usize, Vec<(TokenKind, &str, bool)>> = BTreeMap::new();
    'tokens: for (i, tok) in report.tokens.iter().enumerate() {
        for frag in &tok.fragments {
            lines
                .entry(frag.line)
                .or_default()
                .push((tok.kind, frag.text.as_str(), annotated.contains(&i)));
            if tok.kind == TokenKind::NotConsumed {
                // Only the first unlexed line is worth showing.
                break 'tokens;
            }
        }
    }

    let mut last_printed: Option<usize> = None;
    for (line, parts) in &lines {
        if !relevant.contains(line) {
            continue;
        }
        if let Some(prev) = last_printed {
            if line.saturating_sub(prev) > 1 {
                let _ = writeln!(out, "{:>11} ({} lines)", "···", line - prev - 1);
            }
        }
        last_printed = Some(*line);

        let color = line_color(report, *line, parts);
        set_fg(out, color);
        let _ = write!(out, "{:<5}", line);
        let _ = out.reset();
        for (kind, text, _) in parts {
            set_fg(out, kind_color(*kind));
            let _ = write!(out, "{}", text.trim_end_matches(['\n', '\r']));
            let _ = out.reset();
        }
        let _ = writeln!(out);
    }
}

/// The trace view: one row per token fragment, with scope rails and the
/// annotations hung under their anchor tokens.
pub fn print_trace(out: &mut dyn WriteColor, report: &SnippetReport, opts: &RenderOptions) {
    let relevant = display_set(report, opts);
    let mut open_depth = 0usize;

    'tokens: for (i, tok) in report.tokens.iter().enumerate() {
        if tok.is_scope_open() {
            open_depth += 1;
        }
        let depth = open_depth;
        if tok.is_scope_close() {
            open_depth = open_depth.saturating_sub(1);
        }

        for frag in &tok.fragments {
            if opts.verbosity < 2 && !relevant.contains(&frag.line) {
                continue;
            }
            let _ = write!(out, "{:>4}:{:<4}", frag.line, frag.col);
            set_fg(out, kind_color(tok.kind));
            for _ in 1..depth {
                let _ = write!(out, "┃ ");
            }
            let glyph = if tok.is_scope_close() {
                "┗━"
            } else if tok.is_scope_open() {
                "┏━"
            } else {
                "┣━"
            };
            let _ = write!(out, "{glyph} {}: ", tok.kind);
            let _ = write!(out, "{}", frag.text.replace('\n', "↵"));
            let _ = out.reset();
            let _ = writeln!(out);
        }
        for annot in report.annotations.iter().filter(|a| a.token == i) {
            set_fg(out, Some(Color::Magenta));
            let _ = writeln!(out, "{:>9}⚞ {} ⚟", "", annot.message);
            let _ = out.reset();
        }
        if tok.kind == TokenKind::NotConsumed {
            break 'tokens;
        }
    }

    if opts.verbosity > 0 {
        let _ = writeln!(out, "• {}", report.node_path);
    }
    if let Some(e) = &report.parse_error {
        set_fg(out, Some(Color::Red));
        let _ = writeln!(
            out,
            "• {} ┃ {} ┃ template parser ┃ {}",
            report.node_path, e.line, e.message
        );
        let _ = out.reset();
    }
    if let Some(e) = &report.lex_error {
        set_fg(out, Some(Color::Red));
        let _ = writeln!(
            out,
            "• {} ┃ {} ┃ template lexer ┃ {}",
            report.node_path, e.line, e.message
        );
        let _ = out.reset();
    }
}

fn display_set(report: &SnippetReport, opts: &RenderOptions) -> BTreeSet<usize> {
    let mut relevant = relevant_lines(report, opts.context_lines.max(1));
    if opts.verbosity > 0 {
        let last = report
            .tokens
            .iter()
            .flat_map(|t| t.fragments.iter())
            .map(|f| f.line)
            .max()
            .unwrap_or(0);
        let first = report
            .tokens
            .first()
            .map(|t| t.first().line)
            .unwrap_or(0);
        relevant.extend(first..=last);
    }
    relevant
}

fn line_color(
    report: &SnippetReport,
    line: usize,
    parts: &[(TokenKind, &str, bool)],
) -> Option<Color> {
    if report.parse_error.as_ref().is_some_and(|e| e.line == line) {
        return Some(Color::Red);
    }
    if report.lex_error.as_ref().is_some_and(|e| e.line == line) {
        return Some(Color::Red);
    }
    if parts.iter().any(|(_, _, annotated)| *annotated) {
        return Some(Color::Magenta);
    }
    None
}

fn kind_color(kind: TokenKind) -> Option<Color> {
    match kind {
        TokenKind::Data | TokenKind::Whitespace => None,
        TokenKind::VariableBegin | TokenKind::VariableEnd => Some(Color::Magenta),
        TokenKind::BlockBegin | TokenKind::BlockEnd => Some(Color::Yellow),
        TokenKind::CommentBegin | TokenKind::Comment | TokenKind::CommentEnd => {
            Some(Color::Cyan)
        }
        TokenKind::Operator => Some(Color::Cyan),
        TokenKind::Name => Some(Color::Green),
        TokenKind::Str => Some(Color::Red),
        TokenKind::Integer | TokenKind::Float => Some(Color::Green),
        TokenKind::NotConsumed => Some(Color::Red),
    }
}

fn set_fg(out: &mut dyn WriteColor, color: Option<Color>) {
    let mut spec = ColorSpec::new();
    spec.set_fg(color);
    let _ = out.set_color(&spec);
}

#[cfg(test)]
mod tests {
    use termcolor::NoColor;

    use super::*;
    use crate::engine::{check_snippet, SnippetOrigin};
    use crate::registry::Registries;

    fn report_for(source: &str) -> SnippetReport {
        check_snippet(
            source,
            &SnippetOrigin {
                start_line: 0,
                start_col: 0,
                node_path: "test.yml:node".to_string(),
                standalone: true,
            },
            Registries::builtin(),
        )
    }

    fn rendered(f: impl Fn(&mut dyn WriteColor)) -> String {
        let mut out = NoColor::new(Vec::new());
        f(&mut out);
        String::from_utf8(out.into_inner()).expect("utf8")
    }

    #[test]
    fn relevant_lines_widen_and_fill_gaps() {
        let report = report_for("{{ x | bogusfilter }}");
        let lines = relevant_lines(&report, 2);
        // The annotation is on line 1; the radius reaches down to line 3.
        assert!(lines.contains(&1));
        assert!(lines.contains(&3));
    }

    #[test]
    fn inline_view_prints_line_numbers_and_skip_markers() {
        let many = format!(
            "{{{{ y | bogusone }}}}\n{}{{{{ x | bogustwo }}}}\n",
            "plain\n".repeat(20)
        );
        let report = report_for(&many);
        let text = rendered(|out| {
            print_inline(out, &report, &RenderOptions::default());
        });
        // Two marked clusters, lines 1 and 22, with the stretch between
        // them collapsed.
        assert!(text.contains("bogusone"));
        assert!(text.contains("bogustwo"));
        assert!(text.contains("(14 lines)"));
        assert!(!text.contains("\n10   "));
    }

    #[test]
    fn trace_view_shows_kinds_and_annotations() {
        let report = report_for("{{ x | bogusfilter }}");
        let text = rendered(|out| {
            print_trace(
                out,
                &report,
                &RenderOptions {
                    context_lines: 3,
                    verbosity: 2,
                },
            );
        });
        assert!(text.contains("variable_begin"));
        assert!(text.contains("Not a builtin filter?"));
    }

    #[test]
    fn trace_view_reports_parser_errors_in_the_footer() {
        let report = report_for("{{ }}");
        let text = rendered(|out| {
            print_trace(out, &report, &RenderOptions::default());
        });
        assert!(text.contains("template parser"));
        assert!(text.contains("test.yml:node"));
    }
}
