//! Document walker: drives the snippet engine field-by-field across a
//! host document's structural event stream.
//!
//! A per-scope state machine mirrors the document's nesting. Mapping
//! frames alternate strictly KEY → VALUE → KEY; sequence frames count
//! items. Entering a nested collection while a value is expected reverts
//! the parent to KEY, because the nested structure stands in for the
//! value. Specific field names get context-sensitive semantics (`when`
//! and friends are bare expressions, `name` labels the node path, `tags`
//! accumulate, `shell`/`command` also see the shell heuristic); everything
//! else is checked as an ordinary snippet.
//!
//! Mapping-close runs the sibling-conflict check, and anchor definitions,
//! alias references, and harvested free variables flow into the run
//! context for end-of-run reconciliation. Anchor and alias *names* are
//! recovered from the source text around the event span; the scanner's
//! events only carry numeric ids.

use std::collections::BTreeSet;

use saphyr_parser::{Event, Parser, Span as ScanSpan};

use crate::diagnostics::{to_error_source, ErrorContext, LintError, SourceArc, Span};
use crate::engine::{self, SnippetOrigin, SnippetReport};
use crate::registry::Registries;
use crate::shell;
use crate::xref::{RunContext, Site};

/// Keys that routinely coexist with an action key on a task-like node.
/// Anything outside this list counts toward the sibling-conflict check.
const TASK_CONTROL_KEYS: &[&str] = &[
    "name", "when", "tags", "register", "loop", "loop_control", "with_items", "with_dict",
    "with_fileglob", "with_together", "with_sequence", "with_subelements", "with_nested",
    "with_first_found", "with_lines", "with_indexed_items", "with_flattened", "become",
    "become_user", "become_method", "become_flags", "delegate_to", "delegate_facts",
    "ignore_errors", "ignore_unreachable", "failed_when", "changed_when", "until", "retries",
    "delay", "notify", "vars", "args", "environment", "no_log", "run_once", "check_mode",
    "diff", "listen", "connection", "remote_user", "any_errors_fatal", "throttle", "timeout",
    "module_defaults", "collections",
];

/// Sections whose mappings are data, not tasks; the conflict check skips
/// anything below them.
const NON_TASK_SECTIONS: &[&str] = &["vars", "defaults", "handlers"];

/// Fields holding a bare conditional expression, checked after wrapping
/// in the expression delimiters.
const CONDITIONAL_FIELDS: &[&str] = &["when", "failed_when", "changed_when", "until"];

/// Fields holding a shell-like payload.
const SHELL_FIELDS: &[&str] = &["shell", "command"];

/// Everything one document walk produced.
#[derive(Debug, Default)]
pub struct FileOutcome {
    pub reports: Vec<SnippetReport>,
    pub diagnostics: Vec<LintError>,
}

impl FileOutcome {
    pub fn is_hard_error(&self) -> bool {
        self.reports.iter().any(|r| r.is_hard_error())
            || self.diagnostics.iter().any(|d| d.is_hard())
    }

    pub fn has_findings(&self) -> bool {
        self.reports.iter().any(|r| r.has_findings())
            || self.diagnostics.iter().any(|d| !d.is_hard())
    }
}

/// Per-scope frame, one variant per frame kind.
#[derive(Debug)]
enum Frame {
    /// Expecting a mapping key.
    Key { siblings: BTreeSet<String> },
    /// Expecting the value for `pending_key`.
    Value {
        pending_key: Option<String>,
        siblings: BTreeSet<String>,
    },
    /// Inside a sequence; `index` counts started items.
    Sequence { index: usize },
}

/// One entry of the position stack, parallel to the open scopes.
#[derive(Debug)]
struct Scope {
    frame: Frame,
    /// Key under which this collection was entered, if any.
    key: Option<String>,
    /// Node-identifying label, set lazily from a `name` field.
    label: Option<String>,
    start_byte: usize,
}

/// Field-by-field driver over host documents.
pub struct Walker<'a> {
    reg: &'a Registries,
}

impl<'a> Walker<'a> {
    pub fn new(reg: &'a Registries) -> Self {
        Walker { reg }
    }

    /// Walk one host-format document.
    pub fn walk_yaml(&self, source: &str, doc_id: &str, ctx: &mut RunContext) -> FileOutcome {
        let mut walk = FileWalk::new(self.reg, source, doc_id);
        walk.run(ctx);
        walk.outcome
    }

    /// Walk a raw template file as a synthetic document whose sole scalar
    /// value is the entire file content.
    pub fn walk_raw(&self, source: &str, doc_id: &str, ctx: &mut RunContext) -> FileOutcome {
        let origin = SnippetOrigin {
            start_line: 0,
            start_col: 0,
            node_path: format!("{doc_id}:"),
            standalone: true,
        };
        let report = engine::check_snippet(source, &origin, self.reg);
        let mut outcome = FileOutcome::default();
        if let Some(symbols) = &report.symbols {
            if !symbols.free.is_empty() {
                ctx.add_free_vars(doc_id, symbols.free.iter().cloned());
            }
        }
        outcome.reports.push(report);
        outcome
    }
}

/// What a scalar event stands for in the current frame.
enum ScalarRole {
    Key,
    Value(Option<String>),
    Item(Option<String>),
}

struct FileWalk<'a> {
    reg: &'a Registries,
    source: &'a str,
    doc_id: &'a str,
    named_source: SourceArc,
    char_to_byte: Vec<usize>,
    scopes: Vec<Scope>,
    outcome: FileOutcome,
}

impl<'a> FileWalk<'a> {
    fn new(reg: &'a Registries, source: &'a str, doc_id: &'a str) -> Self {
        let mut char_to_byte: Vec<usize> = source.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(source.len());
        FileWalk {
            reg,
            source,
            doc_id,
            named_source: to_error_source(doc_id, source),
            char_to_byte,
            scopes: vec![Scope {
                frame: Frame::Value {
                    pending_key: None,
                    siblings: BTreeSet::new(),
                },
                key: None,
                label: None,
                start_byte: 0,
            }],
            outcome: FileOutcome::default(),
        }
    }

    fn run(&mut self, ctx: &mut RunContext) {
        let parser = Parser::new_from_str(self.source);
        let mut completed = false;
        for item in parser {
            let (event, span) = match item {
                Ok(pair) => pair,
                Err(e) => {
                    self.scan_error(e.to_string(), ctx);
                    return;
                }
            };
            match event {
                Event::StreamStart { .. } => {}
                Event::DocumentStart { .. } | Event::DocumentEnd { .. } => {}
                Event::Alias(..) => self.on_alias(&span, ctx),
                Event::Scalar(value, _, anchor_id, ..) => {
                    let anchored = anchor_id > 0;
                    self.on_scalar(&value, anchored, &span, ctx);
                }
                Event::SequenceStart(anchor_id, ..) => {
                    self.on_collection_start(false, anchor_id > 0, &span, ctx);
                }
                Event::MappingStart(anchor_id, ..) => {
                    self.on_collection_start(true, anchor_id > 0, &span, ctx);
                }
                Event::SequenceEnd => self.on_sequence_end(),
                Event::MappingEnd => self.on_mapping_end(&span),
                Event::StreamEnd => {
                    completed = true;
                    break;
                }
                other => {
                    // Defensive catch-all: surfaced verbatim for
                    // follow-up rather than silently ignored.
                    self.outcome.diagnostics.push(LintError::Internal {
                        message: format!("unhandled scanner event: {other:?}"),
                        ctx: ErrorContext::none(),
                    });
                }
            }
        }
        if !completed {
            self.outcome.diagnostics.push(LintError::Internal {
                message: "scanner exited before the end of the document stream".to_string(),
                ctx: ErrorContext::none(),
            });
        }
    }

    // === Event handlers ===

    fn on_scalar(&mut self, value: &str, anchored: bool, span: &ScanSpan, ctx: &mut RunContext) {
        if anchored {
            if let Some(name) = self.anchor_name_before(span) {
                ctx.define_anchor(name, self.site_at(span));
            }
        }
        let top = self.scopes.len() - 1;
        let role = {
            let scope = &mut self.scopes[top];
            match &mut scope.frame {
                Frame::Key { siblings } => {
                    let mut siblings = std::mem::take(siblings);
                    siblings.insert(value.to_string());
                    scope.frame = Frame::Value {
                        pending_key: Some(value.to_string()),
                        siblings,
                    };
                    ScalarRole::Key
                }
                Frame::Value {
                    pending_key,
                    siblings,
                } => {
                    let key = pending_key.take();
                    let siblings = std::mem::take(siblings);
                    scope.frame = Frame::Key { siblings };
                    ScalarRole::Value(key)
                }
                Frame::Sequence { index } => {
                    *index += 1;
                    ScalarRole::Item(scope.key.clone())
                }
            }
        };
        match role {
            ScalarRole::Key => {
                self.check_value(value, span, ctx);
            }
            ScalarRole::Value(key) => match key.as_deref() {
                Some("name") => {
                    self.check_value(value, span, ctx);
                    self.scopes[top].label = Some(value.to_string());
                }
                Some(k) if CONDITIONAL_FIELDS.contains(&k) => {
                    // A bare expression; wrap it in the expression
                    // delimiters before checking. The two-column skew on
                    // the first line is accepted.
                    let wrapped = format!("{{{{{value}}}}}");
                    self.check_value(&wrapped, span, ctx);
                }
                Some("tags") => {
                    self.check_value(value, span, ctx);
                    ctx.add_tags(
                        self.doc_id,
                        value.split(',').map(str::trim).filter(|t| !t.is_empty()),
                    );
                }
                Some(k) if SHELL_FIELDS.contains(&k) => {
                    self.check_value(value, span, ctx);
                    for issue in shell::check(value) {
                        let byte_span = self.byte_span(span);
                        self.outcome.diagnostics.push(LintError::Heuristic {
                            message: format!("shell value: {}", issue.message),
                            ctx: ErrorContext::with_source_and_span(
                                self.named_source.clone(),
                                byte_span,
                            ),
                        });
                    }
                }
                _ => self.check_value(value, span, ctx),
            },
            ScalarRole::Item(seq_key) => {
                self.check_value(value, span, ctx);
                if seq_key.as_deref() == Some("tags") {
                    let tag = value.trim();
                    if !tag.is_empty() {
                        ctx.add_tags(self.doc_id, [tag]);
                    }
                }
            }
        }
    }

    fn on_alias(&mut self, span: &ScanSpan, ctx: &mut RunContext) {
        let name = self.alias_name_at(span);
        ctx.reference_alias(name, self.site_at(span));
        // An alias stands where a scalar would.
        let top = self.scopes.len() - 1;
        let scope = &mut self.scopes[top];
        match &mut scope.frame {
            Frame::Key { siblings } => {
                let siblings = std::mem::take(siblings);
                scope.frame = Frame::Value {
                    pending_key: None,
                    siblings,
                };
            }
            Frame::Value { siblings, .. } => {
                let siblings = std::mem::take(siblings);
                scope.frame = Frame::Key { siblings };
            }
            Frame::Sequence { index } => *index += 1,
        }
    }

    fn on_collection_start(
        &mut self,
        is_mapping: bool,
        anchored: bool,
        span: &ScanSpan,
        ctx: &mut RunContext,
    ) {
        if anchored {
            if let Some(name) = self.anchor_name_before(span) {
                ctx.define_anchor(name, self.site_at(span));
            }
        }
        let top = self.scopes.len() - 1;
        let scope = &mut self.scopes[top];
        let taken = std::mem::replace(
            &mut scope.frame,
            Frame::Key {
                siblings: BTreeSet::new(),
            },
        );
        let entered_key = match taken {
            // The nested collection stands in for the value: the parent
            // goes back to expecting a key.
            Frame::Value {
                pending_key,
                siblings,
            } => {
                scope.frame = Frame::Key { siblings };
                pending_key
            }
            Frame::Key { siblings } => {
                // A collection used as a mapping key; nothing sensible to
                // carry as context.
                scope.frame = Frame::Key { siblings };
                None
            }
            Frame::Sequence { index } => {
                scope.frame = Frame::Sequence { index: index + 1 };
                None
            }
        };
        self.scopes.push(Scope {
            frame: if is_mapping {
                Frame::Key {
                    siblings: BTreeSet::new(),
                }
            } else {
                Frame::Sequence { index: 0 }
            },
            key: entered_key,
            label: None,
            start_byte: self.to_byte(span.start.index()),
        });
    }

    fn on_sequence_end(&mut self) {
        if self.scopes.len() > 1 {
            let scope = self.scopes.pop();
            debug_assert!(matches!(
                scope.map(|s| s.frame),
                Some(Frame::Sequence { .. })
            ));
        }
    }

    fn on_mapping_end(&mut self, span: &ScanSpan) {
        if self.scopes.len() <= 1 {
            return;
        }
        let popped = match self.scopes.pop() {
            Some(scope) => scope,
            None => return,
        };
        self.conflict_check(popped, span);
    }

    // === Sibling-conflict check ===

    fn conflict_check(&mut self, popped: Scope, end: &ScanSpan) {
        // Not task-like content: variable or trigger definitions.
        let in_non_task_section = popped
            .key
            .iter()
            .chain(self.scopes.iter().filter_map(|s| s.key.as_ref()))
            .any(|k| NON_TASK_SECTIONS.contains(&k.as_str()));
        if in_non_task_section {
            return;
        }
        // Only node-labeled mappings look like tasks at all.
        if popped.label.is_none() {
            return;
        }
        let siblings = match popped.frame {
            Frame::Key { siblings } | Frame::Value { siblings, .. } => siblings,
            Frame::Sequence { .. } => return,
        };
        // Leaf check: the nearest named ancestor must be absent, skipping
        // sequences and grouping constructs we may recurse through.
        for ancestor in self.scopes.iter().rev() {
            match &ancestor.frame {
                Frame::Sequence { .. } => continue,
                Frame::Key { siblings } | Frame::Value { siblings, .. } => {
                    if siblings.contains("block") {
                        continue;
                    }
                    if ancestor.label.is_some() {
                        return;
                    }
                }
            }
        }
        let conflicting: Vec<&str> = siblings
            .iter()
            .map(String::as_str)
            .filter(|k| !TASK_CONTROL_KEYS.contains(k))
            .collect();
        if conflicting.len() > 1 {
            let end_byte = self.to_byte(end.start.index()).max(popped.start_byte + 1);
            self.outcome.diagnostics.push(LintError::Conflict {
                keys: conflicting.join(", "),
                ctx: ErrorContext::with_source_and_span(
                    self.named_source.clone(),
                    Span::new(popped.start_byte, end_byte),
                )
                .help("these keys are mutually exclusive actions; a node runs only one"),
            });
        }
    }

    // === Snippet dispatch ===

    fn check_value(&mut self, value: &str, span: &ScanSpan, ctx: &mut RunContext) {
        let origin = SnippetOrigin {
            start_line: span.start.line().saturating_sub(1),
            start_col: span.start.col(),
            node_path: self.node_path(),
            standalone: false,
        };
        let report = engine::check_snippet(value, &origin, self.reg);
        if let Some(symbols) = &report.symbols {
            if !symbols.free.is_empty() {
                ctx.add_free_vars(self.doc_id, symbols.free.iter().cloned());
            }
        }
        self.outcome.reports.push(report);
    }

    fn scan_error(&mut self, message: String, ctx: &mut RunContext) {
        // The scanner resolves aliases eagerly and aborts on one that
        // names no anchor, which is exactly the case reconciliation
        // wants to report. Recover the reference tables from the text so
        // the end-of-run pass still sees them.
        if message.contains("anchor") {
            self.recover_refs_from_text(ctx);
        }
        let help = if message.contains("could not find expected ':'") {
            Some("the entry may lack indentation")
        } else if message.contains("did not find expected key") {
            Some("the line may need indentation, or a key may be missing")
        } else {
            None
        };
        let mut err_ctx = ErrorContext {
            source: Some(self.named_source.clone()),
            span: None,
            help: None,
            related: vec![],
        };
        if let Some(help) = help {
            err_ctx = err_ctx.help(help);
        }
        self.outcome.diagnostics.push(LintError::Scan {
            message,
            ctx: err_ctx,
        });
    }

    /// Best-effort textual scan for `&anchor` and `*alias` markers, used
    /// only when the scanner refused to finish the document. Sites
    /// already recorded from events keep their first-write priority.
    fn recover_refs_from_text(&self, ctx: &mut RunContext) {
        let chars: Vec<char> = self.source.chars().collect();
        let mut line = 1usize;
        let mut col = 1usize;
        let mut i = 0usize;
        while i < chars.len() {
            let ch = chars[i];
            if ch == '\n' {
                line += 1;
                col = 1;
                i += 1;
                continue;
            }
            if ch == '*' || ch == '&' {
                let at_boundary = i == 0
                    || matches!(
                        chars[i - 1],
                        ' ' | '\t' | '\n' | '\r' | '[' | '{' | ',' | '-' | ':'
                    );
                if at_boundary {
                    let mut j = i + 1;
                    let mut name = String::new();
                    while j < chars.len() && is_anchor_char(chars[j]) {
                        name.push(chars[j]);
                        j += 1;
                    }
                    if !name.is_empty() {
                        let site = Site {
                            doc: self.doc_id.to_string(),
                            line,
                            col,
                        };
                        if ch == '&' {
                            ctx.define_anchor(name, site);
                        } else {
                            ctx.reference_alias(name, site);
                        }
                        col += j - i;
                        i = j;
                        continue;
                    }
                }
            }
            col += 1;
            i += 1;
        }
    }

    // === Coordinates and names ===

    /// Dotted, human-readable label for the current position.
    fn node_path(&self) -> String {
        let mut out = format!("{}:", self.doc_id);
        let mut first = true;
        for scope in &self.scopes[1..] {
            match &scope.frame {
                Frame::Sequence { index } => {
                    if let Some(key) = &scope.key {
                        if !first {
                            out.push('.');
                        }
                        out.push_str(key);
                    }
                    out.push_str(&format!("[{}]", index.saturating_sub(1)));
                    first = false;
                }
                Frame::Key { .. } | Frame::Value { .. } => {
                    if let Some(text) = scope.label.as_ref().or(scope.key.as_ref()) {
                        if !first {
                            out.push('.');
                        }
                        out.push_str(text);
                        first = false;
                    }
                }
            }
        }
        out
    }

    fn site_at(&self, span: &ScanSpan) -> Site {
        Site {
            doc: self.doc_id.to_string(),
            line: span.start.line(),
            col: span.start.col() + 1,
        }
    }

    /// Convert a char index from a scanner marker to a byte index.
    fn to_byte(&self, char_idx: usize) -> usize {
        if char_idx >= self.char_to_byte.len() {
            self.source.len()
        } else {
            self.char_to_byte[char_idx]
        }
    }

    fn byte_span(&self, span: &ScanSpan) -> Span {
        let start = self.to_byte(span.start.index());
        let end = self.to_byte(span.end.index()).max(start + 1);
        Span::new(start, end)
    }

    /// The anchor name written shortly before the event: the scanner only
    /// hands out numeric ids.
    fn anchor_name_before(&self, span: &ScanSpan) -> Option<String> {
        let start = self.to_byte(span.start.index());
        let mut search_start = start.saturating_sub(200);
        while !self.source.is_char_boundary(search_start) {
            search_start -= 1;
        }
        let region = &self.source[search_start..start];
        let amp = region.rfind('&')?;
        let name: String = region[amp + 1..]
            .chars()
            .take_while(|c| is_anchor_char(*c))
            .collect();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    fn alias_name_at(&self, span: &ScanSpan) -> String {
        let start = self.to_byte(span.start.index());
        let end = self.to_byte(span.end.index()).max(start);
        let region = &self.source[start..end.min(self.source.len())];
        match region.find('*') {
            Some(star) => region[star + 1..]
                .chars()
                .take_while(|c| is_anchor_char(*c))
                .collect(),
            None => String::from("unknown"),
        }
    }
}

/// Valid in an anchor or alias name: any non-whitespace character except
/// the flow indicators.
fn is_anchor_char(ch: char) -> bool {
    !ch.is_whitespace() && !matches!(ch, '[' | ']' | '{' | '}' | ',')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn walk(source: &str) -> (FileOutcome, RunContext) {
        let mut ctx = RunContext::new();
        let outcome = Walker::new(Registries::builtin()).walk_yaml(source, "play.yml", &mut ctx);
        (outcome, ctx)
    }

    #[test]
    fn values_are_checked_with_document_coordinates() {
        let (outcome, _) = walk("greeting: \"{{ salutation }}\"\n");
        let report = outcome
            .reports
            .iter()
            .find(|r| !r.is_plain())
            .expect("template report");
        let first = report.tokens.first().expect("tokens");
        assert_eq!(first.first().line, 1);
        assert!(report.symbols.as_ref().is_some_and(|s| s.free.contains("salutation")));
    }

    #[test]
    fn conditional_fields_are_wrapped_as_expressions() {
        let (outcome, ctx) = walk("- name: t\n  debug: x\n  when: ready is defined\n");
        let wrapped = outcome
            .reports
            .iter()
            .find(|r| {
                r.tokens
                    .first()
                    .is_some_and(|t| t.kind == TokenKind::VariableBegin)
            })
            .expect("wrapped report");
        assert!(wrapped.parse_error.is_none());
        assert!(ctx.free_vars()["play.yml"].contains("ready"));
    }

    #[test]
    fn name_values_label_the_node_path() {
        let (outcome, _) = walk("- name: install things\n  command: \"{{ tool }} install\"\n");
        let report = outcome
            .reports
            .iter()
            .find(|r| r.node_path.contains("install things"))
            .expect("labeled node path");
        assert!(report.node_path.starts_with("play.yml:"));
    }

    #[test]
    fn tags_accumulate_from_sequences_and_comma_scalars() {
        let (_, ctx) = walk("tags:\n  - deploy\n  - web\n");
        assert!(ctx.tags()["play.yml"].contains("deploy"));
        assert!(ctx.tags()["play.yml"].contains("web"));
        let (_, ctx) = walk("tags: alpha, beta\n");
        assert!(ctx.tags()["play.yml"].contains("alpha"));
        assert!(ctx.tags()["play.yml"].contains("beta"));
    }

    #[test]
    fn shell_fields_see_the_shell_heuristic() {
        let (outcome, _) = walk("- name: t\n  shell: echo 'oops\n");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.to_string().contains("single quote")));
    }

    #[test]
    fn sibling_conflicts_report_the_action_keys() {
        let (outcome, _) = walk("- name: demo\n  copy: src=a\n  template: src=b\n");
        let conflict = outcome
            .diagnostics
            .iter()
            .find(|d| matches!(d, LintError::Conflict { .. }))
            .expect("conflict diagnostic");
        let text = conflict.to_string();
        assert!(text.contains("copy"));
        assert!(text.contains("template"));
    }

    #[test]
    fn control_keys_do_not_conflict() {
        let (outcome, _) = walk("- name: demo\n  copy: src=a\n  when: go\n  tags: a\n");
        assert!(!outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, LintError::Conflict { .. })));
    }

    #[test]
    fn conflicts_skip_variable_sections() {
        let (outcome, _) = walk("vars:\n  app:\n    name: x\n    copy: y\n    template: z\n");
        assert!(!outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, LintError::Conflict { .. })));
    }

    #[test]
    fn block_ancestors_are_recursed_through() {
        let source = "- name: outer\n  block:\n    - name: inner\n      copy: a\n      template: b\n";
        let (outcome, _) = walk(source);
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, LintError::Conflict { .. })));
    }

    #[test]
    fn named_ancestors_suppress_the_conflict_check() {
        let source =
            "- name: composite\n  tasks:\n    - name: inner\n      copy: a\n      template: b\n";
        let (outcome, _) = walk(source);
        assert!(!outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, LintError::Conflict { .. })));
    }

    #[test]
    fn anchors_and_aliases_reach_the_run_context() {
        let (_, ctx) = walk("base: &common 1\nuse: *common\nmiss: *gone\n");
        assert!(ctx.anchor_site("common").is_some());
        let dangling = ctx.reconcile();
        assert_eq!(dangling.len(), 1);
        assert_eq!(dangling[0].label, "gone");
    }

    #[test]
    fn raw_templates_walk_as_a_single_snippet() {
        let mut ctx = RunContext::new();
        let outcome = Walker::new(Registries::builtin()).walk_raw(
            "line one\n{{ item }}\n",
            "tpl.j2",
            &mut ctx,
        );
        assert_eq!(outcome.reports.len(), 1);
        let report = &outcome.reports[0];
        assert!(!report.is_plain());
        // Line numbers count from the top of the raw file itself.
        let var = report
            .tokens
            .iter()
            .find(|t| t.kind == TokenKind::VariableBegin)
            .expect("variable token");
        assert_eq!(var.first().line, 2);
        assert!(ctx.free_vars()["tpl.j2"].contains("item"));
    }

    #[test]
    fn scanner_failures_become_scan_diagnostics() {
        let (outcome, _) = walk("a: b\n  c: d\n");
        assert!(outcome.is_hard_error());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| matches!(d, LintError::Scan { .. })));
    }
}
