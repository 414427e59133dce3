//! The templint command-line interface.
//!
//! Orchestrates the core library: input discovery, the per-file walk,
//! rendering of snippet reports and structural diagnostics, end-of-run
//! anchor reconciliation, the machine-readable summary, and the exit
//! status mapping.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::GraphicalReportHandler;
use serde::Serialize;
use termcolor::{ColorChoice, StandardStream};
use walkdir::WalkDir;

use crate::cli::args::TemplintArgs;
use crate::diagnostics::{ErrorContext, LintError};
use crate::registry::Registries;
use crate::render::{self, RenderOptions};
use crate::walker::Walker;
use crate::xref::RunContext;

pub mod args;

/// Machine-readable summary printed on request. Both top-level keys are
/// optional; absent means "not asked for".
#[derive(Serialize)]
struct Summary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    free_variables: Option<&'a BTreeMap<String, BTreeSet<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a BTreeMap<String, BTreeSet<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags_by_label: Option<BTreeMap<String, BTreeSet<String>>>,
}

/// The main entry point for the CLI. Returns the process exit code.
pub fn run() -> i32 {
    let args = TemplintArgs::parse();
    let opts = RenderOptions {
        context_lines: args.context_lines,
        verbosity: args.verbose,
    };
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    let handler = GraphicalReportHandler::new().with_context_lines(args.context_lines);
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);

    let mut hard_error = false;
    let mut findings = false;

    for path in collect_inputs(&args.files) {
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                hard_error = true;
                continue;
            }
        };
        let doc_id = path.display().to_string();
        let outcome = if is_host_document(&path) {
            walker.walk_yaml(&source, &doc_id, &mut ctx)
        } else {
            walker.walk_raw(&source, &doc_id, &mut ctx)
        };
        hard_error |= outcome.is_hard_error();
        findings |= outcome.has_findings();

        if args.quiet {
            continue;
        }
        for report in &outcome.reports {
            if report.is_plain() {
                continue;
            }
            let noteworthy = report.is_hard_error() || report.has_findings();
            if noteworthy || opts.verbosity >= 1 {
                render::print_inline(&mut stdout, report, &opts);
            }
            if noteworthy || opts.verbosity >= 2 {
                render::print_trace(&mut stdout, report, &opts);
            }
        }
        for diag in &outcome.diagnostics {
            print_diagnostic(&handler, diag);
        }
    }

    // Cross-document reconciliation runs exactly once, after every input
    // has been walked.
    let dangling = ctx.reconcile();
    if !args.quiet {
        for d in &dangling {
            let mut help = format!("referenced at {}", d.site);
            if let Some(suggestion) = &d.suggestion {
                help.push_str(&format!("; closest unreferenced anchor: '{suggestion}'"));
            }
            let err = LintError::DanglingAlias {
                label: d.label.clone(),
                ctx: ErrorContext::none().help(help),
            };
            print_diagnostic(&handler, &err);
        }
    }

    if args.emit_vars || args.emit_tags {
        let summary = Summary {
            free_variables: args.emit_vars.then(|| ctx.free_vars()),
            tags: args.emit_tags.then(|| ctx.tags()),
            tags_by_label: args.emit_tags.then(|| ctx.tags_by_label()),
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("failed to serialize summary: {e}");
                hard_error = true;
            }
        }
    }

    let annotation_failure = findings && !args.lenient;
    if hard_error || annotation_failure || !dangling.is_empty() {
        1
    } else {
        0
    }
}

/// Expand the argument list: directories are walked for host-format
/// documents, `--` separators are skipped, plain files pass through.
fn collect_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.as_os_str() == "--" {
            continue;
        }
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
            {
                if entry.file_type().is_file() && is_host_document(entry.path()) {
                    inputs.push(entry.path().to_path_buf());
                }
            }
        } else {
            inputs.push(path.clone());
        }
    }
    inputs
}

fn is_host_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn print_diagnostic(handler: &GraphicalReportHandler, diag: &LintError) {
    let mut rendered = String::new();
    if handler.render_report(&mut rendered, diag).is_ok() {
        eprintln!("{rendered}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_documents_are_recognized_by_extension() {
        assert!(is_host_document(Path::new("site.yml")));
        assert!(is_host_document(Path::new("roles/x/tasks/main.yaml")));
        assert!(!is_host_document(Path::new("template.j2")));
    }

    #[test]
    fn double_dash_entries_are_skipped() {
        let inputs = collect_inputs(&[PathBuf::from("--"), PathBuf::from("a.yml")]);
        assert_eq!(inputs, vec![PathBuf::from("a.yml")]);
    }
}
