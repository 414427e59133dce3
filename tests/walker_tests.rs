//! Document-level scenarios: multiple files sharing one run context,
//! anchor/alias reconciliation, and the structural checks the walker
//! applies on top of per-snippet reports.

use templint::diagnostics::LintError;
use templint::registry::Registries;
use templint::walker::Walker;
use templint::xref::RunContext;

#[test]
fn reconciliation_spans_documents() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    walker.walk_yaml("base: &shared 1\nuse: *shared\n", "one.yml", &mut ctx);
    walker.walk_yaml("other: *orphan\n", "two.yml", &mut ctx);

    let dangling = ctx.reconcile();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].label, "orphan");
    assert_eq!(dangling[0].site.doc, "two.yml");
}

#[test]
fn dangling_aliases_suggest_the_closest_unreferenced_anchor() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    walker.walk_yaml("defaults: &defaults 1\n", "one.yml", &mut ctx);
    walker.walk_yaml("use: *defalts\n", "two.yml", &mut ctx);

    let dangling = ctx.reconcile();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].suggestion.as_deref(), Some("defaults"));
}

#[test]
fn duplicate_anchor_definitions_are_tolerated_and_last_wins() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    let outcome = walker.walk_yaml(
        "- id: &a first\n- id: &a second\n- use: *a\n",
        "dup.yml",
        &mut ctx,
    );

    // No annotation for the duplicate definition itself.
    assert!(outcome.diagnostics.is_empty());
    let site = ctx.anchor_site("a").expect("anchor recorded");
    assert_eq!(site.line, 2);
    assert!(ctx.reconcile().is_empty());
}

#[test]
fn free_variables_accumulate_per_document() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    walker.walk_yaml(
        "- name: t\n  debug: \"{{ alpha }} {{ beta | int }}\"\n",
        "one.yml",
        &mut ctx,
    );
    walker.walk_yaml("- name: u\n  debug: \"{{ gamma }}\"\n", "two.yml", &mut ctx);

    assert!(ctx.free_vars()["one.yml"].contains("alpha"));
    assert!(ctx.free_vars()["one.yml"].contains("beta"));
    assert!(!ctx.free_vars()["one.yml"].contains("gamma"));
    assert!(ctx.free_vars()["two.yml"].contains("gamma"));
}

#[test]
fn sibling_conflict_reports_only_the_action_keys() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    let outcome = walker.walk_yaml(
        "- name: demo\n  copy: src=a\n  template: src=b\n",
        "tasks.yml",
        &mut ctx,
    );

    let conflicts: Vec<&LintError> = outcome
        .diagnostics
        .iter()
        .filter(|d| matches!(d, LintError::Conflict { .. }))
        .collect();
    assert_eq!(conflicts.len(), 1);
    let text = conflicts[0].to_string();
    assert!(text.contains("copy"));
    assert!(text.contains("template"));
    assert!(!text.contains("name,"));
}

#[test]
fn hard_errors_do_not_leak_across_documents() {
    let reg = Registries::builtin();
    let walker = Walker::new(reg);
    let mut ctx = RunContext::new();
    let broken = walker.walk_yaml("a: b\n  c: d\n", "broken.yml", &mut ctx);
    let clean = walker.walk_yaml("ok: \"{{ fine }}\"\n", "clean.yml", &mut ctx);

    assert!(broken.is_hard_error());
    assert!(!clean.is_hard_error());
    assert!(ctx.free_vars()["clean.yml"].contains("fine"));
}
