//! Cross-reference accumulation and end-of-run reconciliation.
//!
//! One [`RunContext`] is threaded by reference through every document
//! walk; no process-wide state. The tables are append-only while walking
//! and read-only afterwards: reconciliation must not start before every
//! input document has been fully walked. When the same anchor label is
//! defined more than once, the lexically last definition wins for
//! lookups; duplicates themselves are never flagged.
//!
//! Reconciliation deliberately ignores the host format's anchor scoping
//! rules — every anchor is treated as visible everywhere, which can both
//! under- and over-report in pathological nesting. Known limitation, not
//! a defect to paper over.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::suggest::suggest;

/// Where in which document something was seen. Lines and columns are
/// 1-based for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub doc: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.doc, self.line, self.col)
    }
}

/// An alias that resolved to no anchor across the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingAlias {
    pub label: String,
    pub site: Site,
    /// Closest unreferenced anchor label, when one exists.
    pub suggestion: Option<String>,
}

/// Process-wide accumulation tables, populated while walking and
/// reconciled once at the end of a run.
#[derive(Debug, Default)]
pub struct RunContext {
    anchors: BTreeMap<String, Vec<Site>>,
    aliases: BTreeMap<String, Site>,
    free_vars: BTreeMap<String, BTreeSet<String>>,
    tags: BTreeMap<String, BTreeSet<String>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an anchor definition. Later definitions of the same label
    /// accumulate; they do not overwrite.
    pub fn define_anchor(&mut self, label: impl Into<String>, site: Site) {
        self.anchors.entry(label.into()).or_default().push(site);
    }

    /// Record an alias reference. The first reference site per label is
    /// kept.
    pub fn reference_alias(&mut self, label: impl Into<String>, site: Site) {
        self.aliases.entry(label.into()).or_insert(site);
    }

    /// The winning (lexically last) definition site for a label.
    pub fn anchor_site(&self, label: &str) -> Option<&Site> {
        self.anchors.get(label).and_then(|sites| sites.last())
    }

    pub fn add_free_vars<I, S>(&mut self, doc: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.free_vars.entry(doc.to_string()).or_default();
        entry.extend(names.into_iter().map(Into::into));
    }

    pub fn add_tags<I, S>(&mut self, doc: &str, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.tags.entry(doc.to_string()).or_default();
        entry.extend(tags.into_iter().map(Into::into));
    }

    pub fn free_vars(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.free_vars
    }

    pub fn tags(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.tags
    }

    /// The inverse tag table: label to the documents carrying it.
    pub fn tags_by_label(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut inverse: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (doc, tags) in &self.tags {
            for tag in tags {
                inverse.entry(tag.clone()).or_default().insert(doc.clone());
            }
        }
        inverse
    }

    /// Resolve aliases against anchors. Call exactly once, after all
    /// documents are walked.
    pub fn reconcile(&self) -> Vec<DanglingAlias> {
        let unreferenced: Vec<&str> = self
            .anchors
            .keys()
            .filter(|label| !self.aliases.contains_key(*label))
            .map(String::as_str)
            .collect();
        self.aliases
            .iter()
            .filter(|(label, _)| !self.anchors.contains_key(*label))
            .map(|(label, site)| DanglingAlias {
                label: label.clone(),
                site: site.clone(),
                suggestion: suggest(label, unreferenced.iter().copied(), 1, 0.5)
                    .into_iter()
                    .next(),
            })
            .collect()
    }
}
