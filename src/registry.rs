//! Canonical builtin-name registries.
//!
//! The lint engine never discovers names itself: filter, test, and
//! platform registries are materialized once here and passed by reference
//! into every checking code path. Tools embedding the engine can construct
//! their own [`Registries`] from plain string sets instead.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;

/// Template-language builtin filters.
const TEMPLATE_FILTERS: &[&str] = &[
    "abs", "attr", "batch", "capitalize", "center", "default", "d", "dictsort", "escape",
    "filesizeformat", "first", "float", "forceescape", "format", "groupby", "indent", "int",
    "join", "last", "length", "list", "lower", "map", "max", "min", "pprint", "random",
    "reject", "rejectattr", "replace", "reverse", "round", "safe", "select", "selectattr",
    "slice", "sort", "string", "striptags", "sum", "title", "tojson", "trim", "truncate",
    "unique", "upper", "urlencode", "urlize", "wordcount", "wordwrap", "xmlattr",
];

// Automation-tool filters, grouped by the release that introduced them.
// Version gating is a possible refinement; today all groups are merged.
const TOOL_FILTERS_V2_3: &[&str] = &[
    "mandatory", "ternary", "bool", "lookup", "combine", "permutations", "product",
    "combinations", "shuffle", "union", "intersect", "difference", "symmetric_difference",
    "log", "pow", "root", "hash", "checksum", "password_hash", "comment", "to_datetime",
    "to_uuid", "regex_escape", "regex_search", "regex_replace", "basename", "win_basename",
    "win_splitdrive", "dirname", "win_dirname", "expanduser", "realpath", "relpath",
    "splitext", "path_join", "quote", "b64decode", "b64encode", "from_json", "to_json",
    "from_nice_json", "to_nice_json", "from_yaml", "to_yaml", "from_nice_yaml",
    "to_nice_yaml", "type_debug", "zip", "zip_longest", "json_query",
];
const TOOL_FILTERS_V2_4: &[&str] = &["strftime", "urlsplit"];
const TOOL_FILTERS_V2_5: &[&str] = &["flatten"];

/// Template-language and automation-tool builtin tests.
const BUILTIN_TESTS: &[&str] = &[
    "boolean", "callable", "defined", "divisibleby", "eq", "equalto", "escaped", "even",
    "false", "filter", "float", "ge", "gt", "greaterthan", "in", "integer", "iterable",
    "le", "lessthan", "lower", "lt", "mapping", "ne", "none", "number", "odd", "sameas",
    "sequence", "string", "test", "true", "undefined", "upper",
    // automation-tool additions
    "abs", "all", "any", "changed", "contains", "directory", "exists", "failed", "failure",
    "file", "finished", "issubset", "issuperset", "link", "match", "mount", "regex",
    "search", "skip", "skipped", "started", "succeeded", "success", "superset", "subset",
    "truthy", "falsy", "version", "version_compare", "vault_encrypted",
];

/// Platform names compared against the well-known distribution fact.
const KNOWN_PLATFORMS: &[&str] = &[
    "Alpine", "Amazon", "Archlinux", "CentOS", "Debian", "Fedora", "FreeBSD", "Gentoo",
    "MacOSX", "NetBSD", "OpenBSD", "RedHat", "Rocky", "AlmaLinux", "SLES", "Ubuntu",
    "openSUSE Leap",
];

/// Read-only name registries injected into the checking engine.
#[derive(Debug, Clone)]
pub struct Registries {
    pub filters: BTreeSet<String>,
    pub tests: BTreeSet<String>,
    pub platforms: BTreeSet<String>,
}

impl Registries {
    /// Build registries from caller-supplied name sets.
    pub fn new<F, T, P>(filters: F, tests: T, platforms: P) -> Self
    where
        F: IntoIterator<Item = String>,
        T: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        Registries {
            filters: filters.into_iter().collect(),
            tests: tests.into_iter().collect(),
            platforms: platforms.into_iter().collect(),
        }
    }

    /// The canonical builtin registries, materialized once per process.
    pub fn builtin() -> &'static Registries {
        static BUILTIN: Lazy<Registries> = Lazy::new(|| {
            let filters = TEMPLATE_FILTERS
                .iter()
                .chain(TOOL_FILTERS_V2_3)
                .chain(TOOL_FILTERS_V2_4)
                .chain(TOOL_FILTERS_V2_5)
                .map(|s| s.to_string());
            Registries::new(
                filters,
                BUILTIN_TESTS.iter().map(|s| s.to_string()),
                KNOWN_PLATFORMS.iter().map(|s| s.to_string()),
            )
        });
        &BUILTIN
    }
}
