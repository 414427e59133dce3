//! Defines the command-line arguments for the templint CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::Parser;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "templint",
    version,
    about = "Lint templated configuration documents: embedded-snippet syntax, \
             misspelled builtin names, and structural consistency."
)]
pub struct TemplintArgs {
    /// Files or directories to lint. Directories are walked recursively
    /// for host-format documents; anything else is treated as a raw
    /// template file.
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Number of context lines shown around a diagnostic.
    #[arg(short = 'C', long, default_value_t = 3)]
    pub context_lines: usize,

    /// Increase verbosity: -v shows node paths and full sources, -vv adds
    /// a per-token trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress incidental output. The machine-readable summary still
    /// prints when requested.
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not fail the run for heuristic annotations alone; only hard
    /// syntax errors and dangling aliases affect the exit status.
    #[arg(long)]
    pub lenient: bool,

    /// Emit the per-document free-variable summary as JSON on stdout.
    #[arg(long)]
    pub emit_vars: bool,

    /// Emit the per-document tag summary (and its inverse) as JSON on
    /// stdout.
    #[arg(long)]
    pub emit_tags: bool,
}
