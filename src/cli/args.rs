//! Defines the command-line arguments and subcommands for the clash CLI.
//!
//! This module uses the `clap` crate with its "derive" feature. Every global setting can also
//! come from a `CLASH_*` environment variable so shell hooks need no flags.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "clash",
    version,
    about = "Configuration-driven command dispatcher with shell completion."
)]
pub struct ClashArgs {
    /// Specification document describing commands and macros.
    #[arg(long, env = "CLASH_SPEC", default_value = "clash.yaml")]
    pub spec: PathBuf,

    /// Directory holding the environment store.
    #[arg(long, env = "CLASH_HOME", default_value = ".clash")]
    pub home: PathBuf,

    /// Extra macro documents or directories of them.
    #[arg(long = "macros", value_name = "PATH")]
    pub macros: Vec<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print completion candidates, one per line.
    Complete {
        /// Command line being completed.
        #[arg(long, env = "COMP_LINE")]
        line: Option<String>,
        /// Cursor position within the line.
        #[arg(long, env = "COMP_POINT")]
        point: Option<usize>,
        /// Leading words of the line to drop.
        #[arg(long, default_value_t = 1)]
        skip: usize,
        /// Complete only past the first occurrence of this word; before it, offer clash's
        /// own subcommands.
        #[arg(long, value_name = "WORD", conflicts_with = "skip")]
        after: Option<String>,
        /// Already split words; the last one is completed. Takes precedence over --line.
        #[arg(last = true)]
        words: Vec<String>,
    },
    /// Run a command from the tree.
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the command tree.
    Tree,
    /// List every macro by qualified name.
    Macros,
    /// Print a bash completion hook.
    Hook {
        /// Name the hook completes.
        #[arg(default_value = "clash")]
        program: String,
    },
}
