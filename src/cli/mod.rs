//! The clash command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates the core library
//! functions: load the specification, build the tree once, then answer one completion query
//! or one dispatch against the environment store.

use std::collections::BTreeSet;
use std::io::{self, IsTerminal, Write};
use std::path::Path;

use clap::{CommandFactory, Parser};
use termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::EnvFilter;

use crate::cli::args::{ClashArgs, Command};
use crate::completion::{resolve, CompleterRegistry, PartialInput};
use crate::dispatch::{dispatch, Outcome};
use crate::env::EnvironmentStore;
use crate::macros::MacroRegistry;
use crate::spec::load_specification;
use crate::tree::{CommandTree, TreeBuilder};
use crate::ClashError;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() -> miette::Result<()> {
    let args = ClashArgs::parse();
    init_logging(args.verbose);
    execute(args).map_err(miette::Report::new)
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env("CLASH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "clash=debug",
            _ => "clash=trace",
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn execute(args: ClashArgs) -> Result<(), ClashError> {
    match args.command {
        Command::Hook { program } => write_stdout(|out| write!(out, "{}", hook_script(&program))),
        Command::Macros => {
            let spec = load_specification(&args.spec, &args.macros)?;
            let registry = MacroRegistry::from_specification(&spec)?;
            let mut stdout = StandardStream::stdout(color_choice());
            output::print_macros(&mut stdout, &registry.qualified_names())
                .map_err(stdout_error)
        }
        Command::Tree => {
            let tree = build_tree(&args.spec, &args.macros)?;
            let mut stdout = StandardStream::stdout(color_choice());
            output::print_tree(&mut stdout, &tree).map_err(stdout_error)
        }
        Command::Complete {
            line,
            point,
            skip,
            after,
            words,
        } => {
            let input = if !words.is_empty() {
                PartialInput::from_words(&words)
            } else if let Some(line) = line {
                match after {
                    Some(marker) => match PartialInput::from_comp_line_after(&line, point, &marker) {
                        Some(input) => input,
                        None => {
                            let own = own_candidates(&PartialInput::from_comp_line(&line, point, 1));
                            return write_stdout(|out| output::print_reply(out, &own));
                        }
                    },
                    None => PartialInput::from_comp_line(&line, point, skip),
                }
            } else {
                PartialInput::default()
            };
            let tree = build_tree(&args.spec, &args.macros)?;
            let store = EnvironmentStore::open(&args.home)?;
            let candidates = resolve(&tree, &store.context(), &input);
            tracing::debug!(tokens = ?input.tokens, partial = %input.partial_word, count = candidates.len(), "resolved");
            write_stdout(|out| output::print_reply(out, &candidates))
        }
        Command::Run { args: tokens } => {
            let tree = build_tree(&args.spec, &args.macros)?;
            let mut store = EnvironmentStore::open(&args.home)?;
            let outcome = dispatch(&tree, &mut store, &tokens)?;
            if matches!(
                outcome,
                Outcome::Created(_) | Outcome::Used(_) | Outcome::Removed(_) | Outcome::Initialized(_)
            ) {
                store.save()?;
            }
            let mut stdout = StandardStream::stdout(color_choice());
            output::print_outcome(&mut stdout, &outcome).map_err(stdout_error)
        }
    }
}

/// Loads the specification and builds the tree. The binary has no compiled-in completers:
/// documents use inline `choices`, `user_data` lookups or the reserved `environments` and
/// `active_environment` completers.
pub fn build_tree(spec: &Path, macros: &[std::path::PathBuf]) -> Result<CommandTree, ClashError> {
    let specification = load_specification(spec, macros)?;
    TreeBuilder::new(&CompleterRegistry::new()).build(&specification)
}

/// Candidates for clash's own command line, before the `run` word. Nothing is offered
/// after an option that takes a value so the shell falls back to file names.
fn own_candidates(input: &PartialInput) -> BTreeSet<String> {
    let command = ClashArgs::command();
    let awaits_value = input.tokens.last().is_some_and(|word| {
        command.get_arguments().any(|arg| {
            let named = arg.get_long().is_some_and(|long| *word == format!("--{long}"))
                || arg.get_short().is_some_and(|short| *word == format!("-{short}"));
            named && arg.get_action().takes_values()
        })
    });
    let past_subcommand = input
        .tokens
        .iter()
        .any(|word| !word.starts_with('-') && is_subcommand(&command, word));
    if awaits_value || past_subcommand {
        return BTreeSet::new();
    }
    command
        .get_subcommands()
        .map(|sub| sub.get_name().to_string())
        .filter(|name| input.admits(name))
        .collect()
}

fn is_subcommand(command: &clap::Command, word: &str) -> bool {
    command.get_subcommands().any(|sub| sub.get_name() == word)
}

/// Bash completion hook routing `<program> run …` through `clash complete`.
pub fn hook_script(program: &str) -> String {
    let function = format!("_{}_complete", program.replace(|c: char| !c.is_ascii_alphanumeric(), "_"));
    format!(
        r#"{function}() {{
    local IFS=$'\n'
    COMPREPLY=($(COMP_LINE="$COMP_LINE" COMP_POINT="$COMP_POINT" {program} complete --after run 2>/dev/null))
}}
complete -o default -F {function} {program}
"#
    )
}

fn write_stdout(f: impl FnOnce(&mut io::StdoutLock<'_>) -> io::Result<()>) -> Result<(), ClashError> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    f(&mut lock).and_then(|_| lock.flush()).map_err(stdout_error)
}

fn color_choice() -> ColorChoice {
    if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn stdout_error(source: io::Error) -> ClashError {
    ClashError::resource("write", Path::new("<stdout>"), source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_names_a_valid_function() {
        let script = hook_script("my-tool");
        assert!(script.starts_with("_my_tool_complete()"));
        assert!(script.contains("complete -o default -F _my_tool_complete my-tool"));
        assert!(script.contains("my-tool complete --after run"));
    }

    #[test]
    fn own_subcommands_complete_before_run() {
        let input = PartialInput::from_comp_line("clash --spec x.yaml ", None, 1);
        let names = own_candidates(&input);
        assert!(names.contains("run") && names.contains("complete") && names.contains("hook"));

        let input = PartialInput::from_comp_line("clash r", None, 1);
        assert_eq!(own_candidates(&input), BTreeSet::from(["run".to_string()]));
    }

    #[test]
    fn own_options_taking_values_fall_back_to_files() {
        let input = PartialInput::from_comp_line("clash --spec ", None, 1);
        assert!(own_candidates(&input).is_empty());
        let input = PartialInput::from_comp_line("clash -v ", None, 1);
        assert!(own_candidates(&input).contains("run"));
    }

    #[test]
    fn other_subcommands_complete_nothing() {
        let input = PartialInput::from_comp_line("clash tree ", None, 1);
        assert!(own_candidates(&input).is_empty());
    }
}
