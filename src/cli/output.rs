//! Handles all user-facing output for the CLI.
//!
//! Listings are colorized through `termcolor`; machine-read output (completion replies,
//! JSON) is written plain.

use std::io::{self, Write};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::completion::format_reply;
use crate::dispatch::Outcome;
use crate::tree::{CommandNode, CommandTree, Gate};

// ============================================================================
// LISTINGS
// ============================================================================

/// Prints the tree, one node per line, indented by depth. Gated nodes are marked.
pub fn print_tree(out: &mut impl WriteColor, tree: &CommandTree) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    writeln!(out, "{}", tree.program())?;
    out.reset()?;
    for child in tree.root().children.values() {
        print_node(out, child, 1)?;
    }
    Ok(())
}

/// Prints qualified macro names.
pub fn print_macros(out: &mut impl WriteColor, names: &[String]) -> io::Result<()> {
    if names.is_empty() {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        writeln!(out, "(no macros)")?;
        return out.reset();
    }
    for name in names {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        writeln!(out, "{name}")?;
    }
    out.reset()
}

/// Prints a completion reply.
pub fn print_reply<'a>(
    out: &mut impl Write,
    candidates: impl IntoIterator<Item = &'a String>,
) -> io::Result<()> {
    out.write_all(format_reply(candidates).as_bytes())
}

/// Prints what a dispatch did.
pub fn print_outcome(out: &mut impl WriteColor, outcome: &Outcome) -> io::Result<()> {
    match outcome {
        Outcome::Help(usage) => writeln!(out, "{usage}"),
        Outcome::Created(name) => status_line(out, "created", name),
        Outcome::Used(name) => status_line(out, "using", name),
        Outcome::Removed(name) => status_line(out, "removed", name),
        Outcome::Initialized(name) => status_line(out, "initialized", name),
        Outcome::Listed { names, active } => {
            for name in names {
                if active.as_deref() == Some(name.as_str()) {
                    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
                    writeln!(out, "* {name}")?;
                    out.reset()?;
                } else {
                    writeln!(out, "  {name}")?;
                }
            }
            Ok(())
        }
        Outcome::Status { environment, json: true } => {
            serde_json::to_writer_pretty(&mut *out, environment)?;
            writeln!(out)
        }
        Outcome::Status { environment, .. } => {
            status_line(out, "environment", &environment.name)?;
            let state = if environment.initialized { "initialized" } else { "not initialized" };
            writeln!(out, "  {state}")?;
            if let Some(dir) = &environment.storage_dir {
                writeln!(out, "  storage: {}", dir.display())?;
            }
            for (key, value) in environment.user_data.iter() {
                writeln!(out, "  {key}: {value}")?;
            }
            Ok(())
        }
        Outcome::Invoked(invocation) => {
            serde_json::to_writer(&mut *out, invocation)?;
            writeln!(out)
        }
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn print_node(out: &mut impl WriteColor, node: &CommandNode, depth: usize) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(node.is_group()))?;
    write!(out, "{indent}{}", node.name)?;
    out.reset()?;
    for argument in &node.arguments {
        write!(out, " <{}>", argument.name)?;
    }
    for option in node.options.iter().filter(|o| !o.is_help()) {
        write!(out, " {}", option.usage())?;
    }
    if node.gate == Gate::RequiresEnvironment {
        out.set_color(ColorSpec::new().set_dimmed(true))?;
        write!(out, " (needs environment)")?;
        out.reset()?;
    }
    if let Some(help) = &node.help {
        write!(out, "  - {help}")?;
    }
    writeln!(out)?;
    for child in node.children.values() {
        print_node(out, child, depth + 1)?;
    }
    Ok(())
}

fn status_line(out: &mut impl WriteColor, label: &str, name: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
    write!(out, "{label}")?;
    out.reset()?;
    writeln!(out, " {name}")
}
