//! Built-in structural commands present in every tree.

use super::node::{ArgumentSpec, CommandNode, OptionSpec, ValueSource};
use crate::macros::MacroExpander;
use crate::spec::CreateSection;
use crate::ClashError;

pub const ENV: &str = "env";
pub const CREATE: &str = "create";
pub const USE: &str = "use";
pub const REMOVE: &str = "remove";
pub const LIST: &str = "list";
pub const INIT: &str = "init";
pub const APPLY: &str = "apply";
pub const STATUS: &str = "status";

/// Option destinations `env create` consumes itself; everything else becomes user data.
pub const CREATE_DESTS: [&str; 4] = ["reset", "storage_dir", "editable", "name"];

fn flag(short: &str, long: &str, help: &str) -> Result<OptionSpec, ClashError> {
    Ok(OptionSpec::new(Some(short), Some(long), false)?.with_help(help))
}

fn valued(short: &str, long: &str, help: &str) -> Result<OptionSpec, ClashError> {
    Ok(OptionSpec::new(Some(short), Some(long), true)?.with_help(help))
}

/// `-v|--verbose`, carried by `apply` and by every user-declared command.
pub fn verbose() -> Result<OptionSpec, ClashError> {
    flag("-v", "--verbose", "increase output verbosity")
}

/// The `env` group. `create` carries the built-in options followed by whatever the
/// specification declares for it.
pub fn env_group(expander: &MacroExpander<'_>, create: &CreateSection) -> Result<CommandNode, ClashError> {
    let mut create_node = CommandNode::new(CREATE)
        .with_help("create a new environment")
        .with_option(flag("-r", "--reset", "replace an existing environment of the same name")?)
        .with_option(valued("-s", "--storage-dir", "directory holding the environment's files")?)
        .with_option(flag("-e", "--editable", "mark the environment as editable")?)
        .with_option(valued("-n", "--name", "environment name (default: main)")?);
    expander.lower_options(&create.options, &mut create_node)?;
    expander.lower_arguments(&create.arguments, &mut create_node)?;

    let name_argument = || ArgumentSpec::new("name").with_source(ValueSource::EnvironmentNames);
    let mut env = CommandNode::new(ENV).with_help("manage environments");
    env.insert_child(create_node)?;
    env.insert_child(
        CommandNode::new(USE)
            .with_help("make an environment the active one")
            .with_argument(name_argument()),
    )?;
    env.insert_child(
        CommandNode::new(REMOVE)
            .with_help("delete an environment")
            .with_argument(name_argument()),
    )?;
    env.insert_child(CommandNode::new(LIST).with_help("list environments"))?;
    Ok(env)
}

/// `init`, `apply` and `status`, all reachable only with an active environment.
pub fn environment_commands() -> Result<Vec<CommandNode>, ClashError> {
    Ok(vec![
        CommandNode::new(INIT)
            .with_help("initialize the active environment")
            .with_option(flag("-r", "--reset", "initialize again")?)
            .gated(),
        CommandNode::new(APPLY)
            .with_help("apply the active environment")
            .with_option(verbose()?)
            .gated(),
        CommandNode::new(STATUS)
            .with_help("show the active environment")
            .with_option(flag("-j", "--json", "print as JSON")?)
            .gated(),
    ])
}
