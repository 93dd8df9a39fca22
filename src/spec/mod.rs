//! Declarative specification documents.
//!
//! These are the typed shapes the YAML loader produces. They carry no behavior: the macro
//! expander lowers them into [`CommandNode`](crate::tree::CommandNode)s and the tree builder
//! merges those into the root.
//!
//! An argument entry whose `name` starts with `-` declares a value-taking option rather than
//! a positional (`{name: --arg2}` is `--arg2 VALUE`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub mod loader;

pub use loader::{
    load_macros_from_file, load_macros_from_str, load_spec_from_file, load_spec_from_str,
    load_specification, MacroSource, Specification,
};

/// A macro namespace document: name → macro or nested namespace.
pub type MacroNamespaceDoc = BTreeMap<String, MacroEntryDoc>;

/// Top-level specification document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecDocument {
    /// Program name shown in usage lines; defaults to `clash`.
    #[serde(default)]
    pub name: Option<String>,
    /// Extensions to the built-in `env` commands.
    #[serde(default)]
    pub env: EnvSection,
    /// User-declared top-level commands.
    #[serde(default)]
    pub commands: Vec<CommandDoc>,
    /// Inline macro definitions.
    #[serde(default)]
    pub macros: MacroNamespaceDoc,
    /// Macro documents to load, relative to the specification file.
    #[serde(default)]
    pub macro_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSection {
    /// Extra arguments and options accepted by `env create`.
    #[serde(default)]
    pub create: CreateSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSection {
    #[serde(default)]
    pub arguments: Vec<ArgumentDoc>,
    #[serde(default)]
    pub options: Vec<OptionDoc>,
}

/// A command or subcommand declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandDoc {
    pub name: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionDoc>,
    #[serde(default)]
    pub arguments: Vec<ArgumentDoc>,
    #[serde(default)]
    pub commands: Vec<CommandDoc>,
    /// Dotted reference to a macro spliced into this command.
    #[serde(default, rename = "macro")]
    pub macro_ref: Option<String>,
}

impl CommandDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A flag-style option declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDoc {
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub takes_value: bool,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub completer: Option<CompleterDoc>,
}

/// A positional argument declaration (or a value option, see the module docs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentDoc {
    pub name: String,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub completer: Option<CompleterDoc>,
}

impl ArgumentDoc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_completer(mut self, completer: impl Into<String>) -> Self {
        self.completer = Some(CompleterDoc::Named(completer.into()));
        self
    }

    /// True when this entry declares an option (`--arg`, `-a`) instead of a positional.
    pub fn is_option(&self) -> bool {
        self.name.starts_with('-')
    }
}

/// Reference to a completer: a registered name, an inline list of choices, or a key of the
/// active environment's user data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompleterDoc {
    Named(String),
    Choices { choices: Vec<String> },
    UserData { user_data: String },
}

/// A macro definition document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacroDoc {
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgumentDoc>,
    #[serde(default)]
    pub commands: Vec<CommandDoc>,
}

/// Either a macro or a nested namespace of further entries.
///
/// Untagged: a mapping with only `help`/`args`/`commands` keys is a macro, anything else a
/// namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MacroEntryDoc {
    Macro(MacroDoc),
    Namespace(MacroNamespaceDoc),
}
