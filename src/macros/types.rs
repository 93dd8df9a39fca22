//! Core macro types.
//!
//! This module has no dependencies on the other macro modules. A [`Macro`] is a template:
//! it is never shared into the tree, every reference produces a fresh expansion.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{ArgumentDoc, CommandDoc, MacroDoc, MacroEntryDoc};
use crate::ClashError;

/// Maximum nesting of macro references before expansion gives up.
pub const MAX_MACRO_RECURSION_DEPTH: usize = 128;

/// Separator between namespace segments in a macro reference.
pub const PATH_SEPARATOR: char = '.';

/// A reusable fragment of arguments and subcommands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Macro {
    pub help: Option<String>,
    pub args: Vec<ArgumentDoc>,
    pub commands: Vec<CommandDoc>,
}

impl From<MacroDoc> for Macro {
    fn from(doc: MacroDoc) -> Self {
        Self {
            help: doc.help,
            args: doc.args,
            commands: doc.commands,
        }
    }
}

/// A namespace level: name → macro or nested namespace.
pub type MacroNamespace = BTreeMap<String, MacroEntry>;

/// Either a macro or a nested namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroEntry {
    Leaf(Macro),
    Namespace(MacroNamespace),
}

impl MacroEntry {
    /// Converts a loaded document entry, rejecting segment names that contain the separator.
    pub fn from_doc(name: &str, doc: MacroEntryDoc) -> Result<Self, ClashError> {
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            return Err(ClashError::InvalidName {
                kind: "macro",
                name: name.to_string(),
                help: Some(format!(
                    "macro and namespace names are non-empty and may not contain '{PATH_SEPARATOR}'"
                )),
            });
        }
        Ok(match doc {
            MacroEntryDoc::Macro(m) => MacroEntry::Leaf(m.into()),
            MacroEntryDoc::Namespace(entries) => {
                let mut namespace = MacroNamespace::new();
                for (child, entry) in entries {
                    let converted = MacroEntry::from_doc(&child, entry)?;
                    namespace.insert(child, converted);
                }
                MacroEntry::Namespace(namespace)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MacroEntry::Leaf(_) => "macro",
            MacroEntry::Namespace(_) => "namespace",
        }
    }
}

/// A parsed dotted macro reference such as `nested.macro2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroPath(Vec<String>);

impl MacroPath {
    pub fn parse(reference: &str) -> Result<Self, ClashError> {
        let segments: Vec<String> = reference
            .split(PATH_SEPARATOR)
            .map(str::to_string)
            .collect();
        if segments.iter().any(String::is_empty) {
            return Err(ClashError::UnknownMacro {
                path: reference.to_string(),
                help: Some("macro references are dot-separated names, e.g. `nested.macro2`".to_string()),
            });
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The final segment: the macro's own name.
    pub fn leaf(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    pub fn root(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl fmt::Display for MacroPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}
