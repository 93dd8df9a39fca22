use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::completion::BoundCompleter;
use crate::ClashError;

static SHORT_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-[A-Za-z0-9]$").unwrap());
static LONG_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^--[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

/// Reachability of a node relative to environment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gate {
    #[default]
    Always,
    /// Only reachable while an environment is active.
    RequiresEnvironment,
}

/// Where the candidate values of an argument or value option come from.
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// Names of the environments currently in the store.
    EnvironmentNames,
    /// A completer bound at build time.
    Completer(BoundCompleter),
}

/// A positional argument.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    pub name: String,
    pub help: Option<String>,
    pub source: Option<ValueSource>,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            source: None,
        }
    }

    pub fn with_source(mut self, source: ValueSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// A flag-style option with a short and/or long form.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub short: Option<String>,
    pub long: Option<String>,
    pub takes_value: bool,
    pub help: Option<String>,
    pub source: Option<ValueSource>,
}

impl OptionSpec {
    /// Builds an option after validating its forms. At least one form is required.
    pub fn new(short: Option<&str>, long: Option<&str>, takes_value: bool) -> Result<Self, ClashError> {
        if short.is_none() && long.is_none() {
            return Err(ClashError::invalid_spec("an option needs a short or a long form"));
        }
        if let Some(s) = short {
            if !SHORT_FORM.is_match(s) {
                return Err(ClashError::InvalidSpec {
                    message: format!("'{s}' is not a valid short option"),
                    help: Some("short options look like `-x`".to_string()),
                });
            }
        }
        if let Some(l) = long {
            if !LONG_FORM.is_match(l) {
                return Err(ClashError::InvalidSpec {
                    message: format!("'{l}' is not a valid long option"),
                    help: Some("long options look like `--name`".to_string()),
                });
            }
        }
        Ok(Self {
            short: short.map(str::to_string),
            long: long.map(str::to_string),
            takes_value,
            help: None,
            source: None,
        })
    }

    /// Builds a value-taking option from a single `-x` or `--name` form.
    pub fn from_form(form: &str) -> Result<Self, ClashError> {
        if form.starts_with("--") {
            Self::new(None, Some(form), true)
        } else {
            Self::new(Some(form), None, true)
        }
    }

    /// The `-h|--help` pair every node carries.
    pub fn help_pair() -> Self {
        Self {
            short: Some("-h".to_string()),
            long: Some("--help".to_string()),
            takes_value: false,
            help: Some("show this help message".to_string()),
            source: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_source(mut self, source: ValueSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Key under which the option's value is bound: the long form without dashes, else the
    /// short form's letter. Dashes inside the name become underscores.
    pub fn dest(&self) -> String {
        let raw = match (&self.long, &self.short) {
            (Some(long), _) => long.trim_start_matches('-'),
            (None, Some(short)) => short.trim_start_matches('-'),
            (None, None) => "",
        };
        raw.replace('-', "_")
    }

    pub fn forms(&self) -> impl Iterator<Item = &str> {
        self.short.iter().chain(self.long.iter()).map(String::as_str)
    }

    pub fn matches(&self, token: &str) -> bool {
        self.forms().any(|f| f == token)
    }

    pub fn is_help(&self) -> bool {
        self.long.as_deref() == Some("--help")
    }

    /// Usage fragment, e.g. `[-s|--storage-dir STORAGE_DIR]`.
    pub fn usage(&self) -> String {
        let forms: Vec<&str> = self.forms().collect();
        if self.takes_value {
            format!("[{} {}]", forms.join("|"), self.dest().to_uppercase())
        } else {
            format!("[{}]", forms.join("|"))
        }
    }
}

/// A command or subcommand. Nodes with children are groups, the rest are leaves.
#[derive(Debug, Clone)]
pub struct CommandNode {
    pub name: String,
    pub help: Option<String>,
    pub gate: Gate,
    pub children: BTreeMap<String, CommandNode>,
    pub arguments: Vec<ArgumentSpec>,
    pub options: Vec<OptionSpec>,
}

impl CommandNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            gate: Gate::Always,
            children: BTreeMap::new(),
            arguments: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn gated(mut self) -> Self {
        self.gate = Gate::RequiresEnvironment;
        self
    }

    pub fn with_argument(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Inserts a child, failing if a sibling already has its name.
    pub fn insert_child(&mut self, child: CommandNode) -> Result<(), ClashError> {
        if self.children.contains_key(&child.name) {
            return Err(ClashError::DuplicateCommand {
                name: child.name,
                parent: self.name.clone(),
            });
        }
        self.children.insert(child.name.clone(), child);
        Ok(())
    }

    /// Folds `other`'s arguments, options and children into this node.
    pub fn absorb(&mut self, other: CommandNode) -> Result<(), ClashError> {
        self.arguments.extend(other.arguments);
        self.options.extend(other.options);
        for child in other.children.into_values() {
            self.insert_child(child)?;
        }
        Ok(())
    }

    pub fn option(&self, token: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.matches(token))
    }

    /// Finds a value-taking option given in `--name=value` form.
    pub fn inline_option<'a>(&self, token: &'a str) -> Option<(&OptionSpec, &'a str)> {
        let (form, value) = token.split_once('=')?;
        self.option(form)
            .filter(|o| o.takes_value)
            .map(|o| (o, value))
    }

    /// Depth-first visit of this node and every descendant.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut CommandNode)) {
        f(self);
        for child in self.children.values_mut() {
            child.visit_mut(f);
        }
    }

    pub fn usage(&self, path: &[&str]) -> String {
        let mut parts: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        parts.extend(self.options.iter().map(OptionSpec::usage));
        parts.extend(self.arguments.iter().map(|a| format!("<{}>", a.name)));
        if self.is_group() {
            parts.push("<command>".to_string());
        }
        format!("usage: {}", parts.join(" "))
    }
}
