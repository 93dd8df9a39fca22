//! Unified, `miette`-based diagnostics for clash.
//!
//! Every failure mode of the tree compiler, the environment store, the dispatcher and the
//! loaders is a variant of [`ClashError`]. Build-time variants are fatal and surface to the
//! caller; the completion resolver never produces them (it degrades instead).
//!
//! # Error Construction
//!
//! - Construct variants directly when the fields carry meaning (`Cycle`, `DuplicateCommand`, ...).
//! - Use [`usage_err!`](crate::usage_err) for dispatch-time binding failures, which are
//!   message-only.
//!
//! ```rust
//! use clash::{usage_err, ClashError};
//! let err = usage_err!("missing argument <{}>", "name");
//! assert!(matches!(err, ClashError::Usage { .. }));
//! ```

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Type-safe classification of [`ClashError`] variants, used by the CLI and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Macro expansion and macro namespace failures
    Macro,
    /// Command tree construction failures
    Tree,
    /// Environment store failures
    Environment,
    /// Specification document failures
    Spec,
    /// Dispatch-time binding failures
    Usage,
    /// Filesystem and persistence failures
    Resource,
    /// Completer callback failures
    Completer,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Macro => "Macro",
            ErrorType::Tree => "Tree",
            ErrorType::Environment => "Environment",
            ErrorType::Spec => "Spec",
            ErrorType::Usage => "Usage",
            ErrorType::Resource => "Resource",
            ErrorType::Completer => "Completer",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for every clash failure mode.
#[derive(Debug, Error, Diagnostic)]
pub enum ClashError {
    #[error("macro expansion cycle: {chain}")]
    #[diagnostic(
        code(clash::macros::cycle),
        help("a macro must not reference itself, directly or through other macros")
    )]
    Cycle { chain: String },

    #[error("name collision at '{path}': {reason}")]
    #[diagnostic(code(clash::macros::name_collision))]
    NameCollision { path: String, reason: String },

    #[error("unknown macro '{path}'")]
    #[diagnostic(code(clash::macros::unknown))]
    UnknownMacro {
        path: String,
        #[help]
        help: Option<String>,
    },

    #[error("duplicate command '{name}' under '{parent}'")]
    #[diagnostic(
        code(clash::tree::duplicate_command),
        help("command names must be unique among siblings, including the built-in commands")
    )]
    DuplicateCommand { name: String, parent: String },

    #[error("duplicate option '{form}' on command '{command}'")]
    #[diagnostic(code(clash::tree::duplicate_option))]
    DuplicateOption { form: String, command: String },

    #[error("unknown completer '{name}'")]
    #[diagnostic(
        code(clash::completion::unknown_completer),
        help("register it with `CompleterRegistry::register` before building the tree")
    )]
    UnknownCompleter { name: String },

    #[error("completer '{name}' failed: {message}")]
    #[diagnostic(code(clash::completion::completer))]
    Completer { name: String, message: String },

    #[error("environment '{name}' already exists")]
    #[diagnostic(
        code(clash::env::duplicate),
        help("pass --reset to recreate it")
    )]
    DuplicateEnvironment { name: String },

    #[error("unknown environment '{name}'")]
    #[diagnostic(code(clash::env::unknown))]
    UnknownEnvironment {
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("no active environment")]
    #[diagnostic(
        code(clash::env::inactive),
        help("create one with `env create` or select one with `env use`")
    )]
    NoActiveEnvironment,

    #[error("invalid {kind} name '{name}'")]
    #[diagnostic(code(clash::names::invalid))]
    InvalidName {
        kind: &'static str,
        name: String,
        #[help]
        help: Option<String>,
    },

    #[error("invalid specification: {message}")]
    #[diagnostic(code(clash::spec::invalid))]
    InvalidSpec {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("failed to parse {origin}: {message}")]
    #[diagnostic(code(clash::spec::syntax))]
    SpecSyntax {
        origin: String,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("failed to {operation} '{path}'")]
    #[diagnostic(code(clash::io))]
    Resource {
        operation: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed environment store '{path}'")]
    #[diagnostic(
        code(clash::env::store_format),
        help("the store is plain JSON; fix or delete the file to start over")
    )]
    StoreFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(clash::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl ClashError {
    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            ClashError::Cycle { .. }
            | ClashError::NameCollision { .. }
            | ClashError::UnknownMacro { .. } => ErrorType::Macro,
            ClashError::DuplicateCommand { .. } | ClashError::DuplicateOption { .. } => {
                ErrorType::Tree
            }
            ClashError::UnknownCompleter { .. } | ClashError::Completer { .. } => {
                ErrorType::Completer
            }
            ClashError::DuplicateEnvironment { .. }
            | ClashError::UnknownEnvironment { .. }
            | ClashError::NoActiveEnvironment
            | ClashError::StoreFormat { .. } => ErrorType::Environment,
            ClashError::InvalidName { .. }
            | ClashError::InvalidSpec { .. }
            | ClashError::SpecSyntax { .. } => ErrorType::Spec,
            ClashError::Resource { .. } => ErrorType::Resource,
            ClashError::Usage { .. } => ErrorType::Usage,
        }
    }

    /// Wraps an I/O failure with the operation and path that caused it.
    pub fn resource(operation: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        ClashError::Resource {
            operation,
            path: path.display().to_string(),
            source,
        }
    }

    /// Builds an `InvalidSpec` error without help text.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        ClashError::InvalidSpec {
            message: message.into(),
            help: None,
        }
    }
}

/// Constructs a [`ClashError::Usage`] with a formatted message and no help text.
///
/// A trailing `; help = expr` arm attaches help.
#[macro_export]
macro_rules! usage_err {
    ($fmt:literal $(, $arg:expr)* ; help = $help:expr) => {
        $crate::ClashError::Usage {
            message: format!($fmt $(, $arg)*),
            help: Some(($help).to_string()),
        }
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::ClashError::Usage {
            message: format!($fmt $(, $arg)*),
            help: None,
        }
    };
}
