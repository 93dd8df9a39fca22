//! # clash
//!
//! A configuration-driven command dispatcher. A YAML specification declares commands,
//! arguments, options and reusable macros; clash compiles it once into an immutable command
//! tree, keeps a store of named environments, and answers shell completion queries against
//! the tree and the active environment.
//!
//! ## Module Structure
//! - **`spec`**: specification documents and their loader
//! - **`macros`**: macro registry and expansion
//! - **`tree`**: command nodes, built-ins, tree construction and token walking
//! - **`env`**: environments and the persisted store
//! - **`completion`**: completers, partial input and the resolver
//! - **`dispatch`**: binding full command lines and running built-ins
//! - **`cli`**: the `clash` binary front end

pub use crate::diagnostics::{ClashError, ErrorType};

pub mod cli;
pub mod completion;
pub mod diagnostics;
pub mod dispatch;
pub mod env;
pub mod macros;
pub mod spec;
pub mod tree;
