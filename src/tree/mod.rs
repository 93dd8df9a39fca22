//! The normalized command tree: nodes, built-ins, construction and token walking.

pub mod builder;
pub mod builtins;
pub mod node;
pub mod walk;

pub use builder::{CommandTree, TreeBuilder, DEFAULT_PROGRAM};
pub use node::{ArgumentSpec, CommandNode, Gate, OptionSpec, ValueSource};
pub use walk::{SuppliedOption, Walk};
