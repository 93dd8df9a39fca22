//! # Macros
//!
//! Named, reusable fragments of arguments and subcommands, spliced into the command tree at
//! build time. Once expanded a macro is indistinguishable from any other command; there is
//! no macro resolution at query time.
//!
//! ## Module Structure
//! - **`types`**: `Macro`, `MacroEntry`, `MacroPath` and limits
//! - **`registry`**: merged namespace of every loaded macro document
//! - **`expander`**: lowering of command documents with cycle detection

pub mod expander;
pub mod registry;
pub mod types;

pub use expander::MacroExpander;
pub use registry::MacroRegistry;
pub use types::{Macro, MacroEntry, MacroNamespace, MacroPath, MAX_MACRO_RECURSION_DEPTH};
