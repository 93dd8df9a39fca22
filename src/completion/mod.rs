//! Shell completion: completers, partial input and the resolver.

pub mod completer;
pub mod input;
pub mod resolver;

pub use completer::{
    ActiveEnvironment, BoundCompleter, Choices, Completer, CompleterRegistry, FnCompleter,
    UserData, ACTIVE_ENVIRONMENT_COMPLETER, ENVIRONMENTS_COMPLETER,
};
pub use input::{format_reply, PartialInput};
pub use resolver::{resolve, ResolveContext};
