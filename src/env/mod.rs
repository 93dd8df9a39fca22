//! Named, persisted execution contexts.

pub mod environment;
pub mod store;

pub use environment::{validate_environment_name, Environment, DEFAULT_ENVIRONMENT};
pub use store::{CreateRequest, EnvironmentStore, STORE_FILE};
