//! Dynamic value completers.
//!
//! A [`Completer`] is resolved by name once, while the tree is built, and invoked at query
//! time with the active environment and the argument values already resolved on the line.
//! Completers must be pure with respect to the tree and the environment store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::env::Environment;
use crate::spec::CompleterDoc;
use crate::tree::ValueSource;
use crate::ClashError;

/// Registry name that binds to the environment names of the store.
pub const ENVIRONMENTS_COMPLETER: &str = "environments";

/// Registry name that completes the active environment's own name.
pub const ACTIVE_ENVIRONMENT_COMPLETER: &str = "active_environment";

const RESERVED: [&str; 2] = [ENVIRONMENTS_COMPLETER, ACTIVE_ENVIRONMENT_COMPLETER];

/// Produces candidate values for an argument or a value-taking option.
pub trait Completer: Send + Sync {
    fn complete(
        &self,
        environment: Option<&Environment>,
        resolved: &[String],
    ) -> Result<Vec<String>, ClashError>;
}

/// A fixed list of candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choices(pub Vec<String>);

impl Completer for Choices {
    fn complete(&self, _: Option<&Environment>, _: &[String]) -> Result<Vec<String>, ClashError> {
        Ok(self.0.clone())
    }
}

/// The active environment's name, or nothing without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEnvironment;

impl Completer for ActiveEnvironment {
    fn complete(&self, environment: Option<&Environment>, _: &[String]) -> Result<Vec<String>, ClashError> {
        Ok(environment.map(|e| e.name.clone()).into_iter().collect())
    }
}

/// Values stored under `key` in the active environment's user data. Arrays yield one
/// candidate per element, null or a missing key yields none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserData(pub String);

impl Completer for UserData {
    fn complete(&self, environment: Option<&Environment>, _: &[String]) -> Result<Vec<String>, ClashError> {
        let Some(value) = environment.and_then(|e| e.get(&self.0)) else {
            return Ok(Vec::new());
        };
        Ok(match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items.iter().filter_map(scalar).collect(),
            other => scalar(other).into_iter().collect(),
        })
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        _ => None,
    }
}

/// Adapts a closure into a [`Completer`].
pub struct FnCompleter<F>(pub F);

impl<F> Completer for FnCompleter<F>
where
    F: Fn(Option<&Environment>, &[String]) -> Result<Vec<String>, ClashError> + Send + Sync,
{
    fn complete(
        &self,
        environment: Option<&Environment>,
        resolved: &[String],
    ) -> Result<Vec<String>, ClashError> {
        (self.0)(environment, resolved)
    }
}

/// A completer bound into the tree, remembering the name it was resolved from.
#[derive(Clone)]
pub struct BoundCompleter {
    pub name: String,
    completer: Arc<dyn Completer>,
}

impl BoundCompleter {
    pub fn new(name: impl Into<String>, completer: Arc<dyn Completer>) -> Self {
        Self {
            name: name.into(),
            completer,
        }
    }

    pub fn complete(
        &self,
        environment: Option<&Environment>,
        resolved: &[String],
    ) -> Result<Vec<String>, ClashError> {
        self.completer.complete(environment, resolved)
    }
}

impl fmt::Debug for BoundCompleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCompleter").field("name", &self.name).finish()
    }
}

/// Name → completer table consulted while the tree is built.
///
/// Registering a name twice replaces the earlier completer and returns it, mirroring a map
/// insert. `environments` and `active_environment` are reserved.
#[derive(Clone, Default)]
pub struct CompleterRegistry {
    completers: HashMap<String, Arc<dyn Completer>>,
}

impl CompleterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        completer: impl Completer + 'static,
    ) -> Result<Option<Arc<dyn Completer>>, ClashError> {
        if RESERVED.contains(&name) {
            return Err(ClashError::NameCollision {
                path: name.to_string(),
                reason: "this completer name is reserved".to_string(),
            });
        }
        Ok(self.completers.insert(name.to_string(), Arc::new(completer)))
    }

    /// Registers a closure completer.
    pub fn register_fn<F>(&mut self, name: &str, f: F) -> Result<Option<Arc<dyn Completer>>, ClashError>
    where
        F: Fn(Option<&Environment>, &[String]) -> Result<Vec<String>, ClashError>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, FnCompleter(f))
    }

    pub fn contains(&self, name: &str) -> bool {
        RESERVED.contains(&name) || self.completers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.completers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completers.is_empty()
    }

    /// Resolves a completer reference into the value source stored in the tree.
    pub fn resolve(&self, doc: &CompleterDoc) -> Result<ValueSource, ClashError> {
        match doc {
            CompleterDoc::Named(name) if name == ENVIRONMENTS_COMPLETER => {
                Ok(ValueSource::EnvironmentNames)
            }
            CompleterDoc::Named(name) if name == ACTIVE_ENVIRONMENT_COMPLETER => Ok(
                ValueSource::Completer(BoundCompleter::new(name, Arc::new(ActiveEnvironment))),
            ),
            CompleterDoc::Named(name) => self
                .completers
                .get(name)
                .map(|c| ValueSource::Completer(BoundCompleter::new(name, Arc::clone(c))))
                .ok_or_else(|| ClashError::UnknownCompleter { name: name.clone() }),
            CompleterDoc::Choices { choices } => Ok(ValueSource::Completer(BoundCompleter::new(
                "choices",
                Arc::new(Choices(choices.clone())),
            ))),
            CompleterDoc::UserData { user_data } => Ok(ValueSource::Completer(BoundCompleter::new(
                format!("user_data.{user_data}"),
                Arc::new(UserData(user_data.clone())),
            ))),
        }
    }
}

impl fmt::Debug for CompleterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.completers.keys().collect();
        names.sort();
        f.debug_struct("CompleterRegistry").field("completers", &names).finish()
    }
}
