//! The environment store: owner of every [`Environment`] and of the active selection.
//!
//! One store instance lives for the whole process. Queries read it through
//! [`EnvironmentStore::context`]; only explicit `create`/`use`/`remove` dispatches mutate it.

use std::fs;
use std::path::{Path, PathBuf};

use im::OrdMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::environment::{validate_environment_name, Environment};
use crate::completion::ResolveContext;
use crate::{usage_err, ClashError};

/// File name of the persisted store inside the home directory.
pub const STORE_FILE: &str = "environments.json";

/// Everything `create` needs besides the store itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequest {
    pub name: String,
    pub user_data: OrdMap<String, Value>,
    pub storage_dir: Option<PathBuf>,
    pub editable: bool,
    /// Replace an existing environment of the same name instead of failing.
    pub reset: bool,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    active: Option<String>,
    #[serde(default)]
    environments: Vec<Environment>,
}

#[derive(Debug, Default)]
pub struct EnvironmentStore {
    home: Option<PathBuf>,
    environments: Vec<Environment>,
    active: Option<String>,
}

impl EnvironmentStore {
    /// A store that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store under `home`. A missing store file is an empty store.
    pub fn open(home: impl Into<PathBuf>) -> Result<Self, ClashError> {
        let home = home.into();
        let path = home.join(STORE_FILE);
        let file = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str::<StoreFile>(&content).map_err(|source| {
                ClashError::StoreFormat {
                    path: path.display().to_string(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(ClashError::resource("read", &path, e)),
        };
        tracing::debug!(
            path = %path.display(),
            environments = file.environments.len(),
            "opened environment store"
        );
        // A dangling active name (edited file) reads as no active environment.
        let active = file
            .active
            .filter(|name| file.environments.iter().any(|e| &e.name == name));
        Ok(Self {
            home: Some(home),
            environments: file.environments,
            active,
        })
    }

    /// Writes the store to `<home>/environments.json`. In-memory stores do nothing.
    pub fn save(&self) -> Result<(), ClashError> {
        let Some(home) = &self.home else {
            return Ok(());
        };
        fs::create_dir_all(home).map_err(|e| ClashError::resource("create", home, e))?;
        let path = home.join(STORE_FILE);
        let file = StoreFile {
            active: self.active.clone(),
            environments: self.environments.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|source| ClashError::StoreFormat {
            path: path.display().to_string(),
            source,
        })?;
        let tmp = home.join(format!("{STORE_FILE}.tmp"));
        fs::write(&tmp, content).map_err(|e| ClashError::resource("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| ClashError::resource("replace", &path, e))?;
        tracing::debug!(path = %path.display(), "saved environment store");
        Ok(())
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    /// Creates an environment. The first one created while none is active becomes active.
    pub fn create(&mut self, request: CreateRequest) -> Result<&Environment, ClashError> {
        validate_environment_name(&request.name)?;
        if let Some(pos) = self.position(&request.name) {
            if !request.reset {
                return Err(ClashError::DuplicateEnvironment { name: request.name });
            }
            tracing::info!(name = %request.name, "resetting environment");
            self.environments.remove(pos);
        }
        let environment = Environment {
            name: request.name,
            user_data: request.user_data,
            storage_dir: request.storage_dir,
            editable: request.editable,
            initialized: false,
        };
        if self.active.is_none() {
            self.active = Some(environment.name.clone());
        }
        tracing::info!(name = %environment.name, "created environment");
        self.environments.push(environment);
        Ok(&self.environments[self.environments.len() - 1])
    }

    /// Makes `name` the active environment.
    pub fn use_environment(&mut self, name: &str) -> Result<(), ClashError> {
        if self.position(name).is_none() {
            return Err(self.unknown(name));
        }
        self.active = Some(name.to_string());
        Ok(())
    }

    /// Deletes `name`. Removing the active environment leaves none active.
    pub fn remove(&mut self, name: &str) -> Result<Environment, ClashError> {
        let pos = self.position(name).ok_or_else(|| self.unknown(name))?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        tracing::info!(name, "removed environment");
        Ok(self.environments.remove(pos))
    }

    /// Environment names in creation order.
    pub fn list(&self) -> Vec<&str> {
        self.environments.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    pub fn active(&self) -> Option<&Environment> {
        self.active.as_deref().and_then(|name| self.get(name))
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Marks the active environment initialized (or re-initialized with `reset`).
    pub fn initialize_active(&mut self, reset: bool) -> Result<&Environment, ClashError> {
        let name = self.active.clone().ok_or(ClashError::NoActiveEnvironment)?;
        let pos = self.position(&name).ok_or(ClashError::NoActiveEnvironment)?;
        let environment = &mut self.environments[pos];
        if environment.initialized && !reset {
            return Err(usage_err!(
                "environment '{}' is already initialized", environment.name;
                help = "pass --reset to initialize it again"
            ));
        }
        environment.initialized = true;
        tracing::info!(name = %environment.name, reset, "initialized environment");
        Ok(&self.environments[pos])
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Read-only snapshot handed to the resolver for one query.
    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext {
            active: self.active(),
            environments: self.list(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.environments.iter().position(|e| e.name == name)
    }

    fn unknown(&self, name: &str) -> ClashError {
        let help = if self.environments.is_empty() {
            "no environments exist yet; create one with `env create`".to_string()
        } else {
            format!("known environments: {}", self.list().join(", "))
        };
        ClashError::UnknownEnvironment {
            name: name.to_string(),
            help: Some(help),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_environment_becomes_active() {
        let mut store = EnvironmentStore::in_memory();
        store.create(CreateRequest::new("main")).unwrap();
        store.create(CreateRequest::new("second")).unwrap();
        assert_eq!(store.active_name(), Some("main"));
        assert_eq!(store.list(), vec!["main", "second"]);
    }

    #[test]
    fn duplicates_fail_unless_reset() {
        let mut store = EnvironmentStore::in_memory();
        store.create(CreateRequest::new("main")).unwrap();
        let err = store.create(CreateRequest::new("main")).unwrap_err();
        assert!(matches!(err, ClashError::DuplicateEnvironment { .. }));

        let mut reset = CreateRequest::new("main");
        reset.reset = true;
        reset.editable = true;
        assert!(store.create(reset).unwrap().editable);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn removing_the_active_environment_clears_it() {
        let mut store = EnvironmentStore::in_memory();
        store.create(CreateRequest::new("main")).unwrap();
        store.create(CreateRequest::new("second")).unwrap();
        store.remove("main").unwrap();
        assert!(store.active().is_none());
        assert_eq!(store.list(), vec!["second"]);

        store.use_environment("second").unwrap();
        assert_eq!(store.active().map(|e| e.name.as_str()), Some("second"));
    }

    #[test]
    fn unknown_names_are_reported() {
        let mut store = EnvironmentStore::in_memory();
        assert!(matches!(
            store.use_environment("nope").unwrap_err(),
            ClashError::UnknownEnvironment { .. }
        ));
        assert!(matches!(
            store.remove("nope").unwrap_err(),
            ClashError::UnknownEnvironment { .. }
        ));
    }

    #[test]
    fn initialize_requires_an_active_environment() {
        let mut store = EnvironmentStore::in_memory();
        assert!(matches!(
            store.initialize_active(false).unwrap_err(),
            ClashError::NoActiveEnvironment
        ));
        store.create(CreateRequest::new("main")).unwrap();
        assert!(store.initialize_active(false).unwrap().initialized);
        assert!(matches!(
            store.initialize_active(false).unwrap_err(),
            ClashError::Usage { .. }
        ));
        assert!(store.initialize_active(true).is_ok());
    }

    #[test]
    fn store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        {
            let mut store = EnvironmentStore::open(&home).unwrap();
            assert!(store.is_empty());
            let mut request = CreateRequest::new("main");
            request.user_data.insert("arg1".to_string(), Value::from("x"));
            store.create(request).unwrap();
            store.create(CreateRequest::new("second")).unwrap();
            store.use_environment("second").unwrap();
            store.save().unwrap();
        }
        let store = EnvironmentStore::open(&home).unwrap();
        assert_eq!(store.list(), vec!["main", "second"]);
        assert_eq!(store.active_name(), Some("second"));
        assert_eq!(store.get("main").unwrap().get_str("arg1"), Some("x"));
    }

    #[test]
    fn malformed_store_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), "{not json").unwrap();
        let err = EnvironmentStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, ClashError::StoreFormat { .. }));
    }
}
